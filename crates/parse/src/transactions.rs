//! Transaction extraction from classified ledger lines.
//!
//! A logical record starts at a line whose first token is a date
//! (`M/D`, `MM/DD`, optionally `/YY` or `/YYYY`). Lines without a
//! leading date token continue the previous record's description. Once
//! a record's lines are joined, its trailing two numeric tokens are the
//! amount and the running balance.

use std::sync::OnceLock;

use chrono::NaiveDate;
use regex::Regex;

use cbs_core::{Money, TransactionRecord};

use crate::util::parse_signed_amount;
use crate::warning::ParseWarning;

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

re!(re_date_token, r"^\s*(\d{1,2})/(\d{1,2})(?:/(\d{2}|\d{4}))?\b");
// Amount then balance at the end of a joined record. The amount may be
// parenthesized or carry a leading/trailing minus; the balance is the
// statement's running figure and is printed unsigned.
re!(re_trailing_pair,
    r"(?:^|\s)(\(?\$?-?[\d,]+\.\d{2}\)?-?)\s+(\$?-?[\d,]+\.\d{2})\s*$");
re!(re_dot_filler, r"\.{2,}");
re!(re_card_purchase, r"^Card Purchase\s+(.*?)\d{2}/\d{2}");

#[derive(Debug, Clone, Copy)]
pub struct ExtractOptions {
    /// Year applied to date tokens that carry none.
    pub year_hint: i32,
    /// Re-sort the final sequence ascending by date. Default is document
    /// order (Chase prints newest first).
    pub ascending: bool,
    /// Cross-check `balance[i] == balance[i-1] + amount[i]` and emit a
    /// warning on drift. Never alters the parsed values.
    pub check_running_balance: bool,
}

impl Default for ExtractOptions {
    fn default() -> Self {
        ExtractOptions {
            year_hint: 1970,
            ascending: false,
            check_running_balance: false,
        }
    }
}

/// Extract ordered transaction records from `LEDGER`-tagged lines.
pub fn extract_transactions(
    lines: &[String],
    options: ExtractOptions,
    warnings: &mut Vec<ParseWarning>,
) -> Vec<TransactionRecord> {
    let mut records = Vec::new();
    let mut pending: Option<String> = None;

    for line in lines {
        if re_date_token().is_match(line) {
            if let Some(group) = pending.take() {
                if let Some(record) = finish_record(&group, options.year_hint) {
                    records.push(record);
                }
            }
            pending = Some(line.trim().to_string());
        } else if let Some(group) = pending.as_mut() {
            // Continuation line: join with a single space.
            group.push(' ');
            group.push_str(line.trim());
        }
        // Continuation text before any date anchor has no record to
        // attach to and is dropped.
    }
    if let Some(group) = pending.take() {
        if let Some(record) = finish_record(&group, options.year_hint) {
            records.push(record);
        }
    }

    if options.check_running_balance {
        check_running_balance(&records, warnings);
    }

    if options.ascending {
        records.sort_by_key(|r| r.date);
    }

    records
}

/// Parse one joined logical record. Returns `None` when the group has no
/// trailing amount/balance pair (section sub-headers are discarded, not
/// emitted as malformed records).
fn finish_record(group: &str, year_hint: i32) -> Option<TransactionRecord> {
    let caps = re_date_token().captures(group)?;
    let month: u32 = caps[1].parse().ok()?;
    let day: u32 = caps[2].parse().ok()?;
    let year = match caps.get(3) {
        Some(y) => expand_year(y.as_str().parse().ok()?),
        None => year_hint,
    };
    let date = NaiveDate::from_ymd_opt(year, month, day)?;

    let rest = &group[caps.get(0)?.end()..];
    let pair = re_trailing_pair().captures(rest)?;
    let amount = parse_signed_amount(&pair[1])?;
    let balance = parse_signed_amount(&pair[2])?;

    let description = normalize_description(&rest[..pair.get(0)?.start()]);

    Some(TransactionRecord {
        date,
        description,
        amount,
        balance,
    })
}

/// Strip alignment filler, collapse whitespace, and normalize the
/// `Card Purchase <mm/dd>` prefix Chase repeats on card rows.
fn normalize_description(raw: &str) -> String {
    let no_dots = re_dot_filler().replace_all(raw, " ");
    let collapsed = no_dots.split_whitespace().collect::<Vec<_>>().join(" ");
    re_card_purchase()
        .replace(&collapsed, "Card Purchase -")
        .trim()
        .to_string()
}

fn expand_year(y: i32) -> i32 {
    if y < 100 {
        2000 + y
    } else {
        y
    }
}

fn check_running_balance(records: &[TransactionRecord], warnings: &mut Vec<ParseWarning>) {
    for pair in records.windows(2) {
        // Document order is newest-first, so the earlier transaction is
        // the second element of each window.
        let (later, earlier) = (&pair[0], &pair[1]);
        let expected = earlier.balance + later.amount;
        if expected != later.balance {
            warnings.push(ParseWarning::RunningBalanceDrift {
                description: later.description.clone(),
                expected,
                actual: later.balance,
            });
        }
    }
}
