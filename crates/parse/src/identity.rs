//! Statement identity resolution.
//!
//! Priority: the month most dated transactions fall in (ties toward the
//! most recent month), falling back to year/month tokens in the source
//! file name. Failure excludes the document from multi-statement
//! aggregation only — the standalone parse stays usable.

use std::collections::HashMap;
use std::path::Path;
use std::sync::OnceLock;

use regex::Regex;
use thiserror::Error;

use cbs_core::{StatementIdentity, TransactionRecord};

macro_rules! re {
    ($name:ident, $pat:expr) => {
        fn $name() -> &'static Regex {
            static R: OnceLock<Regex> = OnceLock::new();
            R.get_or_init(|| Regex::new($pat).expect("invalid regex"))
        }
    };
}

// `20240115-statement.pdf` style (the source convention) …
re!(re_compact_date, r"\b(\d{4})(\d{2})\d{2}\b");
// … and `2024-01` / `2024_01` separators.
re!(re_separated_date, r"\b(\d{4})[-_](\d{2})\b");

#[derive(Debug, Clone, Error, PartialEq)]
pub enum IdentityError {
    #[error("cannot derive (year, month): no dated transactions and no usable source name{0}")]
    Unresolvable(String),
}

/// Derive the `(year, month)` key for one parsed document.
pub fn resolve_identity(
    records: &[TransactionRecord],
    source: Option<&Path>,
) -> Result<StatementIdentity, IdentityError> {
    if let Some(identity) = majority_month(records) {
        return Ok(identity);
    }
    if let Some(identity) = source.and_then(identity_from_name) {
        return Ok(identity);
    }
    let detail = source
        .map(|p| format!(" ({})", p.display()))
        .unwrap_or_default();
    Err(IdentityError::Unresolvable(detail))
}

/// Majority vote over transaction months; ties break toward the most
/// recent month.
fn majority_month(records: &[TransactionRecord]) -> Option<StatementIdentity> {
    let mut counts: HashMap<StatementIdentity, usize> = HashMap::new();
    for record in records {
        *counts.entry(StatementIdentity::from_date(record.date)).or_default() += 1;
    }
    counts
        .into_iter()
        .max_by_key(|(identity, count)| (*count, *identity))
        .map(|(identity, _)| identity)
}

fn identity_from_name(source: &Path) -> Option<StatementIdentity> {
    let name = source.file_stem()?.to_str()?;
    for re in [re_compact_date(), re_separated_date()] {
        if let Some(caps) = re.captures(name) {
            let year: i32 = caps[1].parse().ok()?;
            let month: u32 = caps[2].parse().ok()?;
            if let Some(identity) = StatementIdentity::new(year, month) {
                return Some(identity);
            }
        }
    }
    None
}

/// Year component only, for seeding the transaction extractor before any
/// dates have been parsed.
pub fn year_hint_from_name(source: &Path) -> Option<i32> {
    identity_from_name(source).map(|id| id.year)
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::Money;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    fn record(y: i32, m: u32, d: u32) -> TransactionRecord {
        TransactionRecord {
            date: NaiveDate::from_ymd_opt(y, m, d).unwrap(),
            description: "x".into(),
            amount: Money::from_cents(100),
            balance: Money::from_cents(100),
        }
    }

    #[test]
    fn majority_month_wins() {
        let records = vec![
            record(2024, 1, 5),
            record(2024, 1, 7),
            record(2023, 12, 31),
        ];
        let id = resolve_identity(&records, None).unwrap();
        assert_eq!(id, StatementIdentity::new(2024, 1).unwrap());
    }

    #[test]
    fn tie_breaks_toward_most_recent_month() {
        let records = vec![record(2023, 12, 31), record(2024, 1, 1)];
        let id = resolve_identity(&records, None).unwrap();
        assert_eq!(id, StatementIdentity::new(2024, 1).unwrap());
    }

    #[test]
    fn empty_ledger_falls_back_to_file_name() {
        let path = PathBuf::from("statements/20240115-statement.txt");
        let id = resolve_identity(&[], Some(&path)).unwrap();
        assert_eq!(id, StatementIdentity::new(2024, 1).unwrap());
    }

    #[test]
    fn separated_file_name_tokens() {
        let path = PathBuf::from("chase_2023-11.txt");
        let id = resolve_identity(&[], Some(&path)).unwrap();
        assert_eq!(id, StatementIdentity::new(2023, 11).unwrap());
    }

    #[test]
    fn transactions_take_priority_over_file_name() {
        let path = PathBuf::from("20230601-old-name.txt");
        let records = vec![record(2024, 2, 1)];
        let id = resolve_identity(&records, Some(&path)).unwrap();
        assert_eq!(id, StatementIdentity::new(2024, 2).unwrap());
    }

    #[test]
    fn unresolvable_is_an_error() {
        let path = PathBuf::from("statement.txt");
        assert!(matches!(
            resolve_identity(&[], Some(&path)),
            Err(IdentityError::Unresolvable(_))
        ));
        assert!(resolve_identity(&[], None).is_err());
    }

    #[test]
    fn bogus_month_token_is_rejected() {
        let path = PathBuf::from("2024-13.txt");
        assert!(resolve_identity(&[], Some(&path)).is_err());
    }

    #[test]
    fn year_hint_from_name_extracts_year() {
        assert_eq!(
            year_hint_from_name(Path::new("20240115-statement.txt")),
            Some(2024)
        );
        assert_eq!(year_hint_from_name(Path::new("nodate.txt")), None);
    }
}
