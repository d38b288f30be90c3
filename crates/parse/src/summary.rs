//! Checking-summary extraction.
//!
//! Each of the five fixed labels takes its value from the first
//! `SUMMARY`-tagged line containing it; a label with no matching line
//! stays absent. Nothing is fabricated — derived metrics live on
//! [`CheckingSummaryRecord`] and fail per-field when inputs are missing.

use std::sync::OnceLock;

use regex::Regex;

use cbs_core::{CheckingSummaryRecord, Money, SUMMARY_LABELS};

use crate::util::parse_signed_amount;
use crate::warning::ParseWarning;

fn re_trailing_number() -> &'static Regex {
    static R: OnceLock<Regex> = OnceLock::new();
    R.get_or_init(|| {
        Regex::new(r"(\(?\$?-?[\d,]+\.\d{2}\)?-?)\s*$").expect("invalid regex")
    })
}

/// Tolerance for the statement invariant
/// `Ending − Beginning == Deposits − Total Withdrawals`.
const DRIFT_TOLERANCE_CENTS: i64 = 1;

/// Build one summary record from `SUMMARY`-tagged lines. Absent labels
/// and invariant violations are warnings; the record itself is always
/// returned (possibly fully absent).
pub fn extract_summary(
    lines: &[String],
    warnings: &mut Vec<ParseWarning>,
) -> CheckingSummaryRecord {
    let mut record = CheckingSummaryRecord::default();

    for label in SUMMARY_LABELS {
        let matched = lines
            .iter()
            .find(|line| contains_label(line, label))
            .and_then(|line| trailing_amount(line));
        match matched {
            Some(value) => record.set_field(label, value),
            None => warnings.push(ParseWarning::SummaryFieldAbsent {
                label: label.to_string(),
            }),
        }
    }

    if let Ok(drift) = record.balance_drift() {
        if drift > Money::from_cents(DRIFT_TOLERANCE_CENTS) {
            warnings.push(ParseWarning::SummaryBalanceDrift { drift });
        }
    }

    record
}

/// Whitespace-normalized containment test, case-insensitive.
fn contains_label(line: &str, label: &str) -> bool {
    let normalize = |s: &str| s.split_whitespace().collect::<Vec<_>>().join(" ").to_lowercase();
    normalize(line).contains(&normalize(label))
}

fn trailing_amount(line: &str) -> Option<Money> {
    let caps = re_trailing_number().captures(line.trim())?;
    parse_signed_amount(&caps[1])
}

#[cfg(test)]
mod tests {
    use super::*;
    use rust_decimal::Decimal;

    fn lines(raw: &[&str]) -> Vec<String> {
        raw.iter().map(|s| s.to_string()).collect()
    }

    fn full_block() -> Vec<String> {
        lines(&[
            "Beginning Balance $1,000.00",
            "Deposits and Additions 500.00",
            "ATM & Debit Card Withdrawals -200.00",
            "Electronic Withdrawals -100.00",
            "Ending Balance $1,200.00",
        ])
    }

    #[test]
    fn extracts_all_five_fields() {
        let mut warnings = Vec::new();
        let record = extract_summary(&full_block(), &mut warnings);
        assert!(warnings.is_empty());
        assert_eq!(record.beginning_balance, Some(Money::from_cents(100_000)));
        assert_eq!(record.deposits_and_additions, Some(Money::from_cents(50_000)));
        assert_eq!(record.atm_debit_withdrawals, Some(Money::from_cents(-20_000)));
        assert_eq!(record.electronic_withdrawals, Some(Money::from_cents(-10_000)));
        assert_eq!(record.ending_balance, Some(Money::from_cents(120_000)));
    }

    #[test]
    fn derived_metrics_satisfy_invariant_within_tolerance() {
        let mut warnings = Vec::new();
        let record = extract_summary(&full_block(), &mut warnings);
        assert_eq!(record.total_withdrawals().unwrap(), Money::from_cents(30_000));
        assert_eq!(record.net_savings().unwrap(), Money::from_cents(20_000));
        assert_eq!(record.saving_rate().unwrap(), Decimal::new(4000, 2));
        assert!(record.balance_drift().unwrap() <= Money::from_cents(1));
    }

    #[test]
    fn missing_label_stays_absent_and_warns() {
        let mut warnings = Vec::new();
        let record = extract_summary(
            &lines(&["Beginning Balance $1,000.00", "Ending Balance $1,200.00"]),
            &mut warnings,
        );
        assert_eq!(record.deposits_and_additions, None);
        assert!(warnings.iter().any(|w| matches!(
            w,
            ParseWarning::SummaryFieldAbsent { label } if label == "Deposits and Additions"
        )));
        // Net savings still computable from the two present fields.
        assert_eq!(record.net_savings().unwrap(), Money::from_cents(20_000));
    }

    #[test]
    fn first_matching_line_wins() {
        let mut warnings = Vec::new();
        let record = extract_summary(
            &lines(&["Ending Balance $5.00", "Ending Balance $9.00"]),
            &mut warnings,
        );
        assert_eq!(record.ending_balance, Some(Money::from_cents(500)));
    }

    #[test]
    fn whitespace_normalized_label_match() {
        let mut warnings = Vec::new();
        let record = extract_summary(
            &lines(&["  ATM  &  Debit   Card  Withdrawals   -42.00"]),
            &mut warnings,
        );
        assert_eq!(record.atm_debit_withdrawals, Some(Money::from_cents(-4_200)));
    }

    #[test]
    fn invariant_violation_is_a_warning_not_an_error() {
        let mut warnings = Vec::new();
        let mut block = full_block();
        block[4] = "Ending Balance $9,999.00".to_string();
        let record = extract_summary(&block, &mut warnings);
        assert!(warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::SummaryBalanceDrift { .. })));
        // Value kept as printed.
        assert_eq!(record.ending_balance, Some(Money::from_cents(999_900)));
    }

    #[test]
    fn empty_input_yields_fully_absent_record() {
        let mut warnings = Vec::new();
        let record = extract_summary(&[], &mut warnings);
        assert!(record.is_empty());
        assert_eq!(warnings.len(), SUMMARY_LABELS.len());
    }
}
