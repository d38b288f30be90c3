use chrono::NaiveDate;
use rust_decimal::Decimal;
use serde::{Deserialize, Serialize};
use thiserror::Error;

use super::money::Money;

/// The five checking-summary labels as they appear in Chase statements,
/// in statement order. These drive the Summary Extractor and the summary
/// column set used by analysis.
pub const SUMMARY_LABELS: [&str; 5] = [
    "Beginning Balance",
    "Deposits and Additions",
    "ATM & Debit Card Withdrawals",
    "Electronic Withdrawals",
    "Ending Balance",
];

/// One ledger entry recovered from a statement's transaction detail
/// section. `balance` is the running balance the statement prints after
/// this transaction; it is taken from the document, never recomputed.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TransactionRecord {
    pub date: NaiveDate,
    pub description: String,
    /// Signed: positive = credit, negative = debit.
    pub amount: Money,
    pub balance: Money,
}

#[derive(Debug, Clone, Error, PartialEq)]
pub enum SummaryError {
    #[error("summary field missing: {0}")]
    FieldMissing(&'static str),
    #[error("saving rate undefined: Deposits and Additions is zero")]
    ZeroDeposits,
}

/// The checking-summary block of one statement. Source fields are
/// `Option` — an absent label stays absent rather than defaulting to
/// zero, and every derived metric reports which input it is missing.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct CheckingSummaryRecord {
    pub beginning_balance: Option<Money>,
    pub deposits_and_additions: Option<Money>,
    pub atm_debit_withdrawals: Option<Money>,
    pub electronic_withdrawals: Option<Money>,
    pub ending_balance: Option<Money>,
}

impl CheckingSummaryRecord {
    pub fn field(&self, label: &str) -> Option<Money> {
        match label {
            "Beginning Balance" => self.beginning_balance,
            "Deposits and Additions" => self.deposits_and_additions,
            "ATM & Debit Card Withdrawals" => self.atm_debit_withdrawals,
            "Electronic Withdrawals" => self.electronic_withdrawals,
            "Ending Balance" => self.ending_balance,
            _ => None,
        }
    }

    pub fn set_field(&mut self, label: &str, value: Money) {
        match label {
            "Beginning Balance" => self.beginning_balance = Some(value),
            "Deposits and Additions" => self.deposits_and_additions = Some(value),
            "ATM & Debit Card Withdrawals" => self.atm_debit_withdrawals = Some(value),
            "Electronic Withdrawals" => self.electronic_withdrawals = Some(value),
            "Ending Balance" => self.ending_balance = Some(value),
            _ => {}
        }
    }

    /// `|ATM & Debit Card Withdrawals| + |Electronic Withdrawals|`.
    pub fn total_withdrawals(&self) -> Result<Money, SummaryError> {
        let atm = self
            .atm_debit_withdrawals
            .ok_or(SummaryError::FieldMissing("ATM & Debit Card Withdrawals"))?;
        let electronic = self
            .electronic_withdrawals
            .ok_or(SummaryError::FieldMissing("Electronic Withdrawals"))?;
        Ok(atm.abs() + electronic.abs())
    }

    /// `Ending Balance − Beginning Balance`.
    pub fn net_savings(&self) -> Result<Money, SummaryError> {
        let beginning = self
            .beginning_balance
            .ok_or(SummaryError::FieldMissing("Beginning Balance"))?;
        let ending = self
            .ending_balance
            .ok_or(SummaryError::FieldMissing("Ending Balance"))?;
        Ok(ending - beginning)
    }

    /// `100 × Net Savings / Deposits and Additions`, rounded to 2 dp.
    pub fn saving_rate(&self) -> Result<Decimal, SummaryError> {
        let deposits = self
            .deposits_and_additions
            .ok_or(SummaryError::FieldMissing("Deposits and Additions"))?;
        if deposits.is_zero() {
            return Err(SummaryError::ZeroDeposits);
        }
        let net = self.net_savings()?;
        Ok((net.as_decimal() / deposits.as_decimal() * Decimal::from(100)).round_dp(2))
    }

    /// Deviation from the statement invariant
    /// `Ending − Beginning == Deposits − Total Withdrawals`.
    /// Advisory: callers compare against a tolerance, nothing is corrected.
    pub fn balance_drift(&self) -> Result<Money, SummaryError> {
        let net = self.net_savings()?;
        let deposits = self
            .deposits_and_additions
            .ok_or(SummaryError::FieldMissing("Deposits and Additions"))?;
        let expected = deposits - self.total_withdrawals()?;
        Ok((net - expected).abs())
    }

    pub fn is_empty(&self) -> bool {
        SUMMARY_LABELS.iter().all(|l| self.field(l).is_none())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::NaiveDate;

    fn full_summary() -> CheckingSummaryRecord {
        CheckingSummaryRecord {
            beginning_balance: Some(Money::from_cents(100_000)),
            deposits_and_additions: Some(Money::from_cents(50_000)),
            atm_debit_withdrawals: Some(Money::from_cents(-20_000)),
            electronic_withdrawals: Some(Money::from_cents(-10_000)),
            ending_balance: Some(Money::from_cents(120_000)),
        }
    }

    #[test]
    fn total_withdrawals_sums_absolute_values() {
        assert_eq!(
            full_summary().total_withdrawals().unwrap(),
            Money::from_cents(30_000)
        );
    }

    #[test]
    fn net_savings_is_ending_minus_beginning() {
        assert_eq!(full_summary().net_savings().unwrap(), Money::from_cents(20_000));
    }

    #[test]
    fn saving_rate_rounds_to_two_places() {
        // 200.00 / 500.00 * 100 = 40.00
        let rate = full_summary().saving_rate().unwrap();
        assert_eq!(rate, Decimal::new(4000, 2));
    }

    #[test]
    fn saving_rate_zero_deposits_is_domain_error() {
        let mut s = full_summary();
        s.deposits_and_additions = Some(Money::zero());
        assert_eq!(s.saving_rate(), Err(SummaryError::ZeroDeposits));
    }

    #[test]
    fn derived_metrics_report_missing_inputs() {
        let s = CheckingSummaryRecord::default();
        assert_eq!(
            s.net_savings(),
            Err(SummaryError::FieldMissing("Beginning Balance"))
        );
        assert_eq!(
            s.total_withdrawals(),
            Err(SummaryError::FieldMissing("ATM & Debit Card Withdrawals"))
        );
    }

    #[test]
    fn balance_drift_zero_when_invariant_holds() {
        // 1200 - 1000 == 500 - 300
        assert!(full_summary().balance_drift().unwrap().is_zero());
    }

    #[test]
    fn balance_drift_reports_violation() {
        let mut s = full_summary();
        s.ending_balance = Some(Money::from_cents(125_000));
        assert_eq!(s.balance_drift().unwrap(), Money::from_cents(5_000));
    }

    #[test]
    fn field_lookup_by_label() {
        let s = full_summary();
        for label in SUMMARY_LABELS {
            assert!(s.field(label).is_some(), "missing {label}");
        }
        assert!(s.field("Not A Label").is_none());
    }

    #[test]
    fn transaction_record_serializes() {
        let r = TransactionRecord {
            date: NaiveDate::from_ymd_opt(2024, 3, 15).unwrap(),
            description: "Card Purchase - Coffee".into(),
            amount: Money::from_cents(-450),
            balance: Money::from_cents(95_550),
        };
        let json = serde_json::to_string(&r).unwrap();
        let back: TransactionRecord = serde_json::from_str(&json).unwrap();
        assert_eq!(back, r);
    }
}
