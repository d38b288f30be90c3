use cbs_core::Money;
use serde::{Deserialize, Serialize};
use std::fmt;

/// Non-fatal parse-quality signals. Collected per document and surfaced
/// alongside results; nothing here aborts a parse or alters parsed data.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum ParseWarning {
    /// No ledger section header was found in the document.
    MissingLedgerSection,
    /// No checking-summary section header was found in the document.
    MissingSummarySection,
    /// A fixed summary label had no matching line.
    SummaryFieldAbsent { label: String },
    /// `Ending − Beginning` disagrees with `Deposits − Total Withdrawals`
    /// beyond the tolerance.
    SummaryBalanceDrift { drift: Money },
    /// A record's printed balance disagrees with the previous balance
    /// plus its amount.
    RunningBalanceDrift {
        description: String,
        expected: Money,
        actual: Money,
    },
    /// Date tokens carried no year and none was derivable from the
    /// source name; the current year was assumed.
    AssumedYear { year: i32 },
}

impl fmt::Display for ParseWarning {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            ParseWarning::MissingLedgerSection => {
                write!(f, "no transaction detail section found")
            }
            ParseWarning::MissingSummarySection => {
                write!(f, "no checking summary section found")
            }
            ParseWarning::SummaryFieldAbsent { label } => {
                write!(f, "summary label not found: {label}")
            }
            ParseWarning::SummaryBalanceDrift { drift } => {
                write!(f, "checking summary totals drift by {drift}")
            }
            ParseWarning::RunningBalanceDrift {
                description,
                expected,
                actual,
            } => write!(
                f,
                "running balance after {description:?} is {actual}, expected {expected}"
            ),
            ParseWarning::AssumedYear { year } => {
                write!(f, "statement year not derivable, assumed {year}")
            }
        }
    }
}
