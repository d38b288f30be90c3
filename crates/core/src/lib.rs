pub mod money;
pub mod record;
pub mod statement;
pub mod table;

pub use money::Money;
pub use record::{CheckingSummaryRecord, SummaryError, TransactionRecord, SUMMARY_LABELS};
pub use statement::StatementIdentity;
pub use table::{Cell, Table};
