pub mod classify;
pub mod document;
pub mod identity;
pub mod summary;
pub mod transactions;
pub(crate) mod util;
pub mod warning;

pub use classify::{classify_lines, ClassifiedLines, LineTag};
pub use document::{parse_statement, ParseOptions, ParsedStatement};
pub use identity::{resolve_identity, year_hint_from_name, IdentityError};
pub use summary::extract_summary;
pub use transactions::{extract_transactions, ExtractOptions};
pub use warning::ParseWarning;
