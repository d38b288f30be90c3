//! Multi-statement aggregation and time-bucketed analysis.

pub mod aggregate;
pub mod analyze;

pub use aggregate::{
    load_documents, merge_statements, parse_batch, BatchError, BatchResult, DedupPolicy,
    DocumentFailure, DocumentInput, MergeCache, MergeOptions, MergedCollections, SortDirection,
};
pub use analyze::{
    describe_summaries, describe_transactions, reduce_summaries_by_time,
    reduce_transactions_by_time, AnalysisError, Granularity, Pick, ENDING_BALANCE_MEAN,
    TRANSACTIONS_COUNT,
};
