//! Multi-statement aggregation: parallel per-document parsing, a single
//! merge/join point, identity-keyed deduplication, and an explicit
//! merge cache keyed by a content hash of the input set.

use std::collections::{HashMap, HashSet};
use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex};

use sha2::{Digest, Sha256};
use thiserror::Error;
use tokio::task::JoinSet;

use cbs_core::{CheckingSummaryRecord, StatementIdentity, Table, TransactionRecord};
use cbs_parse::{parse_statement, ParseOptions, ParsedStatement};

#[derive(Debug, Error)]
pub enum BatchError {
    #[error("cannot read {}: {source}", path.display())]
    Path {
        path: PathBuf,
        source: std::io::Error,
    },
    #[error("no statement text files found under {}", .0.display())]
    NoDocuments(PathBuf),
}

/// One document's extracted text, ready to parse. `name` doubles as the
/// identity-resolution fallback and the cache-key component.
#[derive(Debug, Clone)]
pub struct DocumentInput {
    pub name: String,
    pub text: String,
}

impl DocumentInput {
    pub fn from_path(path: &Path) -> Result<Self, BatchError> {
        let text = std::fs::read_to_string(path).map_err(|source| BatchError::Path {
            path: path.to_path_buf(),
            source,
        })?;
        Ok(DocumentInput {
            name: path.display().to_string(),
            text,
        })
    }
}

/// Collect text dumps from a single file or every `.txt` file in a
/// directory (non-recursive, name order).
pub fn load_documents(path: &Path) -> Result<Vec<DocumentInput>, BatchError> {
    let meta = std::fs::metadata(path).map_err(|source| BatchError::Path {
        path: path.to_path_buf(),
        source,
    })?;
    if meta.is_file() {
        return Ok(vec![DocumentInput::from_path(path)?]);
    }

    let entries = std::fs::read_dir(path).map_err(|source| BatchError::Path {
        path: path.to_path_buf(),
        source,
    })?;
    let mut files: Vec<PathBuf> = entries
        .filter_map(|e| e.ok().map(|e| e.path()))
        .filter(|p| p.extension().and_then(|e| e.to_str()) == Some("txt"))
        .collect();
    files.sort();

    if files.is_empty() {
        return Err(BatchError::NoDocuments(path.to_path_buf()));
    }
    files.iter().map(|p| DocumentInput::from_path(p)).collect()
}

/// A per-document failure inside a batch. Failures never abort the
/// batch — they ride alongside the successful results.
#[derive(Debug, Clone)]
pub struct DocumentFailure {
    pub name: String,
    pub message: String,
}

#[derive(Debug, Default)]
pub struct BatchResult {
    /// Successfully parsed documents, in input order.
    pub statements: Vec<ParsedStatement>,
    pub failures: Vec<DocumentFailure>,
}

/// Parse every document on its own blocking worker and join once.
/// Workers share nothing; the merge below is the only synchronization
/// point, so aborting the owning future abandons in-flight parses
/// without touching completed results.
pub async fn parse_batch(inputs: Vec<DocumentInput>, options: ParseOptions) -> BatchResult {
    let mut set = JoinSet::new();
    let mut names: HashMap<tokio::task::Id, String> = HashMap::new();
    for (index, input) in inputs.into_iter().enumerate() {
        let name = input.name.clone();
        let handle = set.spawn_blocking(move || {
            let source = PathBuf::from(&input.name);
            let parsed = parse_statement(input.text.lines(), Some(&source), options);
            (index, input.name, parsed)
        });
        names.insert(handle.id(), name);
    }

    let mut parsed: Vec<(usize, ParsedStatement)> = Vec::new();
    let mut failures = Vec::new();
    while let Some(joined) = set.join_next().await {
        match joined {
            Ok((index, name, statement)) => {
                if !statement.warnings.is_empty() {
                    tracing::warn!(
                        document = %name,
                        warnings = statement.warnings.len(),
                        "parsed with quality warnings"
                    );
                }
                parsed.push((index, statement));
            }
            Err(err) => failures.push(DocumentFailure {
                name: names
                    .remove(&err.id())
                    .unwrap_or_else(|| String::from("<unknown>")),
                message: err.to_string(),
            }),
        }
    }
    parsed.sort_by_key(|(index, _)| *index);

    BatchResult {
        statements: parsed.into_iter().map(|(_, s)| s).collect(),
        failures,
    }
}

/// What to do when two documents resolve to the same `(year, month)`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum DedupPolicy {
    /// Keep the first-seen document, flag the rest.
    #[default]
    KeepFirst,
    /// Let later documents replace earlier ones.
    Overwrite,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Default)]
pub enum SortDirection {
    /// Most recent statement first.
    #[default]
    Descending,
    Ascending,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct MergeOptions {
    pub dedup: DedupPolicy,
    pub direction: SortDirection,
}

/// The combined views over a batch, ordered by statement identity.
#[derive(Debug, Clone, Default)]
pub struct MergedCollections {
    pub transactions: Vec<TransactionRecord>,
    pub summaries: Vec<(StatementIdentity, CheckingSummaryRecord)>,
    /// Duplicate documents that were dropped (or replaced), by identity.
    pub duplicates: Vec<(StatementIdentity, String)>,
    /// Documents excluded because their identity could not be resolved.
    pub excluded: Vec<String>,
}

impl MergedCollections {
    /// Date / Description / Amount / Balance over every retained statement.
    pub fn transactions_table(&self) -> Table {
        let mut table = Table::new(["Date", "Description", "Amount", "Balance"]);
        for r in &self.transactions {
            table.push_row(vec![
                r.date.into(),
                r.description.clone().into(),
                r.amount.as_decimal().into(),
                r.balance.as_decimal().into(),
            ]);
        }
        table
    }

    /// One row per statement: identity, the five source fields, and the
    /// derived metrics. Uncomputable cells stay empty.
    pub fn summaries_table(&self) -> Table {
        let mut table = Table::new([
            "Date",
            "Beginning Balance",
            "Deposits and Additions",
            "ATM & Debit Card Withdrawals",
            "Electronic Withdrawals",
            "Ending Balance",
            "Total Withdrawals",
            "Net Savings",
            "% Saving Rate",
        ]);
        for (identity, summary) in &self.summaries {
            let money_cell = |m: Option<cbs_core::Money>| match m {
                Some(v) => v.as_decimal().into(),
                None => cbs_core::Cell::Empty,
            };
            table.push_row(vec![
                identity.to_string().into(),
                money_cell(summary.beginning_balance),
                money_cell(summary.deposits_and_additions),
                money_cell(summary.atm_debit_withdrawals),
                money_cell(summary.electronic_withdrawals),
                money_cell(summary.ending_balance),
                money_cell(summary.total_withdrawals().ok()),
                money_cell(summary.net_savings().ok()),
                match summary.saving_rate() {
                    Ok(rate) => rate.into(),
                    Err(_) => cbs_core::Cell::Empty,
                },
            ]);
        }
        table
    }
}

/// Merge a batch's per-document results, taking ownership so record
/// buffers move rather than copy. Documents are visited in input order
/// (dedup is first-seen), then the retained set is ordered by identity
/// in the requested direction; within a statement the extractor's own
/// ordering is preserved.
pub fn merge_statements(
    statements: Vec<ParsedStatement>,
    options: MergeOptions,
) -> MergedCollections {
    let mut retained: Vec<(StatementIdentity, ParsedStatement)> = Vec::new();
    let mut seen: HashMap<StatementIdentity, usize> = HashMap::new();
    let mut merged = MergedCollections::default();

    for statement in statements {
        let name = document_name(&statement);
        let identity = match &statement.identity {
            Ok(identity) => *identity,
            Err(err) => {
                tracing::warn!(document = %name, %err, "excluded from aggregation");
                merged.excluded.push(name);
                continue;
            }
        };
        match seen.get(&identity) {
            None => {
                seen.insert(identity, retained.len());
                retained.push((identity, statement));
            }
            Some(&slot) => match options.dedup {
                DedupPolicy::KeepFirst => {
                    tracing::warn!(document = %name, %identity, "duplicate statement dropped");
                    merged.duplicates.push((identity, name));
                }
                DedupPolicy::Overwrite => {
                    let previous = std::mem::replace(&mut retained[slot].1, statement);
                    merged.duplicates.push((identity, document_name(&previous)));
                }
            },
        }
    }

    match options.direction {
        SortDirection::Descending => retained.sort_by(|a, b| b.0.cmp(&a.0)),
        SortDirection::Ascending => retained.sort_by(|a, b| a.0.cmp(&b.0)),
    }

    for (identity, statement) in retained {
        merged.transactions.extend(statement.transactions);
        merged.summaries.push((identity, statement.summary));
    }

    merged
}

fn document_name(statement: &ParsedStatement) -> String {
    statement
        .source
        .as_ref()
        .map(|p| p.display().to_string())
        .unwrap_or_else(|| String::from("<unnamed>"))
}

/// Explicit merge cache for long-lived embedders that re-query the same
/// input set (the one-shot CLI merges directly). The key is a SHA-256
/// digest over the input set (names and content); recomputation for a
/// key is mutually exclusive, and hits hand out cheap `Arc` clones.
#[derive(Debug, Default)]
pub struct MergeCache {
    inner: Mutex<HashMap<[u8; 32], Arc<MergedCollections>>>,
}

impl MergeCache {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn key(inputs: &[DocumentInput]) -> [u8; 32] {
        let mut hasher = Sha256::new();
        for input in inputs {
            hasher.update(input.name.as_bytes());
            hasher.update([0u8]);
            hasher.update(input.text.as_bytes());
            hasher.update([0u8]);
        }
        hasher.finalize().into()
    }

    /// Return the cached merge for `key`, computing it under the cache
    /// lock if absent. On a hit the passed statements are dropped
    /// unused.
    pub fn get_or_merge(
        &self,
        key: [u8; 32],
        statements: Vec<ParsedStatement>,
        options: MergeOptions,
    ) -> Arc<MergedCollections> {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        if let Some(hit) = inner.get(&key) {
            return Arc::clone(hit);
        }
        let merged = Arc::new(merge_statements(statements, options));
        inner.insert(key, Arc::clone(&merged));
        merged
    }

    /// Drop every cached merge whose key is not in `live` — called when
    /// the input document set changes.
    pub fn retain_keys(&self, live: &HashSet<[u8; 32]>) {
        let mut inner = self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner());
        inner.retain(|key, _| live.contains(key));
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::Money;
    use std::io::Write;

    fn doc(name: &str, body: &str) -> DocumentInput {
        DocumentInput {
            name: name.to_string(),
            text: body.to_string(),
        }
    }

    fn statement_text(deposit: &str) -> String {
        format!(
            "CHECKING SUMMARY\n\
             Beginning Balance $1,000.00\n\
             Deposits and Additions {deposit}\n\
             ATM & Debit Card Withdrawals -200.00\n\
             Electronic Withdrawals -100.00\n\
             Ending Balance $1,200.00\n\
             TRANSACTION DETAIL\n\
             01/15 Deposit {deposit} 1,200.00\n"
        )
    }

    #[tokio::test]
    async fn batch_parses_all_documents_in_input_order() {
        let result = parse_batch(
            vec![
                doc("a/20240131.txt", &statement_text("500.00")),
                doc("b/20231231.txt", &statement_text("400.00")),
            ],
            ParseOptions::default(),
        )
        .await;
        assert!(result.failures.is_empty());
        assert_eq!(result.statements.len(), 2);
        assert!(result.statements[0]
            .source
            .as_ref()
            .unwrap()
            .to_string_lossy()
            .contains("20240131"));
    }

    #[tokio::test]
    async fn one_bad_document_does_not_abort_the_batch() {
        let result = parse_batch(
            vec![
                doc("good/20240131.txt", &statement_text("500.00")),
                doc("empty.txt", "not a statement at all"),
            ],
            ParseOptions::default(),
        )
        .await;
        // The malformed document still parses (empty, warned), so the
        // batch reports two statements and zero hard failures.
        assert_eq!(result.statements.len(), 2);
        assert!(result.statements[1].transactions.is_empty());
        assert!(!result.statements[1].warnings.is_empty());
    }

    fn parsed(name: &str, body: &str) -> ParsedStatement {
        parse_statement(
            body.lines(),
            Some(Path::new(name)),
            ParseOptions::default(),
        )
    }

    #[test]
    fn merge_orders_descending_by_default() {
        let a = parsed("20230630.txt", &statement_text("100.00"));
        let b = parsed("20240131.txt", &statement_text("200.00"));
        let merged = merge_statements(vec![a, b], MergeOptions::default());
        assert_eq!(merged.summaries.len(), 2);
        assert!(merged.summaries[0].0 > merged.summaries[1].0);
    }

    #[test]
    fn duplicate_identity_keeps_first_seen() {
        let a = parsed("first/20240131.txt", &statement_text("500.00"));
        let b = parsed("second/20240115.txt", &statement_text("999.00"));
        let merged = merge_statements(vec![a, b], MergeOptions::default());
        assert_eq!(merged.summaries.len(), 1);
        assert_eq!(
            merged.summaries[0].1.deposits_and_additions,
            Some(Money::from_cents(50_000))
        );
        assert_eq!(merged.duplicates.len(), 1);
    }

    #[test]
    fn duplicate_identity_overwrite_policy() {
        let a = parsed("first/20240131.txt", &statement_text("500.00"));
        let b = parsed("second/20240115.txt", &statement_text("999.00"));
        let merged = merge_statements(
            vec![a, b],
            MergeOptions {
                dedup: DedupPolicy::Overwrite,
                ..MergeOptions::default()
            },
        );
        assert_eq!(merged.summaries.len(), 1);
        assert_eq!(
            merged.summaries[0].1.deposits_and_additions,
            Some(Money::from_cents(99_900))
        );
    }

    #[test]
    fn merge_moves_record_buffers_rather_than_copying() {
        let statement = parsed("20240131.txt", &statement_text("500.00"));
        let buffer = statement.transactions[0].description.as_ptr();
        let merged = merge_statements(vec![statement], MergeOptions::default());
        // Same heap allocation: the description moved into the merged view.
        assert_eq!(merged.transactions[0].description.as_ptr(), buffer);
    }

    #[test]
    fn unresolvable_identity_is_excluded_not_fatal() {
        let bad = parsed("statement.txt", "TRANSACTION DETAIL\nnothing\n");
        let good = parsed("20240131.txt", &statement_text("500.00"));
        let merged = merge_statements(vec![bad, good], MergeOptions::default());
        assert_eq!(merged.summaries.len(), 1);
        assert_eq!(merged.excluded, vec!["statement.txt".to_string()]);
    }

    #[test]
    fn cache_key_tracks_content() {
        let a = vec![doc("a.txt", "one")];
        let b = vec![doc("a.txt", "two")];
        assert_ne!(MergeCache::key(&a), MergeCache::key(&b));
        assert_eq!(MergeCache::key(&a), MergeCache::key(&a));
    }

    #[test]
    fn cache_returns_same_merge_for_same_key() {
        let statements = vec![parsed("20240131.txt", &statement_text("500.00"))];
        let inputs = vec![doc("20240131.txt", &statement_text("500.00"))];
        let cache = MergeCache::new();
        let key = MergeCache::key(&inputs);
        let first = cache.get_or_merge(key, statements, MergeOptions::default());
        let second = cache.get_or_merge(key, Vec::new(), MergeOptions::default());
        // Second call hits the cache — the empty statement slice is never merged.
        assert!(Arc::ptr_eq(&first, &second));
        assert_eq!(second.summaries.len(), 1);
    }

    #[test]
    fn cache_invalidation_drops_dead_keys() {
        let statements = vec![parsed("20240131.txt", &statement_text("500.00"))];
        let cache = MergeCache::new();
        let key = MergeCache::key(&[doc("a", "1")]);
        cache.get_or_merge(key, statements, MergeOptions::default());
        cache.retain_keys(&HashSet::new());
        let recomputed = cache.get_or_merge(key, Vec::new(), MergeOptions::default());
        assert!(recomputed.summaries.is_empty());
    }

    #[test]
    fn load_documents_reads_directory_txt_files() {
        let dir = tempfile::tempdir().unwrap();
        let mut f = std::fs::File::create(dir.path().join("20240131.txt")).unwrap();
        f.write_all(statement_text("500.00").as_bytes()).unwrap();
        std::fs::File::create(dir.path().join("ignore.pdf")).unwrap();

        let docs = load_documents(dir.path()).unwrap();
        assert_eq!(docs.len(), 1);
        assert!(docs[0].name.ends_with("20240131.txt"));
    }

    #[test]
    fn load_documents_missing_path_is_path_error() {
        let err = load_documents(Path::new("/no/such/dir")).unwrap_err();
        assert!(matches!(err, BatchError::Path { .. }));
    }

    #[test]
    fn load_documents_empty_directory_is_an_error() {
        let dir = tempfile::tempdir().unwrap();
        assert!(matches!(
            load_documents(dir.path()),
            Err(BatchError::NoDocuments(_))
        ));
    }
}
