//! Single-document parse orchestration: classify → extract transactions
//! → extract summary → resolve identity. One immutable value out; all
//! quality signals collected, none fatal.

use std::path::{Path, PathBuf};

use chrono::Datelike;

use cbs_core::{CheckingSummaryRecord, StatementIdentity, Table, TransactionRecord};

use crate::classify::classify_lines;
use crate::identity::{resolve_identity, year_hint_from_name, IdentityError};
use crate::summary::extract_summary;
use crate::transactions::{extract_transactions, ExtractOptions};
use crate::warning::ParseWarning;

#[derive(Debug, Clone, Copy)]
pub struct ParseOptions {
    /// Re-sort transactions ascending by date (default: document order).
    pub ascending: bool,
    /// Cross-check the running-balance invariant (warning only).
    pub check_running_balance: bool,
}

impl Default for ParseOptions {
    fn default() -> Self {
        ParseOptions {
            ascending: false,
            check_running_balance: true,
        }
    }
}

/// The immutable result of parsing one statement document.
#[derive(Debug, Clone)]
pub struct ParsedStatement {
    /// Where the text dump came from, when known.
    pub source: Option<PathBuf>,
    pub transactions: Vec<TransactionRecord>,
    pub summary: CheckingSummaryRecord,
    /// `Err` only excludes this document from multi-statement
    /// aggregation; the standalone result stays usable.
    pub identity: Result<StatementIdentity, IdentityError>,
    pub warnings: Vec<ParseWarning>,
}

impl ParsedStatement {
    /// Transactions as a tabular container (Date / Description / Amount /
    /// Balance), the shape writers and the analysis engine consume.
    pub fn transactions_table(&self) -> Table {
        transactions_table(&self.transactions)
    }
}

pub(crate) fn transactions_table(records: &[TransactionRecord]) -> Table {
    let mut table = Table::new(["Date", "Description", "Amount", "Balance"]);
    for r in records {
        table.push_row(vec![
            r.date.into(),
            r.description.clone().into(),
            r.amount.as_decimal().into(),
            r.balance.as_decimal().into(),
        ]);
    }
    table
}

/// Parse one document's extracted text lines.
pub fn parse_statement<'a, I>(
    lines: I,
    source: Option<&Path>,
    options: ParseOptions,
) -> ParsedStatement
where
    I: IntoIterator<Item = &'a str>,
{
    let mut warnings = Vec::new();
    let classified = classify_lines(lines);

    if classified.ledger.is_empty() {
        warnings.push(ParseWarning::MissingLedgerSection);
    }
    if classified.summary.is_empty() {
        warnings.push(ParseWarning::MissingSummarySection);
    }

    let year_hint = match source.and_then(year_hint_from_name) {
        Some(year) => year,
        None => {
            let assumed = chrono::Local::now().year();
            if !classified.ledger.is_empty() {
                warnings.push(ParseWarning::AssumedYear { year: assumed });
            }
            assumed
        }
    };

    let transactions = extract_transactions(
        &classified.ledger,
        ExtractOptions {
            year_hint,
            ascending: options.ascending,
            check_running_balance: options.check_running_balance,
        },
        &mut warnings,
    );

    let summary = extract_summary(&classified.summary, &mut warnings);
    let identity = resolve_identity(&transactions, source);

    if !warnings.is_empty() {
        tracing::debug!(
            source = %source.map(|p| p.display().to_string()).unwrap_or_default(),
            count = warnings.len(),
            "parse completed with quality warnings"
        );
    }

    ParsedStatement {
        source: source.map(Path::to_path_buf),
        transactions,
        summary,
        identity,
        warnings,
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use cbs_core::Money;
    use chrono::NaiveDate;
    use std::path::PathBuf;

    const DOC: &str = "\
CHECKING SUMMARY
Beginning Balance $1,000.00
Deposits and Additions 500.00
ATM & Debit Card Withdrawals -200.00
Electronic Withdrawals -100.00
Ending Balance $1,200.00
TRANSACTION DETAIL
DATE DESCRIPTION AMOUNT BALANCE
01/15 Deposit 500.00 1,200.00
01/10 Card Purchase 01/09 Grocer -300.00 700.00
";

    fn parse(doc: &str, name: Option<&str>) -> ParsedStatement {
        let path = name.map(PathBuf::from);
        parse_statement(doc.lines(), path.as_deref(), ParseOptions::default())
    }

    #[test]
    fn full_document_parses_cleanly() {
        let parsed = parse(DOC, Some("20240131-statement.txt"));
        assert_eq!(parsed.transactions.len(), 2);
        assert_eq!(parsed.summary.ending_balance, Some(Money::from_cents(120_000)));
        assert_eq!(
            parsed.identity.as_ref().unwrap(),
            &StatementIdentity::new(2024, 1).unwrap()
        );
    }

    #[test]
    fn year_hint_comes_from_file_name() {
        let parsed = parse(DOC, Some("20230131-statement.txt"));
        assert_eq!(
            parsed.transactions[0].date,
            NaiveDate::from_ymd_opt(2023, 1, 15).unwrap()
        );
        assert!(!parsed
            .warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::AssumedYear { .. })));
    }

    #[test]
    fn nameless_document_assumes_current_year_with_warning() {
        let parsed = parse(DOC, None);
        assert!(parsed
            .warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::AssumedYear { .. })));
    }

    #[test]
    fn missing_ledger_section_warns_and_yields_empty_collection() {
        let doc = "CHECKING SUMMARY\nEnding Balance $5.00\n";
        let parsed = parse(doc, Some("20240131.txt"));
        assert!(parsed.transactions.is_empty());
        assert!(parsed
            .warnings
            .iter()
            .any(|w| matches!(w, ParseWarning::MissingLedgerSection)));
        // Identity still resolvable from the file name.
        assert!(parsed.identity.is_ok());
    }

    #[test]
    fn identity_failure_is_carried_not_raised() {
        let doc = "TRANSACTION DETAIL\nno transactions here\n";
        let parsed = parse(doc, Some("statement.txt"));
        assert!(parsed.identity.is_err());
        assert!(parsed.transactions.is_empty());
    }

    #[test]
    fn transactions_table_shape() {
        let parsed = parse(DOC, Some("20240131-statement.txt"));
        let table = parsed.transactions_table();
        assert_eq!(table.columns(), ["Date", "Description", "Amount", "Balance"]);
        assert_eq!(table.len(), 2);
    }
}
