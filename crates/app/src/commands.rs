use std::path::PathBuf;

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};

use cbs_analysis::{
    describe_summaries, describe_transactions, load_documents, merge_statements, parse_batch,
    reduce_summaries_by_time, reduce_transactions_by_time, DedupPolicy, Granularity, MergeOptions,
    Pick, SortDirection, ENDING_BALANCE_MEAN, TRANSACTIONS_COUNT,
};
use cbs_export::{resolve_export_path, Exporter, DEFAULT_STEM};
use cbs_parse::ParseOptions;

#[derive(Parser, Debug)]
#[command(
    name = "cbsanalyzer",
    version,
    about = "Chase bank statement analyzer: parse text dumps, merge, analyze, export"
)]
pub struct Cli {
    /// A statement text dump, or a directory of .txt dumps
    pub path: PathBuf,

    /// Sort oldest-first instead of newest-first
    #[arg(long)]
    pub ascending: bool,

    /// Export the printed table: a path, a directory, or just an
    /// extension like `csv` or `.json`
    #[arg(long)]
    pub export: Option<String>,

    /// Never replace an existing export file; write a uniquely named
    /// sibling instead
    #[arg(long)]
    pub no_overwrite: bool,

    /// When two documents resolve to the same month, keep the later one
    /// instead of the first seen
    #[arg(long)]
    pub overwrite_duplicates: bool,

    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Print the merged transaction ledger
    Transactions,

    /// Print per-statement checking summaries with derived metrics
    Summaries,

    /// Descriptive statistics over the whole collection, ungrouped
    Describe {
        /// Describe the summary collection instead of transactions
        #[arg(long)]
        summaries: bool,
    },

    /// Group a collection by time bucket, reduce a column, and report
    /// the extreme bucket
    Analyze {
        #[arg(long, value_enum, default_value_t = GranularityArg::Month)]
        granularity: GranularityArg,

        /// Column as "ColumnName_AggregationType", e.g. "Amount_Sum" or
        /// "Net Savings_Mean" (default: "Transactions_Count", or
        /// "Ending Balance_Mean" with --summaries)
        #[arg(long)]
        column: Option<String>,

        /// Report the minimum bucket instead of the maximum
        #[arg(long)]
        min: bool,

        /// Analyze the summary collection instead of transactions
        #[arg(long)]
        summaries: bool,
    },
}

#[derive(Clone, Copy, Debug, ValueEnum)]
pub enum GranularityArg {
    Day,
    Month,
    Year,
}

impl From<GranularityArg> for Granularity {
    fn from(arg: GranularityArg) -> Self {
        match arg {
            GranularityArg::Day => Granularity::Day,
            GranularityArg::Month => Granularity::Month,
            GranularityArg::Year => Granularity::Year,
        }
    }
}

pub async fn run(cli: Cli) -> Result<()> {
    let inputs = load_documents(&cli.path)
        .with_context(|| format!("loading statements from {}", cli.path.display()))?;

    let options = ParseOptions {
        ascending: cli.ascending,
        check_running_balance: true,
    };
    let batch = parse_batch(inputs, options).await;
    for failure in &batch.failures {
        tracing::warn!(document = %failure.name, "parse task failed: {}", failure.message);
    }
    if batch.statements.is_empty() {
        bail!("no statements parsed from {}", cli.path.display());
    }

    let direction = if cli.ascending {
        SortDirection::Ascending
    } else {
        SortDirection::Descending
    };
    let dedup = if cli.overwrite_duplicates {
        DedupPolicy::Overwrite
    } else {
        DedupPolicy::KeepFirst
    };
    let merged = merge_statements(batch.statements, MergeOptions { dedup, direction });
    for (identity, name) in &merged.duplicates {
        tracing::warn!(document = %name, %identity, "duplicate statement skipped");
    }
    for name in &merged.excluded {
        tracing::warn!(document = %name, "statement excluded: identity unresolved");
    }

    let table = match &cli.command {
        Command::Transactions => merged.transactions_table(),
        Command::Summaries => merged.summaries_table(),
        Command::Describe { summaries } => {
            if *summaries {
                describe_summaries(&merged.summaries)
            } else {
                describe_transactions(&merged.transactions)
            }
        }
        Command::Analyze {
            granularity,
            column,
            min,
            summaries,
        } => {
            let pick = if *min { Pick::Min } else { Pick::Max };
            if *summaries {
                let column = column.as_deref().unwrap_or(ENDING_BALANCE_MEAN);
                reduce_summaries_by_time(&merged.summaries, (*granularity).into(), column, pick)?
            } else {
                let column = column.as_deref().unwrap_or(TRANSACTIONS_COUNT);
                reduce_transactions_by_time(
                    &merged.transactions,
                    (*granularity).into(),
                    column,
                    pick,
                )?
            }
        }
    };

    print!("{table}");

    if let Some(hint) = &cli.export {
        let target = resolve_export_path(hint, DEFAULT_STEM, "csv");
        let written = Exporter::new()
            .overwrite(!cli.no_overwrite)
            .export(&table, &target)
            .with_context(|| format!("exporting to {}", target.display()))?;
        println!("exported {}", written.display());
    }

    Ok(())
}
