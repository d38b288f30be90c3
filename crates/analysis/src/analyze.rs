//! Time-bucketed reduction over aggregated collections.
//!
//! Columns follow the `ColumnName_AggregationType` convention:
//! `Amount_Sum`, `Balance_Mean`, `Ending Balance_Last`, and so on. The
//! suffix selects how values reduce inside each bucket; the picker then
//! reports the bucket with the largest (or smallest) reduced value.
//! Ties break toward the lexicographically earliest bucket label.
//!
//! `describe_*` are the ungrouped counterparts: one descriptive
//! statistics table over the whole collection.

use std::collections::BTreeMap;

use chrono::{Datelike, NaiveDate};
use rust_decimal::prelude::{FromPrimitive, ToPrimitive};
use rust_decimal::Decimal;
use thiserror::Error;

use cbs_core::{Cell, CheckingSummaryRecord, StatementIdentity, Table, TransactionRecord};

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Granularity {
    Day,
    Month,
    Year,
}

impl Granularity {
    fn column_name(self) -> &'static str {
        match self {
            Granularity::Day => "Day",
            Granularity::Month => "Month",
            Granularity::Year => "Year",
        }
    }

    fn bucket_of_date(self, date: NaiveDate) -> String {
        match self {
            Granularity::Day => date.to_string(),
            Granularity::Month => format!("{:04}-{:02}", date.year(), date.month()),
            Granularity::Year => format!("{:04}", date.year()),
        }
    }

    fn bucket_of_identity(self, identity: StatementIdentity) -> String {
        match self {
            // Day is rejected earlier for summary collections.
            Granularity::Day | Granularity::Month => identity.to_string(),
            Granularity::Year => format!("{:04}", identity.year),
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Pick {
    Max,
    Min,
}

impl Pick {
    fn column_name(self) -> &'static str {
        match self {
            Pick::Max => "Maximum",
            Pick::Min => "Minimum",
        }
    }
}

/// How values reduce within one bucket; selected by the column suffix.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum Aggregation {
    Mean,
    Sum,
    Min,
    Max,
    Count,
    /// Chronologically latest value in the bucket.
    Last,
}

impl Aggregation {
    fn from_suffix(suffix: &str) -> Option<Self> {
        match suffix {
            "Mean" => Some(Aggregation::Mean),
            "Sum" => Some(Aggregation::Sum),
            "Min" => Some(Aggregation::Min),
            "Max" => Some(Aggregation::Max),
            "Count" => Some(Aggregation::Count),
            "Last" => Some(Aggregation::Last),
            _ => None,
        }
    }

    /// `values` arrive in chronological order within the bucket.
    fn reduce(self, values: &[Decimal]) -> Decimal {
        match self {
            Aggregation::Mean => mean(values),
            Aggregation::Sum => values.iter().copied().sum(),
            Aggregation::Min => values.iter().copied().min().unwrap_or_default(),
            Aggregation::Max => values.iter().copied().max().unwrap_or_default(),
            Aggregation::Count => Decimal::from(values.len()),
            Aggregation::Last => values.last().copied().unwrap_or_default(),
        }
    }
}

/// Default analysis column for transaction collections.
pub const TRANSACTIONS_COUNT: &str = "Transactions_Count";
/// Default analysis column for summary collections.
pub const ENDING_BALANCE_MEAN: &str = "Ending Balance_Mean";

const TRANSACTION_COLUMNS: [&str; 6] = [
    "Amount_Mean",
    "Amount_Sum",
    "Balance_Min",
    "Balance_Max",
    "Balance_Mean",
    TRANSACTIONS_COUNT,
];

const SUMMARY_COLUMNS: [&str; 20] = [
    "Beginning Balance_Mean",
    "Beginning Balance_Min",
    "Beginning Balance_Max",
    "Deposits and Additions_Mean",
    "Deposits and Additions_Sum",
    "Deposits and Additions_Min",
    "Deposits and Additions_Max",
    "ATM & Debit Card Withdrawals_Mean",
    "ATM & Debit Card Withdrawals_Sum",
    "Electronic Withdrawals_Mean",
    "Electronic Withdrawals_Sum",
    ENDING_BALANCE_MEAN,
    "Ending Balance_Last",
    "Total Withdrawals_Mean",
    "Total Withdrawals_Sum",
    "Net Savings_Mean",
    "Net Savings_Sum",
    "% Saving Rate_Mean",
    "% Saving Rate_Max",
    "% Saving Rate_Min",
];

#[derive(Debug, Clone, Error, PartialEq)]
pub enum AnalysisError {
    #[error(
        "unknown column {column:?}; expected 'ColumnName_AggregationType', one of: {}",
        available.join(", ")
    )]
    UnknownColumn {
        column: String,
        available: Vec<&'static str>,
    },
    #[error("daily granularity is not available for summary collections (statements resolve to months)")]
    DailySummaries,
}

fn parse_column<'a>(
    column: &'a str,
    available: &'static [&'static str],
) -> Result<(&'a str, Aggregation), AnalysisError> {
    let unknown = || AnalysisError::UnknownColumn {
        column: column.to_string(),
        available: available.to_vec(),
    };
    if !available.contains(&column) {
        return Err(unknown());
    }
    let (base, suffix) = column.rsplit_once('_').ok_or_else(unknown)?;
    let agg = Aggregation::from_suffix(suffix).ok_or_else(unknown)?;
    Ok((base, agg))
}

/// Reduce a transaction collection by time bucket. An empty collection
/// yields an empty two-column table.
pub fn reduce_transactions_by_time(
    records: &[TransactionRecord],
    granularity: Granularity,
    column: &str,
    pick: Pick,
) -> Result<Table, AnalysisError> {
    let (base, agg) = parse_column(column, &TRANSACTION_COLUMNS)?;

    let mut buckets: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
    for record in records {
        let label = granularity.bucket_of_date(record.date);
        let value = match base {
            "Amount" => record.amount.as_decimal(),
            "Balance" => record.balance.as_decimal(),
            // `Transactions` rows only ever count.
            _ => Decimal::ONE,
        };
        buckets.entry(label).or_default().push(value);
    }

    let reduced = buckets
        .into_iter()
        .map(|(label, values)| (label, agg.reduce(&values).round_dp(2)));
    Ok(pick_bucket(reduced, granularity.column_name(), pick))
}

/// Reduce a summary collection by time bucket. Absent source fields
/// simply don't contribute; daily granularity is a configuration error
/// here — summaries have monthly resolution.
pub fn reduce_summaries_by_time(
    summaries: &[(StatementIdentity, CheckingSummaryRecord)],
    granularity: Granularity,
    column: &str,
    pick: Pick,
) -> Result<Table, AnalysisError> {
    let (base, agg) = parse_column(column, &SUMMARY_COLUMNS)?;
    if granularity == Granularity::Day {
        return Err(AnalysisError::DailySummaries);
    }

    // Visit statements oldest-first so `Last` means the chronologically
    // latest value regardless of merge direction.
    let mut ordered: Vec<&(StatementIdentity, CheckingSummaryRecord)> =
        summaries.iter().collect();
    ordered.sort_by_key(|(identity, _)| *identity);

    let mut buckets: BTreeMap<String, Vec<Decimal>> = BTreeMap::new();
    for (identity, summary) in ordered {
        let label = granularity.bucket_of_identity(*identity);
        if let Some(value) = summary_column_value(summary, base) {
            buckets.entry(label).or_default().push(value);
        }
    }

    let reduced = buckets
        .into_iter()
        .map(|(label, values)| (label, agg.reduce(&values).round_dp(2)));
    Ok(pick_bucket(reduced, granularity.column_name(), pick))
}

/// Ungrouped descriptive statistics over a transaction collection:
/// counts and withdrawal/deposit shares.
pub fn describe_transactions(records: &[TransactionRecord]) -> Table {
    let mut table = Table::new(["Category", "Amount"]);
    if records.is_empty() {
        return table;
    }

    let total = records.len();
    let withdrawals = records
        .iter()
        .filter(|r| r.amount.is_negative())
        .count();
    let deposits = records
        .iter()
        .filter(|r| r.amount.as_decimal() > Decimal::ZERO)
        .count();
    let percent = |n: usize| {
        (Decimal::from(n) / Decimal::from(total) * Decimal::from(100)).round_dp(2)
    };

    table.push_row(vec!["Transactions".into(), total.into()]);
    table.push_row(vec!["Withdrawal Transactions".into(), withdrawals.into()]);
    table.push_row(vec!["Withdrawal Percent".into(), percent(withdrawals).into()]);
    table.push_row(vec!["Deposit Transactions".into(), deposits.into()]);
    table.push_row(vec!["Deposit Percent".into(), percent(deposits).into()]);
    table.push_row(vec![
        "Withdrawal-to-Deposit Ratio".into(),
        if deposits > 0 {
            (Decimal::from(withdrawals) / Decimal::from(deposits))
                .round_dp(2)
                .into()
        } else {
            Cell::Empty
        },
    ]);
    table
}

/// Ungrouped descriptive statistics over a summary collection: balance
/// spread, average flows, net-savings volatility.
pub fn describe_summaries(
    summaries: &[(StatementIdentity, CheckingSummaryRecord)],
) -> Table {
    let mut table = Table::new(["Category", "Amount"]);
    if summaries.is_empty() {
        return table;
    }

    let collect = |base: &str| -> Vec<Decimal> {
        summaries
            .iter()
            .filter_map(|(_, s)| summary_column_value(s, base))
            .collect()
    };
    let beginning = collect("Beginning Balance");
    let deposits = collect("Deposits and Additions");
    let withdrawals = collect("Total Withdrawals");
    let net = collect("Net Savings");

    let stat = |values: &[Decimal], value: Option<Decimal>| match value {
        Some(v) if !values.is_empty() => Cell::Number(v.round_dp(2)),
        _ => Cell::Empty,
    };
    let mut push = |category: &str, cell: Cell| {
        table.push_row(vec![category.into(), cell]);
    };

    push(
        "Average Beginning Balance",
        stat(&beginning, Some(mean(&beginning))),
    );
    push("Median Beginning Balance", stat(&beginning, median(&beginning)));
    push(
        "Max Beginning Balance",
        stat(&beginning, beginning.iter().copied().max()),
    );
    push(
        "Min Beginning Balance",
        stat(&beginning, beginning.iter().copied().min()),
    );
    push("Average Deposits", stat(&deposits, Some(mean(&deposits))));
    push(
        "Average Withdrawals",
        stat(&withdrawals, Some(mean(&withdrawals))),
    );
    push("Average Net Savings", stat(&net, Some(mean(&net))));
    push("Net Savings Volatility", stat(&net, std_dev(&net)));
    push(
        "Negative Cash Flow Months",
        Cell::from(net.iter().filter(|v| v.is_sign_negative()).count()),
    );
    table
}

fn summary_column_value(summary: &CheckingSummaryRecord, base: &str) -> Option<Decimal> {
    match base {
        "Total Withdrawals" => summary.total_withdrawals().ok().map(|m| m.as_decimal()),
        "Net Savings" => summary.net_savings().ok().map(|m| m.as_decimal()),
        "% Saving Rate" => summary.saving_rate().ok(),
        label => summary.field(label).map(|m| m.as_decimal()),
    }
}

fn mean(values: &[Decimal]) -> Decimal {
    if values.is_empty() {
        return Decimal::ZERO;
    }
    values.iter().sum::<Decimal>() / Decimal::from(values.len())
}

fn median(values: &[Decimal]) -> Option<Decimal> {
    if values.is_empty() {
        return None;
    }
    let mut sorted = values.to_vec();
    sorted.sort();
    let mid = sorted.len() / 2;
    Some(if sorted.len() % 2 == 1 {
        sorted[mid]
    } else {
        (sorted[mid - 1] + sorted[mid]) / Decimal::from(2)
    })
}

/// Sample standard deviation; undefined below two values.
fn std_dev(values: &[Decimal]) -> Option<Decimal> {
    if values.len() < 2 {
        return None;
    }
    let mean_f = mean(values).to_f64()?;
    let variance = values
        .iter()
        .filter_map(|v| v.to_f64())
        .map(|v| (v - mean_f).powi(2))
        .sum::<f64>()
        / (values.len() - 1) as f64;
    Decimal::from_f64(variance.sqrt())
}

/// Select one bucket. The iterator arrives in ascending label order, so
/// replacing only on a strict improvement breaks ties toward the
/// earliest label.
fn pick_bucket<I>(reduced: I, bucket_column: &str, pick: Pick) -> Table
where
    I: IntoIterator<Item = (String, Decimal)>,
{
    let mut best: Option<(String, Decimal)> = None;
    for (label, value) in reduced {
        let better = match &best {
            None => true,
            Some((_, current)) => match pick {
                Pick::Max => value > *current,
                Pick::Min => value < *current,
            },
        };
        if better {
            best = Some((label, value));
        }
    }

    let mut table = Table::new([bucket_column, pick.column_name()]);
    if let Some((label, value)) = best {
        table.push_row(vec![label.into(), value.into()]);
    }
    table
}
