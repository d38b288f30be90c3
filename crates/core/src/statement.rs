use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;

/// The `(year, month)` key a statement aggregates and deduplicates under.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct StatementIdentity {
    pub year: i32,
    pub month: u32,
}

impl StatementIdentity {
    pub fn new(year: i32, month: u32) -> Option<Self> {
        (1..=12).contains(&month).then_some(StatementIdentity { year, month })
    }

    pub fn from_date(date: NaiveDate) -> Self {
        StatementIdentity {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for StatementIdentity {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}
