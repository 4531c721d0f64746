//! Date-bucket generation for the month-by-month harvest window.

use serde::{Deserialize, Serialize};

/// A single calendar month inside the harvest window: the unit of
/// pagination for the upstream API (`DEAL_YMD` parameter).
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct DateBucket {
    year: i32,
    month: u32,
}

impl DateBucket {
    #[must_use]
    pub const fn new(year: i32, month: u32) -> Self {
        Self { year, month }
    }

    /// The `YYYYMM` token sent upstream.
    #[must_use]
    pub fn token(&self) -> String {
        format!("{:04}{:02}", self.year, self.month)
    }

    #[must_use]
    pub const fn year(&self) -> i32 {
        self.year
    }

    #[must_use]
    pub const fn month(&self) -> u32 {
        self.month
    }
}

impl std::fmt::Display for DateBucket {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{}", self.token())
    }
}

/// Every month from January of `start_year` through December of `end_year`,
/// in chronological order. An inverted range yields no buckets; the config
/// layer rejects such a range before the planner ever sees it.
#[must_use]
pub fn month_range(start_year: i32, end_year: i32) -> Vec<DateBucket> {
    let mut buckets = Vec::new();
    for year in start_year..=end_year {
        for month in 1..=12 {
            buckets.push(DateBucket::new(year, month));
        }
    }
    buckets
}
