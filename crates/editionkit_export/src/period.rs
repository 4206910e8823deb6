//! Yearly export periods bounded by ISO weeks.

use std::fmt;

use chrono::{Days, NaiveDate, NaiveDateTime, Weekday};
use serde::{Deserialize, Serialize};

use crate::conf::{N_PERIOD_WEEK_FIRST, N_PERIOD_WEEK_LAST};
use crate::spec::ExportError;

/// One export window: Monday of ISO week 1 through Sunday of ISO week 52.
///
/// In years with an ISO week 53 that last week falls outside every period.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub struct SpecPeriod {
    year: i32,
    start_date: NaiveDate,
    end_date: NaiveDate,
}

impl SpecPeriod {
    /// Build the period for `year`.
    pub fn new(year: i32) -> Result<Self, ExportError> {
        let start_date = NaiveDate::from_isoywd_opt(year, N_PERIOD_WEEK_FIRST, Weekday::Mon)
            .ok_or(ExportError::InvalidPeriod(year))?;
        let end_date = NaiveDate::from_isoywd_opt(year, N_PERIOD_WEEK_LAST, Weekday::Mon)
            .and_then(|dt| dt.checked_add_days(Days::new(6)))
            .ok_or(ExportError::InvalidPeriod(year))?;
        Ok(Self {
            year,
            start_date,
            end_date,
        })
    }

    /// Period year.
    pub fn year(&self) -> i32 {
        self.year
    }

    /// First day, inclusive.
    pub fn start_date(&self) -> NaiveDate {
        self.start_date
    }

    /// Last day, inclusive.
    pub fn end_date(&self) -> NaiveDate {
        self.end_date
    }

    /// Whether `datetime` falls on a day inside the period.
    pub fn contains(&self, datetime: NaiveDateTime) -> bool {
        let date = datetime.date();
        date >= self.start_date && date <= self.end_date
    }
}

impl fmt::Display for SpecPeriod {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{} ({}..={})",
            self.year,
            self.start_date.format("%Y-%m-%d"),
            self.end_date.format("%Y-%m-%d")
        )
    }
}
