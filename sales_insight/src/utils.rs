//! Utility functions for the sales_insight crate

use crate::error::{InsightError, Result};
use chrono::{Duration, NaiveDate, NaiveDateTime};
use serde::{Deserialize, Serialize};

/// Calendar date format used on the wire and in datasets
pub const DATE_FORMAT: &str = "%Y-%m-%d";

/// Datetime layouts whose time part is dropped when read as a date
const DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse an ISO 8601 calendar date
///
/// The whole string must match. A complete time component
/// (`2024-01-01 00:00:00`, `2024-01-01T00:00:00`) is accepted and discarded so
/// that datetime-typed columns can be read as dates.
pub fn parse_date(raw: &str) -> Result<NaiveDate> {
    let trimmed = raw.trim();
    if let Ok(date) = NaiveDate::parse_from_str(trimmed, DATE_FORMAT) {
        return Ok(date);
    }

    DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .map(|datetime| datetime.date())
        .ok_or_else(|| InsightError::InvalidRange(format!("'{raw}' is not a YYYY-MM-DD date")))
}

/// Format a date the way responses report it
pub fn format_date(date: NaiveDate) -> String {
    date.format(DATE_FORMAT).to_string()
}

/// Consecutive daily dates following `last`, `horizon` of them
pub fn future_dates(last: NaiveDate, horizon: usize) -> Vec<NaiveDate> {
    (1..=horizon as i64)
        .map(|offset| last + Duration::days(offset))
        .collect()
}

/// Inclusive calendar window requested by a caller
///
/// An inverted window (`start > end`) is valid and simply contains no dates.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DateWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl DateWindow {
    /// Create a window from two dates
    pub fn new(start: NaiveDate, end: NaiveDate) -> Self {
        Self { start, end }
    }

    /// Parse a window from two ISO 8601 strings
    pub fn parse(start: &str, end: &str) -> Result<Self> {
        Ok(Self::new(parse_date(start)?, parse_date(end)?))
    }

    /// Whether `date` lies within the window, bounds included
    pub fn contains(&self, date: NaiveDate) -> bool {
        self.start <= date && date <= self.end
    }

    /// Whether the window is inverted
    pub fn is_empty(&self) -> bool {
        self.start > self.end
    }
}
