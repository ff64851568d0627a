//! Concrete reporting windows.
//!
//! Relative phrases ("last month", "past 30 days") are resolved against a
//! reference date into a closed `[start, end]` interval. The wire form is an
//! ISO-8601 interval: `2026-09-01/2026-09-30`.

use chrono::{Datelike, Days, Months, NaiveDate};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// A closed date interval used as the `time_window` tool parameter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct TimeWindow {
    pub start: NaiveDate,
    pub end: NaiveDate,
}

impl TimeWindow {
    /// Build a window; `None` if `start` is after `end`.
    pub fn new(start: NaiveDate, end: NaiveDate) -> Option<Self> {
        (start <= end).then_some(Self { start, end })
    }

    /// The `days` days up to and including `reference`.
    pub fn last_days(reference: NaiveDate, days: u64) -> Option<Self> {
        let start = reference.checked_sub_days(Days::new(days.saturating_sub(1)))?;
        Self::new(start, reference)
    }

    /// Calendar months back from `reference` (same day-of-month).
    pub fn last_months(reference: NaiveDate, months: u32) -> Option<Self> {
        let start = reference.checked_sub_months(Months::new(months))?;
        Self::new(start, reference)
    }

    /// The full calendar month before the one containing `reference`.
    pub fn previous_month(reference: NaiveDate) -> Option<Self> {
        let end = reference.with_day(1)?.pred_opt()?;
        Self::new(end.with_day(1)?, end)
    }

    /// From the first of the current month up to `reference`.
    pub fn month_to_date(reference: NaiveDate) -> Option<Self> {
        Self::new(reference.with_day(1)?, reference)
    }

    /// The full calendar quarter before the one containing `reference`.
    pub fn previous_quarter(reference: NaiveDate) -> Option<Self> {
        let end = quarter_start(reference)?.pred_opt()?;
        Self::new(quarter_start(end)?, end)
    }

    /// From the first of the current quarter up to `reference`.
    pub fn quarter_to_date(reference: NaiveDate) -> Option<Self> {
        Self::new(quarter_start(reference)?, reference)
    }

    /// From January 1st up to `reference`.
    pub fn year_to_date(reference: NaiveDate) -> Option<Self> {
        Self::new(NaiveDate::from_ymd_opt(reference.year(), 1, 1)?, reference)
    }

    /// Number of days covered, inclusive.
    pub fn days(&self) -> i64 {
        (self.end - self.start).num_days() + 1
    }
}

fn quarter_start(date: NaiveDate) -> Option<NaiveDate> {
    let month = ((date.month() - 1) / 3) * 3 + 1;
    NaiveDate::from_ymd_opt(date.year(), month, 1)
}

impl fmt::Display for TimeWindow {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "{}/{}",
            self.start.format("%Y-%m-%d"),
            self.end.format("%Y-%m-%d")
        )
    }
}

impl FromStr for TimeWindow {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        let (start, end) = s
            .split_once('/')
            .ok_or_else(|| format!("expected START/END interval, got '{}'", s))?;
        let start = NaiveDate::parse_from_str(start.trim(), "%Y-%m-%d")
            .map_err(|e| format!("invalid start date '{}': {}", start, e))?;
        let end = NaiveDate::parse_from_str(end.trim(), "%Y-%m-%d")
            .map_err(|e| format!("invalid end date '{}': {}", end, e))?;
        Self::new(start, end).ok_or_else(|| format!("start {} is after end {}", start, end))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn date(y: i32, m: u32, d: u32) -> NaiveDate {
        NaiveDate::from_ymd_opt(y, m, d).unwrap()
    }

    #[test]
    fn test_previous_month_crosses_year() {
        let w = TimeWindow::previous_month(date(2026, 1, 15)).unwrap();
        assert_eq!(w.start, date(2025, 12, 1));
        assert_eq!(w.end, date(2025, 12, 31));
    }

    #[test]
    fn test_previous_quarter() {
        let w = TimeWindow::previous_quarter(date(2026, 10, 19)).unwrap();
        assert_eq!(w.start, date(2026, 7, 1));
        assert_eq!(w.end, date(2026, 9, 30));
    }

    #[test]
    fn test_last_days_is_inclusive() {
        let w = TimeWindow::last_days(date(2026, 10, 19), 30).unwrap();
        assert_eq!(w.days(), 30);
        assert_eq!(w.end, date(2026, 10, 19));
    }

    #[test]
    fn test_display_and_parse() {
        let w = TimeWindow::month_to_date(date(2026, 10, 19)).unwrap();
        assert_eq!(w.to_string(), "2026-10-01/2026-10-19");
        assert_eq!("2026-10-01/2026-10-19".parse::<TimeWindow>().unwrap(), w);
    }

    #[test]
    fn test_parse_rejects_inverted_interval() {
        assert!("2026-10-19/2026-10-01".parse::<TimeWindow>().is_err());
        assert!("last month".parse::<TimeWindow>().is_err());
    }
}
