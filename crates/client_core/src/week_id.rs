//! Calendar date to ISO-8601 week key.

use std::ops::RangeInclusive;

use chrono::{Datelike, Duration, NaiveDate};
use shared::domain::WeekId;
use thiserror::Error;

#[derive(Debug, Error, PartialEq, Eq)]
pub enum DateInputError {
    #[error("no date selected")]
    Empty,
    #[error("invalid date '{0}', expected YYYY-MM-DD")]
    Malformed(String),
    #[error("date '{0}' is outside years {min}-{max}", min = SUPPORTED_YEARS.start(), max = SUPPORTED_YEARS.end())]
    OutOfRange(String),
}

/// Years a picked date may fall in; keeps the `YYYY` form four digits wide.
pub const SUPPORTED_YEARS: RangeInclusive<i32> = 1..=9999;

/// Parses the date picker's `YYYY-MM-DD` value.
pub fn parse_date_input(raw: &str) -> Result<NaiveDate, DateInputError> {
    let raw = raw.trim();
    if raw.is_empty() {
        return Err(DateInputError::Empty);
    }
    let date = NaiveDate::parse_from_str(raw, "%Y-%m-%d")
        .map_err(|_| DateInputError::Malformed(raw.into()))?;
    if !SUPPORTED_YEARS.contains(&date.year()) {
        return Err(DateInputError::OutOfRange(raw.into()));
    }
    Ok(date)
}

/// Derives `{iso-year}-W{week:02}` for `date`.
///
/// The date is moved to the Thursday of its Monday-based week; that Thursday's
/// calendar year is the ISO week-year and its day-of-year fixes the week number.
pub fn iso_week_id(date: NaiveDate) -> WeekId {
    let iso_day = i64::from(date.weekday().number_from_monday());
    let Some(thursday) = date.checked_add_signed(Duration::days(4 - iso_day)) else {
        // Only reachable at the edges of chrono's calendar.
        let iso = date.iso_week();
        return WeekId(format!("{}-W{:02}", iso.year(), iso.week()));
    };
    let day_offset = i64::from(thursday.ordinal0());
    let week = (day_offset + 1 + 6) / 7;
    WeekId(format!("{}-W{:02}", thursday.year(), week))
}
