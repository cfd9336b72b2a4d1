//! Expiration calendar helpers.

use crate::error::GateError;
use chrono::{Datelike, Duration, NaiveDate, Weekday};

/// Returns the third Friday of the given month.
#[must_use]
pub fn third_friday(year: i32, month: u32) -> Option<NaiveDate> {
    NaiveDate::from_weekday_of_month_opt(year, month, Weekday::Fri, 3)
}

/// Returns the next standard monthly expiration strictly after `today`.
///
/// This is the third Friday of the current month, or of the following month
/// once that Friday has been reached.
#[must_use]
pub fn next_monthly_expiration(today: NaiveDate) -> NaiveDate {
    if let Some(friday) = third_friday(today.year(), today.month())
        && friday > today
    {
        return friday;
    }

    let (year, month) = if today.month() == 12 {
        (today.year() + 1, 1)
    } else {
        (today.year(), today.month() + 1)
    };

    // Every month has a third Friday; fall back to four weeks out regardless.
    third_friday(year, month).unwrap_or(today + Duration::days(28))
}

/// Parses a user supplied `YYYY-MM-DD` expiration.
///
/// # Errors
/// Returns `InvalidRequest` if the date is malformed.
pub fn parse_expiration(input: &str) -> Result<NaiveDate, GateError> {
    NaiveDate::parse_from_str(input.trim(), "%Y-%m-%d").map_err(|_| {
        GateError::InvalidRequest(format!(
            "invalid expiration '{}' (expected YYYY-MM-DD)",
            input
        ))
    })
}

/// Formats an expiration the way requests carry it (`YYYY-MM-DD`).
#[must_use]
pub fn format_expiration(date: NaiveDate) -> String {
    date.format("%Y-%m-%d").to_string()
}
