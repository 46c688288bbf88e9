use chrono::{DateTime, FixedOffset, NaiveDate, Utc};

use crate::error::AppError;

pub const DAY_FORMAT: &str = "%Y-%m-%d";

/// Calendar day of `now` in the quiz timezone.
pub fn quiz_day(now: DateTime<Utc>, offset: &FixedOffset) -> NaiveDate {
    now.with_timezone(offset).date_naive()
}

pub fn format_day(day: NaiveDate) -> String {
    day.format(DAY_FORMAT).to_string()
}

/// Parses a `YYYY-MM-DD` day key supplied by a client.
pub fn parse_day(raw: &str) -> Result<NaiveDate, AppError> {
    NaiveDate::parse_from_str(raw.trim(), DAY_FORMAT)
        .map_err(|_| AppError::BadRequest(format!("Invalid date '{}', expected YYYY-MM-DD", raw)))
}
