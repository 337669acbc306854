//! Parsing of caller-supplied instants.
//!
//! Accepted forms, tried in order:
//!
//! | Form | Example | Interpreted as |
//! |------|---------|----------------|
//! | RFC 3339 | `2025-06-01T12:00:00-04:00` | the given instant |
//! | naive ISO datetime | `2025-06-01T12:00:00.5` | UTC |
//! | date | `2025-06-01` | midnight UTC |
//! | time of day | `12:00:00` | that time today, UTC |

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime, Utc};

use crate::error::CoreError;

const NAIVE_DATETIME_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];
const TIME_FORMATS: [&str; 2] = ["%H:%M:%S%.f", "%H:%M"];

/// Parse `input` into a UTC instant, resolving time-of-day inputs against
/// `today`.
pub fn parse_instant(input: &str, today: NaiveDate) -> Result<DateTime<Utc>, CoreError> {
    let input = input.trim();

    if let Ok(instant) = DateTime::parse_from_rfc3339(input) {
        return Ok(instant.with_timezone(&Utc));
    }

    if let Some(naive) = NAIVE_DATETIME_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(input, format).ok())
    {
        return Ok(naive.and_utc());
    }

    if let Ok(date) = NaiveDate::parse_from_str(input, "%Y-%m-%d") {
        return Ok(date.and_time(NaiveTime::default()).and_utc());
    }

    TIME_FORMATS
        .iter()
        .find_map(|format| NaiveTime::parse_from_str(input, format).ok())
        .map(|time| today.and_time(time).and_utc())
        .ok_or_else(|| CoreError::InvalidInput(format!("invalid timestamp: {input}")))
}
