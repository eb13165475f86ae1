//! Strict parsing and field validators shared by all services.
//!
//! Dates travel as `YYYY-MM-DD` and times of day as `HH:MM`. Anything else is
//! rejected with a [`ParseError`] rather than guessed at.

use chrono::{NaiveDate, NaiveTime, Timelike};
use thiserror::Error;
use validator::ValidationError;

/// Wire format for calendar dates.
pub const DATE_FORMAT: &str = "%Y-%m-%d";
/// Wire format for times of day.
pub const TIME_FORMAT: &str = "%H:%M";

/// Error returned by the strict parsers.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ParseError {
    #[error("{field}: invalid date '{value}', expected YYYY-MM-DD")]
    InvalidDate { field: &'static str, value: String },

    #[error("{field}: invalid time '{value}', expected HH:MM")]
    InvalidTime { field: &'static str, value: String },
}

/// Parses a `YYYY-MM-DD` date.
pub fn parse_date(field: &'static str, value: &str) -> Result<NaiveDate, ParseError> {
    let trimmed = value.trim();
    // chrono accepts a single-digit month/day for %m/%d; the wire format does not.
    if trimmed.len() != 10 {
        return Err(ParseError::InvalidDate {
            field,
            value: value.to_string(),
        });
    }
    NaiveDate::parse_from_str(trimmed, DATE_FORMAT).map_err(|_| ParseError::InvalidDate {
        field,
        value: value.to_string(),
    })
}

/// Parses an `HH:MM` time of day.
///
/// `HH:MM:SS` is tolerated only when the seconds are `00`, which is how
/// stored times are echoed back by some clients.
pub fn parse_time(field: &'static str, value: &str) -> Result<NaiveTime, ParseError> {
    let trimmed = value.trim();
    let invalid = || ParseError::InvalidTime {
        field,
        value: value.to_string(),
    };

    let parsed = match trimmed.len() {
        5 => NaiveTime::parse_from_str(trimmed, TIME_FORMAT).map_err(|_| invalid())?,
        8 => NaiveTime::parse_from_str(trimmed, "%H:%M:%S").map_err(|_| invalid())?,
        _ => return Err(invalid()),
    };

    if parsed.second() != 0 {
        return Err(invalid());
    }
    Ok(parsed)
}

/// Formats a time of day for the wire.
pub fn format_time(time: NaiveTime) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Rejects strings that are empty after trimming.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value cannot be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}
