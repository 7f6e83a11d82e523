//! Common validation and date parsing utilities.

use chrono::{DateTime, NaiveDate, NaiveDateTime, NaiveTime};
use validator::ValidationError;

/// Accepted wall-clock formats for due dates, most specific first.
const DATETIME_FORMATS: &[&str] = &[
    "%Y-%m-%dT%H:%M:%S%.f",
    "%Y-%m-%dT%H:%M:%S",
    "%Y-%m-%dT%H:%M",
    "%Y-%m-%d %H:%M:%S%.f",
    "%Y-%m-%d %H:%M:%S",
    "%Y-%m-%d %H:%M",
];

/// Parses a calendar date in `YYYY-MM-DD` form.
pub fn parse_date(value: &str) -> Option<NaiveDate> {
    NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d").ok()
}

/// Parses a due date into a local wall-clock datetime.
///
/// Accepts `YYYY-MM-DDTHH:MM[:SS]`, the space-separated variant, RFC 3339
/// (the offset is dropped and the local wall-clock time kept) and a bare
/// `YYYY-MM-DD`, which maps to midnight.
pub fn parse_due_date(value: &str) -> Option<NaiveDateTime> {
    let value = value.trim();
    if value.is_empty() {
        return None;
    }

    if let Ok(dt) = DateTime::parse_from_rfc3339(value) {
        return Some(dt.naive_local());
    }

    for format in DATETIME_FORMATS {
        if let Ok(dt) = NaiveDateTime::parse_from_str(value, format) {
            return Some(dt);
        }
    }

    parse_date(value).map(|d| d.and_time(NaiveTime::MIN))
}

/// Validates that a string is not empty after trimming.
pub fn validate_not_blank(value: &str) -> Result<(), ValidationError> {
    if value.trim().is_empty() {
        let mut err = ValidationError::new("blank");
        err.message = Some("Value must not be blank".into());
        Err(err)
    } else {
        Ok(())
    }
}

/// Validates a `YYYY-MM-DD` date string.
pub fn validate_date(value: &str) -> Result<(), ValidationError> {
    if parse_date(value).is_some() {
        Ok(())
    } else {
        let mut err = ValidationError::new("date_format");
        err.message = Some("Date must be in YYYY-MM-DD format".into());
        Err(err)
    }
}

/// Validates a due date string accepted by [`parse_due_date`].
pub fn validate_due_date(value: &str) -> Result<(), ValidationError> {
    if parse_due_date(value).is_some() {
        Ok(())
    } else {
        let mut err = ValidationError::new("due_date_format");
        err.message = Some("Due date must be YYYY-MM-DD or YYYY-MM-DDTHH:MM".into());
        Err(err)
    }
}
