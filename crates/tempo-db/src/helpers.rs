//! Row-to-entity parsing helpers and value conversions.
//!
//! Timestamps are stored as RFC 3339 UTC text with millisecond precision and a
//! `Z` suffix. That format is fixed-width, so SQL text comparison orders rows
//! chronologically. Durations are stored as integer milliseconds.

use chrono::{DateTime, SecondsFormat, SubsecRound, TimeDelta, Utc};

use crate::error::DatabaseError;

/// Truncate a timestamp to the precision the store keeps.
#[must_use]
pub fn normalize(dt: DateTime<Utc>) -> DateTime<Utc> {
    dt.trunc_subsecs(3)
}

/// Round a timestamp up to the next stored millisecond.
#[must_use]
pub fn ceil_millis(dt: DateTime<Utc>) -> DateTime<Utc> {
    let truncated = normalize(dt);
    if truncated < dt {
        truncated + TimeDelta::milliseconds(1)
    } else {
        truncated
    }
}

/// Format a timestamp for storage.
#[must_use]
pub fn format_timestamp(dt: DateTime<Utc>) -> String {
    dt.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Parse a required TEXT column as `DateTime<Utc>`.
///
/// Handles both RFC 3339 and `SQLite`'s default format (`"2026-02-09 14:30:00"`).
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string cannot be parsed as either format.
pub fn parse_datetime(s: &str) -> Result<DateTime<Utc>, DatabaseError> {
    if let Ok(dt) = DateTime::parse_from_rfc3339(s) {
        return Ok(dt.with_timezone(&Utc));
    }
    chrono::NaiveDateTime::parse_from_str(s, "%Y-%m-%d %H:%M:%S")
        .map(|naive| naive.and_utc())
        .map_err(|e| DatabaseError::Query(format!("Failed to parse datetime '{s}': {e}")))
}

/// Parse a TEXT column into a serde-deserializable enum.
///
/// Works with all tempo-core enums that use `#[serde(rename_all = "snake_case")]`.
///
/// # Errors
///
/// Returns `DatabaseError::Query` if the string does not match any enum variant.
pub fn parse_enum<T: serde::de::DeserializeOwned>(s: &str) -> Result<T, DatabaseError> {
    serde_json::from_value(serde_json::Value::String(s.to_string()))
        .map_err(|e| DatabaseError::Query(format!("Failed to parse enum from '{s}': {e}")))
}

/// Read a nullable TEXT column. Returns `None` for both SQL NULL and empty string.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails.
pub fn get_opt_string(row: &libsql::Row, idx: i32) -> Result<Option<String>, DatabaseError> {
    match row.get::<Option<String>>(idx)? {
        Some(s) if s.is_empty() => Ok(None),
        other => Ok(other),
    }
}

/// Convert a stored millisecond count into a duration.
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` if the value is out of range.
pub fn millis_to_duration(ms: i64) -> Result<TimeDelta, DatabaseError> {
    TimeDelta::try_milliseconds(ms)
        .ok_or_else(|| DatabaseError::InvalidState(format!("duration of {ms} ms is out of range")))
}

/// Read a nullable INTEGER millisecond column as a duration.
///
/// # Errors
///
/// Returns `DatabaseError` if the column read fails or the value is out of range.
pub fn get_opt_duration(row: &libsql::Row, idx: i32) -> Result<Option<TimeDelta>, DatabaseError> {
    row.get::<Option<i64>>(idx)?
        .map(millis_to_duration)
        .transpose()
}

/// Read an INTEGER column that must fit a `u32` (counts, sequence numbers).
///
/// # Errors
///
/// Returns `DatabaseError::InvalidState` for negative or oversized values.
pub fn get_u32(row: &libsql::Row, idx: i32) -> Result<u32, DatabaseError> {
    let value = row.get::<i64>(idx)?;
    u32::try_from(value)
        .map_err(|_| DatabaseError::InvalidState(format!("column {idx} holds {value}, expected u32")))
}
