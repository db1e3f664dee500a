//! Shared storage helper functions.
//!
//! Text encoding of fact timestamps and month buckets used across storage
//! backend implementations.

use chrono::NaiveDateTime;

use super::{Result, StorageError};

/// Canonical stored form of a fact timestamp.
pub const DATETIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

/// Accepted on read, in order, after the canonical form.
const LEGACY_DATETIME_FORMATS: &[&str] = &["%Y-%m-%d %H:%M", "%Y-%m-%dT%H:%M:%S", "%Y-%m-%dT%H:%M:%S%.f"];

/// Render a fact timestamp for storage.
pub fn format_datetime(datetime: &NaiveDateTime) -> String {
    datetime.format(DATETIME_FORMAT).to_string()
}

/// Parse a stored fact timestamp.
///
/// Accepts the canonical `YYYY-MM-DD HH:MM:SS` form plus minute precision
/// and ISO-8601 `T` separated forms written by older ingestion runs.
pub fn parse_datetime(value: &str) -> Result<NaiveDateTime> {
    let trimmed = value.trim();
    std::iter::once(DATETIME_FORMAT)
        .chain(LEGACY_DATETIME_FORMATS.iter().copied())
        .find_map(|format| NaiveDateTime::parse_from_str(trimmed, format).ok())
        .ok_or_else(|| StorageError::InvalidDatetime {
            value: value.to_string(),
            reason: "expected YYYY-MM-DD HH:MM:SS".to_string(),
        })
}

/// Convert a stored non-negative integer count.
pub fn count_from_i64(column: &'static str, value: i64) -> Result<u64> {
    u64::try_from(value).map_err(|_| StorageError::InvalidValue { column, value })
}

/// Convert a stored line number.
pub fn line_number_from_i64(value: i64) -> Result<u32> {
    u32::try_from(value).map_err(|_| StorageError::InvalidValue {
        column: "line_number",
        value,
    })
}

/// Stored form of a count. Counts above `i64::MAX` saturate.
pub fn count_to_i64(value: u64) -> i64 {
    i64::try_from(value).unwrap_or(i64::MAX)
}
