//! Shared utility functions used across multiple modules.

use chrono::{DateTime, NaiveDateTime, SecondsFormat, TimeDelta, Utc};

/// Normalize optional text by trimming whitespace and removing empties.
///
/// Returns `None` when the input is `None` or the trimmed value is empty.
pub fn normalize_text_option(value: Option<String>) -> Option<String> {
    let value = value?;
    let value = value.trim();
    if value.is_empty() {
        None
    } else {
        Some(value.to_string())
    }
}

/// Current UTC time truncated to millisecond precision.
///
/// Every stored timestamp goes through millisecond storage, so values
/// produced here compare equal to what is read back.
pub fn now_millis() -> DateTime<Utc> {
    from_millis(Utc::now().timestamp_millis())
}

/// Timestamp for a local mutation of a record last stamped `previous`.
///
/// Never moves backwards, even when `previous` came from a device whose
/// clock runs ahead of ours.
pub fn advance_timestamp(previous: DateTime<Utc>) -> DateTime<Utc> {
    now_millis().max(previous + TimeDelta::milliseconds(1))
}

/// Convert Unix milliseconds to a UTC timestamp, clamping out-of-range values to the epoch.
pub fn from_millis(millis: i64) -> DateTime<Utc> {
    DateTime::from_timestamp_millis(millis).unwrap_or(DateTime::UNIX_EPOCH)
}

/// Truncate a timestamp to millisecond precision.
pub fn truncate_to_millis(value: DateTime<Utc>) -> DateTime<Utc> {
    from_millis(value.timestamp_millis())
}

/// Format a timestamp in the sortable wire form (`2024-05-01T09:30:00.000Z`).
pub fn format_timestamp(value: DateTime<Utc>) -> String {
    value.to_rfc3339_opts(SecondsFormat::Millis, true)
}

/// Zone-less layouts written by older clients, read as UTC
const NAIVE_TIMESTAMP_FORMATS: [&str; 2] = ["%Y-%m-%dT%H:%M:%S%.f", "%Y-%m-%d %H:%M:%S%.f"];

/// Parse a wire timestamp, truncated to milliseconds.
///
/// RFC 3339 is preferred. Values without an offset are taken as UTC.
pub fn parse_timestamp(raw: &str) -> Option<DateTime<Utc>> {
    let raw = raw.trim();
    if let Ok(parsed) = DateTime::parse_from_rfc3339(raw) {
        return Some(truncate_to_millis(parsed.with_timezone(&Utc)));
    }

    NAIVE_TIMESTAMP_FORMATS
        .iter()
        .find_map(|format| NaiveDateTime::parse_from_str(raw, format).ok())
        .map(|naive| truncate_to_millis(naive.and_utc()))
}
