//! Shared utility functions used across multiple modules.

use chrono::{Local, TimeZone};

/// Date-time layout expected by the backend for scan timestamps.
pub const WIRE_DATE_TIME_FORMAT: &str = "%Y-%m-%d %H:%M:%S";

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

/// Check if a string starts with `http://` or `https://`.
pub fn is_http_url(value: &str) -> bool {
    value.starts_with("http://") || value.starts_with("https://")
}

/// Truncate text to at most 180 characters for error messages.
pub fn compact_text(value: &str) -> String {
    value.trim().chars().take(180).collect()
}

/// Current Unix timestamp in milliseconds.
pub fn unix_millis_now() -> i64 {
    chrono::Utc::now().timestamp_millis()
}

/// Render a Unix-millisecond timestamp in local time using [`WIRE_DATE_TIME_FORMAT`].
///
/// Out-of-range values fall back to the Unix epoch.
pub fn format_local_timestamp(unix_ms: i64) -> String {
    Local
        .timestamp_millis_opt(unix_ms)
        .single()
        .or_else(|| Local.timestamp_millis_opt(0).single())
        .map(|datetime| datetime.format(WIRE_DATE_TIME_FORMAT).to_string())
        .unwrap_or_default()
}
