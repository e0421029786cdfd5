//! # Date Handling Utilities
//!
//! Formatting of API timestamps for table output.

use chrono::{DateTime, NaiveDate, Utc};

/// Returns true if a JSON key looks like a date field (`created_at`, `uploaded_at`, ...).
pub fn is_date_like_key(key: &str) -> bool {
    let normalized_key = key.to_ascii_lowercase().replace([' ', '-'], "_");
    normalized_key.ends_with("_at") || normalized_key.ends_with("_on") || normalized_key.ends_with("_date") || normalized_key == "created"
}

/// Formats an RFC3339 timestamp or ISO date as `YYYY-MM-DD HH:MM` (UTC).
///
/// Unparseable input is returned unchanged so tables never lose data.
///
/// # Example
/// ```rust
/// use studio_util::date_handling::format_timestamp;
///
/// assert_eq!(format_timestamp("2021-03-04T10:30:59.123+01:00"), "2021-03-04 09:30");
/// assert_eq!(format_timestamp("2021-03-04"), "2021-03-04");
/// assert_eq!(format_timestamp("yesterday"), "yesterday");
/// ```
pub fn format_timestamp(value: &str) -> String {
    if let Ok(timestamp) = DateTime::parse_from_rfc3339(value.trim()) {
        return timestamp.with_timezone(&Utc).format("%Y-%m-%d %H:%M").to_string();
    }
    if let Ok(date) = NaiveDate::parse_from_str(value.trim(), "%Y-%m-%d") {
        return date.format("%Y-%m-%d").to_string();
    }
    value.to_string()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn detects_date_keys() {
        assert!(is_date_like_key("created_at"));
        assert!(is_date_like_key("uploaded_at"));
        assert!(is_date_like_key("Created"));
        assert!(!is_date_like_key("name"));
    }

    #[test]
    fn formats_utc_timestamps() {
        assert_eq!(format_timestamp("2023-12-25T10:30:00Z"), "2023-12-25 10:30");
    }
}
