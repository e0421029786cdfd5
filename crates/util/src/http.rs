//! # HTTP Utilities
//!
//! Helpers shared by the API client and the CLI for turning HTTP responses
//! into user-facing messages.

/// Return a user-friendly hint for common HTTP status codes.
///
/// # Example
/// ```rust
/// use studio_util::http::status_error_message;
///
/// assert!(status_error_message(401).unwrap().contains("STUDIO_ACCESS_TOKEN"));
/// assert!(status_error_message(404).unwrap().contains("Not Found"));
/// assert!(status_error_message(500).is_none());
/// ```
pub fn status_error_message(status_code: u16) -> Option<String> {
    match status_code {
        401 => Some("Unauthorized (401). Hint: set STUDIO_ACCESS_TOKEN=... or log in again".into()),
        403 => Some("Forbidden (403). Hint: check project membership and permissions".into()),
        404 => Some("Not Found (404). Hint: check the studio URL and the current project".into()),
        _ => None,
    }
}

/// Shorten a response body for inclusion in error messages.
pub fn truncate_for_summary(text: &str, max_len: usize) -> String {
    let trimmed = text.trim();
    if trimmed.chars().count() <= max_len {
        return trimmed.to_string();
    }
    let truncated: String = trimmed.chars().take(max_len.saturating_sub(3)).collect();
    format!("{}...", truncated.trim_end())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn truncates_long_bodies() {
        assert_eq!(truncate_for_summary("  short  ", 10), "short");
        assert_eq!(truncate_for_summary("abcdefghijkl", 8), "abcde...");
    }
}
