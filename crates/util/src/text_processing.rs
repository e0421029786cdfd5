//! # Text Processing Utilities
//!
//! Redaction of credentials before text reaches logs or the terminal.

use once_cell::sync::Lazy;
use regex::Regex;

static REDACT_PATTERNS: Lazy<Vec<Regex>> = Lazy::new(build_redact_patterns);

/// Redacts values that look like secrets in a string.
///
/// Authorization headers (`Token`, `Bearer`, `Basic`), `*_TOKEN`/`*_KEY`/
/// `*_SECRET`/`*_PASSWORD` assignments and JSON `access_token` fields are
/// replaced with `[REDACTED]` while the key names are kept for debugging.
///
/// # Example
/// ```rust
/// use studio_util::redact_sensitive;
///
/// assert_eq!(redact_sensitive("Authorization: Token abc123"), "Authorization: [REDACTED]");
/// assert_eq!(redact_sensitive("STUDIO_ACCESS_TOKEN=xyz"), "STUDIO_ACCESS_TOKEN=[REDACTED]");
/// ```
pub fn redact_sensitive(input: &str) -> String {
    let mut redacted = input.to_string();
    for pattern in REDACT_PATTERNS.iter() {
        redacted = pattern
            .replace_all(&redacted, |captures: &regex::Captures| {
                let prefix = captures.get(1).map(|m| m.as_str()).unwrap_or("");
                let suffix = captures.get(3).map(|m| m.as_str()).unwrap_or("");
                format!("{prefix}[REDACTED]{suffix}")
            })
            .to_string();
    }
    redacted
}

fn build_redact_patterns() -> Vec<Regex> {
    [
        r"(?i)(authorization:\s*)((?:token|bearer|basic)\s+[^\s]+|[^\s]+)()",
        r"(?i)\b([A-Z0-9_]*(?:TOKEN|KEY|SECRET|PASSWORD)=)([^\s]+)()",
        r#"(?i)("(?:access_token|secret_key|password)"\s*:\s*")([^"]*)(")"#,
    ]
    .iter()
    .filter_map(|pattern| Regex::new(pattern).ok())
    .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn redacts_authorization_header_schemes() {
        assert_eq!(redact_sensitive("authorization: Bearer abc.def"), "authorization: [REDACTED]");
        assert_eq!(redact_sensitive("Authorization:Token 123"), "Authorization:[REDACTED]");
    }

    #[test]
    fn redacts_json_token_fields() {
        let input = r#"{"studio_url":"s.example.com","access_token":"abc"}"#;
        assert_eq!(
            redact_sensitive(input),
            r#"{"studio_url":"s.example.com","access_token":"[REDACTED]"}"#
        );
    }

    #[test]
    fn leaves_ordinary_text_alone() {
        assert_eq!(redact_sensitive("release lab-1 installed"), "release lab-1 installed");
    }
}
