//! Errors returned by the studio API and metrics clients.

use studio_util::ConfigError;
use studio_util::http::{status_error_message, truncate_for_summary};
use thiserror::Error;

/// Longest response body excerpt included in an error message.
const BODY_EXCERPT_LEN: usize = 400;

#[derive(Debug, Error)]
pub enum ApiError {
    #[error("invalid studio URL '{url}': {reason}")]
    InvalidBaseUrl { url: String, reason: String },

    #[error("access token contains characters that are not allowed in an HTTP header")]
    InvalidToken,

    #[error(transparent)]
    Config(#[from] ConfigError),

    #[error("network error: {0}. Hint: check the studio URL, your connection, and proxy settings")]
    Network(#[from] reqwest::Error),

    #[error("{}", describe_status(*status, reason, body))]
    Status { status: u16, reason: String, body: String },

    #[error("invalid JSON in response from {url}: {reason}")]
    Decode { url: String, reason: String },

    #[error("response from {url} is not a JSON array")]
    NotAList { url: String },

    #[error("project '{0}' not found")]
    ProjectNotFound(String),

    #[error("found {count} projects named '{name}'; select a specific project")]
    AmbiguousProject { name: String, count: usize },
}

impl ApiError {
    pub fn status(status: u16, reason: impl Into<String>, body: impl Into<String>) -> Self {
        Self::Status {
            status,
            reason: reason.into(),
            body: body.into(),
        }
    }

    pub fn decode(url: impl Into<String>, reason: impl ToString) -> Self {
        Self::Decode {
            url: url.into(),
            reason: reason.to_string(),
        }
    }

    /// HTTP status code for status errors.
    pub fn status_code(&self) -> Option<u16> {
        match self {
            Self::Status { status, .. } => Some(*status),
            _ => None,
        }
    }
}

fn describe_status(status: u16, reason: &str, body: &str) -> String {
    let mut message = format!("Returned status code: {status}\nReason: {reason}");
    let excerpt = truncate_for_summary(body, BODY_EXCERPT_LEN);
    if !excerpt.is_empty() {
        message.push('\n');
        message.push_str(&excerpt);
    }
    if let Some(hint) = status_error_message(status) {
        message.push('\n');
        message.push_str(&hint);
    }
    message
}
