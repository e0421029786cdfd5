//! Studio API client utilities.
//!
//! This crate provides a lightweight async client for the studio REST API and
//! for the read-only metrics service. It focuses on:
//!
//! - Constructing an HTTP client with sensible defaults (token authentication,
//!   JSON accept header, timeout, optional TLS verification)
//! - Normalizing the configured studio URL into the API root
//! - Resolving the current project name into its id for project scoped calls
//! - Turning non-success responses into [`ApiError::Status`] with the status
//!   code, reason, and body
//!
//! The primary entry point is [`StudioClient`]. Create one with
//! [`StudioClient::from_config`] and call the endpoint helpers.
//!
//! # Example
//!
//! ```ignore
//! use studio_api::{Endpoint, StudioClient};
//! use studio_util::ConfigStore;
//!
//! async fn list_projects() -> anyhow::Result<()> {
//!     let config = ConfigStore::new().load()?;
//!     let client = StudioClient::from_config(&config)?;
//!     let projects = client.list(&Endpoint::Projects, &[]).await?;
//!     println!("{} projects", projects.len());
//!     Ok(())
//! }
//! ```

mod endpoints;
mod error;
pub mod metrics;

use std::time::Duration;

use reqwest::{Client, Method, RequestBuilder, header};
use serde_json::Value;
use studio_util::{StudioConfig, redact_sensitive};
use tracing::debug;

pub use endpoints::{Endpoint, ParseProjectResourceError, ProjectResource, normalize_studio_url};
pub use error::ApiError;
pub use metrics::{MetricsClient, PodCounts, ResourceMeasure, ResourceQuery, Sample};
pub use reqwest::multipart;

/// Request timeout applied to every studio call.
const REQUEST_TIMEOUT: Duration = Duration::from_secs(30);

#[derive(Debug, Clone)]
/// Thin wrapper around a configured `reqwest::Client` for studio API access.
///
/// The client pre-configures the `Authorization: Token <token>` header and
/// resolves endpoint paths against the normalized API root.
pub struct StudioClient {
    base_url: String,
    http: Client,
    user_agent: String,
}

impl StudioClient {
    /// Build a client for `studio_url` authenticating with `access_token`.
    ///
    /// When `secure` is false, invalid TLS certificates are accepted (self
    /// signed development clusters).
    pub fn new(studio_url: &str, access_token: &str, secure: bool) -> Result<Self, ApiError> {
        let base_url = normalize_studio_url(studio_url)?;

        let mut default_headers = header::HeaderMap::new();
        let authorization = header::HeaderValue::from_str(&format!("Token {}", access_token.trim())).map_err(|_| ApiError::InvalidToken)?;
        default_headers.insert(header::AUTHORIZATION, authorization);
        default_headers.insert(header::ACCEPT, header::HeaderValue::from_static("application/json"));

        let http = Client::builder()
            .default_headers(default_headers)
            .timeout(REQUEST_TIMEOUT)
            .danger_accept_invalid_certs(!secure)
            .build()?;

        Ok(Self {
            base_url,
            http,
            user_agent: format!("studio-cli/{}; {}", env!("CARGO_PKG_VERSION"), std::env::consts::OS),
        })
    }

    /// Build a client from resolved configuration; URL and token are required.
    pub fn from_config(config: &StudioConfig) -> Result<Self, ApiError> {
        Self::new(config.require_url()?, config.require_token()?, config.secure)
    }

    /// API root, e.g. `https://studio.example.com/api`.
    pub fn base_url(&self) -> &str {
        &self.base_url
    }

    pub fn url(&self, endpoint: &Endpoint) -> String {
        format!("{}{}", self.base_url, endpoint.path())
    }

    /// Build a `reqwest::RequestBuilder` for a method and endpoint.
    pub fn request(&self, method: Method, endpoint: &Endpoint) -> RequestBuilder {
        let url = self.url(endpoint);
        debug!(%method, url = %redact_sensitive(&url), "building request");
        self.http.request(method, url).header(header::USER_AGENT, &self.user_agent)
    }

    /// GET an endpoint and decode the body as JSON.
    pub async fn get_json(&self, endpoint: &Endpoint, query: &[(&str, &str)]) -> Result<Value, ApiError> {
        let mut builder = self.request(Method::GET, endpoint);
        if !query.is_empty() {
            builder = builder.query(query);
        }
        let url = self.url(endpoint);
        let text = send(builder).await?;
        decode_json(&url, &text)
    }

    /// GET a list endpoint; the response must be a JSON array.
    pub async fn list(&self, endpoint: &Endpoint, query: &[(&str, &str)]) -> Result<Vec<Value>, ApiError> {
        match self.get_json(endpoint, query).await? {
            Value::Array(items) => Ok(items),
            _ => Err(ApiError::NotAList { url: self.url(endpoint) }),
        }
    }

    /// POST a JSON body; an empty response body yields `Value::Null`.
    pub async fn post_json(&self, endpoint: &Endpoint, body: &Value) -> Result<Value, ApiError> {
        let builder = self.request(Method::POST, endpoint).json(body);
        let text = send(builder).await?;
        decode_json_or_null(&self.url(endpoint), &text)
    }

    /// POST a multipart form (file uploads).
    pub async fn post_multipart(&self, endpoint: &Endpoint, form: multipart::Form) -> Result<Value, ApiError> {
        let builder = self.request(Method::POST, endpoint).multipart(form);
        let text = send(builder).await?;
        decode_json_or_null(&self.url(endpoint), &text)
    }

    pub async fn delete(&self, endpoint: &Endpoint) -> Result<(), ApiError> {
        send(self.request(Method::DELETE, endpoint)).await?;
        Ok(())
    }

    /// Look up the single project called `name`.
    pub async fn find_project(&self, name: &str) -> Result<Value, ApiError> {
        let mut projects = self.list(&Endpoint::Projects, &[("name", name)]).await?;
        match projects.len() {
            0 => Err(ApiError::ProjectNotFound(name.to_string())),
            1 => Ok(projects.remove(0)),
            count => Err(ApiError::AmbiguousProject {
                name: name.to_string(),
                count,
            }),
        }
    }

    /// Id of the project called `name`, as used in project scoped paths.
    pub async fn project_id(&self, name: &str) -> Result<String, ApiError> {
        let project = self.find_project(name).await?;
        project
            .get("id")
            .map(id_string)
            .ok_or_else(|| ApiError::decode(self.url(&Endpoint::Projects), "project entry has no 'id'"))
    }
}

/// Render an id field (numeric or string) as a path segment.
pub fn id_string(value: &Value) -> String {
    match value {
        Value::String(text) => text.clone(),
        other => other.to_string(),
    }
}

async fn send(builder: RequestBuilder) -> Result<String, ApiError> {
    let response = builder.send().await?;
    let status = response.status();
    let text = response.text().await?;
    debug!(status = status.as_u16(), "received response");
    if !status.is_success() {
        return Err(ApiError::status(
            status.as_u16(),
            status.canonical_reason().unwrap_or("Unknown"),
            redact_sensitive(&text),
        ));
    }
    Ok(text)
}

fn decode_json(url: &str, text: &str) -> Result<Value, ApiError> {
    serde_json::from_str(text).map_err(|error| ApiError::decode(url, error))
}

fn decode_json_or_null(url: &str, text: &str) -> Result<Value, ApiError> {
    if text.trim().is_empty() {
        return Ok(Value::Null);
    }
    decode_json(url, text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn builds_urls_from_normalized_base() {
        let client = StudioClient::new("studio.example.com/", "abc123", true).expect("client");
        assert_eq!(client.base_url(), "https://studio.example.com/api");
        assert_eq!(
            client.url(&Endpoint::collection("3", ProjectResource::AppInstances)),
            "https://studio.example.com/api/projects/3/appinstances/"
        );
    }

    #[test]
    fn rejects_tokens_that_are_not_header_safe() {
        let err = StudioClient::new("studio.example.com", "bad\ntoken", true).unwrap_err();
        assert!(matches!(err, ApiError::InvalidToken));
    }

    #[test]
    fn from_config_requires_url_and_token() {
        let config = StudioConfig {
            studio_url: Some("studio.example.com".into()),
            ..StudioConfig::default()
        };
        let err = StudioClient::from_config(&config).unwrap_err();
        assert!(err.to_string().contains("access_token"));
    }

    #[test]
    fn ids_render_without_quotes() {
        assert_eq!(id_string(&json!(12)), "12");
        assert_eq!(id_string(&json!("abc")), "abc");
    }

    #[tokio::test]
    async fn truncated_success_body_is_a_network_error() {
        let url = test_server::respond_once("HTTP/1.1 201 Created\r\nContent-Type: application/json\r\nContent-Length: 64\r\n\r\n{\"id\"");
        let client = StudioClient::new(&url, "abc123", true).expect("client");
        let err = client.post_json(&Endpoint::Projects, &json!({"name": "demo"})).await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)), "{err:?}");
    }

    #[tokio::test]
    async fn empty_success_body_posts_as_null() {
        let url = test_server::respond_once("HTTP/1.1 204 No Content\r\n\r\n");
        let client = StudioClient::new(&url, "abc123", true).expect("client");
        let created = client.post_json(&Endpoint::Projects, &json!({"name": "demo"})).await.expect("post");
        assert_eq!(created, Value::Null);
    }

    #[test]
    fn empty_bodies_decode_to_null() {
        assert_eq!(decode_json_or_null("u", "  ").unwrap(), Value::Null);
        assert!(matches!(decode_json("u", "<html>"), Err(ApiError::Decode { .. })));
    }
}

/// Single-connection HTTP server answering with a canned response.
#[cfg(test)]
pub(crate) mod test_server {
    use std::io::{BufRead, BufReader, Read, Write};
    use std::net::TcpListener;
    use std::thread;

    /// Serve `response` to the first request and return the server's base URL.
    pub fn respond_once(response: &'static str) -> String {
        let listener = TcpListener::bind("127.0.0.1:0").expect("bind");
        let address = listener.local_addr().expect("address");
        thread::spawn(move || {
            let Ok((stream, _)) = listener.accept() else {
                return;
            };
            let mut reader = BufReader::new(stream);
            let mut content_length = 0usize;
            loop {
                let mut line = String::new();
                if reader.read_line(&mut line).unwrap_or(0) == 0 || line == "\r\n" {
                    break;
                }
                if let Some((name, value)) = line.split_once(':')
                    && name.eq_ignore_ascii_case("content-length")
                {
                    content_length = value.trim().parse().unwrap_or(0);
                }
            }
            let mut body = vec![0; content_length];
            let _ = reader.read_exact(&mut body);
            let mut stream = reader.into_inner();
            let _ = stream.write_all(response.as_bytes());
            let _ = stream.flush();
        });
        format!("http://{address}")
    }
}
