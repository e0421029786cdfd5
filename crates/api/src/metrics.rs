//! Read-only client for the metrics (Prometheus compatible) query API.
//!
//! Only instant queries are issued. The monitor helpers are best effort: a
//! failed query is logged with `warn!` and reported as zero so a dashboard
//! never fails because the metrics service is down.

use std::collections::BTreeMap;
use std::time::Duration;

use reqwest::Client;
use serde::Deserialize;
use serde_json::Value;
use tracing::{debug, warn};

use crate::ApiError;

const QUERY_TIMEOUT: Duration = Duration::from_secs(15);
const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// One element of an instant vector result.
#[derive(Debug, Clone, PartialEq)]
pub struct Sample {
    pub metric: BTreeMap<String, String>,
    pub value: f64,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct PodCounts {
    pub up: u64,
    pub total: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ResourceMeasure {
    Memory,
    Cpu,
}

impl ResourceMeasure {
    fn metric_suffix(&self) -> &'static str {
        match self {
            Self::Memory => "memory_bytes",
            Self::Cpu => "cpu_cores",
        }
    }
}

/// Parameters of a resource request/limit query.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ResourceQuery {
    pub project_slug: String,
    /// Value of the `type` pod label (`lab`, `deployment`, ...).
    pub resource_type: String,
    /// Query limits instead of requests.
    pub limits: bool,
    pub measure: ResourceMeasure,
    pub app: Option<String>,
}

impl ResourceQuery {
    pub fn to_promql(&self) -> String {
        let kind = if self.limits { "limits" } else { "requests" };
        let mut labels = format!(
            "label_project=\"{}\", label_type=\"{}\"",
            escape_label(&self.project_slug),
            escape_label(&self.resource_type)
        );
        if let Some(app) = &self.app {
            labels.push_str(&format!(", label_app=\"{}\"", escape_label(app)));
        }
        format!(
            "sum(kube_pod_container_resource_{kind}_{} * on(pod) group_left kube_pod_labels{{{labels}}})",
            self.measure.metric_suffix()
        )
    }
}

#[derive(Debug, Deserialize)]
struct QueryResponse {
    #[serde(default)]
    status: String,
    #[serde(default)]
    error: Option<String>,
    #[serde(default)]
    data: Option<QueryData>,
}

#[derive(Debug, Deserialize)]
struct QueryData {
    #[serde(default)]
    result: Vec<RawSample>,
}

#[derive(Debug, Deserialize)]
struct RawSample {
    #[serde(default)]
    metric: BTreeMap<String, String>,
    value: (Value, Value),
}

#[derive(Debug, Clone)]
pub struct MetricsClient {
    query_url: String,
    http: Client,
}

impl MetricsClient {
    pub fn new(prometheus_url: &str) -> Result<Self, ApiError> {
        let trimmed = prometheus_url.trim().trim_end_matches('/');
        url::Url::parse(trimmed).map_err(|error| ApiError::InvalidBaseUrl {
            url: prometheus_url.to_string(),
            reason: error.to_string(),
        })?;
        let http = Client::builder().timeout(QUERY_TIMEOUT).build()?;
        Ok(Self {
            query_url: format!("{trimmed}/api/v1/query"),
            http,
        })
    }

    pub fn query_url(&self) -> &str {
        &self.query_url
    }

    /// Run an instant query and return the result vector.
    pub async fn instant_query(&self, query: &str) -> Result<Vec<Sample>, ApiError> {
        debug!(query, "metrics query");
        let response = self.http.get(&self.query_url).query(&[("query", query)]).send().await?;
        let status = response.status();
        let text = response.text().await?;
        if !status.is_success() {
            return Err(ApiError::status(status.as_u16(), status.canonical_reason().unwrap_or("Unknown"), text));
        }
        parse_vector(&self.query_url, &text)
    }

    /// Value of the first sample, or zero when the query fails or is empty.
    pub async fn first_value_or_zero(&self, query: &str) -> f64 {
        match self.instant_query(query).await {
            Ok(samples) => samples.first().map(|sample| sample.value).unwrap_or(0.0),
            Err(error) => {
                warn!(%error, query, "metrics query failed; reporting zero");
                0.0
            }
        }
    }

    pub async fn pods_up(&self, app_name: &str) -> PodCounts {
        let (up_query, total_query) = pods_up_queries(app_name);
        let up = self.first_value_or_zero(&up_query).await;
        let total = self.first_value_or_zero(&total_query).await;
        PodCounts {
            up: up.max(0.0).round() as u64,
            total: total.max(0.0).round() as u64,
        }
    }

    /// CPU cores used by a project's labs, averaged over 60s.
    pub async fn project_cpu_usage(&self, project_slug: &str) -> f64 {
        self.first_value_or_zero(&project_usage_query("container_cpu_usage_seconds_total", project_slug)).await
    }

    pub async fn project_memory_usage_gib(&self, project_slug: &str) -> f64 {
        self.first_value_or_zero(&project_usage_query("container_memory_usage_bytes", project_slug)).await / BYTES_PER_GIB
    }

    pub async fn project_memory_requests_gib(&self, project_slug: &str) -> f64 {
        self.first_value_or_zero(&project_requests_query("memory_bytes", project_slug)).await / BYTES_PER_GIB
    }

    pub async fn project_cpu_requests(&self, project_slug: &str) -> f64 {
        self.first_value_or_zero(&project_requests_query("cpu_cores", project_slug)).await
    }

    pub async fn resource_usage(&self, query: &ResourceQuery) -> f64 {
        self.first_value_or_zero(&query.to_promql()).await
    }
}

pub fn pods_up_queries(app_name: &str) -> (String, String) {
    let app = escape_label(app_name);
    (format!("sum(up{{app=\"{app}\"}})"), format!("count(up{{app=\"{app}\"}})"))
}

pub fn project_usage_query(metric: &str, project_slug: &str) -> String {
    format!(
        "sum(sum (rate ({metric}{{image!=\"\"}}[60s])) by (pod) * on(pod) group_left kube_pod_labels{{label_project=\"{}\", label_app=\"lab\"}})",
        escape_label(project_slug)
    )
}

pub fn project_requests_query(measure: &str, project_slug: &str) -> String {
    format!(
        "sum(kube_pod_container_resource_requests_{measure} * on(pod) group_left kube_pod_labels{{label_project=\"{}\"}})",
        escape_label(project_slug)
    )
}

fn escape_label(value: &str) -> String {
    value.replace('\\', "\\\\").replace('"', "\\\"")
}

/// Parse an instant query response body into samples.
pub fn parse_vector(url: &str, body: &str) -> Result<Vec<Sample>, ApiError> {
    let response: QueryResponse = serde_json::from_str(body).map_err(|error| ApiError::decode(url, error))?;
    if response.status != "success" {
        return Err(ApiError::decode(
            url,
            response.error.unwrap_or_else(|| format!("query status '{}'", response.status)),
        ));
    }
    response
        .data
        .map(|data| data.result)
        .unwrap_or_default()
        .into_iter()
        .map(|raw| {
            let value = match &raw.value.1 {
                Value::String(text) => text.parse::<f64>().ok(),
                Value::Number(number) => number.as_f64(),
                _ => None,
            }
            .ok_or_else(|| ApiError::decode(url, format!("sample value {} is not numeric", raw.value.1)))?;
            Ok(Sample { metric: raw.metric, value })
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_pod_queries_with_escaped_labels() {
        let (up, total) = pods_up_queries("lab\"x");
        assert_eq!(up, r#"sum(up{app="lab\"x"})"#);
        assert_eq!(total, r#"count(up{app="lab\"x"})"#);
    }

    #[test]
    fn builds_resource_queries() {
        let mut query = ResourceQuery {
            project_slug: "demo".into(),
            resource_type: "lab".into(),
            limits: false,
            measure: ResourceMeasure::Memory,
            app: None,
        };
        assert_eq!(
            query.to_promql(),
            r#"sum(kube_pod_container_resource_requests_memory_bytes * on(pod) group_left kube_pod_labels{label_project="demo", label_type="lab"})"#
        );
        query.limits = true;
        query.measure = ResourceMeasure::Cpu;
        query.app = Some("jupyter".into());
        assert!(query.to_promql().starts_with("sum(kube_pod_container_resource_limits_cpu_cores"));
        assert!(query.to_promql().contains(r#"label_app="jupyter""#));
    }

    #[test]
    fn parses_vector_results() {
        let body = r#"{"status":"success","data":{"resultType":"vector","result":[
            {"metric":{"app":"lab"},"value":[1700000000.1,"3"]},
            {"metric":{},"value":[1700000000.1,"0.25"]}
        ]}}"#;
        let samples = parse_vector("u", body).expect("samples");
        assert_eq!(samples.len(), 2);
        assert_eq!(samples[0].metric.get("app").map(String::as_str), Some("lab"));
        assert_eq!(samples[0].value, 3.0);
        assert_eq!(samples[1].value, 0.25);
    }

    #[test]
    fn error_status_and_bad_values_are_decode_errors() {
        let failed = r#"{"status":"error","error":"parse error at char 4"}"#;
        assert!(parse_vector("u", failed).unwrap_err().to_string().contains("parse error"));
        let bad = r#"{"status":"success","data":{"result":[{"metric":{},"value":[1,"NaN?"]}]}}"#;
        assert!(parse_vector("u", bad).is_err());
        let empty = r#"{"status":"success","data":{"result":[]}}"#;
        assert!(parse_vector("u", empty).unwrap().is_empty());
    }

    #[tokio::test]
    async fn truncated_query_body_is_a_network_error() {
        let url = crate::test_server::respond_once("HTTP/1.1 200 OK\r\nContent-Length: 80\r\n\r\n{\"status\":\"success\"");
        let client = MetricsClient::new(&url).expect("client");
        let err = client.instant_query("up").await.unwrap_err();
        assert!(matches!(err, ApiError::Network(_)), "{err:?}");
    }

    #[test]
    fn query_url_is_derived_from_base() {
        let client = MetricsClient::new("http://prometheus:9090/").expect("client");
        assert_eq!(client.query_url(), "http://prometheus:9090/api/v1/query");
        assert!(MetricsClient::new("not a url").is_err());
    }
}
