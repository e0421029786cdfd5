use anyhow::{Context, Result};
use serde_json::Value;
use studio_api::{MetricsClient, ResourceMeasure, ResourceQuery, StudioClient};
use studio_util::Table;

use super::{Session, report_failure};
use crate::cli::MonitorCommand;

pub async fn run(command: MonitorCommand, session: &Session) -> Result<bool> {
    let metrics = MetricsClient::new(session.config().require_prometheus_url()?).context("failed to set up the metrics client")?;
    match command {
        MonitorCommand::Pods { app } => {
            let pods = metrics.pods_up(&app).await;
            println!("{app}: {}/{} pods up", pods.up, pods.total);
            Ok(true)
        }
        MonitorCommand::Usage => {
            let Some(slug) = project_slug(session, &session.client()?).await? else {
                return Ok(false);
            };
            let slug = slug.as_str();

            let mut table = Table::new(["Project", "CPU usage", "CPU requests", "Memory usage (GiB)", "Memory requests (GiB)"]);
            table.add_row(vec![
                slug.to_string(),
                format_measure(metrics.project_cpu_usage(slug).await),
                format_measure(metrics.project_cpu_requests(slug).await),
                format_measure(metrics.project_memory_usage_gib(slug).await),
                format_measure(metrics.project_memory_requests_gib(slug).await),
            ]);
            println!("{table}");
            Ok(true)
        }
        MonitorCommand::Resources {
            resource_type,
            limits,
            app,
        } => {
            let Some(slug) = project_slug(session, &session.client()?).await? else {
                return Ok(false);
            };
            let memory = resource_query(&slug, &resource_type, limits, ResourceMeasure::Memory, app.clone());
            let cpu = resource_query(&slug, &resource_type, limits, ResourceMeasure::Cpu, app);
            let label = if limits { "limits" } else { "requests" };

            let mut table = Table::new(["Project".to_string(), "Type".to_string(), format!("CPU {label}"), format!("Memory {label} (GiB)")]);
            table.add_row(vec![
                slug.clone(),
                resource_type,
                format_measure(metrics.resource_usage(&cpu).await),
                format_measure(metrics.resource_usage(&memory).await / BYTES_PER_GIB),
            ]);
            println!("{table}");
            Ok(true)
        }
    }
}

const BYTES_PER_GIB: f64 = 1024.0 * 1024.0 * 1024.0;

/// Slug of the current project; `None` once a failure has been printed.
async fn project_slug(session: &Session, client: &StudioClient) -> Result<Option<String>> {
    let project = match client.find_project(session.config().require_project()?).await {
        Ok(project) => project,
        Err(error) => {
            report_failure("Fetching project failed.", &error);
            return Ok(None);
        }
    };
    match project.get("slug").and_then(Value::as_str) {
        Some(slug) => Ok(Some(slug.to_string())),
        None => {
            println!("Project has no slug.");
            Ok(None)
        }
    }
}

fn resource_query(project_slug: &str, resource_type: &str, limits: bool, measure: ResourceMeasure, app: Option<String>) -> ResourceQuery {
    ResourceQuery {
        project_slug: project_slug.to_string(),
        resource_type: resource_type.to_string(),
        limits,
        measure,
        app,
    }
}

fn format_measure(value: f64) -> String {
    format!("{value:.2}")
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn measures_use_two_decimals() {
        assert_eq!(format_measure(0.0), "0.00");
        assert_eq!(format_measure(1.0 / 3.0), "0.33");
    }

    #[test]
    fn resource_queries_carry_project_type_and_app() {
        let query = resource_query("demo", "lab", true, ResourceMeasure::Cpu, Some("jupyter".into()));
        let promql = query.to_promql();
        assert!(promql.starts_with("sum(kube_pod_container_resource_limits_cpu_cores"));
        assert!(promql.contains(r#"label_project="demo", label_type="lab", label_app="jupyter""#));
    }
}
