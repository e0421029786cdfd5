use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::{Value, json};
use studio_api::multipart::{Form, Part};
use studio_api::{Endpoint, ProjectResource, StudioClient};
use tokio::process::Command;
use tracing::{debug, info};

use super::{Session, report_failure};
use crate::cli::CreateCommand;

pub async fn run(command: CreateCommand, session: &Session) -> Result<bool> {
    let client = session.client()?;
    match command {
        CreateCommand::Project {
            name,
            description,
            repository,
            template,
        } => {
            let body = json!({"name": name, "description": description, "repository": repository, "template": template});
            if let Err(error) = client.post_json(&Endpoint::Projects, &body).await {
                return Ok(report_failure("Failed to create project.", &error));
            }
            println!("Created project: {name}");
            session.store.set_current(None, Some(&name)).context("failed to save configuration")?;
            info!(project = %name, "current project updated");
            Ok(true)
        }
        CreateCommand::App { settings, chart, logo } => create_app(&client, &settings, &chart, &logo).await,
        CreateCommand::Template { template, image } => {
            let settings = read_json(&template).await?;
            let form = Form::new()
                .text("settings", settings.to_string())
                .part("image", file_part(&image).await?);
            match client.post_multipart(&Endpoint::ProjectTemplates, form).await {
                Ok(_) => println!("Created template."),
                Err(error) => return Ok(report_failure("Failed to create template.", &error)),
            }
            Ok(true)
        }
        CreateCommand::AppInstance { data } => {
            let body = read_json(&data).await?;
            let endpoint = session.project_collection(&client, ProjectResource::AppInstances).await?;
            match client.post_json(&endpoint, &body).await {
                Ok(created) => println!("{created}"),
                Err(error) => return Ok(report_failure("Failed to create app instance.", &error)),
            }
            Ok(true)
        }
        CreateCommand::Resource { file } => {
            let body = read_json(&file).await?;
            let endpoint = session.project_collection(&client, ProjectResource::Resources).await?;
            match client.post_json(&endpoint, &body).await {
                Ok(_) => println!("Created resource."),
                Err(error) => return Ok(report_failure("Failed to create resource.", &error)),
            }
            Ok(true)
        }
        CreateCommand::Object {
            name,
            uid,
            release_type,
            version,
            object_type,
            description,
            model_card,
        } => {
            let model_card = match model_card {
                Some(path) => tokio::fs::read_to_string(&path)
                    .await
                    .with_context(|| format!("failed to read model card {}", path.display()))?,
                None => String::new(),
            };
            let body = json!({
                "uid": uid,
                "name": name,
                "release_type": release_type,
                "version": version,
                "description": description,
                "model_card": model_card,
                "object_type": object_type,
            });
            let endpoint = session.project_collection(&client, ProjectResource::Models).await?;
            if let Err(error) = client.post_json(&endpoint, &body).await {
                return Ok(report_failure("Failed to create model.", &error));
            }
            println!("Released model: {name}, release_type: {release_type}");
            Ok(true)
        }
    }
}

/// Fields sent alongside the chart archive when registering an app.
#[derive(Debug, PartialEq)]
struct AppRegistration {
    name: String,
    slug: String,
    category: String,
    description: String,
    settings: String,
    table_field: String,
    access: String,
    priority: String,
}

impl AppRegistration {
    fn from_settings(config: &Value) -> Result<Self> {
        let text = |key: &str| -> Result<String> {
            match config.get(key) {
                Some(Value::String(value)) => Ok(value.clone()),
                Some(_) => bail!("'{key}' must be a string"),
                None => bail!("settings file is missing '{key}'"),
            }
        };
        let embedded = |key: &str| -> Result<String> {
            config
                .get(key)
                .map(Value::to_string)
                .with_context(|| format!("settings file is missing '{key}'"))
        };
        Ok(Self {
            name: text("name")?,
            slug: text("slug")?,
            category: text("category")?,
            description: text("description")?,
            settings: embedded("settings")?,
            table_field: embedded("table_field")?,
            access: config.get("access").and_then(Value::as_str).unwrap_or("public").to_string(),
            priority: config
                .get("priority")
                .map(|priority| priority.as_str().map(str::to_string).unwrap_or_else(|| priority.to_string()))
                .unwrap_or_else(|| "100".to_string()),
        })
    }

    fn into_form(self) -> Form {
        Form::new()
            .text("name", self.name)
            .text("slug", self.slug)
            .text("cat", self.category)
            .text("description", self.description)
            .text("settings", self.settings)
            .text("table_field", self.table_field)
            .text("access", self.access)
            .text("priority", self.priority)
    }
}

async fn create_app(client: &StudioClient, settings: &Path, chart: &Path, logo: &Path) -> Result<bool> {
    let registration = AppRegistration::from_settings(&read_json(settings).await?)
        .with_context(|| format!("invalid app settings in {}", settings.display()))?;
    let name = registration.name.clone();

    let workdir = tempfile::tempdir().context("failed to create a working directory")?;
    let archive = workdir.path().join("chart.tgz");
    archive_chart(chart, &archive).await?;

    let chart_bytes = tokio::fs::read(&archive).await.context("failed to read chart archive")?;
    let form = registration
        .into_form()
        .part("chart", Part::bytes(chart_bytes).file_name("chart.tgz"))
        .part("logo", file_part(logo).await?);

    match client.post_multipart(&Endpoint::AdminApps, form).await {
        Ok(_) => {
            println!("Created app {name}.");
            Ok(true)
        }
        Err(error) => Ok(report_failure(&format!("Failed to create app {name}."), &error)),
    }
}

async fn archive_chart(chart: &Path, archive: &Path) -> Result<()> {
    debug!(chart = %chart.display(), archive = %archive.display(), "archiving chart");
    let output = Command::new("tar")
        .arg("-C")
        .arg(chart)
        .arg("-czf")
        .arg(archive)
        .arg(".")
        .output()
        .await
        .context("failed to run tar")?;
    if !output.status.success() {
        bail!("tar failed to archive {}: {}", chart.display(), String::from_utf8_lossy(&output.stderr).trim());
    }
    Ok(())
}

async fn read_json(path: &Path) -> Result<Value> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    serde_json::from_str(&data).with_context(|| format!("failed to load JSON from {}", path.display()))
}

async fn file_part(path: &Path) -> Result<Part> {
    let bytes = tokio::fs::read(path)
        .await
        .with_context(|| format!("failed to read {}", path.display()))?;
    let file_name = path
        .file_name()
        .map(|name| name.to_string_lossy().into_owned())
        .unwrap_or_else(|| "upload".to_string());
    Ok(Part::bytes(bytes).file_name(file_name))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn registration_embeds_nested_settings_as_json() {
        let config = json!({
            "name": "JupyterLab",
            "slug": "lab",
            "category": "notebooks",
            "description": "Notebook server",
            "settings": {"flavor": {}, "apps": {"Persistent Volume": "many"}},
            "table_field": {"url": "https://{{ release }}.example.com"},
            "priority": 200
        });
        let registration = AppRegistration::from_settings(&config).expect("registration");
        assert_eq!(registration.slug, "lab");
        assert_eq!(registration.access, "public");
        assert_eq!(registration.priority, "200");
        assert_eq!(registration.settings, r#"{"flavor":{},"apps":{"Persistent Volume":"many"}}"#);
    }

    #[test]
    fn registration_requires_identity_fields() {
        let error = AppRegistration::from_settings(&json!({"name": "lab"})).expect_err("missing slug");
        assert!(error.to_string().contains("slug"));
    }

    #[tokio::test]
    async fn chart_directory_is_archived() {
        let dir = tempfile::tempdir().expect("tempdir");
        let chart = dir.path().join("chart");
        std::fs::create_dir(&chart).expect("chart dir");
        std::fs::write(chart.join("Chart.yaml"), "name: lab\n").expect("chart file");
        let archive = dir.path().join("chart.tgz");

        archive_chart(&chart, &archive).await.expect("archive");
        assert!(std::fs::metadata(&archive).expect("archive exists").len() > 0);
        assert!(archive_chart(&dir.path().join("missing"), &dir.path().join("x.tgz")).await.is_err());
    }
}
