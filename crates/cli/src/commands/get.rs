use anyhow::Result;
use serde_json::Value;
use studio_api::{ApiError, Endpoint, ProjectResource, StudioClient, id_string};
use studio_util::{Table, json_cell};

use super::{Session, print_current, report_failure};
use crate::cli::GetCommand;

pub async fn run(command: GetCommand, session: &Session) -> Result<bool> {
    if let GetCommand::Current = command {
        print_current(session.config());
        return Ok(true);
    }

    let client = session.client()?;
    match command {
        GetCommand::App { category } => apps(session, &client, category.as_deref()).await,
        GetCommand::Environment => environments(session, &client).await,
        GetCommand::Flavor => {
            let listed = project_list(session, &client, ProjectResource::Flavors, &[]).await;
            print_listing(
                listed,
                "No flavors are associated to the current project.",
                &["Name", "CPU req", "CPU lim", "Mem req", "Mem lim", "GPUs", "Eph mem req", "Eph mem lim"],
                &["name", "cpu_req", "cpu_lim", "mem_req", "mem_lim", "gpu_req", "ephmem_req", "ephmem_lim"],
            )
        }
        GetCommand::ModelObj { object_type } => objects(session, &client, &object_type).await,
        GetCommand::Project => {
            let listed = client.list(&Endpoint::Projects, &[]).await;
            print_listing(
                listed,
                "There are no projects associated to the current user.",
                &["Name", "Created"],
                &["name", "created_at"],
            )
        }
        GetCommand::ProjectTemplates => {
            let listed = client.list(&Endpoint::ProjectTemplates, &[]).await;
            print_listing(listed, "There are no templates.", &["Name", "Description"], &["name", "description"])
        }
        GetCommand::S3 { name } => {
            let query: Vec<(&str, &str)> = name.as_deref().map(|name| ("name", name)).into_iter().collect();
            let listed = project_list(session, &client, ProjectResource::S3, &query).await;
            print_listing(
                listed,
                "There are no S3 endpoints associated with the current project.",
                &["Name", "Host", "Region"],
                &["name", "host", "region"],
            )
        }
        GetCommand::Current => Ok(true),
    }
}

async fn project_list(
    session: &Session,
    client: &StudioClient,
    resource: ProjectResource,
    query: &[(&str, &str)],
) -> Result<Vec<Value>, ApiError> {
    let endpoint = session.project_collection(client, resource).await?;
    client.list(&endpoint, query).await
}

fn print_listing(listed: Result<Vec<Value>, ApiError>, empty_message: &str, headers: &[&str], keys: &[&str]) -> Result<bool> {
    match listed {
        Ok(items) if items.is_empty() => println!("{empty_message}"),
        Ok(items) => println!("{}", Table::from_json_items(headers, keys, &items)),
        Err(error) => return Ok(report_failure("Fetching failed.", &error)),
    }
    Ok(true)
}

async fn apps(session: &Session, client: &StudioClient, category: Option<&str>) -> Result<bool> {
    let category = category.map(str::to_lowercase);
    let query: Vec<(&str, &str)> = category.as_deref().map(|category| ("app__category", category)).into_iter().collect();
    let apps = match project_list(session, client, ProjectResource::AppInstances, &query).await {
        Ok(apps) => apps,
        Err(error) => return Ok(report_failure("Apps could not be fetched.", &error)),
    };
    if apps.is_empty() {
        println!("There are no apps associated with the current project.");
        return Ok(true);
    }

    let mut table = Table::new(["Category", "App", "Name", "URL", "Status"]);
    for row in app_rows(&apps) {
        table.add_row(row);
    }
    println!("{table}");
    Ok(true)
}

/// Rows of the app table, sorted by category; the status column shows the latest status entry.
fn app_rows(apps: &[Value]) -> Vec<Vec<String>> {
    let mut rows: Vec<Vec<String>> = apps
        .iter()
        .map(|app| {
            let status = app
                .get("status")
                .and_then(Value::as_array)
                .and_then(|statuses| statuses.iter().max_by_key(|status| status.get("id").and_then(Value::as_i64).unwrap_or(i64::MIN)))
                .map(|status| json_cell(status, "status_type"))
                .unwrap_or_default();
            vec![
                json_cell(app, "app.category.name"),
                json_cell(app, "app.name"),
                json_cell(app, "name"),
                json_cell(app, "table_field.url"),
                status,
            ]
        })
        .collect();
    rows.sort_by(|left, right| left[0].cmp(&right[0]));
    rows
}

async fn environments(session: &Session, client: &StudioClient) -> Result<bool> {
    let environments = match project_list(session, client, ProjectResource::Environments, &[]).await {
        Ok(environments) => environments,
        Err(error) => return Ok(report_failure("Fetching environments failed.", &error)),
    };
    if environments.is_empty() {
        println!("There are no environments associated with the current project");
        return Ok(true);
    }

    let mut rows: Vec<Vec<String>> = environments
        .iter()
        .map(|environment| {
            vec![
                json_cell(environment, "app.category.name"),
                json_cell(environment, "app.name"),
                json_cell(environment, "name"),
                format!("{}/{}", json_cell(environment, "repository"), json_cell(environment, "image")),
            ]
        })
        .collect();
    rows.sort_by(|left, right| left[0].cmp(&right[0]));

    let mut table = Table::new(["Category", "App", "Name", "Image"]);
    for row in rows {
        table.add_row(row);
    }
    println!("{table}");
    Ok(true)
}

async fn objects(session: &Session, client: &StudioClient, object_type: &str) -> Result<bool> {
    let object_types = match project_list(session, client, ProjectResource::ObjectTypes, &[]).await {
        Ok(object_types) => object_types,
        Err(error) => return Ok(report_failure("Fetching object types failed.", &error)),
    };
    let Some(type_id) = object_types
        .iter()
        .find(|candidate| candidate.get("slug").and_then(Value::as_str) == Some(object_type))
        .and_then(|found| found.get("id"))
        .map(id_string)
    else {
        println!("Object type {object_type} doesn't exist.");
        return Ok(true);
    };

    let mut objects = match project_list(session, client, ProjectResource::Models, &[("object_type", type_id.as_str())]).await {
        Ok(objects) => objects,
        Err(error) => return Ok(report_failure("Fetching model objects failed.", &error)),
    };
    if objects.is_empty() {
        println!("No model objects are associated to the current project.");
        return Ok(true);
    }

    label_object_types(&mut objects, &object_types);
    println!(
        "{}",
        Table::from_json_items(&["Name", "Version", "Type", "Created"], &["name", "version", "object_type", "uploaded_at"], &objects)
    );
    Ok(true)
}

/// Replace each object's `object_type` id list with the name of its first type.
fn label_object_types(objects: &mut [Value], object_types: &[Value]) {
    for object in objects.iter_mut() {
        let type_name = object
            .get("object_type")
            .and_then(|types| types.get(0))
            .map(id_string)
            .and_then(|id| {
                object_types
                    .iter()
                    .find(|candidate| candidate.get("id").map(id_string).as_deref() == Some(id.as_str()))
                    .and_then(|found| found.get("name").cloned())
            });
        if let (Some(name), Some(fields)) = (type_name, object.as_object_mut()) {
            fields.insert("object_type".into(), name);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn app_rows_use_latest_status_and_sort_by_category() {
        let apps = vec![
            json!({
                "name": "lab-1",
                "app": {"name": "JupyterLab", "category": {"name": "Notebooks"}},
                "table_field": {"url": "https://lab-1.example.com"},
                "status": [{"id": 3, "status_type": "Running"}, {"id": 1, "status_type": "Created"}]
            }),
            json!({
                "name": "minio",
                "app": {"name": "MinIO", "category": {"name": "Manage Files"}},
                "table_field": {},
                "status": [{"id": 7, "status_type": "Pending"}]
            }),
        ];
        let rows = app_rows(&apps);
        assert_eq!(rows[0], ["Manage Files", "MinIO", "minio", "", "Pending"]);
        assert_eq!(rows[1], ["Notebooks", "JupyterLab", "lab-1", "https://lab-1.example.com", "Running"]);
    }

    #[test]
    fn object_type_ids_are_replaced_by_names() {
        let types = vec![json!({"id": 1, "slug": "model", "name": "Model"}), json!({"id": 2, "slug": "dataset", "name": "Dataset"})];
        let mut objects = vec![json!({"name": "resnet", "object_type": [2]}), json!({"name": "orphan", "object_type": [9]})];
        label_object_types(&mut objects, &types);
        assert_eq!(objects[0]["object_type"], json!("Dataset"));
        assert_eq!(objects[1]["object_type"], json!([9]));
    }
}
