use anyhow::Result;
use serde_json::Value;
use studio_api::{Endpoint, ProjectResource, StudioClient, id_string};

use super::{Session, report_failure};
use crate::cli::DeleteCommand;

pub async fn run(command: DeleteCommand, session: &Session) -> Result<bool> {
    let client = session.client()?;
    match command {
        DeleteCommand::App { name } => {
            let endpoint = session.project_collection(&client, ProjectResource::AppInstances).await?;
            let apps = match client.list(&endpoint, &[("name", name.as_str())]).await {
                Ok(apps) => apps,
                Err(error) => return Ok(report_failure("Fetching apps failed.", &error)),
            };
            match apps.len() {
                0 => {
                    println!("Found no app with that name, aborting...");
                    return Ok(false);
                }
                1 => {}
                _ => println!("Found multiple apps with that name, deleting all..."),
            }
            delete_items(&client, &endpoint, &apps, ItemKey::Id, &format!("Deleted app: {name}"), "Failed to delete app.").await
        }
        DeleteCommand::Object { name, version } => {
            let endpoint = session.project_collection(&client, ProjectResource::Models).await?;
            let mut query = vec![("name", name.as_str())];
            if let Some(version) = version.as_deref() {
                query.push(("version", version));
            }
            let objects = match client.list(&endpoint, &query).await {
                Ok(objects) => objects,
                Err(error) => return Ok(report_failure("Fetching model objects failed.", &error)),
            };
            if objects.is_empty() {
                println!("No model objects found with the given name and/or version.");
                return Ok(true);
            }
            delete_items(
                &client,
                &endpoint,
                &objects,
                ItemKey::Id,
                &format!("Deleted model object: {name}"),
                "Failed to delete model object.",
            )
            .await
        }
        DeleteCommand::Project { name } => {
            let project_id = client.project_id(&name).await?;
            match client.delete(&Endpoint::Project { project_id }).await {
                Ok(()) => {
                    println!("Deleted project: {name}");
                    Ok(true)
                }
                Err(error) => Ok(report_failure("Failed to delete project.", &error)),
            }
        }
        DeleteCommand::Resource { resource_type, name } => {
            let endpoint = session.project_collection(&client, resource_type).await?;
            let found = match client.list(&endpoint, &[("name", name.as_str())]).await {
                Ok(found) => found,
                Err(error) => return Ok(report_failure(&format!("Fetching {resource_type} failed."), &error)),
            };
            match found.len() {
                0 => {
                    println!("No {resource_type}: '{name}' associated with the current project");
                    Ok(false)
                }
                1 => {
                    let key = if resource_type.addressed_by_name() { ItemKey::Name } else { ItemKey::Id };
                    delete_items(
                        &client,
                        &endpoint,
                        &found,
                        key,
                        &format!("Deleted {resource_type}: {name}"),
                        &format!("Failed to delete {resource_type}."),
                    )
                    .await
                }
                _ => {
                    println!("Found multiple resources with the passed name.");
                    Ok(false)
                }
            }
        }
    }
}

/// Field addressing an item below its collection.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum ItemKey {
    Id,
    Name,
}

impl ItemKey {
    fn field(self) -> &'static str {
        match self {
            Self::Id => "id",
            Self::Name => "name",
        }
    }
}

fn item_endpoint(collection: &Endpoint, item: &Value, key: ItemKey) -> Option<Endpoint> {
    let Endpoint::Collection { project_id, resource } = collection else {
        return None;
    };
    let item = item.get(key.field()).map(id_string)?;
    Some(Endpoint::item(project_id.clone(), *resource, item))
}

async fn delete_items(
    client: &StudioClient,
    collection: &Endpoint,
    items: &[Value],
    key: ItemKey,
    deleted_message: &str,
    failed_message: &str,
) -> Result<bool> {
    let mut all_deleted = true;
    for item in items {
        let Some(endpoint) = item_endpoint(collection, item, key) else {
            println!("{failed_message}");
            println!("Entry has no '{}' field.", key.field());
            all_deleted = false;
            continue;
        };
        match client.delete(&endpoint).await {
            Ok(()) => println!("{deleted_message}"),
            Err(error) => all_deleted &= report_failure(failed_message, &error),
        }
    }
    Ok(all_deleted)
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn items_are_addressed_by_id_or_name() {
        let collection = Endpoint::collection("7", ProjectResource::S3);
        let item = json!({"id": 12, "name": "minio"});
        assert_eq!(item_endpoint(&collection, &item, ItemKey::Name), Some(Endpoint::item("7", ProjectResource::S3, "minio")));
        assert_eq!(item_endpoint(&collection, &item, ItemKey::Id), Some(Endpoint::item("7", ProjectResource::S3, "12")));
        assert_eq!(item_endpoint(&collection, &json!({}), ItemKey::Id), None);
        assert_eq!(item_endpoint(&Endpoint::Projects, &item, ItemKey::Id), None);
    }
}
