use std::collections::BTreeSet;
use std::error::Error;
use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Kinds of platform objects that can be listed from an inventory or referenced
/// from an app instance.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum ObjectKind {
    DataModel,
    AppDefinition,
    AppInstance,
    Flavor,
    Environment,
}

impl ObjectKind {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::DataModel => "data_model",
            Self::AppDefinition => "app_definition",
            Self::AppInstance => "app_instance",
            Self::Flavor => "flavor",
            Self::Environment => "environment",
        }
    }
}

impl fmt::Display for ObjectKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ParseObjectKindError;

impl fmt::Display for ParseObjectKindError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str("invalid object kind; expected one of data_model, app_definition, app_instance, flavor, environment")
    }
}

impl Error for ParseObjectKindError {}

impl FromStr for ObjectKind {
    type Err = ParseObjectKindError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "data_model" | "model" => Ok(Self::DataModel),
            "app_definition" | "app" => Ok(Self::AppDefinition),
            "app_instance" | "appinstance" => Ok(Self::AppInstance),
            "flavor" => Ok(Self::Flavor),
            "environment" => Ok(Self::Environment),
            _ => Err(ParseObjectKindError),
        }
    }
}

/// Typed reference to a platform object.
///
/// App instances record the objects they were configured with as a set of
/// references; the engine uses that set to pre-select prior choices.
#[derive(Clone, Debug, Hash, Eq, PartialEq, Ord, PartialOrd, Serialize, Deserialize)]
pub struct ObjectRef {
    pub kind: ObjectKind,
    pub id: String,
}

impl ObjectRef {
    pub fn new(kind: ObjectKind, id: impl Into<String>) -> Self {
        Self { kind, id: id.into() }
    }

    pub fn data_model(id: impl Into<String>) -> Self {
        Self::new(ObjectKind::DataModel, id)
    }

    pub fn app_instance(id: impl Into<String>) -> Self {
        Self::new(ObjectKind::AppInstance, id)
    }
}

impl fmt::Display for ObjectRef {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.kind, self.id)
    }
}

/// A published data model (a versioned object stored for a project).
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct DataModel {
    pub id: String,
    pub name: String,
    /// Slug of the owning project.
    pub project: String,
    #[serde(default)]
    pub version: Option<String>,
    #[serde(default)]
    pub object_type: Option<String>,
    #[serde(default)]
    pub uploaded_at: Option<DateTime<Utc>>,
}

/// Catalog entry describing a deployable unit type.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppDefinition {
    pub id: String,
    pub name: String,
    pub slug: String,
    #[serde(default)]
    pub category: Option<String>,
    /// Raw dependency schema declared by the app, if it was loaded with the catalog.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub settings: Option<Value>,
}

/// Sharing settings of an app instance.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InstancePermission {
    /// Visible to every user of the platform.
    #[serde(default)]
    pub public: bool,
    /// Slugs of projects the instance is shared with.
    #[serde(default)]
    pub projects: Vec<String>,
}

/// A concrete deployed (or deployable) unit created from an app definition.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct AppInstance {
    pub id: String,
    pub name: String,
    /// Name of the app definition this instance was created from.
    pub app: String,
    /// Slug of the project the instance belongs to.
    pub project: String,
    /// User name of the owner.
    pub owner: String,
    /// Nested parameter record submitted when the instance was configured.
    #[serde(default)]
    pub parameters: Value,
    #[serde(default)]
    pub permission: InstancePermission,
    /// Objects this instance was configured with.
    #[serde(default)]
    pub links: BTreeSet<ObjectRef>,
}

impl AppInstance {
    /// Returns true when this instance was configured with `object`.
    pub fn links_to(&self, object: &ObjectRef) -> bool {
        self.links.contains(object)
    }
}

/// Compute flavor (resource requests and limits) offered by the platform.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Flavor {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub cpu_req: Option<String>,
    #[serde(default)]
    pub cpu_lim: Option<String>,
    #[serde(default)]
    pub mem_req: Option<String>,
    #[serde(default)]
    pub mem_lim: Option<String>,
    #[serde(default)]
    pub gpu_req: Option<String>,
    #[serde(default)]
    pub ephmem_req: Option<String>,
    #[serde(default)]
    pub ephmem_lim: Option<String>,
}

/// Container image an app can be started from.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct EnvironmentImage {
    pub id: String,
    pub name: String,
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub repository: Option<String>,
    pub image: String,
}

impl EnvironmentImage {
    /// Fully qualified image reference (`repository/image` when a repository is set).
    pub fn image_reference(&self) -> String {
        match self.repository.as_deref() {
            Some(repository) if !repository.is_empty() => format!("{}/{}", repository.trim_end_matches('/'), self.image),
            _ => self.image.clone(),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn object_kind_parses_aliases() {
        assert_eq!("model".parse::<ObjectKind>(), Ok(ObjectKind::DataModel));
        assert_eq!("app_instance".parse::<ObjectKind>(), Ok(ObjectKind::AppInstance));
        assert!("volume".parse::<ObjectKind>().is_err());
    }

    #[test]
    fn app_instance_defaults_missing_fields() {
        let instance: AppInstance = serde_json::from_value(json!({
            "id": "i1",
            "name": "lab",
            "app": "JupyterLab",
            "project": "demo",
            "owner": "alice"
        }))
        .expect("instance");
        assert!(instance.parameters.is_null());
        assert!(!instance.permission.public);
        assert!(instance.links.is_empty());
    }

    #[test]
    fn links_are_matched_by_kind_and_id() {
        let mut instance: AppInstance = serde_yaml::from_str(
            r#"
id: "i2"
name: "serve"
app: "Serve"
project: "demo"
owner: "bob"
links:
  - { kind: data_model, id: "m1" }
"#,
        )
        .expect("instance");
        assert!(instance.links_to(&ObjectRef::data_model("m1")));
        assert!(!instance.links_to(&ObjectRef::app_instance("m1")));
        instance.links.clear();
        assert!(!instance.links_to(&ObjectRef::data_model("m1")));
    }

    #[test]
    fn image_reference_joins_repository() {
        let image = EnvironmentImage {
            id: "e1".into(),
            name: "Default".into(),
            repository: Some("registry.example.com/".into()),
            image: "lab:1.0".into(),
            ..Default::default()
        };
        assert_eq!(image.image_reference(), "registry.example.com/lab:1.0");
    }
}
