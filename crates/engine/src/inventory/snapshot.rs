use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use studio_types::{AppDefinition, AppInstance, DataModel, EnvironmentImage, Flavor, InventoryFilter};

use super::{InventoryError, InventoryLookup};

/// In-memory inventory.
///
/// Used by the CLI `form` command (loaded from an exported JSON/YAML
/// document) and by tests. Filters are evaluated with the predicates on
/// [`InventoryFilter`].
#[derive(Clone, Debug, Default, PartialEq, Serialize, Deserialize)]
pub struct InventorySnapshot {
    #[serde(default)]
    pub data_models: Vec<DataModel>,
    #[serde(default)]
    pub app_definitions: Vec<AppDefinition>,
    #[serde(default)]
    pub app_instances: Vec<AppInstance>,
    #[serde(default)]
    pub flavors: Vec<Flavor>,
    #[serde(default)]
    pub environments: Vec<EnvironmentImage>,
}

impl InventorySnapshot {
    /// Load a snapshot; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, InventoryError> {
        let path = path.as_ref();
        let load_error = |reason: String| InventoryError::Load {
            path: path.to_path_buf(),
            reason,
        };
        let text = fs::read_to_string(path).map_err(|error| load_error(error.to_string()))?;
        let is_json = path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        if is_json {
            serde_json::from_str(&text).map_err(|error| load_error(error.to_string()))
        } else {
            serde_yaml::from_str(&text).map_err(|error| load_error(error.to_string()))
        }
    }

    /// Instance with the given id.
    pub fn app_instance(&self, id: &str) -> Option<&AppInstance> {
        self.app_instances.iter().find(|instance| instance.id == id)
    }
}

impl InventoryLookup for InventorySnapshot {
    fn data_models(&self, filter: &InventoryFilter) -> Result<Vec<DataModel>, InventoryError> {
        Ok(self.data_models.iter().filter(|model| filter.matches_model(model)).cloned().collect())
    }

    fn app_definitions(&self) -> Result<Vec<AppDefinition>, InventoryError> {
        Ok(self.app_definitions.clone())
    }

    fn app_instances(&self, filter: &InventoryFilter) -> Result<Vec<AppInstance>, InventoryError> {
        Ok(self
            .app_instances
            .iter()
            .filter(|instance| filter.matches_instance(instance))
            .cloned()
            .collect())
    }

    fn flavors(&self) -> Result<Vec<Flavor>, InventoryError> {
        Ok(self.flavors.clone())
    }

    fn environments(&self) -> Result<Vec<EnvironmentImage>, InventoryError> {
        Ok(self.environments.clone())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SNAPSHOT_YAML: &str = r#"
data_models:
  - { id: "m1", name: "resnet", project: "demo" }
  - { id: "m2", name: "bert", project: "other" }
app_definitions:
  - { id: "1", name: "JupyterLab", slug: "lab" }
app_instances:
  - id: "10"
    name: "lab-alice"
    app: "JupyterLab"
    project: "demo"
    owner: "alice"
flavors:
  - { id: "f1", name: "small", cpu_req: "200m" }
"#;

    #[test]
    fn loads_yaml_and_filters_by_project() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.yaml");
        fs::write(&path, SNAPSHOT_YAML).unwrap();
        let snapshot = InventorySnapshot::from_path(&path).expect("snapshot");

        let models = snapshot.data_models(&InventoryFilter::for_project("demo")).unwrap();
        assert_eq!(models.len(), 1);
        assert_eq!(models[0].name, "resnet");
        assert!(snapshot.environments().unwrap().is_empty());
        assert_eq!(snapshot.app_definition("JupyterLab").unwrap().map(|app| app.slug), Some("lab".to_string()));
        assert!(snapshot.app_definition("Missing").unwrap().is_none());
        assert_eq!(snapshot.app_instance("10").map(|instance| instance.owner.as_str()), Some("alice"));
    }

    #[test]
    fn unmatched_lookups_are_empty_not_errors() {
        let snapshot = InventorySnapshot::default();
        assert!(snapshot.app_instances(&InventoryFilter::for_project("demo").with_app("X")).unwrap().is_empty());
    }

    #[test]
    fn invalid_documents_report_the_path() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("inventory.json");
        fs::write(&path, "{not json").unwrap();
        let err = InventorySnapshot::from_path(&path).unwrap_err();
        assert!(err.to_string().contains("inventory.json"));
    }
}
