//! App dependency schemas.
//!
//! Every app definition declares the inputs it needs as a mapping from a
//! dependency kind to a kind specific descriptor:
//!
//! ```yaml
//! model: {}
//! apps:
//!   JupyterLab: one
//! appobj: { title: Serve, type: select }
//! flavor: {}
//! permissions:
//!   public: { value: "false", option: "false" }
//! customField:
//!   threshold: { default: 10, type: number }
//! ```
//!
//! Keys outside the reserved set are primitive field groups; they are never
//! dropped. The document is parsed once into [`AppSchema`], a tagged union
//! per key, so resolvers dispatch on variants instead of inspecting raw JSON.

use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use indexmap::IndexMap;
use serde::{Serialize, Serializer};
use serde_json::{Map as JsonMap, Value};
use thiserror::Error;

/// Categories of dependency an app schema can declare.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum DependencyKind {
    Model,
    Apps,
    AppObject,
    Flavor,
    Environment,
    Volumes,
    Logs,
    Permissions,
    Primitives,
}

impl DependencyKind {
    /// Kinds with a fixed schema key, in resolution order.
    pub const RESERVED: [DependencyKind; 8] = [
        Self::Model,
        Self::Apps,
        Self::AppObject,
        Self::Flavor,
        Self::Environment,
        Self::Volumes,
        Self::Logs,
        Self::Permissions,
    ];

    /// Schema key for reserved kinds; primitive groups use their own names.
    pub fn schema_key(&self) -> &'static str {
        match self {
            Self::Model => "model",
            Self::Apps => "apps",
            Self::AppObject => "appobj",
            Self::Flavor => "flavor",
            Self::Environment => "environment",
            Self::Volumes => "volumes",
            Self::Logs => "logs",
            Self::Permissions => "permissions",
            Self::Primitives => "primitives",
        }
    }

    pub fn from_schema_key(key: &str) -> Option<Self> {
        Self::RESERVED.into_iter().find(|kind| kind.schema_key() == key)
    }
}

impl fmt::Display for DependencyKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.schema_key())
    }
}

/// Cardinality of an app-instance dependency.
#[derive(Clone, Copy, Debug, Default, Hash, Eq, PartialEq)]
pub enum SelectMode {
    Single,
    #[default]
    Multiple,
}

impl SelectMode {
    /// `"one"` selects a single instance; any other marker allows several.
    pub fn from_marker(marker: &Value) -> Self {
        match marker {
            Value::String(text) if text == "one" => Self::Single,
            _ => Self::Multiple,
        }
    }

    /// Marker handed to the renderer: empty for single, `"multiple"` otherwise.
    pub fn as_marker(&self) -> &'static str {
        match self {
            Self::Single => "",
            Self::Multiple => "multiple",
        }
    }
}

impl Serialize for SelectMode {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(self.as_marker())
    }
}

/// Labels for the self-reference selector.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize)]
pub struct AppObjectSpec {
    pub title: String,
    #[serde(rename = "type")]
    pub selector_type: String,
}

/// One visibility scope of the permission settings.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PermissionScope {
    /// Currently chosen value.
    #[serde(serialize_with = "bool_as_text")]
    pub value: bool,
    /// Value offered by the schema.
    #[serde(serialize_with = "bool_as_text")]
    pub option: bool,
}

impl PermissionScope {
    pub const fn fixed(value: bool) -> Self {
        Self { value, option: value }
    }
}

fn bool_as_text<S: Serializer>(flag: &bool, serializer: S) -> Result<S::Ok, S::Error> {
    serializer.serialize_str(if *flag { "true" } else { "false" })
}

/// Names of the three visibility scopes.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum PermissionScopeName {
    Public,
    Project,
    Private,
}

impl PermissionScopeName {
    pub const ALL: [PermissionScopeName; 3] = [Self::Public, Self::Project, Self::Private];

    pub fn as_str(&self) -> &'static str {
        match self {
            Self::Public => "public",
            Self::Project => "project",
            Self::Private => "private",
        }
    }
}

/// Permission settings; defaults to private only.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Serialize)]
pub struct PermissionSet {
    pub public: PermissionScope,
    pub project: PermissionScope,
    pub private: PermissionScope,
}

impl Default for PermissionSet {
    fn default() -> Self {
        Self {
            public: PermissionScope::fixed(false),
            project: PermissionScope::fixed(false),
            private: PermissionScope::fixed(true),
        }
    }
}

impl PermissionSet {
    pub fn scope(&self, name: PermissionScopeName) -> &PermissionScope {
        match name {
            PermissionScopeName::Public => &self.public,
            PermissionScopeName::Project => &self.project,
            PermissionScopeName::Private => &self.private,
        }
    }

    pub fn scope_mut(&mut self, name: PermissionScopeName) -> &mut PermissionScope {
        match name {
            PermissionScopeName::Public => &mut self.public,
            PermissionScopeName::Project => &mut self.project,
            PermissionScopeName::Private => &mut self.private,
        }
    }
}

/// Descriptor of a single primitive field.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PrimitiveField {
    #[serde(skip_serializing_if = "Option::is_none")]
    pub default: Option<Value>,
    #[serde(rename = "type", skip_serializing_if = "Option::is_none")]
    pub field_type: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,
    /// Any other descriptor keys, passed through to the renderer.
    #[serde(flatten)]
    pub extra: IndexMap<String, Value>,
}

impl PrimitiveField {
    fn from_descriptor(descriptor: &Value) -> Self {
        let Value::Object(map) = descriptor else {
            return Self {
                default: Some(descriptor.clone()),
                ..Self::default()
            };
        };
        let mut field = Self::default();
        for (key, value) in map {
            match (key.as_str(), value) {
                ("default", value) => field.default = Some(value.clone()),
                ("type", Value::String(text)) => field.field_type = Some(text.clone()),
                ("title", Value::String(text)) => field.title = Some(text.clone()),
                (other, value) => {
                    field.extra.insert(other.to_string(), value.clone());
                }
            }
        }
        field
    }
}

/// Fields of one primitive group, in declaration order.
pub type PrimitiveGroup = IndexMap<String, PrimitiveField>;

/// Parsed value of one schema key.
#[derive(Clone, Debug, PartialEq)]
pub enum SchemaEntry {
    Model,
    Apps(IndexMap<String, SelectMode>),
    AppObject(AppObjectSpec),
    Flavor,
    Environment,
    /// `volumes` / `logs`: reserved keys that are accepted but not resolved.
    Reserved(DependencyKind),
    Permissions(PermissionSet),
    Primitives(PrimitiveGroup),
}

impl SchemaEntry {
    pub fn kind(&self) -> DependencyKind {
        match self {
            Self::Model => DependencyKind::Model,
            Self::Apps(_) => DependencyKind::Apps,
            Self::AppObject(_) => DependencyKind::AppObject,
            Self::Flavor => DependencyKind::Flavor,
            Self::Environment => DependencyKind::Environment,
            Self::Reserved(kind) => *kind,
            Self::Permissions(_) => DependencyKind::Permissions,
            Self::Primitives(_) => DependencyKind::Primitives,
        }
    }
}

#[derive(Debug, Error)]
pub enum SchemaError {
    #[error("failed to read schema file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },
    #[error("invalid {format} schema: {reason}")]
    Parse { format: &'static str, reason: String },
    #[error("schema must be a mapping of dependency kinds")]
    NotAMapping,
    #[error("invalid schema entry '{key}': {reason}")]
    InvalidEntry { key: String, reason: String },
}

impl SchemaError {
    fn invalid(key: &str, reason: impl Into<String>) -> Self {
        Self::InvalidEntry {
            key: key.to_string(),
            reason: reason.into(),
        }
    }
}

/// An app's dependency schema.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct AppSchema {
    entries: IndexMap<String, SchemaEntry>,
}

impl AppSchema {
    pub fn from_value(document: &Value) -> Result<Self, SchemaError> {
        let map = match document {
            Value::Object(map) => map,
            Value::Null => return Ok(Self::default()),
            _ => return Err(SchemaError::NotAMapping),
        };
        let mut entries = IndexMap::with_capacity(map.len());
        for (key, value) in map {
            entries.insert(key.clone(), parse_entry(key, value)?);
        }
        Ok(Self { entries })
    }

    pub fn from_json_str(text: &str) -> Result<Self, SchemaError> {
        let document: Value = serde_json::from_str(text).map_err(|error| SchemaError::Parse {
            format: "JSON",
            reason: error.to_string(),
        })?;
        Self::from_value(&document)
    }

    pub fn from_yaml_str(text: &str) -> Result<Self, SchemaError> {
        let document: Value = serde_yaml::from_str(text).map_err(|error| SchemaError::Parse {
            format: "YAML",
            reason: error.to_string(),
        })?;
        Self::from_value(&document)
    }

    /// Load a schema file; `.json` files are parsed as JSON, anything else as YAML.
    pub fn from_path(path: impl AsRef<Path>) -> Result<Self, SchemaError> {
        let path = path.as_ref();
        let text = fs::read_to_string(path).map_err(|source| SchemaError::Io {
            path: path.to_path_buf(),
            source,
        })?;
        if is_json_path(path) {
            Self::from_json_str(&text)
        } else {
            Self::from_yaml_str(&text)
        }
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn entries(&self) -> impl Iterator<Item = (&String, &SchemaEntry)> {
        self.entries.iter()
    }

    /// True when the schema declares `kind` (for primitives: any group).
    pub fn requires(&self, kind: DependencyKind) -> bool {
        self.entries.values().any(|entry| entry.kind() == kind)
    }

    pub fn apps(&self) -> Option<&IndexMap<String, SelectMode>> {
        self.entries.values().find_map(|entry| match entry {
            SchemaEntry::Apps(apps) => Some(apps),
            _ => None,
        })
    }

    pub fn app_object(&self) -> Option<&AppObjectSpec> {
        self.entries.values().find_map(|entry| match entry {
            SchemaEntry::AppObject(spec) => Some(spec),
            _ => None,
        })
    }

    pub fn permissions(&self) -> Option<&PermissionSet> {
        self.entries.values().find_map(|entry| match entry {
            SchemaEntry::Permissions(permissions) => Some(permissions),
            _ => None,
        })
    }

    pub fn primitive_groups(&self) -> impl Iterator<Item = (&String, &PrimitiveGroup)> {
        self.entries.iter().filter_map(|(name, entry)| match entry {
            SchemaEntry::Primitives(group) => Some((name, group)),
            _ => None,
        })
    }
}

fn is_json_path(path: &Path) -> bool {
    path.extension().and_then(|ext| ext.to_str()).is_some_and(|ext| ext.eq_ignore_ascii_case("json"))
}

fn parse_entry(key: &str, value: &Value) -> Result<SchemaEntry, SchemaError> {
    let Some(kind) = DependencyKind::from_schema_key(key) else {
        return parse_primitive_group(key, value).map(SchemaEntry::Primitives);
    };
    match kind {
        DependencyKind::Model => Ok(SchemaEntry::Model),
        DependencyKind::Flavor => Ok(SchemaEntry::Flavor),
        DependencyKind::Environment => Ok(SchemaEntry::Environment),
        DependencyKind::Volumes | DependencyKind::Logs => Ok(SchemaEntry::Reserved(kind)),
        DependencyKind::Apps => parse_apps(key, value).map(SchemaEntry::Apps),
        DependencyKind::AppObject => parse_app_object(key, value).map(SchemaEntry::AppObject),
        DependencyKind::Permissions => parse_permissions(key, value).map(SchemaEntry::Permissions),
        DependencyKind::Primitives => parse_primitive_group(key, value).map(SchemaEntry::Primitives),
    }
}

fn expect_mapping<'a>(key: &str, value: &'a Value) -> Result<&'a JsonMap<String, Value>, SchemaError> {
    value.as_object().ok_or_else(|| SchemaError::invalid(key, "expected a mapping"))
}

fn parse_apps(key: &str, value: &Value) -> Result<IndexMap<String, SelectMode>, SchemaError> {
    if value.is_null() {
        return Ok(IndexMap::new());
    }
    Ok(expect_mapping(key, value)?
        .iter()
        .map(|(app_name, marker)| (app_name.clone(), SelectMode::from_marker(marker)))
        .collect())
}

fn parse_app_object(key: &str, value: &Value) -> Result<AppObjectSpec, SchemaError> {
    if value.is_null() {
        return Ok(AppObjectSpec::default());
    }
    let map = expect_mapping(key, value)?;
    let label = |name: &str| match map.get(name) {
        None | Some(Value::Null) => Ok(String::new()),
        Some(Value::String(text)) => Ok(text.clone()),
        Some(_) => Err(SchemaError::invalid(key, format!("'{name}' must be a string"))),
    };
    Ok(AppObjectSpec {
        title: label("title")?,
        selector_type: label("type")?,
    })
}

fn is_falsy(value: &Value) -> bool {
    match value {
        Value::Null => true,
        Value::Bool(flag) => !flag,
        Value::String(text) => text.is_empty(),
        Value::Object(map) => map.is_empty(),
        Value::Array(items) => items.is_empty(),
        Value::Number(_) => false,
    }
}

/// Accepts `true`/`false` or their string forms.
pub(crate) fn parse_flag(value: &Value) -> Option<bool> {
    match value {
        Value::Bool(flag) => Some(*flag),
        Value::String(text) if text.eq_ignore_ascii_case("true") => Some(true),
        Value::String(text) if text.eq_ignore_ascii_case("false") => Some(false),
        _ => None,
    }
}

fn parse_permissions(key: &str, value: &Value) -> Result<PermissionSet, SchemaError> {
    let mut permissions = PermissionSet::default();
    if is_falsy(value) {
        return Ok(permissions);
    }
    let map = expect_mapping(key, value)?;
    for name in PermissionScopeName::ALL {
        let Some(descriptor) = map.get(name.as_str()) else {
            continue;
        };
        let scope = permissions.scope_mut(name);
        let read = |field: &str| -> Result<Option<bool>, SchemaError> {
            match descriptor.get(field) {
                None | Some(Value::Null) => Ok(None),
                Some(flag) => parse_flag(flag)
                    .map(Some)
                    .ok_or_else(|| SchemaError::invalid(key, format!("'{}.{field}' must be true or false", name.as_str()))),
            }
        };
        if let Some(value) = read("value")? {
            scope.value = value;
        }
        if let Some(option) = read("option")? {
            scope.option = option;
        }
    }
    Ok(permissions)
}

fn parse_primitive_group(key: &str, value: &Value) -> Result<PrimitiveGroup, SchemaError> {
    let map = value
        .as_object()
        .ok_or_else(|| SchemaError::invalid(key, "primitive field groups must be a mapping of field name to descriptor"))?;
    Ok(map
        .iter()
        .map(|(field, descriptor)| (field.clone(), PrimitiveField::from_descriptor(descriptor)))
        .collect())
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn parses_every_reserved_kind_and_keeps_unknown_keys() {
        let schema = AppSchema::from_value(&json!({
            "model": {},
            "apps": {"JupyterLab": "one", "Serve": "many"},
            "appobj": {"title": "Serve", "type": "select"},
            "flavor": {},
            "environment": {},
            "volumes": {},
            "logs": ["a"],
            "permissions": {},
            "customField": {"threshold": {"default": 10, "type": "number"}}
        }))
        .expect("schema");

        let kinds: Vec<DependencyKind> = schema.entries().map(|(_, entry)| entry.kind()).collect();
        assert_eq!(
            kinds,
            vec![
                DependencyKind::Model,
                DependencyKind::Apps,
                DependencyKind::AppObject,
                DependencyKind::Flavor,
                DependencyKind::Environment,
                DependencyKind::Volumes,
                DependencyKind::Logs,
                DependencyKind::Permissions,
                DependencyKind::Primitives,
            ]
        );
        let apps = schema.apps().expect("apps");
        assert_eq!(apps["JupyterLab"], SelectMode::Single);
        assert_eq!(apps["Serve"], SelectMode::Multiple);
        assert_eq!(schema.app_object().map(|spec| spec.title.as_str()), Some("Serve"));
        assert_eq!(schema.permissions(), Some(&PermissionSet::default()));
        let (name, group) = schema.primitive_groups().next().expect("group");
        assert_eq!(name, "customField");
        assert_eq!(group["threshold"].default, Some(json!(10)));
        assert_eq!(group["threshold"].field_type.as_deref(), Some("number"));
    }

    #[test]
    fn select_mode_markers() {
        assert_eq!(SelectMode::from_marker(&json!("one")).as_marker(), "");
        assert_eq!(SelectMode::from_marker(&json!("many")).as_marker(), "multiple");
        assert_eq!(SelectMode::from_marker(&json!(1)).as_marker(), "multiple");
        assert_eq!(serde_json::to_value(SelectMode::Single).unwrap(), json!(""));
    }

    #[test]
    fn permissions_accept_booleans_and_strings() {
        let schema = AppSchema::from_value(&json!({
            "permissions": {
                "public": {"value": "true", "option": true},
                "project": {"value": false, "option": "true"}
            }
        }))
        .expect("schema");
        let permissions = schema.permissions().expect("permissions");
        assert_eq!(permissions.public, PermissionScope::fixed(true));
        assert_eq!(permissions.project, PermissionScope { value: false, option: true });
        assert_eq!(permissions.private, PermissionScope::fixed(true));
        assert_eq!(
            serde_json::to_value(permissions.private).unwrap(),
            json!({"value": "true", "option": "true"})
        );

        let err = AppSchema::from_value(&json!({"permissions": {"public": {"value": "maybe"}}})).unwrap_err();
        assert!(err.to_string().contains("public.value"));
    }

    #[test]
    fn scalar_field_descriptors_are_defaults() {
        let schema = AppSchema::from_value(&json!({"resources": {"replicas": 2, "image": {"default": "x", "help": "h"}}})).expect("schema");
        let (_, group) = schema.primitive_groups().next().expect("group");
        assert_eq!(group["replicas"].default, Some(json!(2)));
        assert_eq!(group["image"].extra.get("help"), Some(&json!("h")));
        assert_eq!(serde_json::to_value(&group["image"]).unwrap(), json!({"default": "x", "help": "h"}));
    }

    #[test]
    fn rejects_non_mapping_documents_and_groups() {
        assert!(matches!(AppSchema::from_value(&json!([1])), Err(SchemaError::NotAMapping)));
        let err = AppSchema::from_value(&json!({"customField": 3})).unwrap_err();
        assert!(matches!(err, SchemaError::InvalidEntry { ref key, .. } if key == "customField"));
        assert!(AppSchema::from_value(&json!({"apps": "JupyterLab"})).is_err());
    }

    #[test]
    fn loads_yaml_and_json_files() {
        let dir = tempfile::tempdir().unwrap();
        let yaml_path = dir.path().join("schema.yaml");
        fs::write(&yaml_path, "model: {}\nflavor: {}\n").unwrap();
        let schema = AppSchema::from_path(&yaml_path).expect("yaml schema");
        assert!(schema.requires(DependencyKind::Model));
        assert!(!schema.requires(DependencyKind::Apps));

        let json_path = dir.path().join("schema.json");
        fs::write(&json_path, r#"{"apps": {"Environment": "one"}}"#).unwrap();
        assert!(AppSchema::from_path(&json_path).expect("json schema").requires(DependencyKind::Apps));

        assert!(matches!(AppSchema::from_path(dir.path().join("missing.yaml")), Err(SchemaError::Io { .. })));
    }
}
