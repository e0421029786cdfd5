//! # Parameter Flattening
//!
//! App instances store the configuration they were submitted with as a nested
//! JSON record. Forms and release values address individual settings by a
//! dotted path instead (`permissions.public`, `appobj.lab`), so this module
//! converts between the two shapes.
//!
//! - [`flatten`] walks nested mappings and emits one entry per leaf, keyed by
//!   the separator-joined path. Arrays and empty mappings are leaves and are
//!   kept as single values.
//! - [`unflatten`] rebuilds the nested mapping from such entries.
//!
//! Flattening never drops keys silently: a record whose root is not a mapping,
//! that contains an empty key, or whose keys collapse onto the same flat path
//! fails with [`FlattenError::MalformedParameters`].

use std::collections::BTreeMap;

use serde::Serialize;
use serde_json::{Map as JsonMap, Value};
use thiserror::Error;

/// Separator used for parameter paths throughout the platform.
pub const DEFAULT_SEPARATOR: &str = ".";

/// Raised when a parameter record cannot be converted losslessly.
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum FlattenError {
    #[error("malformed parameters: {reason}")]
    MalformedParameters { reason: String },
}

impl FlattenError {
    pub fn malformed(reason: impl Into<String>) -> Self {
        Self::MalformedParameters { reason: reason.into() }
    }
}

/// Flat view of a parameter record, keyed by joined path.
#[derive(Debug, Clone, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct FlatParameters {
    entries: BTreeMap<String, Value>,
    #[serde(skip)]
    separator: String,
}

impl FlatParameters {
    /// Create an empty set of parameters using `separator` for joined lookups.
    pub fn new(separator: &str) -> Self {
        Self {
            entries: BTreeMap::new(),
            separator: separator.to_string(),
        }
    }

    /// Value stored at an already joined path.
    pub fn get(&self, path: &str) -> Option<&Value> {
        self.entries.get(path)
    }

    /// Value stored at the path formed by joining `segments` with the separator.
    pub fn get_segments(&self, segments: &[&str]) -> Option<&Value> {
        self.entries.get(&segments.join(&self.separator))
    }

    pub fn contains(&self, path: &str) -> bool {
        self.entries.contains_key(path)
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }

    pub fn separator(&self) -> &str {
        &self.separator
    }

    pub fn iter(&self) -> impl Iterator<Item = (&String, &Value)> {
        self.entries.iter()
    }

    /// Insert a leaf, returning an error when the path is already taken.
    pub fn insert(&mut self, path: String, value: Value) -> Result<(), FlattenError> {
        if self.entries.contains_key(&path) {
            return Err(FlattenError::malformed(format!("parameter path '{path}' is defined more than once")));
        }
        self.entries.insert(path, value);
        Ok(())
    }

    pub fn into_inner(self) -> BTreeMap<String, Value> {
        self.entries
    }
}

/// Flatten a nested parameter record into dotted-path entries.
///
/// `null` is treated as an empty record (an instance that was never
/// configured). Any other non-mapping root is malformed.
///
/// # Example
/// ```rust
/// use serde_json::json;
/// use studio_util::flatten::flatten;
///
/// let flat = flatten(&json!({"permissions": {"public": "false"}, "tags": ["a", "b"]}), ".").unwrap();
/// assert_eq!(flat.get("permissions.public"), Some(&json!("false")));
/// assert_eq!(flat.get("tags"), Some(&json!(["a", "b"])));
/// ```
pub fn flatten(record: &Value, separator: &str) -> Result<FlatParameters, FlattenError> {
    if separator.is_empty() {
        return Err(FlattenError::malformed("separator must not be empty"));
    }
    let mut flat = FlatParameters::new(separator);
    match record {
        Value::Null => {}
        Value::Object(map) => flatten_into(map, "", separator, &mut flat)?,
        other => {
            return Err(FlattenError::malformed(format!(
                "expected a mapping at the root, found {}",
                json_type_name(other)
            )));
        }
    }
    Ok(flat)
}

fn flatten_into(map: &JsonMap<String, Value>, prefix: &str, separator: &str, flat: &mut FlatParameters) -> Result<(), FlattenError> {
    for (key, value) in map {
        if key.is_empty() {
            let location = if prefix.is_empty() { "<root>" } else { prefix };
            return Err(FlattenError::malformed(format!("empty key under '{location}'")));
        }
        let path = if prefix.is_empty() {
            key.clone()
        } else {
            format!("{prefix}{separator}{key}")
        };
        match value {
            Value::Object(nested) if !nested.is_empty() => flatten_into(nested, &path, separator, flat)?,
            leaf => flat.insert(path, leaf.clone())?,
        }
    }
    Ok(())
}

/// Rebuild a nested mapping from `(path, value)` entries.
///
/// Entries that disagree about the shape of a prefix (a scalar at `a` and a
/// leaf at `a.b`) are malformed.
pub fn unflatten<I, K>(entries: I, separator: &str) -> Result<JsonMap<String, Value>, FlattenError>
where
    I: IntoIterator<Item = (K, Value)>,
    K: AsRef<str>,
{
    if separator.is_empty() {
        return Err(FlattenError::malformed("separator must not be empty"));
    }
    let mut root = JsonMap::new();
    for (path, value) in entries {
        let path = path.as_ref();
        let segments: Vec<&str> = path.split(separator).collect();
        if segments.iter().any(|segment| segment.is_empty()) {
            return Err(FlattenError::malformed(format!("parameter path '{path}' has an empty segment")));
        }
        insert_path(&mut root, &segments, value, path)?;
    }
    Ok(root)
}

fn insert_path(map: &mut JsonMap<String, Value>, segments: &[&str], value: Value, full_path: &str) -> Result<(), FlattenError> {
    let Some((head, rest)) = segments.split_first() else {
        return Ok(());
    };
    if rest.is_empty() {
        return match map.get(*head) {
            None => {
                map.insert((*head).to_string(), value);
                Ok(())
            }
            Some(Value::Object(_)) if value.as_object().is_some_and(JsonMap::is_empty) => Ok(()),
            Some(_) => Err(FlattenError::malformed(format!("parameter path '{full_path}' conflicts with another entry"))),
        };
    }
    let slot = map.entry((*head).to_string()).or_insert_with(|| Value::Object(JsonMap::new()));
    match slot {
        Value::Object(nested) => insert_path(nested, rest, value, full_path),
        _ => Err(FlattenError::malformed(format!(
            "parameter path '{full_path}' descends into non-mapping value at '{head}'"
        ))),
    }
}

fn json_type_name(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "a mapping",
    }
}
