//! Inventory lookup boundary.
//!
//! Modules:
//! - `snapshot`: in-memory inventory loaded from a JSON/YAML document
//! - `null`: empty inventory for tests and disabled scenarios
//!
//! Storage backends implement [`InventoryLookup`]. Lookups receive selector
//! values ([`InventoryFilter`]) rather than query text, and must return an
//! empty sequence when nothing matches.

mod null;
mod snapshot;

pub use null::NullInventory;
pub use snapshot::InventorySnapshot;

use std::path::PathBuf;

use studio_types::{AppDefinition, AppInstance, DataModel, EnvironmentImage, Flavor, InventoryFilter, ObjectKind};
use thiserror::Error;

#[derive(Debug, Error)]
pub enum InventoryError {
    #[error("inventory lookup for {kind} failed: {reason}")]
    Unavailable { kind: ObjectKind, reason: String },
    #[error("failed to load inventory from {path}: {reason}")]
    Load { path: PathBuf, reason: String },
}

impl InventoryError {
    pub fn unavailable(kind: ObjectKind, reason: impl Into<String>) -> Self {
        Self::Unavailable {
            kind,
            reason: reason.into(),
        }
    }
}

/// Read-only access to the platform objects a form resolves against.
pub trait InventoryLookup: Send + Sync {
    /// Data models matching `filter` (the form engine filters by project only).
    fn data_models(&self, filter: &InventoryFilter) -> Result<Vec<DataModel>, InventoryError>;

    /// The full catalog of app definitions.
    fn app_definitions(&self) -> Result<Vec<AppDefinition>, InventoryError>;

    fn app_instances(&self, filter: &InventoryFilter) -> Result<Vec<AppInstance>, InventoryError>;

    /// Platform-wide compute flavors.
    fn flavors(&self) -> Result<Vec<Flavor>, InventoryError>;

    /// Platform-wide environment images.
    fn environments(&self) -> Result<Vec<EnvironmentImage>, InventoryError>;

    /// App definition called `name`, if any.
    fn app_definition(&self, name: &str) -> Result<Option<AppDefinition>, InventoryError> {
        Ok(self.app_definitions()?.into_iter().find(|app| app.name == name))
    }
}
