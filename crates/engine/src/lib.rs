//! # Studio Engine
//!
//! The engine builds the configuration form of a deployable app from the
//! app's dependency schema, and installs or removes the resulting releases.
//!
//! ## Usage
//!
//! ```rust
//! use studio_engine::{AppSchema, FormContext, InventorySnapshot, assemble};
//!
//! let schema = AppSchema::from_json_str(r#"{"model": {}, "flavor": {}}"#)?;
//! let inventory = InventorySnapshot::default();
//! let context = FormContext::new(&inventory, "demo", "alice", "lab");
//! let form = assemble(&schema, &context)?;
//! assert!(form.required().model);
//! assert!(!form.required().apps);
//! # Ok::<(), Box<dyn std::error::Error>>(())
//! ```
//!
//! ## Architecture
//!
//! - **`schema`**: tagged union over the dependency kinds of a schema document
//! - **`inventory`**: lookup boundary for platform objects, plus an in-memory snapshot
//! - **`resolver`**: one resolver per dependency kind
//! - **`form`**: the assembler that runs the resolvers and merges their output
//! - **`release`**: packaging tool invocation for install/remove

pub mod error;
pub mod form;
pub mod inventory;
pub mod release;
pub mod resolver;
pub mod schema;

pub use error::{AssemblyError, FormWarning, ResolveError};
pub use form::{FormAssembler, RequiredKinds, ResolvedForm, assemble};
pub use inventory::{InventoryError, InventoryLookup, InventorySnapshot, NullInventory};
pub use release::{HelmReleaseController, HelmSettings, ReleaseController, ReleaseError, ReleaseOutcome, ReleaseRequest};
pub use resolver::{
    AppDependency, AppObjectDependency, AppsDependency, CatalogDependency, Choice, DependencyResolver, FormContext, ModelDependency,
    PermissionsDependency, PrimitivesDependency, ResolvedKind,
};
pub use schema::{
    AppObjectSpec, AppSchema, DependencyKind, PermissionScope, PermissionScopeName, PermissionSet, PrimitiveField, PrimitiveGroup, SchemaEntry,
    SchemaError, SelectMode,
};
