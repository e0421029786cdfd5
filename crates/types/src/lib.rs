//! Shared domain types for the studio client and engine.
//!
//! The types in this crate describe the platform objects that the form
//! engine resolves against (data models, app definitions, app instances,
//! compute flavors, environment images) plus the selector values used to
//! query an inventory of those objects.

mod objects;
mod visibility;

pub use objects::{
    AppDefinition, AppInstance, DataModel, EnvironmentImage, Flavor, InstancePermission, ObjectKind, ObjectRef, ParseObjectKindError,
};
pub use visibility::{InventoryFilter, LinkedAppPredicate, VisibilityPredicate};
