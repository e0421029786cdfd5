//! Dependency resolvers, one per dependency kind.
//!
//! Modules:
//! - `model`: data models of the target project
//! - `apps`: instances of other apps, filtered by visibility and link markers
//! - `app_object`: the app catalog for self-reference selectors
//! - `catalog`: platform-wide flavor and environment catalogs
//! - `primitives`: primitive field groups, prefilled from an edited instance
//! - `permissions`: visibility settings, best effort from an edited instance
//!
//! Resolvers are stateless and only read from the [`FormContext`]; they
//! either return a fully populated [`ResolvedKind`] or a [`ResolveError`].

mod app_object;
mod apps;
mod catalog;
mod model;
mod permissions;
mod primitives;

pub use app_object::{AppObjectDependency, AppObjectResolver};
pub use apps::{AppDependency, AppInstanceResolver, AppsDependency};
pub use catalog::{CatalogDependency, EnvironmentResolver, FlavorResolver};
pub use model::{ModelDependency, ModelResolver};
pub use permissions::{PermissionResolver, PermissionsDependency};
pub use primitives::{PrimitiveResolver, PrimitivesDependency};

use serde::Serialize;
use studio_types::{AppInstance, EnvironmentImage, Flavor, ObjectRef};
use studio_util::{DEFAULT_SEPARATOR, FlatParameters, flatten};

use crate::error::ResolveError;
use crate::inventory::InventoryLookup;
use crate::schema::{AppSchema, DependencyKind};

/// Inputs shared by every resolver for one assembly.
#[derive(Clone, Copy)]
pub struct FormContext<'a> {
    /// Slug of the target project.
    pub project: &'a str,
    /// Requesting user.
    pub user: &'a str,
    /// Slug of the app whose form is being built.
    pub app_slug: &'a str,
    /// Instance being edited, if any.
    pub instance: Option<&'a AppInstance>,
    pub inventory: &'a dyn InventoryLookup,
}

impl<'a> FormContext<'a> {
    pub fn new(inventory: &'a dyn InventoryLookup, project: &'a str, user: &'a str, app_slug: &'a str) -> Self {
        Self {
            project,
            user,
            app_slug,
            instance: None,
            inventory,
        }
    }

    pub fn with_instance(mut self, instance: Option<&'a AppInstance>) -> Self {
        self.instance = instance;
        self
    }

    /// True when the edited instance was configured with `object`.
    pub fn selects(&self, object: &ObjectRef) -> bool {
        self.instance.is_some_and(|instance| instance.links_to(object))
    }

    /// Flattened parameters of the edited instance.
    pub fn flattened_instance(&self) -> Result<Option<FlatParameters>, ResolveError> {
        let Some(instance) = self.instance else {
            return Ok(None);
        };
        flatten(&instance.parameters, DEFAULT_SEPARATOR)
            .map(Some)
            .map_err(|source| ResolveError::MalformedParameters {
                instance: instance.id.clone(),
                source,
            })
    }
}

/// A catalog item together with whether the edited instance selected it.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct Choice<T> {
    #[serde(flatten)]
    pub item: T,
    pub selected: bool,
}

impl<T> Choice<T> {
    pub fn new(item: T, selected: bool) -> Self {
        Self { item, selected }
    }
}

/// Output of one resolver.
#[derive(Clone, Debug, PartialEq)]
pub enum ResolvedKind {
    Models(ModelDependency),
    Apps(AppsDependency),
    AppObject(AppObjectDependency),
    Flavors(CatalogDependency<Flavor>),
    Environments(CatalogDependency<EnvironmentImage>),
    Primitives(PrimitivesDependency),
    Permissions(PermissionsDependency),
}

pub trait DependencyResolver: Send + Sync {
    fn kind(&self) -> DependencyKind;
    fn resolve(&self, schema: &AppSchema, context: &FormContext<'_>) -> Result<ResolvedKind, ResolveError>;
}
