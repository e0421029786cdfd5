use serde::Serialize;
use studio_types::{EnvironmentImage, Flavor};

use super::{DependencyResolver, FormContext, ResolvedKind};
use crate::error::ResolveError;
use crate::schema::{AppSchema, DependencyKind};

/// A platform-wide catalog. Items carry no selection state.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct CatalogDependency<T> {
    pub required: bool,
    pub choices: Vec<T>,
}

impl<T> Default for CatalogDependency<T> {
    fn default() -> Self {
        Self {
            required: false,
            choices: Vec::new(),
        }
    }
}

pub struct FlavorResolver;

impl DependencyResolver for FlavorResolver {
    fn kind(&self) -> DependencyKind {
        DependencyKind::Flavor
    }

    fn resolve(&self, schema: &AppSchema, context: &FormContext<'_>) -> Result<ResolvedKind, ResolveError> {
        let mut dependency = CatalogDependency::<Flavor>::default();
        if schema.requires(DependencyKind::Flavor) {
            dependency.required = true;
            dependency.choices = context.inventory.flavors()?;
        }
        Ok(ResolvedKind::Flavors(dependency))
    }
}

pub struct EnvironmentResolver;

impl DependencyResolver for EnvironmentResolver {
    fn kind(&self) -> DependencyKind {
        DependencyKind::Environment
    }

    fn resolve(&self, schema: &AppSchema, context: &FormContext<'_>) -> Result<ResolvedKind, ResolveError> {
        let mut dependency = CatalogDependency::<EnvironmentImage>::default();
        if schema.requires(DependencyKind::Environment) {
            dependency.required = true;
            dependency.choices = context.inventory.environments()?;
        }
        Ok(ResolvedKind::Environments(dependency))
    }
}
