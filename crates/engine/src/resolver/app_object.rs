use serde::Serialize;
use studio_types::AppDefinition;

use super::{DependencyResolver, FormContext, ResolvedKind};
use crate::error::ResolveError;
use crate::schema::{AppSchema, DependencyKind};

/// Self-reference selector: the app catalog plus the schema's labels.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AppObjectDependency {
    pub required: bool,
    pub title: String,
    #[serde(rename = "type")]
    pub selector_type: String,
    pub choices: Vec<AppDefinition>,
}

pub struct AppObjectResolver;

impl DependencyResolver for AppObjectResolver {
    fn kind(&self) -> DependencyKind {
        DependencyKind::AppObject
    }

    fn resolve(&self, schema: &AppSchema, context: &FormContext<'_>) -> Result<ResolvedKind, ResolveError> {
        let Some(spec) = schema.app_object() else {
            return Ok(ResolvedKind::AppObject(AppObjectDependency::default()));
        };
        Ok(ResolvedKind::AppObject(AppObjectDependency {
            required: true,
            title: spec.title.clone(),
            selector_type: spec.selector_type.clone(),
            choices: context.inventory.app_definitions()?,
        }))
    }
}
