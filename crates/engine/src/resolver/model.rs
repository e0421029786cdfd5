use serde::Serialize;
use studio_types::{DataModel, InventoryFilter, ObjectRef};
use tracing::debug;

use super::{Choice, DependencyResolver, FormContext, ResolvedKind};
use crate::error::ResolveError;
use crate::schema::{AppSchema, DependencyKind};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ModelDependency {
    pub required: bool,
    pub choices: Vec<Choice<DataModel>>,
}

/// Offers every data model of the target project; no ownership filter.
pub struct ModelResolver;

impl DependencyResolver for ModelResolver {
    fn kind(&self) -> DependencyKind {
        DependencyKind::Model
    }

    fn resolve(&self, schema: &AppSchema, context: &FormContext<'_>) -> Result<ResolvedKind, ResolveError> {
        if !schema.requires(DependencyKind::Model) {
            return Ok(ResolvedKind::Models(ModelDependency::default()));
        }
        let models = context.inventory.data_models(&InventoryFilter::for_project(context.project))?;
        let choices: Vec<Choice<DataModel>> = models
            .into_iter()
            .map(|model| {
                let selected = context.selects(&ObjectRef::data_model(model.id.clone()));
                Choice::new(model, selected)
            })
            .collect();
        debug!(project = context.project, count = choices.len(), "resolved data models");
        Ok(ResolvedKind::Models(ModelDependency { required: true, choices }))
    }
}
