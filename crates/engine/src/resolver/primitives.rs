use indexmap::IndexMap;
use serde::Serialize;
use tracing::debug;

use super::{DependencyResolver, FormContext, ResolvedKind};
use crate::error::ResolveError;
use crate::schema::{AppSchema, DependencyKind, PrimitiveGroup};

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
#[serde(transparent)]
pub struct PrimitivesDependency {
    /// Field groups keyed by group name, in schema order.
    pub groups: IndexMap<String, PrimitiveGroup>,
}

impl PrimitivesDependency {
    pub fn required(&self) -> bool {
        !self.groups.is_empty()
    }
}

/// Copies primitive groups from the schema; when editing an instance, every
/// field default is replaced by the instance's value at `<group>.<field>`.
pub struct PrimitiveResolver;

impl DependencyResolver for PrimitiveResolver {
    fn kind(&self) -> DependencyKind {
        DependencyKind::Primitives
    }

    fn resolve(&self, schema: &AppSchema, context: &FormContext<'_>) -> Result<ResolvedKind, ResolveError> {
        let mut groups: IndexMap<String, PrimitiveGroup> =
            schema.primitive_groups().map(|(name, group)| (name.clone(), group.clone())).collect();
        if groups.is_empty() {
            return Ok(ResolvedKind::Primitives(PrimitivesDependency::default()));
        }

        let (Some(instance), Some(values)) = (context.instance, context.flattened_instance()?) else {
            return Ok(ResolvedKind::Primitives(PrimitivesDependency { groups }));
        };
        for (group_name, group) in groups.iter_mut() {
            for (field_name, field) in group.iter_mut() {
                let value = values
                    .get_segments(&[group_name.as_str(), field_name.as_str()])
                    .ok_or_else(|| ResolveError::IncompleteParameters {
                        instance: instance.id.clone(),
                        group: group_name.clone(),
                        field: field_name.clone(),
                        path: format!("{group_name}{}{field_name}", values.separator()),
                    })?;
                field.default = Some(value.clone());
            }
            debug!(group = %group_name, instance = %instance.id, "prefilled primitive group");
        }
        Ok(ResolvedKind::Primitives(PrimitivesDependency { groups }))
    }
}
