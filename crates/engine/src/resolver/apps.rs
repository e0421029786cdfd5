use indexmap::IndexMap;
use serde::Serialize;
use serde_json::Value;
use studio_types::{AppInstance, InventoryFilter, LinkedAppPredicate, ObjectRef, VisibilityPredicate};
use studio_util::{DEFAULT_SEPARATOR, flatten};
use tracing::{debug, warn};

use super::{Choice, DependencyResolver, FormContext, ResolvedKind};
use crate::error::ResolveError;
use crate::schema::{AppSchema, DependencyKind, SelectMode};

/// Instances offered for one referenced app.
#[derive(Clone, Debug, PartialEq, Serialize)]
pub struct AppDependency {
    pub instances: Vec<Choice<AppInstance>>,
    pub option_type: SelectMode,
}

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct AppsDependency {
    pub required: bool,
    /// Keyed by referenced app name, in schema order.
    pub apps: IndexMap<String, AppDependency>,
}

/// Resolves instances of the apps named under `apps`.
///
/// Instances must be visible to the requesting user (owned, shared with the
/// project, or public). Dependencies on the `Environment` app are narrowed to
/// environments whose `appobj.<app slug>` marker is set.
pub struct AppInstanceResolver;

impl DependencyResolver for AppInstanceResolver {
    fn kind(&self) -> DependencyKind {
        DependencyKind::Apps
    }

    fn resolve(&self, schema: &AppSchema, context: &FormContext<'_>) -> Result<ResolvedKind, ResolveError> {
        let Some(referenced) = schema.apps() else {
            return Ok(ResolvedKind::Apps(AppsDependency::default()));
        };

        let mut apps = IndexMap::with_capacity(referenced.len());
        for (app_name, option_type) in referenced {
            let definition = context
                .inventory
                .app_definition(app_name)?
                .ok_or_else(|| ResolveError::AppNotFound { name: app_name.clone() })?;

            let filter = InventoryFilter::for_project(context.project)
                .with_app(definition.name.clone())
                .with_visibility(VisibilityPredicate::for_request(context.user, context.project));
            let mut instances = context.inventory.app_instances(&filter)?;
            if let Some(linked) = LinkedAppPredicate::for_dependency(&definition.name, context.app_slug) {
                let marker_path = linked.marker_path();
                instances.retain(|instance| linked.matches(instance, link_marker(instance, &marker_path).as_ref()));
                debug!(app = %definition.name, marker = %linked.marker_path(), "filtered instances by link marker");
            }

            let instances: Vec<Choice<AppInstance>> = instances
                .into_iter()
                .map(|instance| {
                    let selected = context.selects(&ObjectRef::app_instance(instance.id.clone()));
                    Choice::new(instance, selected)
                })
                .collect();
            debug!(app = %app_name, count = instances.len(), "resolved app instances");
            apps.insert(
                app_name.clone(),
                AppDependency {
                    instances,
                    option_type: *option_type,
                },
            );
        }
        Ok(ResolvedKind::Apps(AppsDependency { required: true, apps }))
    }
}

/// Value at `marker_path` in the instance's flattened parameters.
///
/// A record that cannot be flattened carries no marker.
fn link_marker(instance: &AppInstance, marker_path: &str) -> Option<Value> {
    match flatten(&instance.parameters, DEFAULT_SEPARATOR) {
        Ok(flat) => flat.get(marker_path).cloned(),
        Err(error) => {
            warn!(instance = %instance.id, %error, "ignoring instance with malformed parameters");
            None
        }
    }
}
