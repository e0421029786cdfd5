use serde::Serialize;
use studio_types::AppInstance;
use studio_util::{DEFAULT_SEPARATOR, flatten};
use tracing::warn;

use super::{DependencyResolver, FormContext, ResolvedKind};
use crate::error::{FormWarning, ResolveError};
use crate::schema::{AppSchema, DependencyKind, PermissionScopeName, PermissionSet, parse_flag};

/// Group holding the stored permission values in an instance record.
const PERMISSIONS_GROUP: &str = "permissions";

#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct PermissionsDependency {
    pub required: bool,
    pub permissions: PermissionSet,
    /// Set when the edited instance's values could not be used.
    #[serde(skip)]
    pub warning: Option<FormWarning>,
}

/// Starts from the schema (or private-only defaults) and applies the edited
/// instance's `permissions.public`, `permissions.project` and
/// `permissions.private` values. Unreadable values never fail the form.
pub struct PermissionResolver;

impl DependencyResolver for PermissionResolver {
    fn kind(&self) -> DependencyKind {
        DependencyKind::Permissions
    }

    fn resolve(&self, schema: &AppSchema, context: &FormContext<'_>) -> Result<ResolvedKind, ResolveError> {
        let Some(declared) = schema.permissions() else {
            return Ok(ResolvedKind::Permissions(PermissionsDependency::default()));
        };
        let mut permissions = *declared;
        let mut warning = None;
        if let Some(instance) = context.instance {
            match stored_permissions(instance) {
                Ok(values) => {
                    for (name, value) in PermissionScopeName::ALL.into_iter().zip(values) {
                        permissions.scope_mut(name).value = value;
                    }
                }
                Err(reason) => {
                    let condition = FormWarning::PermissionParse {
                        instance: instance.id.clone(),
                        reason,
                    };
                    warn!(%condition, "falling back to declared permissions");
                    warning = Some(condition);
                }
            }
        }
        Ok(ResolvedKind::Permissions(PermissionsDependency {
            required: true,
            permissions,
            warning,
        }))
    }
}

/// Reads all three scopes or none.
fn stored_permissions(instance: &AppInstance) -> Result<[bool; 3], String> {
    let flat = flatten(&instance.parameters, DEFAULT_SEPARATOR).map_err(|error| error.to_string())?;
    let mut values = [false; 3];
    for (slot, name) in values.iter_mut().zip(PermissionScopeName::ALL) {
        let raw = flat
            .get_segments(&[PERMISSIONS_GROUP, name.as_str()])
            .ok_or_else(|| format!("'{PERMISSIONS_GROUP}.{}' is not set", name.as_str()))?;
        *slot = parse_flag(raw).ok_or_else(|| format!("'{PERMISSIONS_GROUP}.{}' is not a boolean: {raw}", name.as_str()))?;
    }
    Ok(values)
}
