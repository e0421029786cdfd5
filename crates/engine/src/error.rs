use serde::Serialize;
use studio_util::FlattenError;
use thiserror::Error;

use crate::inventory::InventoryError;
use crate::schema::DependencyKind;

/// Hard failure of a single dependency resolver.
#[derive(Debug, Error)]
pub enum ResolveError {
    #[error("app '{name}' is not in the app catalog")]
    AppNotFound { name: String },

    #[error("parameters of app instance '{instance}' are malformed: {source}")]
    MalformedParameters {
        instance: String,
        #[source]
        source: FlattenError,
    },

    #[error("app instance '{instance}' has no value for field '{field}' of group '{group}' (expected at '{path}')")]
    IncompleteParameters {
        instance: String,
        group: String,
        field: String,
        path: String,
    },

    #[error(transparent)]
    InventoryUnavailable(#[from] InventoryError),
}

/// Assembly aborted by a resolver; names the kind that failed.
#[derive(Debug, Error)]
#[error("failed to resolve {kind} dependency: {source}")]
pub struct AssemblyError {
    pub kind: DependencyKind,
    #[source]
    pub source: ResolveError,
}

impl AssemblyError {
    pub fn new(kind: DependencyKind, source: ResolveError) -> Self {
        Self { kind, source }
    }
}

/// Recoverable condition reported alongside a resolved form.
#[derive(Clone, Debug, PartialEq, Eq, Serialize)]
#[serde(tag = "warning", rename_all = "snake_case")]
pub enum FormWarning {
    /// The instance's permission values could not be read; defaults were used.
    PermissionParse { instance: String, reason: String },
}

impl std::fmt::Display for FormWarning {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::PermissionParse { instance, reason } => {
                write!(f, "permissions of app instance '{instance}' could not be read ({reason}); using defaults")
            }
        }
    }
}
