//! Form assembly.
//!
//! [`FormAssembler`] runs every resolver against one schema in a fixed order
//! (model, app instances, app object, flavor, environment, primitive fields,
//! permissions) and merges the results into a [`ResolvedForm`]. The first
//! resolver failure aborts assembly; no partially built form is returned.

use serde::Serialize;
use studio_types::{EnvironmentImage, Flavor};
use tracing::debug;

use crate::error::{AssemblyError, FormWarning};
use crate::resolver::{
    AppInstanceResolver, AppObjectDependency, AppObjectResolver, AppsDependency, CatalogDependency, DependencyResolver, EnvironmentResolver,
    FlavorResolver, FormContext, ModelDependency, ModelResolver, PermissionResolver, PermissionsDependency, PrimitiveResolver,
    PrimitivesDependency, ResolvedKind,
};
use crate::schema::{AppSchema, DependencyKind};

/// Everything a renderer needs to present an app's configuration form.
#[derive(Clone, Debug, Default, PartialEq, Serialize)]
pub struct ResolvedForm {
    pub model: ModelDependency,
    pub apps: AppsDependency,
    pub appobj: AppObjectDependency,
    pub flavor: CatalogDependency<Flavor>,
    pub environment: CatalogDependency<EnvironmentImage>,
    pub primitives: PrimitivesDependency,
    pub permissions: PermissionsDependency,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub warnings: Vec<FormWarning>,
}

/// Whether the schema requires each dependency kind.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize)]
pub struct RequiredKinds {
    pub model: bool,
    pub apps: bool,
    pub appobj: bool,
    pub flavor: bool,
    pub environment: bool,
    pub primitives: bool,
    pub permissions: bool,
}

impl ResolvedForm {
    pub fn required(&self) -> RequiredKinds {
        RequiredKinds {
            model: self.model.required,
            apps: self.apps.required,
            appobj: self.appobj.required,
            flavor: self.flavor.required,
            environment: self.environment.required,
            primitives: self.primitives.required(),
            permissions: self.permissions.required,
        }
    }

    fn absorb(&mut self, resolved: ResolvedKind) {
        match resolved {
            ResolvedKind::Models(models) => self.model = models,
            ResolvedKind::Apps(apps) => self.apps = apps,
            ResolvedKind::AppObject(appobj) => self.appobj = appobj,
            ResolvedKind::Flavors(flavors) => self.flavor = flavors,
            ResolvedKind::Environments(environments) => self.environment = environments,
            ResolvedKind::Primitives(primitives) => self.primitives = primitives,
            ResolvedKind::Permissions(mut permissions) => {
                self.warnings.extend(permissions.warning.take());
                self.permissions = permissions;
            }
        }
    }
}

/// Runs the dependency resolvers in order.
pub struct FormAssembler {
    resolvers: Vec<Box<dyn DependencyResolver>>,
}

impl Default for FormAssembler {
    fn default() -> Self {
        Self {
            resolvers: vec![
                Box::new(ModelResolver),
                Box::new(AppInstanceResolver),
                Box::new(AppObjectResolver),
                Box::new(FlavorResolver),
                Box::new(EnvironmentResolver),
                Box::new(PrimitiveResolver),
                Box::new(PermissionResolver),
            ],
        }
    }
}

impl FormAssembler {
    pub fn new() -> Self {
        Self::default()
    }

    /// Kinds resolved by this assembler, in order.
    pub fn kinds(&self) -> Vec<DependencyKind> {
        self.resolvers.iter().map(|resolver| resolver.kind()).collect()
    }

    pub fn assemble(&self, schema: &AppSchema, context: &FormContext<'_>) -> Result<ResolvedForm, AssemblyError> {
        let mut form = ResolvedForm::default();
        for resolver in &self.resolvers {
            let kind = resolver.kind();
            debug!(%kind, app = context.app_slug, "resolving dependency");
            let resolved = resolver.resolve(schema, context).map_err(|source| AssemblyError::new(kind, source))?;
            form.absorb(resolved);
        }
        for kind in [DependencyKind::Volumes, DependencyKind::Logs] {
            if schema.requires(kind) {
                debug!(%kind, "reserved dependency kind is not resolved");
            }
        }
        Ok(form)
    }
}

/// Assemble a form with the default resolver set.
pub fn assemble(schema: &AppSchema, context: &FormContext<'_>) -> Result<ResolvedForm, AssemblyError> {
    FormAssembler::default().assemble(schema, context)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::inventory::NullInventory;

    #[test]
    fn resolvers_run_in_fixed_order() {
        assert_eq!(
            FormAssembler::new().kinds(),
            vec![
                DependencyKind::Model,
                DependencyKind::Apps,
                DependencyKind::AppObject,
                DependencyKind::Flavor,
                DependencyKind::Environment,
                DependencyKind::Primitives,
                DependencyKind::Permissions,
            ]
        );
    }

    #[test]
    fn empty_schema_requires_nothing() {
        let context = FormContext::new(&NullInventory, "demo", "alice", "lab");
        let form = assemble(&AppSchema::default(), &context).expect("form");
        assert_eq!(form.required(), RequiredKinds::default());
        assert_eq!(form, ResolvedForm::default());
    }
}
