//! Selector values passed to inventory lookups.
//!
//! These describe *which* objects a caller may see without committing to any
//! storage query syntax. Inventory implementations evaluate them with
//! [`InventoryFilter::matches_instance`] and friends or translate them into
//! their own query language.

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::{AppInstance, DataModel};

/// Union-of-conditions visibility rule for app instances.
///
/// An instance is visible when it is owned by `owner`, OR shared with the
/// project `project_slug`, OR (when `include_public` is set) marked public.
#[derive(Clone, Debug, PartialEq, Eq, Serialize, Deserialize)]
pub struct VisibilityPredicate {
    pub owner: String,
    pub project_slug: String,
    #[serde(default = "default_include_public")]
    pub include_public: bool,
}

fn default_include_public() -> bool {
    true
}

impl VisibilityPredicate {
    /// Standard rule for a user working inside a project.
    pub fn for_request(owner: impl Into<String>, project_slug: impl Into<String>) -> Self {
        Self {
            owner: owner.into(),
            project_slug: project_slug.into(),
            include_public: true,
        }
    }

    pub fn matches(&self, instance: &AppInstance) -> bool {
        instance.owner == self.owner
            || instance.permission.projects.iter().any(|slug| slug == &self.project_slug)
            || (self.include_public && instance.permission.public)
    }
}

/// Self-reference rule for the distinguished `Environment` app.
///
/// When an app depends on `Environment` instances, only environments that
/// already mark the current app as linked (`appobj.<current_app_slug> = true`
/// in their parameter record) are offered.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LinkedAppPredicate {
    referenced_app: String,
    current_app_slug: String,
}

impl LinkedAppPredicate {
    /// Name of the app definition whose instances are filtered by link marker.
    pub const ENVIRONMENT_APP: &'static str = "Environment";
    /// Parameter group holding the link markers.
    pub const MARKER_GROUP: &'static str = "appobj";

    /// Returns a predicate when `referenced_app` is subject to link filtering.
    pub fn for_dependency(referenced_app: &str, current_app_slug: &str) -> Option<Self> {
        (referenced_app == Self::ENVIRONMENT_APP).then(|| Self {
            referenced_app: referenced_app.to_string(),
            current_app_slug: current_app_slug.to_string(),
        })
    }

    pub fn referenced_app(&self) -> &str {
        &self.referenced_app
    }

    pub fn current_app_slug(&self) -> &str {
        &self.current_app_slug
    }

    /// Dotted parameter path that must be true on a matching instance.
    pub fn marker_path(&self) -> String {
        format!("{}.{}", Self::MARKER_GROUP, self.current_app_slug)
    }

    /// `marker` is the value found at [`Self::marker_path`] in the instance's
    /// flattened parameter record, so nested and dotted records agree.
    pub fn matches(&self, instance: &AppInstance, marker: Option<&Value>) -> bool {
        instance.app == self.referenced_app && marker.is_some_and(is_true_marker)
    }
}

fn is_true_marker(value: &Value) -> bool {
    match value {
        Value::Bool(flag) => *flag,
        Value::String(text) => text.eq_ignore_ascii_case("true"),
        _ => false,
    }
}

/// Criteria for an inventory lookup. Unset criteria do not restrict the result.
#[derive(Clone, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct InventoryFilter {
    /// Project slug the objects must belong to.
    #[serde(default)]
    pub project: Option<String>,
    /// App definition name the instances must be created from.
    #[serde(default)]
    pub app: Option<String>,
    #[serde(default)]
    pub visibility: Option<VisibilityPredicate>,
}

impl InventoryFilter {
    /// Filter that matches everything (platform-wide catalogs).
    pub fn all() -> Self {
        Self::default()
    }

    pub fn for_project(project: impl Into<String>) -> Self {
        Self {
            project: Some(project.into()),
            ..Self::default()
        }
    }

    pub fn with_app(mut self, app: impl Into<String>) -> Self {
        self.app = Some(app.into());
        self
    }

    pub fn with_visibility(mut self, visibility: VisibilityPredicate) -> Self {
        self.visibility = Some(visibility);
        self
    }

    pub fn matches_model(&self, model: &DataModel) -> bool {
        self.project.as_ref().is_none_or(|project| &model.project == project)
    }

    pub fn matches_instance(&self, instance: &AppInstance) -> bool {
        self.project.as_ref().is_none_or(|project| &instance.project == project)
            && self.app.as_ref().is_none_or(|app| &instance.app == app)
            && self.visibility.as_ref().is_none_or(|visibility| visibility.matches(instance))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::InstancePermission;
    use serde_json::json;
    use std::collections::BTreeSet;

    fn instance(id: &str, owner: &str, permission: InstancePermission, parameters: Value) -> AppInstance {
        AppInstance {
            id: id.into(),
            name: format!("instance-{id}"),
            app: "Environment".into(),
            project: "demo".into(),
            owner: owner.into(),
            parameters,
            permission,
            links: BTreeSet::new(),
        }
    }

    #[test]
    fn visibility_is_a_union_of_conditions() {
        let rule = VisibilityPredicate::for_request("alice", "demo");
        let owned = instance("1", "alice", InstancePermission::default(), Value::Null);
        let shared = instance(
            "2",
            "bob",
            InstancePermission {
                public: false,
                projects: vec!["demo".into()],
            },
            Value::Null,
        );
        let public = instance(
            "3",
            "bob",
            InstancePermission {
                public: true,
                projects: Vec::new(),
            },
            Value::Null,
        );
        let private = instance("4", "bob", InstancePermission::default(), Value::Null);

        assert!(rule.matches(&owned));
        assert!(rule.matches(&shared));
        assert!(rule.matches(&public));
        assert!(!rule.matches(&private));

        let no_public = VisibilityPredicate {
            include_public: false,
            ..rule
        };
        assert!(!no_public.matches(&public));
    }

    #[test]
    fn linked_app_predicate_only_applies_to_environment() {
        assert!(LinkedAppPredicate::for_dependency("JupyterLab", "lab").is_none());
        let predicate = LinkedAppPredicate::for_dependency("Environment", "lab").expect("predicate");
        assert_eq!(predicate.marker_path(), "appobj.lab");
    }

    #[test]
    fn linked_app_predicate_requires_true_marker() {
        let predicate = LinkedAppPredicate::for_dependency("Environment", "lab").expect("predicate");
        let environment = instance("1", "alice", InstancePermission::default(), Value::Null);
        let mut notebook = environment.clone();
        notebook.app = "JupyterLab".into();

        assert!(predicate.matches(&environment, Some(&json!(true))));
        assert!(predicate.matches(&environment, Some(&json!("True"))));
        assert!(!predicate.matches(&environment, Some(&json!(false))));
        assert!(!predicate.matches(&environment, Some(&json!(1))));
        assert!(!predicate.matches(&environment, None));
        assert!(!predicate.matches(&notebook, Some(&json!(true))));
    }

    #[test]
    fn filter_combines_project_app_and_visibility() {
        let filter = InventoryFilter::for_project("demo")
            .with_app("Environment")
            .with_visibility(VisibilityPredicate::for_request("alice", "demo"));
        let mut candidate = instance("1", "alice", InstancePermission::default(), Value::Null);
        assert!(filter.matches_instance(&candidate));
        candidate.project = "other".into();
        assert!(!filter.matches_instance(&candidate));
        assert!(InventoryFilter::all().matches_instance(&candidate));
    }
}
