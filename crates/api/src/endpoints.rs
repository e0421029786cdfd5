//! REST endpoints exposed by the studio API.
//!
//! Paths are relative to the API root (`https://<studio>/api`). Project
//! scoped resources live under `/projects/{id}/<resource>/`.

use std::error::Error;
use std::fmt;
use std::str::FromStr;

use percent_encoding::{NON_ALPHANUMERIC, utf8_percent_encode};
use url::Url;

use crate::ApiError;

/// Collections nested under a project.
#[derive(Clone, Copy, Debug, Hash, Eq, PartialEq)]
pub enum ProjectResource {
    AppInstances,
    Environments,
    Flavors,
    Members,
    Models,
    ObjectTypes,
    Resources,
    S3,
}

impl ProjectResource {
    pub fn path_segment(&self) -> &'static str {
        match self {
            Self::AppInstances => "appinstances",
            Self::Environments => "environments",
            Self::Flavors => "flavors",
            Self::Members => "members",
            Self::Models => "models",
            Self::ObjectTypes => "objecttypes",
            Self::Resources => "resources",
            Self::S3 => "s3",
        }
    }

    /// Items of most collections are addressed by id; S3 endpoints by name.
    pub fn addressed_by_name(&self) -> bool {
        matches!(self, Self::S3)
    }
}

impl fmt::Display for ProjectResource {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.path_segment())
    }
}

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ParseProjectResourceError(String);

impl fmt::Display for ParseProjectResourceError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "unknown resource type '{}'; expected one of appinstances, environments, flavors, members, models, objecttypes, resources, s3",
            self.0
        )
    }
}

impl Error for ParseProjectResourceError {}

impl FromStr for ProjectResource {
    type Err = ParseProjectResourceError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "appinstances" | "appinstance" | "apps" => Ok(Self::AppInstances),
            "environments" | "environment" | "env" => Ok(Self::Environments),
            "flavors" | "flavor" | "fl" => Ok(Self::Flavors),
            "members" => Ok(Self::Members),
            "models" | "model" | "objects" | "obj" => Ok(Self::Models),
            "objecttypes" | "objecttype" => Ok(Self::ObjectTypes),
            "resources" | "resource" => Ok(Self::Resources),
            "s3" => Ok(Self::S3),
            other => Err(ParseProjectResourceError(other.to_string())),
        }
    }
}

/// A concrete API endpoint.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum Endpoint {
    /// Admin catalog of app definitions.
    AdminApps,
    Projects,
    ProjectTemplates,
    Project { project_id: String },
    Collection { project_id: String, resource: ProjectResource },
    Item { project_id: String, resource: ProjectResource, item: String },
}

impl Endpoint {
    pub fn collection(project_id: impl Into<String>, resource: ProjectResource) -> Self {
        Self::Collection {
            project_id: project_id.into(),
            resource,
        }
    }

    pub fn item(project_id: impl Into<String>, resource: ProjectResource, item: impl Into<String>) -> Self {
        Self::Item {
            project_id: project_id.into(),
            resource,
            item: item.into(),
        }
    }

    /// Path relative to the API root.
    pub fn path(&self) -> String {
        match self {
            Self::AdminApps => "/apps/".to_string(),
            Self::Projects => "/projects/".to_string(),
            Self::ProjectTemplates => "/projecttemplates/".to_string(),
            Self::Project { project_id } => format!("/projects/{}", encode_segment(project_id)),
            Self::Collection { project_id, resource } => {
                format!("/projects/{}/{}/", encode_segment(project_id), resource.path_segment())
            }
            Self::Item {
                project_id,
                resource,
                item,
            } => format!(
                "/projects/{}/{}/{}/",
                encode_segment(project_id),
                resource.path_segment(),
                encode_segment(item)
            ),
        }
    }
}

fn encode_segment(segment: &str) -> String {
    utf8_percent_encode(segment, NON_ALPHANUMERIC).to_string()
}

/// Normalize a user supplied studio URL into the API root.
///
/// A missing scheme defaults to `https://`; trailing slashes are removed and
/// `/api` is appended.
///
/// # Example
/// ```rust
/// use studio_api::normalize_studio_url;
///
/// assert_eq!(normalize_studio_url("studio.example.com/").unwrap(), "https://studio.example.com/api");
/// assert_eq!(normalize_studio_url("http://localhost:8080").unwrap(), "http://localhost:8080/api");
/// ```
pub fn normalize_studio_url(studio_url: &str) -> Result<String, ApiError> {
    let trimmed = studio_url.trim();
    let with_scheme = if trimmed.starts_with("http://") || trimmed.starts_with("https://") {
        trimmed.to_string()
    } else {
        format!("https://{trimmed}")
    };
    let parsed = Url::parse(&with_scheme).map_err(|error| ApiError::InvalidBaseUrl {
        url: studio_url.to_string(),
        reason: error.to_string(),
    })?;
    if parsed.host_str().is_none_or(str::is_empty) {
        return Err(ApiError::InvalidBaseUrl {
            url: studio_url.to_string(),
            reason: "URL must include a host".into(),
        });
    }
    Ok(format!("{}/api", with_scheme.trim_end_matches('/')))
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn builds_project_scoped_paths() {
        assert_eq!(Endpoint::collection("7", ProjectResource::Flavors).path(), "/projects/7/flavors/");
        assert_eq!(Endpoint::item("7", ProjectResource::S3, "minio main").path(), "/projects/7/s3/minio%20main/");
        assert_eq!(Endpoint::Project { project_id: "7".into() }.path(), "/projects/7");
        assert_eq!(Endpoint::AdminApps.path(), "/apps/");
    }

    #[test]
    fn parses_resource_aliases() {
        assert_eq!("env".parse::<ProjectResource>(), Ok(ProjectResource::Environments));
        assert_eq!("S3".parse::<ProjectResource>(), Ok(ProjectResource::S3));
        assert!("volumes".parse::<ProjectResource>().is_err());
        assert!(ProjectResource::S3.addressed_by_name());
        assert!(!ProjectResource::Flavors.addressed_by_name());
    }

    #[test]
    fn rejects_urls_without_host() {
        assert!(matches!(normalize_studio_url("https://"), Err(ApiError::InvalidBaseUrl { .. })));
    }
}
