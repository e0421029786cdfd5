//! Release controller: installs and removes releases with an external
//! packaging tool (helm).
//!
//! Values are written to a transient YAML file that is deleted when the call
//! returns. A failed invocation is reported with its captured output and is
//! never retried.

use std::env;
use std::ffi::OsString;
use std::path::{Path, PathBuf};
use std::process::Output;

use async_trait::async_trait;
use serde_json::{Map as JsonMap, Value};
use thiserror::Error;
use tokio::process::Command;
use tracing::{debug, info, warn};

pub const HELM_BIN_ENV: &str = "STUDIO_HELM_BIN";
pub const KUBECONFIG_ENV: &str = "STUDIO_KUBECONFIG";
pub const CHART_ROOT_ENV: &str = "STUDIO_CHART_ROOT";
/// Mount root used when running inside a telepresence session.
pub const TELEPRESENCE_ROOT_ENV: &str = "TELEPRESENCE_ROOT";
const DEFAULT_KUBECONFIG: &str = "app/chartcontroller/config/config";

#[derive(Debug, Error)]
pub enum ReleaseError {
    #[error("invalid release request: {0}")]
    InvalidRequest(String),
    #[error("failed to start '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: std::io::Error,
    },
    #[error("failed to write release values: {0}")]
    Values(#[from] std::io::Error),
    #[error("failed to serialize release values: {0}")]
    Serialize(#[from] serde_yaml::Error),
    #[error("packaging tool failed:\n{output}")]
    ExternalToolFailure { output: String },
}

/// A release to install or upgrade.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ReleaseRequest {
    pub release_name: String,
    pub namespace: String,
    /// Chart name, resolved against the chart root.
    pub chart: String,
    pub values: JsonMap<String, Value>,
}

impl ReleaseRequest {
    pub fn new(release_name: impl Into<String>, namespace: impl Into<String>, chart: impl Into<String>) -> Self {
        Self {
            release_name: release_name.into(),
            namespace: namespace.into(),
            chart: chart.into(),
            values: JsonMap::new(),
        }
    }

    pub fn with_values(mut self, values: JsonMap<String, Value>) -> Self {
        self.values = values;
        self
    }

    fn validate(&self) -> Result<(), ReleaseError> {
        validate_target(&self.release_name, &self.namespace)?;
        if self.chart.trim().is_empty() {
            return Err(ReleaseError::InvalidRequest("chart must not be empty".into()));
        }
        Ok(())
    }
}

fn validate_target(release_name: &str, namespace: &str) -> Result<(), ReleaseError> {
    if release_name.trim().is_empty() {
        return Err(ReleaseError::InvalidRequest("release name must not be empty".into()));
    }
    if namespace.trim().is_empty() {
        return Err(ReleaseError::InvalidRequest("namespace must not be empty".into()));
    }
    Ok(())
}

/// Result of one packaging tool invocation.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct ReleaseOutcome {
    pub succeeded: bool,
    /// Captured stdout followed by stderr.
    pub output: String,
}

impl ReleaseOutcome {
    fn from_output(output: Output) -> Self {
        let mut text = String::from_utf8_lossy(&output.stdout).into_owned();
        text.push_str(&String::from_utf8_lossy(&output.stderr));
        Self {
            succeeded: output.status.success(),
            output: text,
        }
    }

    pub fn into_result(self) -> Result<String, ReleaseError> {
        if self.succeeded {
            Ok(self.output)
        } else {
            Err(ReleaseError::ExternalToolFailure { output: self.output })
        }
    }
}

#[async_trait]
pub trait ReleaseController: Send + Sync {
    /// Install the release, or upgrade it when it already exists.
    async fn apply(&self, request: &ReleaseRequest) -> Result<ReleaseOutcome, ReleaseError>;

    async fn remove(&self, release_name: &str, namespace: &str) -> Result<ReleaseOutcome, ReleaseError>;
}

/// Settings for [`HelmReleaseController`].
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct HelmSettings {
    pub program: OsString,
    pub kubeconfig: Option<PathBuf>,
    pub chart_root: PathBuf,
    /// Directory for transient values files; the system temp dir when unset.
    pub values_dir: Option<PathBuf>,
}

impl Default for HelmSettings {
    fn default() -> Self {
        Self {
            program: OsString::from("helm"),
            kubeconfig: None,
            chart_root: PathBuf::from("charts"),
            values_dir: None,
        }
    }
}

impl HelmSettings {
    /// Read `STUDIO_HELM_BIN`, `STUDIO_KUBECONFIG` and `STUDIO_CHART_ROOT`.
    ///
    /// Without `STUDIO_KUBECONFIG` the controller's bundled kubeconfig (under
    /// `TELEPRESENCE_ROOT` when set) is used if it exists.
    pub fn from_env() -> Self {
        let non_empty = |name: &str| env::var_os(name).filter(|value| !value.is_empty());
        let kubeconfig = non_empty(KUBECONFIG_ENV).map(PathBuf::from).or_else(|| {
            let root = non_empty(TELEPRESENCE_ROOT_ENV).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("/"));
            let candidate = root.join(DEFAULT_KUBECONFIG);
            candidate.is_file().then_some(candidate)
        });
        Self {
            program: non_empty(HELM_BIN_ENV).unwrap_or_else(|| OsString::from("helm")),
            kubeconfig,
            chart_root: non_empty(CHART_ROOT_ENV).map(PathBuf::from).unwrap_or_else(|| PathBuf::from("charts")),
            values_dir: None,
        }
    }
}

/// [`ReleaseController`] backed by the helm CLI.
#[derive(Clone, Debug, Default)]
pub struct HelmReleaseController {
    settings: HelmSettings,
}

impl HelmReleaseController {
    pub fn new(settings: HelmSettings) -> Self {
        Self { settings }
    }

    pub fn from_env() -> Self {
        Self::new(HelmSettings::from_env())
    }

    pub fn settings(&self) -> &HelmSettings {
        &self.settings
    }

    /// `upgrade --install [--kubeconfig K] -n NS RELEASE CHART -f VALUES`
    pub fn install_args(&self, request: &ReleaseRequest, values_path: &Path) -> Vec<OsString> {
        let mut args: Vec<OsString> = vec!["upgrade".into(), "--install".into()];
        self.push_kubeconfig(&mut args);
        args.extend([
            OsString::from("-n"),
            OsString::from(&request.namespace),
            OsString::from(&request.release_name),
            self.settings.chart_root.join(&request.chart).into_os_string(),
            OsString::from("-f"),
            values_path.as_os_str().to_os_string(),
        ]);
        args
    }

    /// `[--kubeconfig K] -n NS delete RELEASE`
    pub fn remove_args(&self, release_name: &str, namespace: &str) -> Vec<OsString> {
        let mut args = Vec::new();
        self.push_kubeconfig(&mut args);
        args.extend([OsString::from("-n"), namespace.into(), "delete".into(), release_name.into()]);
        args
    }

    fn push_kubeconfig(&self, args: &mut Vec<OsString>) {
        if let Some(kubeconfig) = &self.settings.kubeconfig {
            args.push("--kubeconfig".into());
            args.push(kubeconfig.as_os_str().to_os_string());
        }
    }

    fn values_file(&self) -> Result<tempfile::NamedTempFile, ReleaseError> {
        let mut builder = tempfile::Builder::new();
        builder.prefix("values-").suffix(".yaml");
        let file = match &self.settings.values_dir {
            Some(dir) => builder.tempfile_in(dir)?,
            None => builder.tempfile()?,
        };
        Ok(file)
    }

    async fn run(&self, args: Vec<OsString>) -> Result<ReleaseOutcome, ReleaseError> {
        let program = self.settings.program.to_string_lossy().into_owned();
        debug!(%program, ?args, "running packaging tool");
        let output = Command::new(&self.settings.program)
            .args(&args)
            .kill_on_drop(true)
            .output()
            .await
            .map_err(|source| ReleaseError::Spawn { program, source })?;
        Ok(ReleaseOutcome::from_output(output))
    }
}

#[async_trait]
impl ReleaseController for HelmReleaseController {
    async fn apply(&self, request: &ReleaseRequest) -> Result<ReleaseOutcome, ReleaseError> {
        request.validate()?;
        let values = serde_yaml::to_string(&request.values)?;
        // Removed from disk when dropped at the end of this call.
        let values_file = self.values_file()?;
        tokio::fs::write(values_file.path(), values).await?;

        let outcome = self.run(self.install_args(request, values_file.path())).await?;
        log_outcome("install", &request.release_name, &request.namespace, &outcome);
        Ok(outcome)
    }

    async fn remove(&self, release_name: &str, namespace: &str) -> Result<ReleaseOutcome, ReleaseError> {
        validate_target(release_name, namespace)?;
        let outcome = self.run(self.remove_args(release_name, namespace)).await?;
        log_outcome("remove", release_name, namespace, &outcome);
        Ok(outcome)
    }
}

fn log_outcome(action: &str, release_name: &str, namespace: &str, outcome: &ReleaseOutcome) {
    if outcome.succeeded {
        info!(action, release = release_name, namespace, "release command succeeded");
    } else {
        warn!(action, release = release_name, namespace, output = %outcome.output.trim(), "release command failed");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    fn controller(program: &str, values_dir: &Path) -> HelmReleaseController {
        HelmReleaseController::new(HelmSettings {
            program: program.into(),
            kubeconfig: Some(PathBuf::from("/etc/kube/config")),
            chart_root: PathBuf::from("charts"),
            values_dir: Some(values_dir.to_path_buf()),
        })
    }

    fn request() -> ReleaseRequest {
        let values = json!({"appname": "lab-1", "permissions": {"public": "false"}});
        ReleaseRequest::new("lab-1", "demo", "lab").with_values(values.as_object().cloned().unwrap_or_default())
    }

    #[test]
    fn builds_helm_command_lines() {
        let controller = controller("helm", Path::new("/tmp"));
        let install: Vec<String> = controller
            .install_args(&request(), Path::new("/tmp/values-x.yaml"))
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(
            install,
            [
                "upgrade",
                "--install",
                "--kubeconfig",
                "/etc/kube/config",
                "-n",
                "demo",
                "lab-1",
                "charts/lab",
                "-f",
                "/tmp/values-x.yaml"
            ]
        );
        let remove: Vec<String> = controller
            .remove_args("lab-1", "demo")
            .into_iter()
            .map(|arg| arg.to_string_lossy().into_owned())
            .collect();
        assert_eq!(remove, ["--kubeconfig", "/etc/kube/config", "-n", "demo", "delete", "lab-1"]);
    }

    #[tokio::test]
    async fn apply_captures_output_and_removes_values_file() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = controller("echo", dir.path()).apply(&request()).await.expect("outcome");
        assert!(outcome.succeeded);
        assert!(outcome.output.contains("upgrade --install"));
        assert!(outcome.output.contains("charts/lab"));
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
    }

    #[tokio::test]
    async fn failed_tool_is_reported_not_retried() {
        let dir = tempfile::tempdir().unwrap();
        let outcome = controller("false", dir.path()).apply(&request()).await.expect("outcome");
        assert!(!outcome.succeeded);
        assert_eq!(std::fs::read_dir(dir.path()).unwrap().count(), 0);
        assert!(matches!(outcome.into_result(), Err(ReleaseError::ExternalToolFailure { .. })));

        let removed = controller("false", dir.path()).remove("lab-1", "demo").await.expect("outcome");
        assert!(!removed.succeeded);
    }

    #[tokio::test]
    async fn rejects_empty_targets_before_spawning() {
        let dir = tempfile::tempdir().unwrap();
        let controller = controller("/nonexistent/helm", dir.path());
        let mut invalid = request();
        invalid.namespace = " ".into();
        assert!(matches!(controller.apply(&invalid).await, Err(ReleaseError::InvalidRequest(_))));
        assert!(matches!(controller.remove("", "demo").await, Err(ReleaseError::InvalidRequest(_))));
        assert!(matches!(controller.apply(&request()).await, Err(ReleaseError::Spawn { .. })));
    }

    #[test]
    fn settings_read_from_environment() {
        temp_env::with_vars(
            [
                (HELM_BIN_ENV, Some("/usr/local/bin/helm3")),
                (KUBECONFIG_ENV, Some("/srv/kubeconfig")),
                (CHART_ROOT_ENV, None),
            ],
            || {
                let settings = HelmSettings::from_env();
                assert_eq!(settings.program, OsString::from("/usr/local/bin/helm3"));
                assert_eq!(settings.kubeconfig, Some(PathBuf::from("/srv/kubeconfig")));
                assert_eq!(settings.chart_root, PathBuf::from("charts"));
            },
        );
    }

    #[test]
    fn bundled_kubeconfig_is_used_when_present() {
        let root = tempfile::tempdir().unwrap();
        let bundled = root.path().join(DEFAULT_KUBECONFIG);
        std::fs::create_dir_all(bundled.parent().unwrap()).unwrap();
        std::fs::write(&bundled, "apiVersion: v1\n").unwrap();
        let root_path = root.path().to_string_lossy().into_owned();
        temp_env::with_vars(
            [(KUBECONFIG_ENV, None), (TELEPRESENCE_ROOT_ENV, Some(root_path.as_str()))],
            || {
                assert_eq!(HelmSettings::from_env().kubeconfig, Some(bundled.clone()));
            },
        );
    }
}
