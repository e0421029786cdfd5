//! Persistent configuration for the studio CLI.
//!
//! The configuration records which studio the CLI talks to, the current
//! project, and the access token. It lives in a small JSON file in the
//! standard configuration directory (`~/.config/studio/config.json` on most
//! platforms). Values are resolved with the precedence
//! command-line flag > environment variable > file.

use std::env;
use std::fs;
use std::path::{Path, PathBuf};

use dirs_next::{config_dir, home_dir};
use serde::{Deserialize, Serialize};
use thiserror::Error;
use tracing::debug;

/// Environment variable allowing callers to override the configuration file path.
pub const CONFIG_PATH_ENV: &str = "STUDIO_CONFIG_PATH";
pub const STUDIO_URL_ENV: &str = "STUDIO_URL";
pub const STUDIO_PROJECT_ENV: &str = "STUDIO_PROJECT";
pub const STUDIO_ACCESS_TOKEN_ENV: &str = "STUDIO_ACCESS_TOKEN";
pub const STUDIO_PROMETHEUS_URL_ENV: &str = "STUDIO_PROMETHEUS_URL";

/// Default filename for the JSON payload.
pub const CONFIG_FILE_NAME: &str = "config.json";

/// Error surfaced when reading, writing, or resolving configuration fails.
#[derive(Debug, Error)]
pub enum ConfigError {
    /// I/O failure (for example, permissions or missing directory).
    #[error("config I/O error: {0}")]
    Io(#[from] std::io::Error),
    /// Serialization or deserialization failure.
    #[error("config serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
    /// A setting required by the current command is not configured anywhere.
    #[error("missing setting '{0}'. Hint: pass it as a flag, export the matching STUDIO_* variable, or run 'studio set current'")]
    MissingSetting(&'static str),
}

/// Settings persisted between invocations.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct StudioConfig {
    #[serde(default)]
    pub studio_url: Option<String>,
    #[serde(default)]
    pub project: Option<String>,
    #[serde(default)]
    pub access_token: Option<String>,
    /// Verify TLS certificates when talking to the studio.
    #[serde(default = "default_secure")]
    pub secure: bool,
    #[serde(default)]
    pub prometheus_url: Option<String>,
}

fn default_secure() -> bool {
    true
}

impl Default for StudioConfig {
    fn default() -> Self {
        Self {
            studio_url: None,
            project: None,
            access_token: None,
            secure: true,
            prometheus_url: None,
        }
    }
}

/// Per-invocation values taken from command-line flags.
#[derive(Debug, Clone, Default)]
pub struct ConfigOverrides {
    pub studio_url: Option<String>,
    pub project: Option<String>,
    pub insecure: bool,
}

impl StudioConfig {
    /// Layer environment variables and flags over the stored configuration.
    pub fn resolve(mut self, overrides: &ConfigOverrides) -> Self {
        apply_env(&mut self.studio_url, STUDIO_URL_ENV);
        apply_env(&mut self.project, STUDIO_PROJECT_ENV);
        apply_env(&mut self.access_token, STUDIO_ACCESS_TOKEN_ENV);
        apply_env(&mut self.prometheus_url, STUDIO_PROMETHEUS_URL_ENV);

        if let Some(url) = non_blank(overrides.studio_url.as_deref()) {
            self.studio_url = Some(url);
        }
        if let Some(project) = non_blank(overrides.project.as_deref()) {
            self.project = Some(project);
        }
        if overrides.insecure {
            self.secure = false;
        }
        self
    }

    pub fn require_url(&self) -> Result<&str, ConfigError> {
        self.studio_url.as_deref().ok_or(ConfigError::MissingSetting("studio_url"))
    }

    pub fn require_project(&self) -> Result<&str, ConfigError> {
        self.project.as_deref().ok_or(ConfigError::MissingSetting("project"))
    }

    pub fn require_token(&self) -> Result<&str, ConfigError> {
        self.access_token.as_deref().ok_or(ConfigError::MissingSetting("access_token"))
    }

    pub fn require_prometheus_url(&self) -> Result<&str, ConfigError> {
        self.prometheus_url.as_deref().ok_or(ConfigError::MissingSetting("prometheus_url"))
    }
}

fn apply_env(slot: &mut Option<String>, variable: &str) {
    if let Some(value) = env::var(variable).ok().as_deref().and_then(|value| non_blank(Some(value))) {
        debug!(variable, "configuration value taken from environment");
        *slot = Some(value);
    }
}

fn non_blank(value: Option<&str>) -> Option<String> {
    value.map(str::trim).filter(|value| !value.is_empty()).map(str::to_string)
}

/// JSON-backed configuration file.
#[derive(Debug, Clone)]
pub struct ConfigStore {
    path: PathBuf,
}

impl ConfigStore {
    /// Store at the default location (or the `STUDIO_CONFIG_PATH` override).
    pub fn new() -> Self {
        Self {
            path: default_config_path(),
        }
    }

    pub fn at(path: impl Into<PathBuf>) -> Self {
        Self { path: path.into() }
    }

    /// Path to the underlying JSON file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Load the stored configuration; a missing file yields the defaults.
    pub fn load(&self) -> Result<StudioConfig, ConfigError> {
        if !self.path.exists() {
            return Ok(StudioConfig::default());
        }
        let data = fs::read_to_string(&self.path)?;
        if data.trim().is_empty() {
            return Ok(StudioConfig::default());
        }
        Ok(serde_json::from_str(&data)?)
    }

    pub fn save(&self, config: &StudioConfig) -> Result<(), ConfigError> {
        if let Some(parent) = self.path.parent() {
            fs::create_dir_all(parent)?;
        }
        let data = serde_json::to_string_pretty(config)?;
        fs::write(&self.path, data)?;
        Ok(())
    }

    /// Record the current studio URL and/or project, keeping other settings.
    pub fn set_current(&self, studio_url: Option<&str>, project: Option<&str>) -> Result<StudioConfig, ConfigError> {
        let mut config = self.load()?;
        if let Some(url) = non_blank(studio_url) {
            config.studio_url = Some(url);
        }
        if let Some(project) = non_blank(project) {
            config.project = Some(project);
        }
        self.save(&config)?;
        Ok(config)
    }
}

impl Default for ConfigStore {
    fn default() -> Self {
        Self::new()
    }
}

fn default_config_path() -> PathBuf {
    if let Ok(path) = env::var(CONFIG_PATH_ENV) {
        let trimmed = path.trim();
        if !trimmed.is_empty() {
            return expand_tilde(trimmed);
        }
    }

    config_dir().unwrap_or_else(|| PathBuf::from(".")).join("studio").join(CONFIG_FILE_NAME)
}

/// Expand a leading `~` to the user's home directory.
pub fn expand_tilde(path: &str) -> PathBuf {
    let trimmed = path.trim();
    let home = || home_dir().unwrap_or_else(|| PathBuf::from("~"));
    if trimmed == "~" {
        return home();
    }
    if let Some(rest) = trimmed.strip_prefix("~/").or_else(|| trimmed.strip_prefix("~\\")) {
        return home().join(rest);
    }
    PathBuf::from(trimmed)
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL_ENV: [(&str, Option<&str>); 4] = [
        (STUDIO_URL_ENV, None),
        (STUDIO_PROJECT_ENV, None),
        (STUDIO_ACCESS_TOKEN_ENV, None),
        (STUDIO_PROMETHEUS_URL_ENV, None),
    ];

    #[test]
    fn missing_file_loads_defaults() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path().join("nested").join("config.json"));
        let config = store.load().unwrap();
        assert_eq!(config, StudioConfig::default());
        assert!(config.secure);
    }

    #[test]
    fn set_current_persists_and_keeps_token() {
        let dir = tempfile::tempdir().unwrap();
        let store = ConfigStore::at(dir.path().join("config.json"));
        store
            .save(&StudioConfig {
                access_token: Some("token-value".into()),
                ..StudioConfig::default()
            })
            .unwrap();

        store.set_current(Some("studio.example.com"), Some("demo")).unwrap();
        let loaded = store.load().unwrap();
        assert_eq!(loaded.studio_url.as_deref(), Some("studio.example.com"));
        assert_eq!(loaded.project.as_deref(), Some("demo"));
        assert_eq!(loaded.access_token.as_deref(), Some("token-value"));

        store.set_current(None, Some("  ")).unwrap();
        assert_eq!(store.load().unwrap().project.as_deref(), Some("demo"));
    }

    #[test]
    fn flags_override_environment_and_file() {
        let stored = StudioConfig {
            studio_url: Some("file.example.com".into()),
            project: Some("file-project".into()),
            ..StudioConfig::default()
        };
        let mut vars = ALL_ENV.to_vec();
        vars[0] = (STUDIO_URL_ENV, Some("env.example.com"));
        vars[1] = (STUDIO_PROJECT_ENV, Some("env-project"));
        temp_env::with_vars(vars, || {
            let overrides = ConfigOverrides {
                studio_url: None,
                project: Some("flag-project".into()),
                insecure: true,
            };
            let resolved = stored.clone().resolve(&overrides);
            assert_eq!(resolved.studio_url.as_deref(), Some("env.example.com"));
            assert_eq!(resolved.project.as_deref(), Some("flag-project"));
            assert!(!resolved.secure);
        });
    }

    #[test]
    fn require_reports_missing_setting() {
        temp_env::with_vars(ALL_ENV, || {
            let resolved = StudioConfig::default().resolve(&ConfigOverrides::default());
            let err = resolved.require_token().unwrap_err();
            assert!(matches!(err, ConfigError::MissingSetting("access_token")));
            assert!(err.to_string().contains("studio set current"));
        });
    }

    #[test]
    fn config_path_env_override_expands_tilde() {
        temp_env::with_var(CONFIG_PATH_ENV, Some("~/studio-test/config.json"), || {
            let store = ConfigStore::new();
            assert!(store.path().ends_with("studio-test/config.json"));
            assert!(!store.path().starts_with("~"));
        });
    }
}
