//! Subcommand handlers.
//!
//! Every handler returns `Result<bool>`: `Ok(false)` means the command failed
//! and a message was already printed.

mod create;
mod delete;
mod form;
mod get;
mod monitor;
mod release;

use anyhow::{Context, Result};
use studio_api::{ApiError, Endpoint, ProjectResource, StudioClient};
use studio_util::{ConfigOverrides, ConfigStore, StudioConfig};

use crate::cli::{Command, SetCommand};

/// Configuration resolved for one invocation.
pub struct Session {
    store: ConfigStore,
    overrides: ConfigOverrides,
    config: StudioConfig,
}

impl Session {
    pub fn load(overrides: ConfigOverrides) -> Result<Self> {
        let store = ConfigStore::new();
        let config = store
            .load()
            .with_context(|| format!("failed to read configuration from {}", store.path().display()))?
            .resolve(&overrides);
        Ok(Self { store, overrides, config })
    }

    pub fn config(&self) -> &StudioConfig {
        &self.config
    }

    pub fn client(&self) -> Result<StudioClient> {
        StudioClient::from_config(&self.config).context("failed to set up the studio client")
    }

    /// Collection endpoint of the current project.
    pub async fn project_collection(&self, client: &StudioClient, resource: ProjectResource) -> Result<Endpoint, ApiError> {
        let project_id = client.project_id(self.config.require_project()?).await?;
        Ok(Endpoint::collection(project_id, resource))
    }
}

/// Dispatch a command; the stored configuration is only read by commands that use it.
pub async fn run(command: Command, overrides: ConfigOverrides) -> Result<bool> {
    if let Command::Release(command) = command {
        return release::run(command).await;
    }

    let session = Session::load(overrides)?;
    match command {
        Command::Get(command) => get::run(command, &session).await,
        Command::Create(command) => create::run(command, &session).await,
        Command::Delete(command) => delete::run(command, &session).await,
        Command::Set(SetCommand::Current) => set_current(&session),
        Command::Form(args) => form::run(args, &session),
        Command::Monitor(command) => monitor::run(command, &session).await,
        Command::Release(command) => release::run(command).await,
    }
}

fn set_current(session: &Session) -> Result<bool> {
    let overrides = &session.overrides;
    if overrides.studio_url.is_none() && overrides.project.is_none() {
        println!("Nothing to set; pass --studio-url and/or --project.");
        return Ok(false);
    }
    let config = session
        .store
        .set_current(overrides.studio_url.as_deref(), overrides.project.as_deref())
        .context("failed to save configuration")?;
    print_current(&config);
    Ok(true)
}

fn print_current(config: &StudioConfig) {
    match &config.studio_url {
        Some(url) => {
            println!("Studio: {url}");
            match &config.project {
                Some(project) => println!("Project: {project}"),
                None => println!("No project set."),
            }
        }
        None => println!("No studio URL set."),
    }
}

/// Print a failure message followed by the error's status code, reason and body.
pub fn report_failure(message: &str, error: &ApiError) -> bool {
    println!("{message}");
    println!("{error}");
    false
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::cli::{GetCommand, ReleaseCommand};
    use studio_util::config::CONFIG_PATH_ENV;

    fn block_on<F: std::future::Future>(future: F) -> F::Output {
        tokio::runtime::Runtime::new().expect("runtime").block_on(future)
    }

    #[test]
    fn release_commands_ignore_an_unreadable_config_file() {
        let dir = tempfile::tempdir().expect("tempdir");
        let config_path = dir.path().join("config.json");
        std::fs::write(&config_path, "{not json").expect("write config");
        let config_path = config_path.to_string_lossy().into_owned();

        temp_env::with_vars([(CONFIG_PATH_ENV, Some(config_path.as_str())), ("STUDIO_HELM_BIN", Some("true"))], || {
            let remove = Command::Release(ReleaseCommand::Remove {
                name: "lab-1".into(),
                namespace: "demo".into(),
            });
            assert!(block_on(run(remove, ConfigOverrides::default())).expect("release runs"));

            let get = Command::Get(GetCommand::Current);
            assert!(block_on(run(get, ConfigOverrides::default())).is_err());
        });
    }
}
