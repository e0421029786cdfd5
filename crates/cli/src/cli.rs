//! Command-line definitions.

use std::path::PathBuf;

use clap::{Args, Parser, Subcommand};
use studio_api::ProjectResource;
use studio_util::ConfigOverrides;

/// Command-line client for the studio platform.
#[derive(Parser, Debug)]
#[command(name = "studio", version, about)]
pub struct Cli {
    /// Studio URL; overrides STUDIO_URL and the stored configuration
    #[arg(short = 'u', long, global = true)]
    pub studio_url: Option<String>,

    /// Project name; overrides STUDIO_PROJECT and the stored configuration
    #[arg(short = 'p', long, global = true)]
    pub project: Option<String>,

    /// Accept invalid TLS certificates
    #[arg(long, global = true)]
    pub insecure: bool,

    /// Log debug output to stderr
    #[arg(short, long, global = true)]
    pub verbose: bool,

    #[command(subcommand)]
    pub command: Command,
}

impl Cli {
    pub fn overrides(&self) -> ConfigOverrides {
        ConfigOverrides {
            studio_url: self.studio_url.clone(),
            project: self.project.clone(),
            insecure: self.insecure,
        }
    }
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// List platform resources
    #[command(subcommand)]
    Get(GetCommand),
    /// Create platform resources
    #[command(subcommand)]
    Create(CreateCommand),
    /// Delete platform resources
    #[command(subcommand)]
    Delete(DeleteCommand),
    /// Update the stored configuration
    #[command(subcommand)]
    Set(SetCommand),
    /// Resolve an app's configuration form against an inventory snapshot
    Form(FormArgs),
    /// Install or remove releases with helm
    #[command(subcommand)]
    Release(ReleaseCommand),
    /// Query the metrics service
    #[command(subcommand)]
    Monitor(MonitorCommand),
}

#[derive(Subcommand, Debug)]
pub enum GetCommand {
    /// App instances of the current project
    #[command(visible_alias = "apps")]
    App {
        /// Only show apps of this category
        #[arg(short, long)]
        category: Option<String>,
    },
    /// Current studio URL and project
    Current,
    /// Environments of the current project
    #[command(visible_aliases = ["environments", "env"])]
    Environment,
    /// Compute flavors of the current project
    #[command(visible_aliases = ["flavors", "fl"])]
    Flavor,
    /// Published objects of the current project
    #[command(name = "model-obj", visible_aliases = ["objects", "model", "models", "obj"])]
    ModelObj {
        /// Object type slug
        #[arg(short = 't', long, default_value = "model")]
        object_type: String,
    },
    /// Projects of the current user
    #[command(visible_aliases = ["projects", "proj"])]
    Project,
    /// Available project templates
    #[command(name = "project-templates", visible_aliases = ["template", "tmpl"])]
    ProjectTemplates,
    /// S3 endpoints of the current project
    S3 {
        #[arg(short, long)]
        name: Option<String>,
    },
}

#[derive(Subcommand, Debug)]
pub enum CreateCommand {
    /// Create a project and make it current
    Project {
        name: String,
        #[arg(short, long, default_value = "")]
        description: String,
        #[arg(short, long, default_value = "")]
        repository: String,
        #[arg(short, long, default_value = "default")]
        template: String,
    },
    /// Register an app definition from a settings file, chart directory and logo
    App {
        #[arg(long, default_value = "config.json")]
        settings: PathBuf,
        #[arg(long, default_value = "chart")]
        chart: PathBuf,
        #[arg(long, default_value = "logo.png")]
        logo: PathBuf,
    },
    /// Register a project template
    Template {
        #[arg(long, default_value = "template.json")]
        template: PathBuf,
        #[arg(long, default_value = "image.png")]
        image: PathBuf,
    },
    /// Create an app instance from a JSON payload
    AppInstance {
        #[arg(long)]
        data: PathBuf,
    },
    /// Create a project resource from a JSON file
    Resource { file: PathBuf },
    /// Publish an object already uploaded to the project's storage
    Object {
        name: String,
        /// Storage key of the uploaded artifact
        #[arg(long)]
        uid: String,
        #[arg(long, default_value = "minor")]
        release_type: String,
        #[arg(long, default_value = "")]
        version: String,
        #[arg(long, default_value = "model")]
        object_type: String,
        #[arg(long)]
        description: Option<String>,
        /// HTML model card
        #[arg(long)]
        model_card: Option<PathBuf>,
    },
}

#[derive(Subcommand, Debug)]
pub enum DeleteCommand {
    /// Delete every app instance with this name
    App { name: String },
    /// Delete published objects by name (and version)
    Object {
        name: String,
        #[arg(long)]
        version: Option<String>,
    },
    Project { name: String },
    /// Delete a project resource (s3, environments, flavors, ...)
    Resource { resource_type: ProjectResource, name: String },
}

#[derive(Subcommand, Debug)]
pub enum SetCommand {
    /// Store the studio URL and/or project given with -u/-p
    Current,
}

#[derive(Args, Debug)]
pub struct FormArgs {
    /// App schema (JSON or YAML)
    #[arg(long)]
    pub schema: PathBuf,
    /// Inventory snapshot (JSON or YAML)
    #[arg(long)]
    pub inventory: PathBuf,
    /// Requesting user
    #[arg(long)]
    pub user: String,
    /// Slug of the app being configured
    #[arg(long)]
    pub app: String,
    /// Id of the app instance being edited
    #[arg(long)]
    pub instance: Option<String>,
}

#[derive(Subcommand, Debug)]
pub enum ReleaseCommand {
    /// Install or upgrade a release
    Install {
        name: String,
        #[arg(short, long)]
        namespace: String,
        #[arg(long)]
        chart: String,
        /// Values file (JSON or YAML)
        #[arg(long)]
        values: Option<PathBuf>,
        /// Dotted value overrides, e.g. --set permissions.public=true
        #[arg(long = "set", value_name = "KEY=VALUE")]
        set: Vec<String>,
    },
    Remove {
        name: String,
        #[arg(short, long)]
        namespace: String,
    },
}

#[derive(Subcommand, Debug)]
pub enum MonitorCommand {
    /// Pods up / total for an app
    Pods { app: String },
    /// Resource usage of the current project
    Usage,
    /// Requested (or limited) CPU and memory of one resource type in the current project
    Resources {
        /// Pod `type` label, e.g. lab or deployment
        #[arg(short = 't', long = "type")]
        resource_type: String,
        /// Report limits instead of requests
        #[arg(long)]
        limits: bool,
        /// Only count pods of this app
        #[arg(long)]
        app: Option<String>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;
    use clap::CommandFactory;

    #[test]
    fn command_definition_is_valid() {
        Cli::command().debug_assert();
    }

    #[test]
    fn aliases_and_global_flags_parse() {
        let cli = Cli::try_parse_from(["studio", "get", "env", "-p", "demo", "--insecure"]).expect("parse");
        assert!(matches!(cli.command, Command::Get(GetCommand::Environment)));
        assert_eq!(cli.project.as_deref(), Some("demo"));
        assert!(cli.overrides().insecure);

        let cli = Cli::try_parse_from(["studio", "delete", "resource", "s3", "minio"]).expect("parse");
        assert!(matches!(
            cli.command,
            Command::Delete(DeleteCommand::Resource {
                resource_type: ProjectResource::S3,
                ..
            })
        ));
        assert!(Cli::try_parse_from(["studio", "delete", "resource", "volumes", "x"]).is_err());
    }

    #[test]
    fn monitor_resources_parses_type_and_limits() {
        let cli = Cli::try_parse_from(["studio", "monitor", "resources", "--type", "lab", "--limits"]).expect("parse");
        assert!(matches!(
            cli.command,
            Command::Monitor(MonitorCommand::Resources { ref resource_type, limits: true, app: None }) if resource_type == "lab"
        ));
        assert!(Cli::try_parse_from(["studio", "monitor", "resources"]).is_err());
    }

    #[test]
    fn release_install_collects_overrides() {
        let cli = Cli::try_parse_from([
            "studio", "release", "install", "lab-1", "-n", "demo", "--chart", "lab", "--set", "a.b=1", "--set", "c=2",
        ])
        .expect("parse");
        match cli.command {
            Command::Release(ReleaseCommand::Install { set, namespace, .. }) => {
                assert_eq!(namespace, "demo");
                assert_eq!(set, ["a.b=1", "c=2"]);
            }
            other => panic!("unexpected command: {other:?}"),
        }
    }
}
