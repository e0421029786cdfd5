use anyhow::{Context, Result};
use studio_engine::{AppSchema, FormContext, InventorySnapshot, assemble};
use tracing::warn;

use super::Session;
use crate::cli::FormArgs;

/// Assemble the configuration form for `args.app` and print it as JSON.
pub fn run(args: FormArgs, session: &Session) -> Result<bool> {
    let project = session.config().require_project()?;
    let schema = AppSchema::from_path(&args.schema).with_context(|| format!("failed to load schema {}", args.schema.display()))?;
    let inventory =
        InventorySnapshot::from_path(&args.inventory).with_context(|| format!("failed to load inventory {}", args.inventory.display()))?;

    let instance = match args.instance.as_deref() {
        Some(id) => match inventory.app_instance(id) {
            Some(instance) => Some(instance),
            None => {
                println!("App instance '{id}' not found in the inventory.");
                return Ok(false);
            }
        },
        None => None,
    };

    let context = FormContext::new(&inventory, project, &args.user, &args.app).with_instance(instance);
    let form = match assemble(&schema, &context) {
        Ok(form) => form,
        Err(error) => {
            println!("Failed to assemble form for '{}': {:#}", args.app, anyhow::Error::new(error));
            return Ok(false);
        }
    };
    for warning in &form.warnings {
        warn!(%warning, "form assembled with defaults");
    }
    println!("{}", serde_json::to_string_pretty(&form).context("failed to serialize form")?);
    Ok(true)
}
