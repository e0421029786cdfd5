use std::path::Path;

use anyhow::{Context, Result, bail};
use serde_json::{Map as JsonMap, Value};
use studio_engine::{HelmReleaseController, ReleaseController, ReleaseOutcome, ReleaseRequest};
use studio_util::{DEFAULT_SEPARATOR, unflatten};

use crate::cli::ReleaseCommand;

pub async fn run(command: ReleaseCommand) -> Result<bool> {
    let controller = HelmReleaseController::from_env();
    match command {
        ReleaseCommand::Install {
            name,
            namespace,
            chart,
            values,
            set,
        } => {
            let mut merged = match values {
                Some(path) => read_values(&path).await?,
                None => JsonMap::new(),
            };
            merge(&mut merged, parse_overrides(&set)?);
            let request = ReleaseRequest::new(name, namespace, chart).with_values(merged);
            let outcome = controller.apply(&request).await?;
            Ok(report(outcome))
        }
        ReleaseCommand::Remove { name, namespace } => {
            let outcome = controller.remove(&name, &namespace).await?;
            Ok(report(outcome))
        }
    }
}

fn report(outcome: ReleaseOutcome) -> bool {
    print!("{}", outcome.output);
    if !outcome.succeeded {
        println!("Release command failed.");
    }
    outcome.succeeded
}

async fn read_values(path: &Path) -> Result<JsonMap<String, Value>> {
    let data = tokio::fs::read_to_string(path)
        .await
        .with_context(|| format!("failed to read values file {}", path.display()))?;
    match serde_yaml::from_str::<Value>(&data).with_context(|| format!("failed to parse values file {}", path.display()))? {
        Value::Object(values) => Ok(values),
        Value::Null => Ok(JsonMap::new()),
        _ => bail!("values file {} must contain a mapping", path.display()),
    }
}

/// Turn `key.path=value` pairs into nested values; values are read as YAML scalars.
fn parse_overrides(pairs: &[String]) -> Result<JsonMap<String, Value>> {
    let entries = pairs
        .iter()
        .map(|pair| {
            let (key, raw) = pair.split_once('=').with_context(|| format!("expected KEY=VALUE, got '{pair}'"))?;
            let value = serde_yaml::from_str::<Value>(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
            Ok((key.trim().to_string(), value))
        })
        .collect::<Result<Vec<_>>>()?;
    Ok(unflatten(entries, DEFAULT_SEPARATOR)?)
}

/// Deep-merge `overrides` into `base`; override leaves win.
fn merge(base: &mut JsonMap<String, Value>, overrides: JsonMap<String, Value>) {
    for (key, value) in overrides {
        match (base.get_mut(&key), value) {
            (Some(Value::Object(existing)), Value::Object(nested)) => merge(existing, nested),
            (_, value) => {
                base.insert(key, value);
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn overrides_become_nested_typed_values() {
        let parsed = parse_overrides(&["permissions.public=true".into(), "flavor.requests.cpu=500m".into(), "replicas=2".into()])
            .expect("overrides");
        assert_eq!(
            Value::Object(parsed),
            json!({"permissions": {"public": true}, "flavor": {"requests": {"cpu": "500m"}}, "replicas": 2})
        );
        assert!(parse_overrides(&["missing-equals".into()]).is_err());
        assert!(parse_overrides(&["a=1".into(), "a.b=2".into()]).is_err());
    }

    #[test]
    fn overrides_merge_over_file_values() {
        let mut base = json!({"appname": "lab-1", "permissions": {"public": false, "project": true}})
            .as_object()
            .cloned()
            .unwrap_or_default();
        let overrides = parse_overrides(&["permissions.public=true".into()]).expect("overrides");
        merge(&mut base, overrides);
        assert_eq!(
            Value::Object(base),
            json!({"appname": "lab-1", "permissions": {"public": true, "project": true}})
        );
    }

    #[tokio::test]
    async fn values_file_must_be_a_mapping() {
        let dir = tempfile::tempdir().expect("tempdir");
        let good = dir.path().join("values.yaml");
        std::fs::write(&good, "appname: lab-1\nflavor:\n  cpu: 1\n").expect("write");
        let values = read_values(&good).await.expect("values");
        assert_eq!(values.get("appname"), Some(&json!("lab-1")));

        let bad = dir.path().join("list.yaml");
        std::fs::write(&bad, "- a\n- b\n").expect("write");
        assert!(read_values(&bad).await.is_err());
    }
}
