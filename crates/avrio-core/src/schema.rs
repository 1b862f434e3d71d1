//! Config schema and sample config rendering.
//!
//! The JSON schema is derived from [`AppConfig`] with schemars. The example
//! config fills in a host and credentials method so that every section shows
//! up with realistic values.

use anyhow::{Context, Result};
use schemars::generate::SchemaSettings;
use serde_json::{Value, json};

use crate::auth::AuthMethod;
use crate::config::{AppConfig, AuthConfig, RuntimeConfig, ServiceConfig};

const EXAMPLE_HOST: &str = "https://avrio.example.com";
const EXAMPLE_USERNAME: &str = "analyst@example.com";
const EXAMPLE_TIMEOUT_SECS: u64 = 30;

fn schema_url(repo_url: &str) -> String {
    format!("{repo_url}/schemas/config.schema.json")
}

/// Generate the draft-07 JSON schema for [`AppConfig`].
///
/// # Errors
///
/// Returns an error if JSON serialization fails.
pub fn generate_schema(project_name: &str, repo_url: &str) -> Result<String> {
    // draft-07 has the widest TOML editor support
    let mut schema = SchemaSettings::draft07()
        .into_generator()
        .into_root_schema_for::<AppConfig>();

    for (key, value) in [
        ("$id", json!(schema_url(repo_url))),
        ("title", json!(format!("{project_name} configuration"))),
        (
            "description",
            json!(format!(
                "Scheduler host, authentication defaults, endpoints and logging for {project_name}"
            )),
        ),
    ] {
        schema.insert(key.to_string(), value);
    }

    // editors write the reference back into the file as a plain key
    if let Some(props) = schema.get_mut("properties").and_then(Value::as_object_mut) {
        props.insert(
            "$schema".to_string(),
            json!({"type": "string", "format": "uri"}),
        );
    }

    serde_json::to_string_pretty(&schema).context("serializing JSON schema")
}

/// Generate an example TOML config with sample connection settings.
///
/// # Errors
///
/// Returns an error if TOML serialization fails.
pub fn generate_example_config(project_name: &str, repo_url: &str) -> Result<String> {
    let sample = AppConfig {
        schema: Some(schema_url(repo_url)),
        runtime: RuntimeConfig {
            timeout: Some(EXAMPLE_TIMEOUT_SECS),
        },
        service: ServiceConfig {
            host: Some(EXAMPLE_HOST.to_string()),
        },
        auth: AuthConfig {
            method: Some(AuthMethod::Password),
            username: Some(EXAMPLE_USERNAME.to_string()),
        },
        ..AppConfig::default()
    };
    let body = toml::to_string_pretty(&sample).context("serializing example config to TOML")?;

    Ok(format!(
        "# Example configuration for {project_name}.\n\
         # Copy to $XDG_CONFIG_HOME/{project_name}/config.toml and replace the sample values.\n\n\
         {body}"
    ))
}

/// The default config as TOML, without a header.
pub(crate) fn default_config_toml() -> Result<String> {
    toml::to_string_pretty(&AppConfig::default()).context("serializing default config to TOML")
}
