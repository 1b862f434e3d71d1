//! Configuration types and loading for the application.

use std::path::Path;

use anyhow::Result;
use config::{Config, Environment, File, FileFormat};
use schemars::JsonSchema;
use serde::{Deserialize, Serialize};

use crate::auth::{AuthMethod, AuthParams};
use crate::endpoints::Endpoints;
use crate::paths::{expand_path, write_default_config};
use crate::{AppPaths, env_prefix};

/// Main application configuration.
#[derive(Debug, Clone, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(
    title = "Application Configuration",
    description = "Main configuration for the application"
)]
pub struct AppConfig {
    /// JSON Schema reference for editor support.
    #[serde(rename = "$schema", default, skip_serializing_if = "Option::is_none")]
    #[schemars(skip)]
    pub schema: Option<String>,

    /// Active configuration profile.
    #[schemars(default = "default_profile")]
    pub profile: String,

    /// Logging configuration.
    pub logging: LoggingConfig,

    /// Runtime behavior configuration.
    pub runtime: RuntimeConfig,

    /// Scheduler service location.
    pub service: ServiceConfig,

    /// Default authentication settings. Secrets are never read from here.
    pub auth: AuthConfig,

    /// Endpoint paths on the scheduler service.
    pub endpoints: Endpoints,
}

fn default_profile() -> String {
    "default".to_string()
}

impl AppConfig {
    /// Load configuration from file and environment, creating defaults if needed.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read, parsed, or written.
    pub fn load(paths: &AppPaths, dry_run: bool) -> Result<Self> {
        if !paths.config_file.exists() {
            if dry_run {
                log::info!(
                    "dry-run: would create default config at {}",
                    paths.config_file.display()
                );
            } else {
                write_default_config(&paths.config_file)?;
            }
        }

        Self::load_from_path(&paths.config_file)
    }

    /// Load configuration from a specific path.
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed.
    pub fn load_from_path(config_file: &Path) -> Result<Self> {
        let env_prefix = env_prefix();
        let built = Config::builder()
            .set_default("profile", "default")?
            .set_default("logging.level", "info")?
            .add_source(
                File::from(config_file)
                    .format(FileFormat::Toml)
                    .required(false),
            )
            .add_source(Environment::with_prefix(env_prefix.as_str()).separator("__"))
            .build()?;

        let mut config: Self = built.try_deserialize()?;

        if let Some(ref file) = config.logging.file {
            let expanded = expand_path(Path::new(file))?;
            config.logging.file = Some(expanded.display().to_string());
        }

        Ok(config)
    }

    /// Authentication parameters filled from the configured defaults.
    ///
    /// Password and access token are always left empty.
    #[must_use]
    pub fn auth_params(&self) -> AuthParams {
        AuthParams {
            host: self.service.host.clone(),
            method: self.auth.method.map(|m| m.as_str().to_string()),
            username: self.auth.username.clone(),
            password: None,
            access_token: None,
        }
    }
}

impl Default for AppConfig {
    fn default() -> Self {
        Self {
            schema: None,
            profile: default_profile(),
            logging: LoggingConfig::default(),
            runtime: RuntimeConfig::default(),
            service: ServiceConfig::default(),
            auth: AuthConfig::default(),
            endpoints: Endpoints::default(),
        }
    }
}

/// Logging configuration.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Logging configuration")]
pub struct LoggingConfig {
    /// Log level (error, warn, info, debug, trace).
    #[schemars(default = "default_log_level")]
    pub level: LogLevel,

    /// Optional path for log file output. Supports ~ and environment variables.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub file: Option<String>,
}

/// Log level enumeration for schema validation.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, JsonSchema, Default)]
#[serde(rename_all = "lowercase")]
pub enum LogLevel {
    /// Only emit error-level messages.
    Error,
    /// Emit warnings and errors.
    Warn,
    /// Emit informational messages and above (default).
    #[default]
    Info,
    /// Emit debug diagnostics and above.
    Debug,
    /// Emit all messages including fine-grained traces.
    Trace,
}

impl std::fmt::Display for LogLevel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Error => write!(f, "error"),
            Self::Warn => write!(f, "warn"),
            Self::Info => write!(f, "info"),
            Self::Debug => write!(f, "debug"),
            Self::Trace => write!(f, "trace"),
        }
    }
}

impl From<LogLevel> for log::LevelFilter {
    fn from(level: LogLevel) -> Self {
        match level {
            LogLevel::Error => Self::Error,
            LogLevel::Warn => Self::Warn,
            LogLevel::Info => Self::Info,
            LogLevel::Debug => Self::Debug,
            LogLevel::Trace => Self::Trace,
        }
    }
}

const fn default_log_level() -> LogLevel {
    LogLevel::Info
}

/// Runtime behavior configuration.
#[derive(Debug, Clone, Copy, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Runtime behavior configuration")]
pub struct RuntimeConfig {
    /// Request timeout in seconds. Unset leaves the HTTP client default.
    #[serde(skip_serializing_if = "Option::is_none")]
    #[schemars(range(min = 1))]
    pub timeout: Option<u64>,
}

/// Scheduler service location.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Scheduler service location")]
pub struct ServiceConfig {
    /// Base URL of the scheduler service, e.g. `https://avrio.example.com`.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub host: Option<String>,
}

/// Default authentication settings.
#[derive(Debug, Clone, Default, Serialize, Deserialize, JsonSchema)]
#[serde(default)]
#[schemars(description = "Default authentication method and username")]
pub struct AuthConfig {
    /// Authentication method (password or `access_token`).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub method: Option<AuthMethod>,

    /// Login email for password authentication.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub username: Option<String>,
}

#[cfg(test)]
mod tests {
    use super::*;

    fn temp_config(name: &str, body: &str) -> std::path::PathBuf {
        let dir = std::env::temp_dir().join(format!("avrio-config-{name}-{}", std::process::id()));
        std::fs::create_dir_all(&dir).expect("create temp dir");
        let path = dir.join("config.toml");
        std::fs::write(&path, body).expect("write config");
        path
    }

    #[test]
    fn defaults_without_file() {
        let path = std::env::temp_dir().join("avrio-config-missing/none.toml");
        let config = AppConfig::load_from_path(&path).expect("load defaults");

        assert_eq!(config.profile, "default");
        assert_eq!(config.logging.level, LogLevel::Info);
        assert!(config.runtime.timeout.is_none());
        assert_eq!(config.endpoints, Endpoints::default());
        assert_eq!(config.auth_params(), AuthParams::default());
    }

    #[test]
    fn file_values_feed_auth_params() {
        let path = temp_config(
            "auth",
            r#"
[service]
host = "https://avrio.example.com"

[auth]
method = "access_token"
username = "me@example.com"

[endpoints]
list = "/custom/list"

[runtime]
timeout = 15
"#,
        );

        let config = AppConfig::load_from_path(&path).expect("load config");

        assert_eq!(config.runtime.timeout, Some(15));
        assert_eq!(config.endpoints.list, "/custom/list");
        assert_eq!(config.endpoints.token, Endpoints::default().token);

        let params = config.auth_params();
        assert_eq!(params.host.as_deref(), Some("https://avrio.example.com"));
        assert_eq!(params.method.as_deref(), Some("access_token"));
        assert_eq!(params.username.as_deref(), Some("me@example.com"));
        assert!(params.password.is_none());
        assert!(params.access_token.is_none());
    }

    #[test]
    fn log_level_maps_to_filter() {
        assert_eq!(log::LevelFilter::from(LogLevel::Warn), log::LevelFilter::Warn);
        assert_eq!(LogLevel::Trace.to_string(), "trace");
    }
}
