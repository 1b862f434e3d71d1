//! Locating and seeding the config file.
//!
//! The config file is taken from `--config`, then `AVRIO_CONFIG`, then
//! `$XDG_CONFIG_HOME/avrio/config.toml` (or the platform config directory).
//! A directory given by either override means `config.toml` inside it.

use std::env;
use std::fmt;
use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{Context, Result, anyhow};

use crate::{APP_NAME, env_prefix, schema};

/// Environment variable naming an alternate config file or directory.
pub const CONFIG_ENV: &str = "AVRIO_CONFIG";

const CONFIG_FILE_NAME: &str = "config.toml";

/// Where the config file location came from.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ConfigOrigin {
    /// The `--config` command-line option.
    CommandLine,
    /// The `AVRIO_CONFIG` environment variable.
    Environment,
    /// The per-user config directory.
    Default,
}

impl fmt::Display for ConfigOrigin {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            Self::CommandLine => "--config",
            Self::Environment => CONFIG_ENV,
            Self::Default => "default location",
        })
    }
}

/// Resolved location of the config file.
///
/// Sessions and tokens live in memory, so this is the only file the client
/// ever touches.
#[derive(Debug, Clone)]
pub struct AppPaths {
    /// Path to the configuration file.
    pub config_file: PathBuf,
    /// How `config_file` was chosen.
    pub origin: ConfigOrigin,
}

impl AppPaths {
    /// Resolve the config file from an optional `--config` value,
    /// `AVRIO_CONFIG`, or the default directory, in that order.
    ///
    /// # Errors
    ///
    /// Returns an error if a path cannot be expanded or no config directory
    /// can be determined.
    pub fn discover(override_path: Option<&Path>) -> Result<Self> {
        let from_env = env::var_os(CONFIG_ENV)
            .filter(|v| !v.is_empty())
            .map(PathBuf::from);
        Self::resolve(override_path, from_env.as_deref())
    }

    fn resolve(flag: Option<&Path>, from_env: Option<&Path>) -> Result<Self> {
        let (config_file, origin) = match (flag, from_env) {
            (Some(path), _) => (config_file_at(path)?, ConfigOrigin::CommandLine),
            (None, Some(path)) => (config_file_at(path)?, ConfigOrigin::Environment),
            (None, None) => (
                default_config_dir()?.join(CONFIG_FILE_NAME),
                ConfigOrigin::Default,
            ),
        };
        Ok(Self {
            config_file,
            origin,
        })
    }
}

impl fmt::Display for AppPaths {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "config: {} ({})", self.config_file.display(), self.origin)
    }
}

fn config_file_at(path: &Path) -> Result<PathBuf> {
    let expanded = expand_path(path)?;
    if expanded.is_dir() {
        Ok(expanded.join(CONFIG_FILE_NAME))
    } else {
        Ok(expanded)
    }
}

/// Expand `~` and environment variables in a path.
///
/// Paths that are not valid UTF-8 are returned unchanged.
///
/// # Errors
///
/// Returns an error if a referenced variable is not set.
pub fn expand_path(path: &Path) -> Result<PathBuf> {
    let Some(text) = path.to_str() else {
        return Ok(path.to_path_buf());
    };
    let expanded = shellexpand::full(text).with_context(|| format!("expanding path {text}"))?;
    Ok(PathBuf::from(expanded.into_owned()))
}

/// Per-user config directory for avrio.
///
/// # Errors
///
/// Returns an error if neither a config nor a home directory can be found.
pub fn default_config_dir() -> Result<PathBuf> {
    let base = env::var_os("XDG_CONFIG_HOME")
        .filter(|v| !v.is_empty())
        .map(PathBuf::from)
        .or_else(dirs::config_dir)
        .or_else(|| dirs::home_dir().map(|home| home.join(".config")))
        .ok_or_else(|| anyhow!("unable to determine configuration directory"))?;
    Ok(base.join(APP_NAME))
}

/// Write the default configuration to `path`, creating parent directories.
///
/// # Errors
///
/// Returns an error if the directory or file cannot be written.
pub fn write_default_config(path: &Path) -> Result<()> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)
            .with_context(|| format!("creating config directory {}", parent.display()))?;
    }

    let mut body = default_config_header(path);
    body.push_str(&schema::default_config_toml()?);
    fs::write(path, body).with_context(|| format!("writing config file to {}", path.display()))
}

fn default_config_header(path: &Path) -> String {
    let prefix = env_prefix();
    format!(
        "# Configuration for {APP_NAME}\n\
         # File: {file}\n\
         #\n\
         # Any key can be overridden as {prefix}__<SECTION>__<KEY>, e.g. {prefix}__SERVICE__HOST.\n\
         # Secrets are never read from here: use {prefix}_PASSWORD or {prefix}_ACCESS_TOKEN.\n\n",
        file = path.display(),
    )
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::AppConfig;

    #[test]
    fn command_line_wins_over_environment() {
        let dir = env::temp_dir();
        let paths =
            AppPaths::resolve(Some(&dir), Some(Path::new("/nowhere/else.toml"))).expect("resolve");
        assert_eq!(paths.config_file, dir.join(CONFIG_FILE_NAME));
        assert_eq!(paths.origin, ConfigOrigin::CommandLine);
    }

    #[test]
    fn environment_file_is_used_verbatim() {
        let file = env::temp_dir().join("avrio-env-config.toml");
        let paths = AppPaths::resolve(None, Some(&file)).expect("resolve");
        assert_eq!(paths.config_file, file);
        assert_eq!(paths.origin, ConfigOrigin::Environment);
        assert!(paths.to_string().ends_with("(AVRIO_CONFIG)"));
    }

    #[test]
    fn default_location_is_under_app_dir() {
        let paths = AppPaths::resolve(None, None).expect("resolve");
        assert_eq!(paths.origin, ConfigOrigin::Default);
        assert!(paths.config_file.ends_with("avrio/config.toml"));
    }

    #[test]
    fn default_config_round_trips_through_loader() {
        let dir = env::temp_dir().join(format!("avrio-paths-{}", std::process::id()));
        let path = dir.join("nested").join(CONFIG_FILE_NAME);

        write_default_config(&path).expect("write default config");
        let written = fs::read_to_string(&path).expect("read config");
        assert!(written.starts_with("# Configuration for avrio"));
        assert!(written.contains("AVRIO__SERVICE__HOST"));
        assert!(!written.contains("password ="));

        let loaded = AppConfig::load_from_path(&path).expect("load written config");
        assert_eq!(loaded.profile, "default");
        assert_eq!(loaded.endpoints, crate::Endpoints::default());

        fs::remove_dir_all(&dir).ok();
    }
}
