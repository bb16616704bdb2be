//! Configuration file resolution and TOML loading
//!
//! Config file location follows a fixed priority order:
//! 1. Command-line argument (highest priority)
//! 2. Environment variable
//! 3. Per-user config directory (`~/.config/siteguard/config.toml` on Linux)
//! 4. System config (`/etc/siteguard/config.toml`, Linux only)
//! 5. Compiled defaults (no file)
//!
//! A missing config file is not an error: the caller logs a warning and falls back
//! to compiled defaults. A file that exists but fails to parse IS an error.

use crate::{Error, Result};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable naming an explicit config file
pub const CONFIG_ENV_VAR: &str = "SITEGUARD_CONFIG";

/// Application directory name under the platform config dir
const APP_DIR: &str = "siteguard";

/// Logging configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct LoggingConfig {
    /// Log level (trace, debug, info, warn, error)
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Log file path (optional, logs to stderr if not specified)
    #[serde(default)]
    pub file: Option<PathBuf>,
}

impl Default for LoggingConfig {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            file: None,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Where the effective configuration came from
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ConfigSource {
    CommandLine(PathBuf),
    Environment(PathBuf),
    UserConfig(PathBuf),
    SystemConfig(PathBuf),
    CompiledDefaults,
}

impl ConfigSource {
    /// Path of the config file, if one was found
    pub fn path(&self) -> Option<&Path> {
        match self {
            ConfigSource::CommandLine(p)
            | ConfigSource::Environment(p)
            | ConfigSource::UserConfig(p)
            | ConfigSource::SystemConfig(p) => Some(p),
            ConfigSource::CompiledDefaults => None,
        }
    }
}

/// Config file resolver
pub struct ConfigFileResolver {
    cli_arg: Option<PathBuf>,
    env_var_name: String,
}

impl ConfigFileResolver {
    pub fn new(cli_arg: Option<PathBuf>) -> Self {
        Self {
            cli_arg,
            env_var_name: CONFIG_ENV_VAR.to_string(),
        }
    }

    /// Override the environment variable consulted at priority 2
    pub fn with_env_var(mut self, name: impl Into<String>) -> Self {
        self.env_var_name = name.into();
        self
    }

    /// Resolve the config file location
    ///
    /// CLI and environment paths are returned even if the file does not exist,
    /// so that an explicit but wrong path surfaces as a load error.
    pub fn resolve(&self) -> ConfigSource {
        if let Some(path) = &self.cli_arg {
            return ConfigSource::CommandLine(path.clone());
        }

        if let Ok(path) = std::env::var(&self.env_var_name) {
            if !path.trim().is_empty() {
                return ConfigSource::Environment(PathBuf::from(path));
            }
        }

        if let Some(user) = dirs::config_dir().map(|d| d.join(APP_DIR).join("config.toml")) {
            if user.exists() {
                return ConfigSource::UserConfig(user);
            }
        }

        if cfg!(target_os = "linux") {
            let system = PathBuf::from("/etc").join(APP_DIR).join("config.toml");
            if system.exists() {
                return ConfigSource::SystemConfig(system);
            }
        }

        ConfigSource::CompiledDefaults
    }
}

/// Load and parse a TOML file
pub fn load_toml<T: DeserializeOwned>(path: &Path) -> Result<T> {
    let content = std::fs::read_to_string(path)
        .map_err(|e| Error::Config(format!("Read {} failed: {}", path.display(), e)))?;
    toml::from_str(&content)
        .map_err(|e| Error::Config(format!("Parse {} failed: {}", path.display(), e)))
}

/// Load config from the resolved source, falling back to defaults
///
/// Explicit sources (CLI, environment) must exist. Discovered sources are
/// only returned by the resolver when they exist.
pub fn load_or_default<T: DeserializeOwned + Default>(source: &ConfigSource) -> Result<T> {
    match source {
        ConfigSource::CompiledDefaults => Ok(T::default()),
        other => {
            let path = other.path().ok_or_else(|| {
                Error::Internal("config source without a path".to_string())
            })?;
            debug!(path = %path.display(), "Loading config file");
            load_toml(path)
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[derive(Debug, Default, Deserialize)]
    struct Sample {
        #[serde(default)]
        logging: LoggingConfig,
    }

    #[test]
    fn test_logging_defaults() {
        let logging = LoggingConfig::default();
        assert_eq!(logging.level, "info");
        assert!(logging.file.is_none());
    }

    #[test]
    fn test_cli_argument_wins() {
        let resolver = ConfigFileResolver::new(Some(PathBuf::from("/tmp/explicit.toml")));
        assert_eq!(
            resolver.resolve(),
            ConfigSource::CommandLine(PathBuf::from("/tmp/explicit.toml"))
        );
    }

    #[test]
    fn test_compiled_defaults_load() {
        let sample: Sample = load_or_default(&ConfigSource::CompiledDefaults).unwrap();
        assert_eq!(sample.logging.level, "info");
    }

    #[test]
    fn test_missing_explicit_file_is_error() {
        let source = ConfigSource::CommandLine(PathBuf::from("/nonexistent/siteguard.toml"));
        let result: Result<Sample> = load_or_default(&source);
        assert!(matches!(result, Err(Error::Config(_))));
    }
}
