//! Configuration management for the pricing engine.
//!
//! Configuration is layered:
//! 1. Default values (hardcoded)
//! 2. Configuration file (YAML)
//! 3. Environment variables (override)
//!
//! Environment variables use the `PRICEWISE_` prefix and `__` as the nested
//! key separator, e.g. `PRICEWISE_CACHE__WRITE_BACK=false`.
//!
//! # Example
//!
//! ```ignore
//! use pricewise_server::config::EngineConfig;
//!
//! let config = EngineConfig::load("pricewise.yaml")?;
//! let config = EngineConfig::from_env()?;
//! ```

use config::{Config, ConfigError, Environment, File, FileFormat};
use pricewise_domain::cache::PolicyCacheConfig;
use pricewise_domain::resolver::ResolutionConfig;
use serde::{Deserialize, Serialize};
use std::path::Path;

const ENV_PREFIX: &str = "PRICEWISE";

/// Engine configuration.
#[derive(Debug, Clone, Default, Deserialize, Serialize, PartialEq)]
pub struct EngineConfig {
    /// Policy cache settings
    #[serde(default)]
    pub cache: CacheSettings,

    /// Logging settings
    #[serde(default)]
    pub logging: LoggingSettings,
}

/// Policy cache settings.
///
/// # Example YAML Configuration
///
/// ```yaml
/// cache:
///   enabled: true
///   write_back: true
///   max_capacity: 100000
/// ```
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct CacheSettings {
    /// Read policies from the cache before falling back to the repository.
    ///
    /// Environment variable: `PRICEWISE_CACHE__ENABLED`
    #[serde(default = "default_true")]
    pub enabled: bool,

    /// Write repository results back into the cache.
    ///
    /// Environment variable: `PRICEWISE_CACHE__WRITE_BACK`
    #[serde(default = "default_true")]
    pub write_back: bool,

    /// Maximum number of cached policy entries.
    #[serde(default = "default_max_capacity")]
    pub max_capacity: u64,
}

impl Default for CacheSettings {
    fn default() -> Self {
        Self {
            enabled: true,
            write_back: true,
            max_capacity: default_max_capacity(),
        }
    }
}

fn default_true() -> bool {
    true
}

fn default_max_capacity() -> u64 {
    PolicyCacheConfig::default().max_capacity
}

/// Logging settings.
#[derive(Debug, Clone, Deserialize, Serialize, PartialEq)]
pub struct LoggingSettings {
    /// Log level: "trace", "debug", "info", "warn", "error"
    #[serde(default = "default_log_level")]
    pub level: String,

    /// Use JSON format (true for production, false for development)
    #[serde(default)]
    pub json: bool,
}

impl Default for LoggingSettings {
    fn default() -> Self {
        Self {
            level: default_log_level(),
            json: false,
        }
    }
}

fn default_log_level() -> String {
    "info".to_string()
}

/// Error type for configuration loading.
#[derive(Debug, thiserror::Error)]
pub enum ConfigLoadError {
    #[error("failed to load configuration: {0}")]
    Load(#[from] ConfigError),

    #[error("configuration file not found: {path}")]
    FileNotFound { path: String },

    #[error("invalid configuration: {message}")]
    Invalid { message: String },
}

impl EngineConfig {
    /// Loads configuration from a YAML file with environment variable overrides.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self, ConfigLoadError> {
        let path = path.as_ref();

        if !path.exists() {
            return Err(ConfigLoadError::FileNotFound {
                path: path.display().to_string(),
            });
        }

        let config = Config::builder()
            .add_source(Config::try_from(&EngineConfig::default())?)
            .add_source(File::from(path).format(FileFormat::Yaml))
            .add_source(env_source())
            .build()?;

        let engine_config: EngineConfig = config.try_deserialize()?;
        engine_config.validate()?;

        Ok(engine_config)
    }

    /// Loads configuration from defaults and `PRICEWISE_` environment variables.
    pub fn from_env() -> Result<Self, ConfigLoadError> {
        let config = Config::builder()
            .add_source(Config::try_from(&EngineConfig::default())?)
            .add_source(env_source())
            .build()?;

        let engine_config: EngineConfig = config.try_deserialize()?;
        engine_config.validate()?;

        Ok(engine_config)
    }

    /// Validates the configuration.
    pub fn validate(&self) -> Result<(), ConfigLoadError> {
        if self.cache.max_capacity == 0 {
            return Err(ConfigLoadError::Invalid {
                message: "cache.max_capacity must be greater than 0".to_string(),
            });
        }

        let valid_levels = ["trace", "debug", "info", "warn", "error"];
        if !valid_levels.contains(&self.logging.level.to_lowercase().as_str()) {
            return Err(ConfigLoadError::Invalid {
                message: format!(
                    "logging.level must be one of: {:?}, got: {}",
                    valid_levels, self.logging.level
                ),
            });
        }

        Ok(())
    }

    /// Orchestrator switches derived from the cache settings.
    pub fn resolution_config(&self) -> ResolutionConfig {
        ResolutionConfig::default()
            .with_cache_reads(self.cache.enabled)
            .with_write_back(self.cache.write_back)
    }

    /// Sizing for the in-process policy cache.
    pub fn cache_config(&self) -> PolicyCacheConfig {
        PolicyCacheConfig::default().with_max_capacity(self.cache.max_capacity)
    }
}

// PRICEWISE_CACHE__WRITE_BACK -> cache.write_back
fn env_source() -> Environment {
    Environment::with_prefix(ENV_PREFIX)
        .prefix_separator("_")
        .separator("__")
}

#[cfg(test)]
mod tests {
    use super::*;
    use serial_test::serial;
    use std::io::Write;
    use tempfile::NamedTempFile;

    #[test]
    #[serial]
    fn test_can_load_config_from_yaml_file() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
cache:
  enabled: false
  write_back: false
  max_capacity: 500

logging:
  level: debug
  json: true
"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();

        assert!(!config.cache.enabled);
        assert!(!config.cache.write_back);
        assert_eq!(config.cache.max_capacity, 500);
        assert_eq!(config.logging.level, "debug");
        assert!(config.logging.json);
    }

    #[test]
    #[serial]
    fn test_partial_file_keeps_defaults() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
logging:
  level: warn
"#
        )
        .unwrap();

        let config = EngineConfig::load(file.path()).unwrap();

        assert_eq!(config.cache, CacheSettings::default());
        assert_eq!(config.logging.level, "warn");
    }

    #[test]
    #[serial]
    fn test_can_override_config_with_env_vars() {
        let mut file = NamedTempFile::new().unwrap();
        writeln!(
            file,
            r#"
cache:
  write_back: true
  max_capacity: 1000
"#
        )
        .unwrap();

        std::env::set_var("PRICEWISE_CACHE__WRITE_BACK", "false");
        std::env::set_var("PRICEWISE_LOGGING__LEVEL", "error");

        let config = EngineConfig::load(file.path());

        std::env::remove_var("PRICEWISE_CACHE__WRITE_BACK");
        std::env::remove_var("PRICEWISE_LOGGING__LEVEL");

        let config = config.unwrap();
        assert!(!config.cache.write_back);
        assert_eq!(config.cache.max_capacity, 1000);
        assert_eq!(config.logging.level, "error");
    }

    #[test]
    #[serial]
    fn test_from_env_loads_defaults_with_env_overrides() {
        std::env::set_var("PRICEWISE_CACHE__ENABLED", "false");

        let config = EngineConfig::from_env();

        std::env::remove_var("PRICEWISE_CACHE__ENABLED");

        let config = config.unwrap();
        assert!(!config.cache.enabled);
        assert!(config.cache.write_back);
        assert_eq!(config.logging.level, "info");
    }

    #[test]
    fn test_config_validation_catches_errors() {
        let mut config = EngineConfig::default();
        config.cache.max_capacity = 0;
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("cache.max_capacity"));

        let mut config = EngineConfig::default();
        config.logging.level = "verbose".to_string();
        let err = config.validate().unwrap_err();
        assert!(err.to_string().contains("logging.level"));

        let mut config = EngineConfig::default();
        config.logging.level = "DEBUG".to_string();
        assert!(config.validate().is_ok());
    }

    #[test]
    #[serial]
    fn test_invalid_config_returns_clear_error() {
        let err = EngineConfig::load("/nonexistent/path/pricewise.yaml").unwrap_err();
        assert!(matches!(err, ConfigLoadError::FileNotFound { .. }));
        assert!(err.to_string().contains("not found"));

        let mut file = NamedTempFile::new().unwrap();
        writeln!(file, "invalid: yaml: syntax: [").unwrap();

        let err = EngineConfig::load(file.path()).unwrap_err();
        assert!(matches!(err, ConfigLoadError::Load(_)));
    }

    #[test]
    fn test_default_config_is_valid() {
        let config = EngineConfig::default();
        assert!(config.validate().is_ok());

        assert!(config.cache.enabled);
        assert!(config.cache.write_back);
        assert_eq!(config.cache.max_capacity, 100_000);
        assert_eq!(config.logging.level, "info");
        assert!(!config.logging.json);
    }

    #[test]
    fn test_derived_resolution_and_cache_configs() {
        let mut config = EngineConfig::default();
        config.cache.enabled = false;
        config.cache.max_capacity = 42;

        let resolution = config.resolution_config();
        assert!(!resolution.cache_reads);
        assert!(resolution.write_back);
        assert_eq!(config.cache_config().max_capacity, 42);
    }
}
