//! Configuration for model classes.
//!
//! [`StewardConfig`] holds the settings a [`ModelBuilder`](crate::ModelBuilder)
//! and [`Registry`](crate::Registry) apply at build time. Applications load it
//! from `config/config.toml` or environment variables with
//! `StewardConfig::load()`:
//!
//! ```toml
//! [steward]
//! default_manager = "objects"
//! strict_columns = true
//! ```
//!
//! or `STEWARD__STEWARD__DEFAULT_MANAGER=objects` in the environment.

use crate::model::{is_identifier, DEFAULT_MANAGER};
use config::{Config, ConfigError, Environment, File, FileFormat};
use serde::Deserialize;

const CONFIG_FILE: &str = "config/config.toml";

#[derive(Debug, Clone, Deserialize, PartialEq, Eq)]
pub struct StewardConfig {
    /// Name given to the implicit default manager
    #[serde(default = "default_manager_name")]
    pub default_manager: String,
    /// Reject querysets that reference undeclared columns
    #[serde(default = "default_strict_columns")]
    pub strict_columns: bool,
}

fn default_manager_name() -> String {
    DEFAULT_MANAGER.to_string()
}

fn default_strict_columns() -> bool {
    true
}

impl Default for StewardConfig {
    fn default() -> Self {
        Self {
            default_manager: default_manager_name(),
            strict_columns: default_strict_columns(),
        }
    }
}

impl StewardConfig {
    /// Load the `[steward]` section from `config/config.toml`, falling back to env vars.
    ///
    /// A missing section yields the defaults.
    pub fn load() -> Result<Self, ConfigError> {
        let builder = Config::builder()
            .add_source(File::with_name(CONFIG_FILE).required(false))
            .add_source(Environment::with_prefix("STEWARD").separator("__"));

        let settings = match builder.build() {
            Ok(cfg) => cfg,
            Err(err) => {
                if std::path::Path::new(CONFIG_FILE).exists() {
                    log::warn!("Failed to load {CONFIG_FILE}, falling back to env: {err}");
                }
                Config::builder()
                    .add_source(Environment::with_prefix("STEWARD").separator("__"))
                    .build()
                    .map_err(|env_err| {
                        ConfigError::Message(format!(
                            "Failed to load configuration from file and env: {err}, then env-only error: {env_err}"
                        ))
                    })?
            }
        };

        Self::from_settings(&settings)
    }

    /// Parse the `[steward]` section of a TOML document
    pub fn from_toml_str(toml: &str) -> Result<Self, ConfigError> {
        let settings = Config::builder()
            .add_source(File::from_str(toml, FileFormat::Toml))
            .build()?;
        Self::from_settings(&settings)
    }

    fn from_settings(settings: &Config) -> Result<Self, ConfigError> {
        let config = match settings.get::<StewardConfig>("steward") {
            Ok(config) => config,
            Err(ConfigError::NotFound(_)) => Self::default(),
            Err(e) => {
                return Err(ConfigError::Message(format!(
                    "Steward configuration could not be loaded from file or environment: {e}"
                )))
            }
        };
        config.validate()?;
        log::debug!("Loaded {config:?}");
        Ok(config)
    }

    fn validate(&self) -> Result<(), ConfigError> {
        if is_identifier(&self.default_manager) {
            Ok(())
        } else {
            Err(ConfigError::Message(format!(
                "default_manager '{}' is not a valid manager name",
                self.default_manager
            )))
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_defaults() {
        let config = StewardConfig::default();
        assert_eq!(config.default_manager, "query");
        assert!(config.strict_columns);
    }

    #[test]
    fn test_missing_section_uses_defaults() {
        let config = StewardConfig::from_toml_str("[database]\nurl = \"postgres://x\"\n").unwrap();
        assert_eq!(config, StewardConfig::default());
    }

    #[test]
    fn test_partial_section() {
        let config = StewardConfig::from_toml_str("[steward]\ndefault_manager = \"objects\"\n").unwrap();
        assert_eq!(config.default_manager, "objects");
        assert!(config.strict_columns);
    }

    #[test]
    fn test_full_section() {
        let config = StewardConfig::from_toml_str(
            "[steward]\ndefault_manager = \"rows\"\nstrict_columns = false\n",
        )
        .unwrap();
        assert_eq!(
            config,
            StewardConfig {
                default_manager: "rows".to_string(),
                strict_columns: false,
            }
        );
    }

    #[test]
    fn test_load_reads_environment() {
        const KEY: &str = "STEWARD__STEWARD__DEFAULT_MANAGER";

        std::env::set_var(KEY, "objects");
        let loaded = StewardConfig::load();
        std::env::set_var(KEY, "not a name");
        let rejected = StewardConfig::load();
        std::env::remove_var(KEY);

        let config = loaded.unwrap();
        assert_eq!(config.default_manager, "objects");
        assert!(config.strict_columns);
        assert!(rejected.is_err());
    }

    #[test]
    fn test_invalid_manager_name_rejected() {
        let err = StewardConfig::from_toml_str("[steward]\ndefault_manager = \"not a name\"\n")
            .unwrap_err();
        assert!(err.to_string().contains("not a valid manager name"), "{err}");
    }
}
