//! Configuration loading from TOML or JSON.

use std::fs;
use std::path::Path;

use tracing::debug;

use super::{Config, ConfigError, validate};

impl Config {
    /// Parses, normalizes and validates a TOML document.
    pub fn from_toml_str(source: &str) -> Result<Self, ConfigError> {
        Self::accept(toml::from_str(source)?)
    }

    /// Parses, normalizes and validates a JSON document.
    pub fn from_json_str(source: &str) -> Result<Self, ConfigError> {
        Self::accept(serde_json::from_str(source)?)
    }

    /// Loads `path`: JSON when the extension is `.json`, TOML otherwise.
    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        let source = fs::read_to_string(path).map_err(|source| ConfigError::Io {
            path: path.to_path_buf(),
            source,
        })?;

        let is_json = path
            .extension()
            .is_some_and(|ext| ext.eq_ignore_ascii_case("json"));
        debug!(path = %path.display(), json = is_json, "loading configuration");

        if is_json {
            Self::from_json_str(&source)
        } else {
            Self::from_toml_str(&source)
        }
    }

    /// Runs the semantic checks on an already-built configuration.
    pub fn validate(&self) -> Result<(), ConfigError> {
        validate(self).map_err(ConfigError::Invalid)
    }

    /// Renders the configuration as TOML.
    pub fn to_toml_string(&self) -> Result<String, ConfigError> {
        Ok(toml::to_string_pretty(self)?)
    }

    fn accept(mut config: Config) -> Result<Self, ConfigError> {
        config.normalize();
        config.validate()?;
        Ok(config)
    }
}
