use std::fs;
use std::path::{Path, PathBuf};

use thiserror::Error;

use super::types::Config;

pub const MAX_SEARCH_LIMIT: u64 = 100;

/// Errors that can occur when loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file '{path}': {source}")]
    ReadError {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Failed to parse config file '{path}': {source}")]
    ParseError {
        path: PathBuf,
        #[source]
        source: toml::de::Error,
    },

    #[error("Config validation failed: {message}")]
    ValidationError { message: String },
}

impl Config {
    /// Reads, parses and validates a TOML config file.
    pub fn load_from(path: &Path) -> Result<Self, ConfigError> {
        let content = fs::read_to_string(path).map_err(|e| ConfigError::ReadError {
            path: path.to_path_buf(),
            source: e,
        })?;

        let config: Config = toml::from_str(&content).map_err(|e| ConfigError::ParseError {
            path: path.to_path_buf(),
            source: e,
        })?;

        config.validate()?;
        Ok(config)
    }

    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.server.port == 0 {
            return Err(ConfigError::ValidationError {
                message: "server.port must be non-zero".to_string(),
            });
        }

        if self.docker.timeout_seconds == 0 {
            return Err(ConfigError::ValidationError {
                message: "docker.timeout_seconds must be non-zero".to_string(),
            });
        }

        if self.search.limit == 0 || self.search.limit > MAX_SEARCH_LIMIT {
            return Err(ConfigError::ValidationError {
                message: format!(
                    "search.limit must be between 1 and {}, got {}",
                    MAX_SEARCH_LIMIT, self.search.limit
                ),
            });
        }

        Ok(())
    }
}
