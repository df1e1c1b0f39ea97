#![deny(clippy::pedantic, unsafe_code)]
#![allow(clippy::module_name_repetitions)]

//! Configuration management for plugpack
//!
//! This crate handles loading and merging configuration from:
//! - Default values (hard-coded)
//! - Configuration file (~/.config/plugpack/config.toml)
//! - Environment variables
//! - CLI flags (applied by the binary)

use plugpack_errors::{ConfigError, Error};
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};
use tracing::debug;

/// Environment variable for `SOURCE_DATE_EPOCH` (standard for reproducible builds)
pub const SOURCE_DATE_EPOCH_VAR: &str = "SOURCE_DATE_EPOCH";

/// Main configuration structure
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct Config {
    #[serde(default)]
    pub pack: PackConfig,
}

/// Packaging configuration
#[derive(Debug, Clone, Serialize, Deserialize, Default)]
pub struct PackConfig {
    /// Patterns applied to every `package` run on top of the caller's own
    #[serde(default)]
    pub default_excludes: Vec<String>,
    #[serde(default)]
    pub clean_staging: bool,
    /// mtime written into every archive header
    #[serde(default)]
    pub timestamp: u64,
}

impl Config {
    /// Get the default config file path
    ///
    /// # Errors
    ///
    /// Returns an error if the system config directory cannot be determined.
    pub fn default_path() -> Result<PathBuf, Error> {
        let config_dir = dirs::config_dir().ok_or_else(|| ConfigError::NotFound {
            path: "config directory".to_string(),
        })?;
        Ok(config_dir.join("plugpack").join("config.toml"))
    }

    /// Load configuration from file
    ///
    /// # Errors
    ///
    /// Returns an error if the file cannot be read or if the file contents
    /// contain invalid TOML syntax that cannot be parsed.
    pub fn load_from_file(path: &Path) -> Result<Self, Error> {
        let contents = std::fs::read_to_string(path).map_err(|_| ConfigError::NotFound {
            path: path.display().to_string(),
        })?;

        debug!(path = %path.display(), "loaded config file");
        toml::from_str(&contents)
            .map_err(|e| ConfigError::ParseError {
                message: e.to_string(),
            })
            .map_err(Into::into)
    }

    /// Load configuration with fallback to defaults
    ///
    /// # Errors
    ///
    /// Returns an error if the configuration file exists but cannot be read
    /// or contains invalid TOML syntax.
    pub fn load() -> Result<Self, Error> {
        match Self::default_path() {
            Ok(config_path) if config_path.exists() => Self::load_from_file(&config_path),
            _ => Ok(Self::default()),
        }
    }

    /// Load configuration from an optional path or use default
    ///
    /// # Errors
    ///
    /// Returns an error if the config file cannot be read or parsed
    pub fn load_or_default(path: Option<&Path>) -> Result<Self, Error> {
        match path {
            Some(config_path) => Self::load_from_file(config_path),
            None => Self::load(),
        }
    }

    /// Merge with environment variables
    ///
    /// # Errors
    ///
    /// Returns an error if environment variables contain invalid values
    /// that cannot be parsed into the expected types.
    pub fn merge_env(&mut self) -> Result<(), Error> {
        self.merge_from(|key| std::env::var(key).ok())
    }

    /// Merge values from an arbitrary variable lookup
    ///
    /// # Errors
    ///
    /// Returns an error if a variable holds a value that cannot be parsed.
    pub fn merge_from<F>(&mut self, lookup: F) -> Result<(), Error>
    where
        F: Fn(&str) -> Option<String>,
    {
        // PLUGPACK_EXCLUDE replaces the default exclusion list
        if let Some(excludes) = lookup("PLUGPACK_EXCLUDE") {
            self.pack.default_excludes = excludes
                .split(',')
                .map(str::trim)
                .filter(|s| !s.is_empty())
                .map(ToString::to_string)
                .collect();
        }

        if let Some(clean) = lookup("PLUGPACK_CLEAN_STAGING") {
            self.pack.clean_staging = match clean.as_str() {
                "true" | "1" | "yes" => true,
                "false" | "0" | "no" => false,
                _ => {
                    return Err(ConfigError::InvalidValue {
                        field: "PLUGPACK_CLEAN_STAGING".to_string(),
                        value: clean,
                    }
                    .into())
                }
            };
        }

        if let Some(epoch) = lookup(SOURCE_DATE_EPOCH_VAR) {
            self.pack.timestamp = epoch.parse().map_err(|_| ConfigError::InvalidValue {
                field: SOURCE_DATE_EPOCH_VAR.to_string(),
                value: epoch,
            })?;
        }

        Ok(())
    }
}
