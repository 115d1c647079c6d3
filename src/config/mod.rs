//! Configuration file loading and parsing.
//!
//! This module handles loading the configuration file from disk and parsing
//! it into validated, type-safe structures.
//!
//! # Configuration File Locations
//!
//! The configuration file is searched in the following order:
//!
//! 1. Path specified on the command line (must exist)
//! 2. Default location:
//!    - **Linux/macOS:** `~/.toolhost-mcp/config.json`
//!    - **Windows:** `%USERPROFILE%\.toolhost-mcp\config.json`
//!
//! When neither is present the built-in defaults are used.

mod settings;

pub use settings::{
    Config, HttpConfig, LimitsConfig, LoggingConfig, ServerConfig, TimeoutsConfig,
};

use std::path::{Path, PathBuf};

use crate::error::ConfigError;

/// Returns the default configuration directory path.
///
/// This is `~/.toolhost-mcp` on all platforms.
#[must_use]
pub fn default_config_dir() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".toolhost-mcp"))
}

/// Returns the default configuration file path.
///
/// This is `~/.toolhost-mcp/config.json`.
#[must_use]
pub fn default_config_path() -> Option<PathBuf> {
    default_config_dir().map(|dir| dir.join("config.json"))
}

/// Loads configuration from the specified path or the default location.
///
/// An explicit `path` must point at an existing file. With `None`, the
/// default path is loaded when the file exists; otherwise the built-in
/// defaults are returned.
///
/// # Errors
///
/// Returns an error if an explicit path does not exist, if the file
/// cannot be read or parsed, or if validation fails.
pub fn load_config(path: Option<&Path>) -> Result<Config, ConfigError> {
    let config_path = match path {
        Some(p) => {
            if !p.exists() {
                return Err(ConfigError::NotFound {
                    path: p.to_path_buf(),
                });
            }
            p.to_path_buf()
        }
        None => match default_config_path() {
            Some(p) if p.exists() => p,
            _ => return Ok(Config::default()),
        },
    };

    let contents = std::fs::read_to_string(&config_path).map_err(|e| ConfigError::ReadError {
        path: config_path.clone(),
        source: e,
    })?;

    let config: Config = serde_json::from_str(&contents).map_err(|e| ConfigError::ParseError {
        path: config_path.clone(),
        source: e,
    })?;

    config.validate()?;

    Ok(config)
}
