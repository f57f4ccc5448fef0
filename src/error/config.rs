//! Configuration error module.
//!
//! Errors raised while loading `PathsConfig` from its file and environment
//! layers, or while checking codec and log settings.

use std::path::PathBuf;
use thiserror::Error;

/// Errors that can occur while loading or validating a `PathsConfig`.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// The `--config` file does not exist.
    #[error("Configuration file not found: {0}")]
    FileNotFound(PathBuf),

    /// The file or an environment override could not be parsed, or its
    /// extension is not one of toml, json, yaml.
    #[error("Failed to parse configuration: {0}")]
    ParseError(String),

    /// A setting such as `codec.timeout_ms` or `log.level` is unusable.
    #[error("Invalid configuration: {0}")]
    ValidationError(String),

    /// A numeric setting such as `codec.reader_threads` is outside its bounds.
    #[error("Configuration value {key} is out of range: {message}")]
    ValueOutOfRange {
        /// Dotted name of the setting
        key: String,
        /// Accepted bounds
        message: String,
    },
}
