//! Codec configuration module.
//!
//! This module defines configuration for the prefixed tree encoder and
//! decoder: the bounded wait applied to every blocking operation, stream
//! buffering, and decode-side limits.

use super::{ConfigResult, Validate};
use crate::error::config::ConfigError;
use serde::{Deserialize, Serialize};
use std::time::Duration;

/// Default bounded wait for resolving a node or joining the decoder worker.
pub const DEFAULT_TIMEOUT_MS: u64 = 60_000;

/// Default upper bound on a single decoded string payload.
pub const DEFAULT_MAX_STRING_BYTES: usize = 1024 * 1024;

/// Codec configuration.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct CodecConfig {
    /// Bounded wait in milliseconds for node resolution and worker join
    pub timeout_ms: u64,

    /// Maximum accepted length of a decoded string in bytes
    pub max_string_bytes: usize,

    /// Size of the read and write buffers in bytes
    pub buffer_size: usize,

    /// Name given to the decoder's background thread
    pub worker_thread_name: String,

    /// Number of concurrent reader threads used when resolving references in bulk
    pub reader_threads: usize,
}

impl CodecConfig {
    /// Returns the bounded wait as a [`Duration`].
    pub fn timeout(&self) -> Duration {
        Duration::from_millis(self.timeout_ms)
    }

    /// Sets the bounded wait.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout_ms = timeout.as_millis() as u64;
        self
    }
}

impl Default for CodecConfig {
    fn default() -> Self {
        Self {
            timeout_ms: DEFAULT_TIMEOUT_MS,
            max_string_bytes: DEFAULT_MAX_STRING_BYTES,
            buffer_size: 64 * 1024,
            worker_thread_name: "prefixed-tree-decoder".to_string(),
            reader_threads: num_cpus::get(),
        }
    }
}

impl Validate for CodecConfig {
    fn validate(&self) -> ConfigResult<()> {
        if self.timeout_ms == 0 {
            return Err(ConfigError::ValidationError(
                "timeout_ms must be greater than 0".to_string(),
            ));
        }

        if self.max_string_bytes == 0 {
            return Err(ConfigError::ValidationError(
                "max_string_bytes must be greater than 0".to_string(),
            ));
        }

        if self.buffer_size == 0 {
            return Err(ConfigError::ValidationError(
                "buffer_size must be greater than 0".to_string(),
            ));
        }

        if self.worker_thread_name.trim().is_empty() {
            return Err(ConfigError::ValidationError(
                "worker_thread_name cannot be empty".to_string(),
            ));
        }

        if self.reader_threads == 0 || self.reader_threads > 1024 {
            return Err(ConfigError::ValueOutOfRange {
                key: "reader_threads".to_string(),
                message: "must be between 1 and 1024".to_string(),
            });
        }

        Ok(())
    }
}
