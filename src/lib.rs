//! Mauka Paths Library
//!
//! This library deduplicates and compactly persists large numbers of
//! filesystem paths inside an incremental build cache. Paths are recorded
//! into a concurrent prefixed tree and referenced by small integer ids; the
//! tree is written once, compressed, and decoded lazily on the next build
//! while any number of threads resolve ids back into paths.
//!
//! # Architecture
//!
//! - [`data_structures::prefixed_tree`]: the concurrent tree and its compression
//! - [`protocol::stream`]: byte stream primitives
//! - [`protocol::tree`]: the tree encoder and the background-fed decoder
//! - [`config`] and [`error`]: the ambient configuration and error handling

// Re-export public modules
pub mod config;
pub mod data_structures;
pub mod error;
pub mod protocol;

// Internal modules that are not part of the public API
#[cfg(test)]
pub(crate) mod tests;

/// Version information for Mauka Paths.
pub const VERSION: &str = env!("CARGO_PKG_VERSION");

/// Library initialization function.
///
/// Installs the tracing error reporter and loads the global configuration
/// from `config_path` (if given) and `MAUKA_PATHS__*` environment variables.
pub fn init(config_path: Option<&std::path::Path>) -> error::PathsResult<()> {
    error::set_error_reporter(std::sync::Arc::new(error::TracingErrorReporter));

    let loader = config::ConfigLoader::new(config_path, config::ENV_PREFIX);
    config::init_global_config(loader.load()?);

    Ok(())
}
