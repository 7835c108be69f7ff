//! Error types
//!
//! The real-time paths (`read`, `feed`, `skip`, `try_lock`) report through
//! plain return values. Only construction and configuration can fail.

use std::io;
use std::path::PathBuf;

use thiserror::Error;

/// Mutex backend errors
#[derive(Debug, Error)]
pub enum MutexError {
    /// The native primitive could not be initialized. The owning component
    /// should fail its own construction.
    #[error("{backend} mutex initialization failed: {source}")]
    Init {
        backend: &'static str,
        #[source]
        source: io::Error,
    },
}

/// Stress configuration errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("failed to read config file {path}: {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: io::Error,
    },
    #[error("invalid config file: {0}")]
    Parse(#[from] toml::de::Error),
    #[error("invalid config value: {0}")]
    Invalid(String),
}
