//! Scheduler and configuration error types

use std::path::PathBuf;
use thiserror::Error;

/// Errors from the process-wide scheduler lifecycle
#[derive(Error, Debug)]
pub enum SchedulerError {
    /// `init_scheduler` called while a scheduler is already installed
    #[error("animation scheduler already initialized on this thread")]
    AlreadyInitialized,

    /// A global operation was used before `init_scheduler`
    #[error("animation scheduler not initialized; call init_scheduler() first")]
    NotInitialized,

    /// Invalid scheduler configuration
    #[error(transparent)]
    Config(#[from] ConfigError),
}

/// Errors while loading a [`SchedulerConfig`](crate::SchedulerConfig)
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Failed to read the config file
    #[error("failed to read scheduler config {}: {source}", path.display())]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Malformed TOML or unknown keys
    #[error("invalid scheduler config: {0}")]
    Parse(#[from] toml::de::Error),

    /// A value that parses but cannot be used
    #[error("invalid value for `{field}`: {reason}")]
    Invalid { field: &'static str, reason: String },
}

/// Result type for scheduler operations
pub type Result<T> = std::result::Result<T, SchedulerError>;
