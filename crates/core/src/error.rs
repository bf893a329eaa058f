//! Error types for stagelog
//!
//! Only construction and configuration surface errors to callers. Failures
//! on the write path are reported through `tracing` and swallowed, so they
//! never appear here.

use std::io;
use std::path::PathBuf;
use thiserror::Error;

/// Result type alias for stagelog operations
pub type Result<T> = std::result::Result<T, LogError>;

/// Error types for stagelog
#[derive(Debug, Error)]
pub enum LogError {
    /// The active log file could not be opened or created
    #[error("failed to open log file '{}': {source}", path.display())]
    OpenFile {
        /// Path of the log file
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// The staging backing file could not be created, sized or mapped
    #[error("failed to set up staging file '{}': {source}", path.display())]
    Staging {
        /// Path of the staging file
        path: PathBuf,
        /// Underlying I/O error
        source: io::Error,
    },

    /// Generic I/O error
    #[error("I/O error: {0}")]
    Io(#[from] io::Error),

    /// Unknown severity name or rank
    #[error("invalid severity: {0}")]
    InvalidLevel(String),

    /// Invalid configuration value
    #[error("invalid configuration: {0}")]
    Config(String),
}
