//! Error types for scanpair-core

use thiserror::Error;

/// Result type alias using scanpair-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in scanpair-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Rejected scan or selection
    #[error("Invalid scan: {0}")]
    Validation(#[from] crate::capture::ValidationError),

    /// Blocking store task panicked or was cancelled
    #[error("Background task failed: {0}")]
    Task(#[from] tokio::task::JoinError),

    /// Configuration error
    #[error("Configuration error: {0}")]
    Config(String),
}
