//! Error types for worklog-core

use thiserror::Error;

/// Result type alias using worklog-core's Error
pub type Result<T> = std::result::Result<T, Error>;

/// Errors that can occur in worklog-core operations
#[derive(Error, Debug)]
pub enum Error {
    /// SQLite error
    #[error("Database error: {0}")]
    Database(#[from] rusqlite::Error),

    /// IO error
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Record not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid input
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A live record with the same unique key already exists
    #[error("Already exists: {0}")]
    Duplicate(String),

    /// Serialization error
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}
