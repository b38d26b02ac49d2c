//! Common error types for Lingo

use thiserror::Error;

/// Common result type for Lingo operations
pub type Result<T> = std::result::Result<T, Error>;

/// Common error types across Lingo crates
#[derive(Error, Debug)]
pub enum Error {
    /// Database operation error (wraps sqlx::Error)
    #[cfg(feature = "sqlx")]
    #[error("Database error: {0}")]
    Database(#[from] sqlx::Error),

    /// I/O operation error (wraps std::io::Error)
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    /// Stored JSON column could not be (de)serialized
    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Configuration loading or validation error
    #[error("Configuration error: {0}")]
    Config(String),

    /// Requested resource not found
    #[error("Not found: {0}")]
    NotFound(String),

    /// Invalid user input or request parameter
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// A record with the same unique key already exists
    ///
    /// Raised by persistence layers in place of engine-specific
    /// constraint codes.
    #[error("Conflict: {0}")]
    Conflict(String),

    /// External generator (LLM) failed or returned unusable output
    #[error("Generator error: {0}")]
    Generator(String),

    /// Internal error
    #[error("Internal error: {0}")]
    Internal(String),
}

impl Error {
    /// True for uniqueness conflicts, which callers may treat as success
    pub fn is_conflict(&self) -> bool {
        matches!(self, Error::Conflict(_))
    }
}
