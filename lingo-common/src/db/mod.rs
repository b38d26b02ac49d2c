//! Database models and queries

pub mod models;

#[cfg(feature = "sqlx")]
pub mod explanations;
#[cfg(feature = "sqlx")]
pub mod init;
#[cfg(feature = "sqlx")]
pub mod languages;
#[cfg(feature = "sqlx")]
pub mod phrases;
#[cfg(feature = "sqlx")]
pub mod progress;
#[cfg(feature = "sqlx")]
pub mod users;

pub use models::*;

#[cfg(feature = "sqlx")]
pub use explanations::SqliteExplanationStore;
#[cfg(feature = "sqlx")]
pub use init::{create_schema, init_database, init_memory_database};

#[cfg(feature = "sqlx")]
use crate::{Error, Result};

/// Parse a UUID stored as TEXT
#[cfg(feature = "sqlx")]
pub(crate) fn parse_uuid(value: &str) -> Result<uuid::Uuid> {
    uuid::Uuid::parse_str(value)
        .map_err(|e| Error::Internal(format!("Invalid UUID '{}' in database: {}", value, e)))
}

/// Map a unique-constraint violation to [`Error::Conflict`]
#[cfg(feature = "sqlx")]
pub(crate) fn conflict_or_database(err: sqlx::Error, what: impl FnOnce() -> String) -> Error {
    if let sqlx::Error::Database(db_err) = &err {
        if db_err.is_unique_violation() {
            return Error::Conflict(what());
        }
    }
    Error::Database(err)
}

/// Decode a JSON TEXT column, tolerating NULL and bad data
#[cfg(feature = "sqlx")]
pub(crate) fn decode_json_list<T: serde::de::DeserializeOwned>(
    column: &str,
    value: Option<String>,
) -> Vec<T> {
    match value {
        None => Vec::new(),
        Some(text) => serde_json::from_str(&text).unwrap_or_else(|e| {
            tracing::warn!(column, error = %e, "Ignoring unreadable JSON column");
            Vec::new()
        }),
    }
}
