//! Storage error types
//!
//! Storage failures are never shown to API callers verbatim. The dispatcher
//! wraps them into a generic internal error and keeps the detail for logs.

use thiserror::Error;

use super::backend::StorageFamily;

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Errors raised by storage backends, the registry and the model layer
#[derive(Debug, Clone, Error)]
pub enum StorageError {
    /// No backend registered under this name
    #[error("Database {0} does not exist")]
    UnknownDatabase(String),

    /// DSN names an engine family this build cannot open
    #[error("Storage engine '{scheme}' ({family}) is not available")]
    UnsupportedEngine {
        scheme: String,
        family: StorageFamily,
    },

    /// DSN could not be parsed
    #[error("Invalid DSN '{0}'")]
    InvalidDsn(String),

    /// Model search without any filter
    #[error("Attempt to perform model search with empty parameters")]
    EmptyFilter,

    /// A stored record does not map onto the model
    #[error("Malformed record in {source_name}: {reason}")]
    MalformedRecord { source_name: String, reason: String },

    /// More than one record matched a strict single-record lookup
    #[error("More than one record in {0} matched a single-record lookup")]
    Ambiguous(String),

    /// Backend internal lock was poisoned by a panicking writer
    #[error("Storage lock poisoned")]
    LockPoisoned,
}

impl StorageError {
    /// Shorthand for a record that failed to map onto a model
    pub fn malformed(source_name: &str, reason: impl Into<String>) -> Self {
        StorageError::MalformedRecord {
            source_name: source_name.to_string(),
            reason: reason.into(),
        }
    }
}
