//! Store error types.

use thiserror::Error;

/// Errors produced by the persistence layer.
#[derive(Debug, Error)]
pub enum StoreError {
    /// Underlying SQLite failure.
    #[error("sqlite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    /// Connection pool exhausted or broken.
    #[error("connection pool error: {0}")]
    Pool(#[from] r2d2::Error),

    /// Session does not exist (or is soft-deleted).
    #[error("session not found: {0}")]
    SessionNotFound(String),

    /// Job does not exist.
    #[error("job not found: {0}")]
    JobNotFound(String),

    /// A validation failure — bad input, never retried.
    #[error("invalid operation: {0}")]
    InvalidOperation(String),

    /// Illegal job state transition.
    #[error("invalid job transition: {from} -> {to}")]
    InvalidTransition {
        /// Current status.
        from: String,
        /// Requested status.
        to: String,
    },

    /// JSON (de)serialization failure for a metadata/payload column.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),

    /// Invariant violation inside the store.
    #[error("internal store error: {0}")]
    Internal(String),
}

/// Store result alias.
pub type Result<T, E = StoreError> = std::result::Result<T, E>;
