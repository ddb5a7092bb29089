//! Runtime error types.

use thiserror::Error;

/// Errors surfaced by the runtime layer.
///
/// Tool failures never appear here: they are caught at dispatch and
/// recorded as error tool messages. A `RuntimeError` ends the turn.
#[derive(Debug, Error)]
pub enum RuntimeError {
    /// Persistence failure.
    #[error("storage error: {0}")]
    Storage(#[from] tandem_store::StoreError),

    /// Model backend failure.
    #[error("backend error: {0}")]
    Backend(#[from] tandem_llm::BackendError),

    /// Bad input. Never retried.
    #[error("validation error: {0}")]
    Validation(String),

    /// Referenced entity does not exist.
    #[error("not found: {0}")]
    NotFound(String),

    /// JSON (de)serialization failure.
    #[error("serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Runtime result alias.
pub type Result<T, E = RuntimeError> = std::result::Result<T, E>;
