//! Backend error types.

use thiserror::Error;

/// Errors produced by a model backend.
#[derive(Debug, Error)]
pub enum BackendError {
    /// Transport-level HTTP failure.
    #[error("http error: {0}")]
    Http(#[from] reqwest::Error),

    /// Non-success API response.
    #[error("api error ({status}): {message}")]
    Api {
        /// HTTP status code.
        status: u16,
        /// Provider error message.
        message: String,
        /// Whether a retry could plausibly succeed.
        retryable: bool,
    },

    /// 429 with optional retry hint.
    #[error("rate limited: {message}")]
    RateLimited {
        /// Retry delay from the `retry-after` header, in milliseconds.
        retry_after_ms: u64,
        /// Provider error message.
        message: String,
    },

    /// Credential problem, detected before or after sending.
    #[error("auth error: {message}")]
    Auth {
        /// What went wrong.
        message: String,
    },

    /// Response body did not parse or was missing required fields.
    #[error("invalid response: {0}")]
    InvalidResponse(String),

    /// JSON (de)serialization failure.
    #[error("json error: {0}")]
    Json(#[from] serde_json::Error),
}

/// Backend result alias.
pub type BackendResult<T, E = BackendError> = std::result::Result<T, E>;
