//! Tool error types.

use thiserror::Error;

/// Errors produced by tool execution.
///
/// All variants are caught at dispatch: a failing tool becomes an error
/// tool message, never a failed turn.
#[derive(Debug, Error)]
pub enum ToolError {
    /// Input did not match the tool's schema.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The tool ran and failed.
    #[error("execution failed: {0}")]
    ExecutionFailed(String),

    /// Execution was cancelled via the context token.
    #[error("cancelled")]
    Cancelled,
}

/// Tool result alias.
pub type ToolResult<T, E = ToolError> = std::result::Result<T, E>;
