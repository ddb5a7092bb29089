//! Prefixed UUIDv7 entity identifiers.
//!
//! Every persisted entity carries a type prefix (`sess_`, `msg_`, `ctx_`,
//! `job_`) so an ID is self-describing in logs and foreign-key columns.
//! UUIDv7 keeps IDs time-sortable, which matches the append-only tables.

use uuid::Uuid;

/// Build a prefixed UUIDv7 identifier.
fn prefixed(prefix: &str) -> String {
    format!("{prefix}_{}", Uuid::now_v7())
}

/// New session ID (`sess_…`).
pub fn session_id() -> String {
    prefixed("sess")
}

/// New message ID (`msg_…`).
pub fn message_id() -> String {
    prefixed("msg")
}

/// New context item ID (`ctx_…`).
pub fn context_item_id() -> String {
    prefixed("ctx")
}

/// New job ID (`job_…`).
pub fn job_id() -> String {
    prefixed("job")
}

/// New turn ID (`turn_…`) — identifies one user turn through the loop.
pub fn turn_id() -> String {
    prefixed("turn")
}
