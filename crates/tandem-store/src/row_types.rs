//! Plain row structs mapped 1:1 to table columns.
//!
//! Enum-valued columns stay as `String` here — the storage format is the
//! source of truth and typed access is opt-in via `FromStr` on the
//! vocabulary enums in `tandem_core::model`.

use serde::{Deserialize, Serialize};

/// One row of `sessions`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SessionRow {
    /// Session ID (`sess_…`).
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// Owning user.
    pub user_id: String,
    /// `code`, `terminal`, or `hybrid`.
    pub session_type: String,
    /// Optional display title.
    pub title: Option<String>,
    /// `active`, `paused`, `completed`, or `error`.
    pub status: String,
    /// Shared-context blob visible to cooperating agents.
    pub shared_context: Option<String>,
    /// SHA-256 of `shared_context` at last write.
    pub context_hash: Option<String>,
    /// Versioned metadata JSON.
    pub metadata: String,
    /// ISO 8601 creation time.
    pub created_at: String,
    /// ISO 8601 last mutation time.
    pub updated_at: String,
    /// ISO 8601 last activity time (monotonically non-decreasing).
    pub last_activity_at: String,
    /// Soft-delete marker.
    pub deleted_at: Option<String>,
}

/// One row of `messages`. Immutable once written.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MessageRow {
    /// Message ID (`msg_…`).
    pub id: String,
    /// Owning session.
    pub session_id: String,
    /// Monotonic per-session sequence — total order even at equal timestamps.
    pub sequence: i64,
    /// `user`, `assistant`, `system`, or `tool`.
    pub role: String,
    /// Agent role tag (`code` / `terminal`), if any.
    pub agent_type: Option<String>,
    /// Content — plain text or serialized content blocks.
    pub content: String,
    /// `text` or `blocks`.
    pub content_type: String,
    /// Tool name (tool messages only).
    pub tool_name: Option<String>,
    /// Tool input JSON (tool messages only).
    pub tool_input: Option<String>,
    /// Tool output (tool messages only).
    pub tool_output: Option<String>,
    /// `success` or `error` (tool messages only).
    pub tool_status: Option<String>,
    /// Optional context snapshot JSON captured at send time.
    pub context_snapshot: Option<String>,
    /// Versioned metadata JSON.
    pub metadata: String,
    /// ISO 8601 creation time.
    pub created_at: String,
}

/// One row of `context_items`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextItemRow {
    /// Item ID (`ctx_…`).
    pub id: String,
    /// Owning project.
    pub project_id: String,
    /// Item kind (`file`, `terminal_output`, `error`, …).
    pub item_type: String,
    /// Unique key within (project, type) — e.g. a file path.
    pub item_key: String,
    /// Item content.
    pub content: String,
    /// SHA-256 of `content`.
    pub content_hash: String,
    /// Versioned metadata JSON.
    pub metadata: String,
    /// ISO 8601 time of last read hit.
    pub last_accessed_at: Option<String>,
    /// Number of read hits.
    pub access_count: i64,
    /// ISO 8601 creation time.
    pub created_at: String,
    /// ISO 8601 last overwrite time.
    pub updated_at: String,
}

/// One row of `session_context_links`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ContextLinkRow {
    /// Linked session.
    pub session_id: String,
    /// Linked context item.
    pub context_item_id: String,
    /// Relevance of the item to the session (latest write wins).
    pub relevance_score: f64,
    /// ISO 8601 creation time.
    pub created_at: String,
    /// ISO 8601 last score update.
    pub updated_at: String,
}

/// One row of `jobs`.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct JobRow {
    /// Job ID (`job_…`).
    pub id: String,
    /// Owning session.
    pub session_id: String,
    /// Free-form job type (e.g. `terminal_execution`).
    pub job_type: String,
    /// `pending`, `running`, `completed`, `error`, or `cancelled`.
    pub status: String,
    /// Human-readable description.
    pub description: Option<String>,
    /// Input payload JSON.
    pub input: Option<String>,
    /// Output payload JSON.
    pub output: Option<String>,
    /// Error message for failed jobs.
    pub error_message: Option<String>,
    /// 0–100.
    pub progress_percentage: i64,
    /// Set once, on the first transition to `running`.
    pub started_at: Option<String>,
    /// Set on any terminal transition.
    pub completed_at: Option<String>,
    /// ISO 8601 creation time.
    pub created_at: String,
}

/// Current time in the storage timestamp format.
#[must_use]
pub fn now_rfc3339() -> String {
    chrono::Utc::now().to_rfc3339()
}
