//! Versioned schema migrations.
//!
//! Tracked through `PRAGMA user_version`. Each migration runs inside a
//! transaction; `run_migrations` is idempotent and safe to call on every
//! startup.

use rusqlite::Connection;
use tracing::debug;

use crate::errors::Result;

/// Latest schema version.
pub const SCHEMA_VERSION: i64 = 1;

const MIGRATION_V1: &str = "
CREATE TABLE sessions (
    id               TEXT PRIMARY KEY,
    project_id       TEXT NOT NULL,
    user_id          TEXT NOT NULL,
    session_type     TEXT NOT NULL,
    title            TEXT,
    status           TEXT NOT NULL DEFAULT 'active',
    shared_context   TEXT,
    context_hash     TEXT,
    metadata         TEXT NOT NULL DEFAULT '{}',
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    last_activity_at TEXT NOT NULL,
    deleted_at       TEXT
);
CREATE INDEX idx_sessions_project_activity
    ON sessions (project_id, last_activity_at DESC);

CREATE TABLE messages (
    id               TEXT PRIMARY KEY,
    session_id       TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    sequence         INTEGER NOT NULL,
    role             TEXT NOT NULL,
    agent_type       TEXT,
    content          TEXT NOT NULL,
    content_type     TEXT NOT NULL DEFAULT 'text',
    tool_name        TEXT,
    tool_input       TEXT,
    tool_output      TEXT,
    tool_status      TEXT,
    context_snapshot TEXT,
    metadata         TEXT NOT NULL DEFAULT '{}',
    created_at       TEXT NOT NULL,
    UNIQUE (session_id, sequence)
);
CREATE INDEX idx_messages_session_sequence
    ON messages (session_id, sequence);
CREATE INDEX idx_messages_agent_created
    ON messages (agent_type, created_at DESC);

CREATE TABLE context_items (
    id               TEXT PRIMARY KEY,
    project_id       TEXT NOT NULL,
    item_type        TEXT NOT NULL,
    item_key         TEXT NOT NULL,
    content          TEXT NOT NULL,
    content_hash     TEXT NOT NULL,
    metadata         TEXT NOT NULL DEFAULT '{}',
    last_accessed_at TEXT,
    access_count     INTEGER NOT NULL DEFAULT 0,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    UNIQUE (project_id, item_type, item_key)
);
CREATE INDEX idx_context_items_accessed
    ON context_items (project_id, item_type, last_accessed_at DESC);

CREATE TABLE session_context_links (
    session_id       TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    context_item_id  TEXT NOT NULL REFERENCES context_items(id) ON DELETE CASCADE,
    relevance_score  REAL NOT NULL DEFAULT 1.0,
    created_at       TEXT NOT NULL,
    updated_at       TEXT NOT NULL,
    PRIMARY KEY (session_id, context_item_id)
);

CREATE TABLE jobs (
    id                  TEXT PRIMARY KEY,
    session_id          TEXT NOT NULL REFERENCES sessions(id) ON DELETE CASCADE,
    job_type            TEXT NOT NULL,
    status              TEXT NOT NULL DEFAULT 'pending',
    description         TEXT,
    input               TEXT,
    output              TEXT,
    error_message       TEXT,
    progress_percentage INTEGER NOT NULL DEFAULT 0,
    started_at          TEXT,
    completed_at        TEXT,
    created_at          TEXT NOT NULL
);
CREATE INDEX idx_jobs_session_created
    ON jobs (session_id, created_at DESC);
CREATE INDEX idx_jobs_status
    ON jobs (status);
";

/// Run all pending migrations. Returns the resulting schema version.
pub fn run_migrations(conn: &Connection) -> Result<i64> {
    let current: i64 = conn.query_row("PRAGMA user_version", [], |row| row.get(0))?;

    if current < 1 {
        let tx = conn.unchecked_transaction()?;
        tx.execute_batch(MIGRATION_V1)?;
        tx.pragma_update(None, "user_version", 1)?;
        tx.commit()?;
        debug!(from = current, to = 1, "schema migrated");
    }

    Ok(SCHEMA_VERSION)
}
