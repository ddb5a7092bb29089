//! `MessageLog` — append-only transcript facade.

use tandem_core::metadata::Metadata;
use tandem_core::model::{AgentRole, MessageRole};
use tracing::{debug, instrument};

use crate::connection::ConnectionPool;
use crate::errors::{Result, StoreError};
use crate::repositories::message::{MessageRepo, NewMessage};
use crate::repositories::session::SessionRepo;
use crate::row_types::MessageRow;
use crate::stores::retry_on_busy;

/// Optional fields for an appended message.
#[derive(Default)]
pub struct AppendMessageOptions<'a> {
    /// Agent role tag, if the message belongs to one surface.
    pub agent_type: Option<AgentRole>,
    /// `text` (default) or `blocks`.
    pub content_type: Option<&'a str>,
    /// Tool name (tool messages).
    pub tool_name: Option<&'a str>,
    /// Tool input JSON (tool messages).
    pub tool_input: Option<&'a str>,
    /// Tool output (tool messages).
    pub tool_output: Option<&'a str>,
    /// `success` or `error` (tool messages).
    pub tool_status: Option<&'a str>,
    /// Optional context snapshot JSON.
    pub context_snapshot: Option<&'a str>,
    /// Free-form metadata.
    pub metadata: Option<Metadata>,
}

/// Append-only, time-ordered transcript per session.
#[derive(Clone)]
pub struct MessageLog {
    pool: ConnectionPool,
}

impl MessageLog {
    /// Build over a connection pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Append a message.
    ///
    /// Side effect: touches the owning session's `last_activity_at` in the
    /// same transaction, so a transcript append always counts as activity.
    /// Fails with `SessionNotFound` if the session is missing or deleted.
    #[instrument(skip(self, content, opts), fields(session_id, role = %role))]
    pub fn append(
        &self,
        session_id: &str,
        role: MessageRole,
        content: &str,
        opts: &AppendMessageOptions<'_>,
    ) -> Result<MessageRow> {
        let metadata = match &opts.metadata {
            Some(meta) => meta.to_json()?,
            None => "{}".to_string(),
        };

        let row = retry_on_busy(|| {
            let conn = self.pool.get()?;
            let tx = conn.unchecked_transaction()?;

            if SessionRepo::get_by_id(&tx, session_id)?.is_none() {
                return Err(StoreError::SessionNotFound(session_id.to_string()));
            }

            let sequence = MessageRepo::next_sequence(&tx, session_id)?;
            let row = MessageRepo::insert(
                &tx,
                &NewMessage {
                    session_id,
                    role: role.as_str(),
                    agent_type: opts.agent_type.map(AgentRole::as_str),
                    content,
                    content_type: opts.content_type.unwrap_or("text"),
                    tool_name: opts.tool_name,
                    tool_input: opts.tool_input,
                    tool_output: opts.tool_output,
                    tool_status: opts.tool_status,
                    context_snapshot: opts.context_snapshot,
                    metadata: &metadata,
                },
                sequence,
            )?;
            let _ = SessionRepo::touch(&tx, session_id, None)?;

            tx.commit()?;
            Ok(row)
        })?;

        debug!(message_id = %row.id, sequence = row.sequence, "message appended");
        Ok(row)
    }

    /// Messages for a session, oldest to newest.
    ///
    /// When a limit is supplied this returns the EARLIEST N messages, not
    /// the most recent N. The asymmetry is deliberate-as-observed: the
    /// window anchors at the start of the transcript. Callers wanting
    /// recency use the aggregation queries instead.
    pub fn read(&self, session_id: &str, limit: Option<i64>) -> Result<Vec<MessageRow>> {
        let conn = self.pool.get()?;
        MessageRepo::list(&conn, session_id, limit)
    }

    /// Count messages in a session.
    pub fn count(&self, session_id: &str) -> Result<i64> {
        let conn = self.pool.get()?;
        MessageRepo::count(&conn, session_id)
    }

    /// Most recent messages for one agent role across a project, newest
    /// first. Feeds the cross-agent snapshot.
    pub fn recent_by_agent(
        &self,
        project_id: &str,
        agent: AgentRole,
        limit: i64,
    ) -> Result<Vec<MessageRow>> {
        let conn = self.pool.get()?;
        MessageRepo::recent_by_agent(&conn, project_id, agent.as_str(), limit)
    }
}
