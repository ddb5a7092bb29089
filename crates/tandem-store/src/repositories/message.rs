//! Message repository — append and ordered reads over `messages`.
//!
//! Messages are immutable: there is no update path. Ordering within a
//! session is by the monotonic `sequence` column, which is total even when
//! two appends land on the same timestamp.

use rusqlite::{Connection, params};
use tandem_core::ids;

use crate::errors::Result;
use crate::row_types::{MessageRow, now_rfc3339};

const MESSAGE_COLUMNS: &str = "id, session_id, sequence, role, agent_type, content, content_type, \
     tool_name, tool_input, tool_output, tool_status, context_snapshot, metadata, created_at";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<MessageRow> {
    Ok(MessageRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        sequence: row.get(2)?,
        role: row.get(3)?,
        agent_type: row.get(4)?,
        content: row.get(5)?,
        content_type: row.get(6)?,
        tool_name: row.get(7)?,
        tool_input: row.get(8)?,
        tool_output: row.get(9)?,
        tool_status: row.get(10)?,
        context_snapshot: row.get(11)?,
        metadata: row.get(12)?,
        created_at: row.get(13)?,
    })
}

/// Column values for a new message.
pub struct NewMessage<'a> {
    /// Owning session.
    pub session_id: &'a str,
    /// Author role.
    pub role: &'a str,
    /// Agent role tag, if the message belongs to one surface.
    pub agent_type: Option<&'a str>,
    /// Content (text or serialized blocks).
    pub content: &'a str,
    /// `text` or `blocks`.
    pub content_type: &'a str,
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
    /// Metadata JSON.
    pub metadata: &'a str,
}

/// Message repository — stateless, every method takes `&Connection`.
pub struct MessageRepo;

impl MessageRepo {
    /// Next sequence number for a session (0 for the first message).
    pub fn next_sequence(conn: &Connection, session_id: &str) -> Result<i64> {
        let next: i64 = conn.query_row(
            "SELECT COALESCE(MAX(sequence) + 1, 0) FROM messages WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(next)
    }

    /// Insert a message at the given sequence.
    pub fn insert(conn: &Connection, msg: &NewMessage<'_>, sequence: i64) -> Result<MessageRow> {
        let id = ids::message_id();
        let now = now_rfc3339();
        let _ = conn.execute(
            "INSERT INTO messages (id, session_id, sequence, role, agent_type, content,
                                   content_type, tool_name, tool_input, tool_output,
                                   tool_status, context_snapshot, metadata, created_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?9, ?10, ?11, ?12, ?13, ?14)",
            params![
                id,
                msg.session_id,
                sequence,
                msg.role,
                msg.agent_type,
                msg.content,
                msg.content_type,
                msg.tool_name,
                msg.tool_input,
                msg.tool_output,
                msg.tool_status,
                msg.context_snapshot,
                msg.metadata,
                now
            ],
        )?;
        Ok(MessageRow {
            id,
            session_id: msg.session_id.to_string(),
            sequence,
            role: msg.role.to_string(),
            agent_type: msg.agent_type.map(String::from),
            content: msg.content.to_string(),
            content_type: msg.content_type.to_string(),
            tool_name: msg.tool_name.map(String::from),
            tool_input: msg.tool_input.map(String::from),
            tool_output: msg.tool_output.map(String::from),
            tool_status: msg.tool_status.map(String::from),
            context_snapshot: msg.context_snapshot.map(String::from),
            metadata: msg.metadata.to_string(),
            created_at: now,
        })
    }

    /// Messages for a session, oldest first.
    ///
    /// With a limit this returns the EARLIEST N messages, not the most
    /// recent N — the window is anchored at the start of the transcript.
    pub fn list(conn: &Connection, session_id: &str, limit: Option<i64>) -> Result<Vec<MessageRow>> {
        let mut sql = format!(
            "SELECT {MESSAGE_COLUMNS} FROM messages
             WHERE session_id = ?1 ORDER BY sequence ASC"
        );
        if limit.is_some() {
            sql.push_str(" LIMIT ?2");
        }

        let mut stmt = conn.prepare(&sql)?;
        let rows = match limit {
            Some(n) => stmt
                .query_map(params![session_id, n], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map(params![session_id], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
    }

    /// Count messages in a session.
    pub fn count(conn: &Connection, session_id: &str) -> Result<i64> {
        let count: i64 = conn.query_row(
            "SELECT COUNT(*) FROM messages WHERE session_id = ?1",
            params![session_id],
            |row| row.get(0),
        )?;
        Ok(count)
    }

    /// Most recent messages for one agent role across a project, newest
    /// first. Soft-deleted sessions are excluded. Feeds the cross-agent
    /// aggregation snapshot.
    pub fn recent_by_agent(
        conn: &Connection,
        project_id: &str,
        agent_type: &str,
        limit: i64,
    ) -> Result<Vec<MessageRow>> {
        let mut stmt = conn.prepare(
            "SELECT m.id, m.session_id, m.sequence, m.role, m.agent_type, m.content,
                    m.content_type, m.tool_name, m.tool_input, m.tool_output,
                    m.tool_status, m.context_snapshot, m.metadata, m.created_at
             FROM messages m
             JOIN sessions s ON s.id = m.session_id
             WHERE s.project_id = ?1 AND s.deleted_at IS NULL AND m.agent_type = ?2
             ORDER BY m.created_at DESC, m.sequence DESC
             LIMIT ?3",
        )?;
        let rows = stmt
            .query_map(params![project_id, agent_type, limit], map_row)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;
    use crate::repositories::session::{NewSession, SessionRepo};

    fn setup() -> (Connection, String) {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        let session = SessionRepo::create(
            &conn,
            &NewSession {
                project_id: "proj_1",
                user_id: "user_1",
                session_type: "code",
                title: None,
                metadata: "{}",
            },
        )
        .unwrap();
        (conn, session.id)
    }

    fn text_message<'a>(session_id: &'a str, content: &'a str) -> NewMessage<'a> {
        NewMessage {
            session_id,
            role: "user",
            agent_type: Some("code"),
            content,
            content_type: "text",
            tool_name: None,
            tool_input: None,
            tool_output: None,
            tool_status: None,
            context_snapshot: None,
            metadata: "{}",
        }
    }

    #[test]
    fn sequence_starts_at_zero_and_increments() {
        let (conn, sid) = setup();
        assert_eq!(MessageRepo::next_sequence(&conn, &sid).unwrap(), 0);

        MessageRepo::insert(&conn, &text_message(&sid, "a"), 0).unwrap();
        assert_eq!(MessageRepo::next_sequence(&conn, &sid).unwrap(), 1);
    }

    #[test]
    fn duplicate_sequence_rejected() {
        let (conn, sid) = setup();
        MessageRepo::insert(&conn, &text_message(&sid, "a"), 0).unwrap();
        assert!(MessageRepo::insert(&conn, &text_message(&sid, "b"), 0).is_err());
    }

    #[test]
    fn list_is_oldest_first() {
        let (conn, sid) = setup();
        for (i, content) in ["first", "second", "third"].iter().enumerate() {
            MessageRepo::insert(&conn, &text_message(&sid, content), i as i64).unwrap();
        }

        let all = MessageRepo::list(&conn, &sid, None).unwrap();
        assert_eq!(all.len(), 3);
        assert_eq!(all[0].content, "first");
        assert_eq!(all[2].content, "third");
    }

    #[test]
    fn limited_list_returns_earliest_window() {
        let (conn, sid) = setup();
        for (i, content) in ["first", "second", "third"].iter().enumerate() {
            MessageRepo::insert(&conn, &text_message(&sid, content), i as i64).unwrap();
        }

        let window = MessageRepo::list(&conn, &sid, Some(2)).unwrap();
        assert_eq!(window.len(), 2);
        assert_eq!(window[0].content, "first");
        assert_eq!(window[1].content, "second");
    }

    #[test]
    fn recent_by_agent_newest_first() {
        let (conn, sid) = setup();
        for i in 0..5 {
            MessageRepo::insert(&conn, &text_message(&sid, &format!("m{i}")), i).unwrap();
        }
        // A terminal-tagged message should not show up for "code"
        MessageRepo::insert(
            &conn,
            &NewMessage {
                agent_type: Some("terminal"),
                ..text_message(&sid, "term")
            },
            5,
        )
        .unwrap();

        let recent = MessageRepo::recent_by_agent(&conn, "proj_1", "code", 3).unwrap();
        assert_eq!(recent.len(), 3);
        assert_eq!(recent[0].content, "m4");
        assert_eq!(recent[2].content, "m2");
    }

    #[test]
    fn recent_by_agent_excludes_deleted_sessions() {
        let (conn, sid) = setup();
        MessageRepo::insert(&conn, &text_message(&sid, "visible"), 0).unwrap();
        SessionRepo::soft_delete(&conn, &sid).unwrap();

        let recent = MessageRepo::recent_by_agent(&conn, "proj_1", "code", 10).unwrap();
        assert!(recent.is_empty());
    }

    #[test]
    fn cascade_delete_with_session_row() {
        let (conn, sid) = setup();
        MessageRepo::insert(&conn, &text_message(&sid, "a"), 0).unwrap();

        // Hard delete of the session row cascades (soft delete does not)
        conn.execute("DELETE FROM sessions WHERE id = ?1", params![sid])
            .unwrap();
        assert_eq!(MessageRepo::count(&conn, &sid).unwrap(), 0);
    }
}
