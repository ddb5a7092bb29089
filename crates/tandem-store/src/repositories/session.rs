//! Session repository — CRUD for the `sessions` table.
//!
//! Sessions are soft-deleted only: `soft_delete` stamps `deleted_at` and
//! every read here filters on `deleted_at IS NULL`.

use rusqlite::{Connection, OptionalExtension, params};
use tandem_core::ids;

use crate::errors::Result;
use crate::row_types::{SessionRow, now_rfc3339};

const SESSION_COLUMNS: &str = "id, project_id, user_id, session_type, title, status, \
     shared_context, context_hash, metadata, created_at, updated_at, \
     last_activity_at, deleted_at";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<SessionRow> {
    Ok(SessionRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        user_id: row.get(2)?,
        session_type: row.get(3)?,
        title: row.get(4)?,
        status: row.get(5)?,
        shared_context: row.get(6)?,
        context_hash: row.get(7)?,
        metadata: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
        last_activity_at: row.get(11)?,
        deleted_at: row.get(12)?,
    })
}

/// Options for creating a new session.
pub struct NewSession<'a> {
    /// Owning project.
    pub project_id: &'a str,
    /// Owning user.
    pub user_id: &'a str,
    /// Agent surface (`code` / `terminal` / `hybrid`).
    pub session_type: &'a str,
    /// Optional display title.
    pub title: Option<&'a str>,
    /// Metadata JSON (canonical form).
    pub metadata: &'a str,
}

/// Session repository — stateless, every method takes `&Connection`.
pub struct SessionRepo;

impl SessionRepo {
    /// Insert a new session in `active` status.
    pub fn create(conn: &Connection, opts: &NewSession<'_>) -> Result<SessionRow> {
        let id = ids::session_id();
        let now = now_rfc3339();
        let _ = conn.execute(
            "INSERT INTO sessions (id, project_id, user_id, session_type, title, status,
                                   metadata, created_at, updated_at, last_activity_at)
             VALUES (?1, ?2, ?3, ?4, ?5, 'active', ?6, ?7, ?7, ?7)",
            params![
                id,
                opts.project_id,
                opts.user_id,
                opts.session_type,
                opts.title,
                opts.metadata,
                now
            ],
        )?;
        Ok(SessionRow {
            id,
            project_id: opts.project_id.to_string(),
            user_id: opts.user_id.to_string(),
            session_type: opts.session_type.to_string(),
            title: opts.title.map(String::from),
            status: "active".to_string(),
            shared_context: None,
            context_hash: None,
            metadata: opts.metadata.to_string(),
            created_at: now.clone(),
            updated_at: now.clone(),
            last_activity_at: now,
            deleted_at: None,
        })
    }

    /// Get a session by ID. Soft-deleted sessions are not returned.
    pub fn get_by_id(conn: &Connection, session_id: &str) -> Result<Option<SessionRow>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {SESSION_COLUMNS} FROM sessions
                     WHERE id = ?1 AND deleted_at IS NULL"
                ),
                params![session_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// List non-deleted sessions for a project, most recently active first.
    /// `session_type` narrows to one agent surface when given.
    pub fn list_by_project(
        conn: &Connection,
        project_id: &str,
        session_type: Option<&str>,
    ) -> Result<Vec<SessionRow>> {
        let mut sql = format!(
            "SELECT {SESSION_COLUMNS} FROM sessions
             WHERE project_id = ?1 AND deleted_at IS NULL"
        );
        if session_type.is_some() {
            sql.push_str(" AND session_type = ?2");
        }
        sql.push_str(" ORDER BY last_activity_at DESC");

        let mut stmt = conn.prepare(&sql)?;
        let rows = match session_type {
            Some(ty) => stmt
                .query_map(params![project_id, ty], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
            None => stmt
                .query_map(params![project_id], map_row)?
                .collect::<rusqlite::Result<Vec<_>>>()?,
        };
        Ok(rows)
    }

    /// Bump activity (and optionally status).
    ///
    /// `last_activity_at` is clamped with `MAX` so it never moves backwards,
    /// even if the caller's clock does.
    pub fn touch(conn: &Connection, session_id: &str, status: Option<&str>) -> Result<bool> {
        let now = now_rfc3339();
        let changed = match status {
            Some(st) => conn.execute(
                "UPDATE sessions
                 SET last_activity_at = MAX(last_activity_at, ?1), updated_at = ?1, status = ?2
                 WHERE id = ?3 AND deleted_at IS NULL",
                params![now, st, session_id],
            )?,
            None => conn.execute(
                "UPDATE sessions
                 SET last_activity_at = MAX(last_activity_at, ?1), updated_at = ?1
                 WHERE id = ?2 AND deleted_at IS NULL",
                params![now, session_id],
            )?,
        };
        Ok(changed > 0)
    }

    /// Replace the shared-context blob and its hash together.
    pub fn update_shared_context(
        conn: &Connection,
        session_id: &str,
        shared_context: &str,
        context_hash: &str,
    ) -> Result<bool> {
        let now = now_rfc3339();
        let changed = conn.execute(
            "UPDATE sessions
             SET shared_context = ?1, context_hash = ?2,
                 updated_at = ?3, last_activity_at = MAX(last_activity_at, ?3)
             WHERE id = ?4 AND deleted_at IS NULL",
            params![shared_context, context_hash, now, session_id],
        )?;
        Ok(changed > 0)
    }

    /// Soft-delete. Subsequent reads exclude the session; rows are never
    /// hard-deleted.
    pub fn soft_delete(conn: &Connection, session_id: &str) -> Result<bool> {
        let now = now_rfc3339();
        let changed = conn.execute(
            "UPDATE sessions SET deleted_at = ?1, updated_at = ?1
             WHERE id = ?2 AND deleted_at IS NULL",
            params![now, session_id],
        )?;
        Ok(changed > 0)
    }
}

#[cfg(test)]
#[allow(unused_results)]
mod tests {
    use super::*;
    use crate::migrations::run_migrations;

    fn setup() -> Connection {
        let conn = Connection::open_in_memory().unwrap();
        conn.execute_batch("PRAGMA foreign_keys = ON;").unwrap();
        run_migrations(&conn).unwrap();
        conn
    }

    fn new_session<'a>(project_id: &'a str) -> NewSession<'a> {
        NewSession {
            project_id,
            user_id: "user_1",
            session_type: "code",
            title: Some("refactor"),
            metadata: "{}",
        }
    }

    #[test]
    fn create_and_get() {
        let conn = setup();
        let created = SessionRepo::create(&conn, &new_session("proj_1")).unwrap();
        assert!(created.id.starts_with("sess_"));
        assert_eq!(created.status, "active");

        let fetched = SessionRepo::get_by_id(&conn, &created.id).unwrap().unwrap();
        assert_eq!(fetched, created);
    }

    #[test]
    fn get_missing_returns_none() {
        let conn = setup();
        assert!(SessionRepo::get_by_id(&conn, "sess_nope").unwrap().is_none());
    }

    #[test]
    fn list_by_project_ordered_by_activity() {
        let conn = setup();
        let a = SessionRepo::create(&conn, &new_session("proj_1")).unwrap();
        let b = SessionRepo::create(&conn, &new_session("proj_1")).unwrap();
        let _other = SessionRepo::create(&conn, &new_session("proj_2")).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        SessionRepo::touch(&conn, &a.id, None).unwrap();

        let list = SessionRepo::list_by_project(&conn, "proj_1", None).unwrap();
        assert_eq!(list.len(), 2);
        assert_eq!(list[0].id, a.id);
        assert_eq!(list[1].id, b.id);
    }

    #[test]
    fn list_filters_by_type() {
        let conn = setup();
        SessionRepo::create(&conn, &new_session("proj_1")).unwrap();
        SessionRepo::create(
            &conn,
            &NewSession {
                session_type: "terminal",
                ..new_session("proj_1")
            },
        )
        .unwrap();

        let code = SessionRepo::list_by_project(&conn, "proj_1", Some("code")).unwrap();
        assert_eq!(code.len(), 1);
        assert_eq!(code[0].session_type, "code");
    }

    #[test]
    fn touch_bumps_activity_and_status() {
        let conn = setup();
        let session = SessionRepo::create(&conn, &new_session("proj_1")).unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        assert!(SessionRepo::touch(&conn, &session.id, Some("paused")).unwrap());

        let updated = SessionRepo::get_by_id(&conn, &session.id).unwrap().unwrap();
        assert_eq!(updated.status, "paused");
        assert!(updated.last_activity_at > session.last_activity_at);
    }

    #[test]
    fn activity_never_moves_backwards() {
        let conn = setup();
        let session = SessionRepo::create(&conn, &new_session("proj_1")).unwrap();

        // Force a future activity stamp, then touch again with "now"
        conn.execute(
            "UPDATE sessions SET last_activity_at = '2999-01-01T00:00:00+00:00' WHERE id = ?1",
            params![session.id],
        )
        .unwrap();
        SessionRepo::touch(&conn, &session.id, None).unwrap();

        let row = SessionRepo::get_by_id(&conn, &session.id).unwrap().unwrap();
        assert_eq!(row.last_activity_at, "2999-01-01T00:00:00+00:00");
    }

    #[test]
    fn update_shared_context() {
        let conn = setup();
        let session = SessionRepo::create(&conn, &new_session("proj_1")).unwrap();

        assert!(
            SessionRepo::update_shared_context(&conn, &session.id, "blob", "hash-of-blob").unwrap()
        );
        let row = SessionRepo::get_by_id(&conn, &session.id).unwrap().unwrap();
        assert_eq!(row.shared_context.as_deref(), Some("blob"));
        assert_eq!(row.context_hash.as_deref(), Some("hash-of-blob"));
    }

    #[test]
    fn soft_delete_hides_from_reads() {
        let conn = setup();
        let session = SessionRepo::create(&conn, &new_session("proj_1")).unwrap();

        assert!(SessionRepo::soft_delete(&conn, &session.id).unwrap());
        assert!(SessionRepo::get_by_id(&conn, &session.id).unwrap().is_none());
        assert!(SessionRepo::list_by_project(&conn, "proj_1", None)
            .unwrap()
            .is_empty());

        // Row still exists
        let count: i64 = conn
            .query_row("SELECT COUNT(*) FROM sessions", [], |row| row.get(0))
            .unwrap();
        assert_eq!(count, 1);

        // Deleting again is a no-op
        assert!(!SessionRepo::soft_delete(&conn, &session.id).unwrap());
    }
}
