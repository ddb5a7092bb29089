//! Job repository — CRUD for the `jobs` table.
//!
//! The status state machine lives in the `JobTracker` facade; this repo
//! only persists fields. `set_started_at_if_unset` is the one piece of
//! transition mechanics kept at the SQL level so "running" stays
//! idempotent under retries.

use rusqlite::{Connection, OptionalExtension, params};
use tandem_core::ids;

use crate::errors::Result;
use crate::row_types::{JobRow, now_rfc3339};

const JOB_COLUMNS: &str = "id, session_id, job_type, status, description, input, output, \
     error_message, progress_percentage, started_at, completed_at, created_at";

fn map_row(row: &rusqlite::Row<'_>) -> rusqlite::Result<JobRow> {
    Ok(JobRow {
        id: row.get(0)?,
        session_id: row.get(1)?,
        job_type: row.get(2)?,
        status: row.get(3)?,
        description: row.get(4)?,
        input: row.get(5)?,
        output: row.get(6)?,
        error_message: row.get(7)?,
        progress_percentage: row.get(8)?,
        started_at: row.get(9)?,
        completed_at: row.get(10)?,
        created_at: row.get(11)?,
    })
}

/// Column values for a new job.
pub struct NewJob<'a> {
    /// Owning session.
    pub session_id: &'a str,
    /// Free-form job type.
    pub job_type: &'a str,
    /// Human-readable description.
    pub description: Option<&'a str>,
    /// Input payload JSON.
    pub input: Option<&'a str>,
}

/// Field updates applied together with a status write. The caller
/// resolves progress defaults; the repo writes what it is given.
#[derive(Default)]
pub struct JobFieldUpdate<'a> {
    /// New progress percentage.
    pub progress_percentage: i64,
    /// Output payload JSON.
    pub output: Option<&'a str>,
    /// Error message.
    pub error_message: Option<&'a str>,
}

/// Job repository — stateless, every method takes `&Connection`.
pub struct JobRepo;

impl JobRepo {
    /// Insert a new job in `pending` status.
    pub fn create(conn: &Connection, opts: &NewJob<'_>) -> Result<JobRow> {
        let id = ids::job_id();
        let now = now_rfc3339();
        let _ = conn.execute(
            "INSERT INTO jobs (id, session_id, job_type, status, description, input, created_at)
             VALUES (?1, ?2, ?3, 'pending', ?4, ?5, ?6)",
            params![id, opts.session_id, opts.job_type, opts.description, opts.input, now],
        )?;
        Ok(JobRow {
            id,
            session_id: opts.session_id.to_string(),
            job_type: opts.job_type.to_string(),
            status: "pending".to_string(),
            description: opts.description.map(String::from),
            input: opts.input.map(String::from),
            output: None,
            error_message: None,
            progress_percentage: 0,
            started_at: None,
            completed_at: None,
            created_at: now,
        })
    }

    /// Get a job by ID.
    pub fn get_by_id(conn: &Connection, job_id: &str) -> Result<Option<JobRow>> {
        let row = conn
            .query_row(
                &format!("SELECT {JOB_COLUMNS} FROM jobs WHERE id = ?1"),
                params![job_id],
                map_row,
            )
            .optional()?;
        Ok(row)
    }

    /// Write status plus the accompanying fields.
    pub fn update_status(
        conn: &Connection,
        job_id: &str,
        status: &str,
        fields: &JobFieldUpdate<'_>,
    ) -> Result<bool> {
        let changed = conn.execute(
            "UPDATE jobs
             SET status = ?1,
                 progress_percentage = ?2,
                 output = COALESCE(?3, output),
                 error_message = COALESCE(?4, error_message)
             WHERE id = ?5",
            params![
                status,
                fields.progress_percentage,
                fields.output,
                fields.error_message,
                job_id
            ],
        )?;
        Ok(changed > 0)
    }

    /// Stamp `started_at` if it has never been set.
    pub fn set_started_at_if_unset(conn: &Connection, job_id: &str) -> Result<()> {
        let now = now_rfc3339();
        let _ = conn.execute(
            "UPDATE jobs SET started_at = ?1 WHERE id = ?2 AND started_at IS NULL",
            params![now, job_id],
        )?;
        Ok(())
    }

    /// Stamp `completed_at` (terminal transitions).
    pub fn set_completed_at(conn: &Connection, job_id: &str) -> Result<()> {
        let now = now_rfc3339();
        let _ = conn.execute(
            "UPDATE jobs SET completed_at = ?1 WHERE id = ?2",
            params![now, job_id],
        )?;
        Ok(())
    }

    /// All pending/running jobs across a project's non-deleted sessions,
    /// newest first.
    pub fn list_active_by_project(conn: &Connection, project_id: &str) -> Result<Vec<JobRow>> {
        let mut stmt = conn.prepare(
            "SELECT j.id, j.session_id, j.job_type, j.status, j.description, j.input,
                    j.output, j.error_message, j.progress_percentage, j.started_at,
                    j.completed_at, j.created_at
             FROM jobs j
             JOIN sessions s ON s.id = j.session_id
             WHERE s.project_id = ?1 AND s.deleted_at IS NULL
               AND j.status IN ('pending', 'running')
             ORDER BY j.created_at DESC",
        )?;
        let rows = stmt
            .query_map(params![project_id], map_row)?
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
                session_type: "terminal",
                title: None,
                metadata: "{}",
            },
        )
        .unwrap();
        (conn, session.id)
    }

    fn new_job<'a>(session_id: &'a str) -> NewJob<'a> {
        NewJob {
            session_id,
            job_type: "terminal_execution",
            description: Some("run the test suite"),
            input: Some("{\"command\":\"cargo test\"}"),
        }
    }

    #[test]
    fn create_starts_pending() {
        let (conn, sid) = setup();
        let job = JobRepo::create(&conn, &new_job(&sid)).unwrap();
        assert!(job.id.starts_with("job_"));
        assert_eq!(job.status, "pending");
        assert_eq!(job.progress_percentage, 0);
        assert!(job.started_at.is_none());
    }

    #[test]
    fn started_at_set_once() {
        let (conn, sid) = setup();
        let job = JobRepo::create(&conn, &new_job(&sid)).unwrap();

        JobRepo::set_started_at_if_unset(&conn, &job.id).unwrap();
        let first = JobRepo::get_by_id(&conn, &job.id)
            .unwrap()
            .unwrap()
            .started_at
            .unwrap();

        std::thread::sleep(std::time::Duration::from_millis(5));
        JobRepo::set_started_at_if_unset(&conn, &job.id).unwrap();
        let second = JobRepo::get_by_id(&conn, &job.id)
            .unwrap()
            .unwrap()
            .started_at
            .unwrap();
        assert_eq!(first, second);
    }

    #[test]
    fn update_status_coalesces_payloads() {
        let (conn, sid) = setup();
        let job = JobRepo::create(&conn, &new_job(&sid)).unwrap();

        JobRepo::update_status(
            &conn,
            &job.id,
            "running",
            &JobFieldUpdate {
                progress_percentage: 40,
                output: Some("{\"partial\":true}"),
                ..JobFieldUpdate::default()
            },
        )
        .unwrap();
        // A later update without output keeps the earlier payload
        JobRepo::update_status(
            &conn,
            &job.id,
            "running",
            &JobFieldUpdate {
                progress_percentage: 60,
                ..JobFieldUpdate::default()
            },
        )
        .unwrap();

        let row = JobRepo::get_by_id(&conn, &job.id).unwrap().unwrap();
        assert_eq!(row.progress_percentage, 60);
        assert_eq!(row.output.as_deref(), Some("{\"partial\":true}"));
    }

    #[test]
    fn list_active_by_project() {
        let (conn, sid) = setup();
        let pending = JobRepo::create(&conn, &new_job(&sid)).unwrap();
        let done = JobRepo::create(&conn, &new_job(&sid)).unwrap();
        JobRepo::update_status(
            &conn,
            &done.id,
            "completed",
            &JobFieldUpdate {
                progress_percentage: 100,
                ..JobFieldUpdate::default()
            },
        )
        .unwrap();

        let active = JobRepo::list_active_by_project(&conn, "proj_1").unwrap();
        assert_eq!(active.len(), 1);
        assert_eq!(active[0].id, pending.id);
    }

    #[test]
    fn list_active_excludes_deleted_sessions() {
        let (conn, sid) = setup();
        JobRepo::create(&conn, &new_job(&sid)).unwrap();
        SessionRepo::soft_delete(&conn, &sid).unwrap();

        assert!(JobRepo::list_active_by_project(&conn, "proj_1")
            .unwrap()
            .is_empty());
    }
}
