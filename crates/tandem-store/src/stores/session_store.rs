//! `SessionStore` — session lifecycle facade.

use tandem_core::hash::content_hash;
use tandem_core::metadata::Metadata;
use tandem_core::model::{SessionStatus, SessionType};
use tracing::{debug, info, instrument};

use crate::connection::ConnectionPool;
use crate::errors::{Result, StoreError};
use crate::repositories::session::{NewSession, SessionRepo};
use crate::row_types::SessionRow;
use crate::stores::retry_on_busy;

/// Options for creating a session.
pub struct CreateSessionOptions<'a> {
    /// Owning project.
    pub project_id: &'a str,
    /// Owning user.
    pub user_id: &'a str,
    /// Agent surface.
    pub session_type: SessionType,
    /// Optional display title.
    pub title: Option<&'a str>,
    /// Free-form metadata.
    pub metadata: Metadata,
}

/// Session lifecycle: create, fetch, list, touch, shared-context updates,
/// soft delete.
#[derive(Clone)]
pub struct SessionStore {
    pool: ConnectionPool,
}

impl SessionStore {
    /// Build over a connection pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Create a session. A persistence failure here is fatal — the caller
    /// has no session to fall back to.
    #[instrument(skip(self, opts), fields(project_id = opts.project_id, session_type = %opts.session_type))]
    pub fn create(&self, opts: &CreateSessionOptions<'_>) -> Result<SessionRow> {
        let metadata = opts.metadata.to_json()?;
        let row = retry_on_busy(|| {
            let conn = self.pool.get()?;
            SessionRepo::create(
                &conn,
                &NewSession {
                    project_id: opts.project_id,
                    user_id: opts.user_id,
                    session_type: opts.session_type.as_str(),
                    title: opts.title,
                    metadata: &metadata,
                },
            )
        })?;
        info!(session_id = %row.id, "session created");
        Ok(row)
    }

    /// Fetch by ID. Soft-deleted sessions are excluded.
    pub fn get(&self, session_id: &str) -> Result<Option<SessionRow>> {
        let conn = self.pool.get()?;
        SessionRepo::get_by_id(&conn, session_id)
    }

    /// Fetch by ID, treating absence as an error.
    pub fn get_required(&self, session_id: &str) -> Result<SessionRow> {
        self.get(session_id)?
            .ok_or_else(|| StoreError::SessionNotFound(session_id.to_string()))
    }

    /// Non-deleted sessions for a project, most recently active first,
    /// optionally narrowed to one agent surface.
    pub fn list_by_project(
        &self,
        project_id: &str,
        session_type: Option<SessionType>,
    ) -> Result<Vec<SessionRow>> {
        let conn = self.pool.get()?;
        SessionRepo::list_by_project(&conn, project_id, session_type.map(SessionType::as_str))
    }

    /// Bump `last_activity_at` (never backwards) and optionally set status.
    #[instrument(skip(self))]
    pub fn touch(&self, session_id: &str, status: Option<SessionStatus>) -> Result<()> {
        let touched = retry_on_busy(|| {
            let conn = self.pool.get()?;
            SessionRepo::touch(&conn, session_id, status.map(SessionStatus::as_str))
        })?;
        if !touched {
            return Err(StoreError::SessionNotFound(session_id.to_string()));
        }
        Ok(())
    }

    /// Replace the shared-context blob; the content hash is recomputed here
    /// so `context_hash == sha256(shared_context)` holds by construction.
    #[instrument(skip(self, shared_context))]
    pub fn update_shared_context(&self, session_id: &str, shared_context: &str) -> Result<()> {
        let hash = content_hash(shared_context);
        let updated = retry_on_busy(|| {
            let conn = self.pool.get()?;
            SessionRepo::update_shared_context(&conn, session_id, shared_context, &hash)
        })?;
        if !updated {
            return Err(StoreError::SessionNotFound(session_id.to_string()));
        }
        debug!(session_id, "shared context updated");
        Ok(())
    }

    /// Soft-delete. Subsequent reads exclude the session.
    #[instrument(skip(self))]
    pub fn soft_delete(&self, session_id: &str) -> Result<bool> {
        let deleted = retry_on_busy(|| {
            let conn = self.pool.get()?;
            SessionRepo::soft_delete(&conn, session_id)
        })?;
        if deleted {
            info!(session_id, "session soft-deleted");
        }
        Ok(deleted)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionConfig, new_in_memory};
    use crate::migrations::run_migrations;

    fn make_store() -> SessionStore {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        SessionStore::new(pool)
    }

    fn create(store: &SessionStore) -> SessionRow {
        store
            .create(&CreateSessionOptions {
                project_id: "proj_1",
                user_id: "user_1",
                session_type: SessionType::Code,
                title: Some("fix the build"),
                metadata: Metadata::new(),
            })
            .unwrap()
    }

    #[test]
    fn create_get_round_trip() {
        let store = make_store();
        let session = create(&store);
        let fetched = store.get(&session.id).unwrap().unwrap();
        assert_eq!(fetched.id, session.id);
        assert_eq!(fetched.session_type, "code");
    }

    #[test]
    fn get_required_errors_on_missing() {
        let store = make_store();
        let err = store.get_required("sess_missing").unwrap_err();
        assert!(matches!(err, StoreError::SessionNotFound(_)));
    }

    #[test]
    fn shared_context_hash_invariant() {
        let store = make_store();
        let session = create(&store);

        store
            .update_shared_context(&session.id, "current task: port the parser")
            .unwrap();

        let row = store.get(&session.id).unwrap().unwrap();
        assert_eq!(
            row.context_hash.as_deref(),
            Some(content_hash("current task: port the parser").as_str())
        );
    }

    #[test]
    fn activity_non_decreasing_across_touches() {
        let store = make_store();
        let session = create(&store);

        let mut previous = session.last_activity_at.clone();
        for _ in 0..3 {
            std::thread::sleep(std::time::Duration::from_millis(3));
            store.touch(&session.id, None).unwrap();
            let current = store.get(&session.id).unwrap().unwrap().last_activity_at;
            assert!(current >= previous);
            previous = current;
        }
    }

    #[test]
    fn touch_can_set_status() {
        let store = make_store();
        let session = create(&store);
        store
            .touch(&session.id, Some(SessionStatus::Completed))
            .unwrap();
        let row = store.get(&session.id).unwrap().unwrap();
        assert_eq!(row.status, "completed");
    }

    #[test]
    fn soft_delete_then_reads_exclude() {
        let store = make_store();
        let session = create(&store);

        assert!(store.soft_delete(&session.id).unwrap());
        assert!(store.get(&session.id).unwrap().is_none());
        assert!(store.touch(&session.id, None).is_err());
    }
}
