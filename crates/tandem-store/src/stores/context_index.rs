//! `ContextIndex` — shared context items and session links.

use tandem_core::hash::content_hash;
use tandem_core::metadata::Metadata;
use tandem_core::model::ContextItemType;
use tracing::{instrument, warn};

use crate::connection::ConnectionPool;
use crate::errors::Result;
use crate::repositories::context::{ContextRepo, UpsertItem};
use crate::row_types::{ContextItemRow, ContextLinkRow};
use crate::stores::retry_on_busy;

/// Relevance assigned to a link when the caller does not score it.
pub const DEFAULT_RELEVANCE: f64 = 1.0;

/// Project-scoped, cross-session index of shared context.
#[derive(Clone)]
pub struct ContextIndex {
    pool: ConnectionPool,
}

impl ContextIndex {
    /// Build over a connection pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Insert or overwrite an item keyed by (project, type, key).
    ///
    /// The content hash is computed here, never supplied, so the stored
    /// hash always matches the stored content.
    #[instrument(skip(self, content, metadata), fields(project_id, item_type = %item_type, item_key))]
    pub fn upsert(
        &self,
        project_id: &str,
        item_type: ContextItemType,
        item_key: &str,
        content: &str,
        metadata: Option<Metadata>,
    ) -> Result<ContextItemRow> {
        let hash = content_hash(content);
        let metadata = match metadata {
            Some(meta) => meta.to_json()?,
            None => "{}".to_string(),
        };

        retry_on_busy(|| {
            let conn = self.pool.get()?;
            ContextRepo::upsert(
                &conn,
                &UpsertItem {
                    project_id,
                    item_type: item_type.as_str(),
                    item_key,
                    content,
                    content_hash: &hash,
                    metadata: &metadata,
                },
            )
        })
    }

    /// Fetch an item, recording the read.
    ///
    /// The access bump is best effort: a failure to update the bookkeeping
    /// is logged, never surfaced, and the read still succeeds. The returned
    /// row reflects the bump.
    pub fn get(
        &self,
        project_id: &str,
        item_type: ContextItemType,
        item_key: &str,
    ) -> Result<Option<ContextItemRow>> {
        let conn = self.pool.get()?;
        let Some(mut row) = ContextRepo::get(&conn, project_id, item_type.as_str(), item_key)?
        else {
            return Ok(None);
        };

        match ContextRepo::record_access(&conn, &row.id) {
            Ok(true) => {
                row.access_count += 1;
                row.last_accessed_at = Some(crate::row_types::now_rfc3339());
            }
            Ok(false) => {}
            Err(err) => {
                warn!(item_id = %row.id, error = %err, "failed to record context access");
            }
        }
        Ok(Some(row))
    }

    /// Fetch an item without touching access bookkeeping.
    pub fn peek(
        &self,
        project_id: &str,
        item_type: ContextItemType,
        item_key: &str,
    ) -> Result<Option<ContextItemRow>> {
        let conn = self.pool.get()?;
        ContextRepo::get(&conn, project_id, item_type.as_str(), item_key)
    }

    /// Link an item to a session. Re-linking overwrites the relevance
    /// score; the latest score wins.
    pub fn link(
        &self,
        session_id: &str,
        context_item_id: &str,
        relevance_score: Option<f64>,
    ) -> Result<()> {
        let score = relevance_score.unwrap_or(DEFAULT_RELEVANCE);
        retry_on_busy(|| {
            let conn = self.pool.get()?;
            ContextRepo::link_upsert(&conn, session_id, context_item_id, score)
        })
    }

    /// Fetch one session↔item link.
    pub fn get_link(
        &self,
        session_id: &str,
        context_item_id: &str,
    ) -> Result<Option<ContextLinkRow>> {
        let conn = self.pool.get()?;
        ContextRepo::get_link(&conn, session_id, context_item_id)
    }

    /// Items linked to a session with their relevance scores, most
    /// relevant first.
    pub fn list_for_session(&self, session_id: &str) -> Result<Vec<(ContextItemRow, f64)>> {
        let conn = self.pool.get()?;
        ContextRepo::list_for_session(&conn, session_id)
    }

    /// Most recently accessed items of one type in a project.
    pub fn recently_accessed(
        &self,
        project_id: &str,
        item_type: ContextItemType,
        limit: i64,
    ) -> Result<Vec<ContextItemRow>> {
        let conn = self.pool.get()?;
        ContextRepo::recently_accessed(&conn, project_id, item_type.as_str(), limit)
    }

    /// Most recently written items of one type in a project.
    pub fn recently_updated(
        &self,
        project_id: &str,
        item_type: ContextItemType,
        limit: i64,
    ) -> Result<Vec<ContextItemRow>> {
        let conn = self.pool.get()?;
        ContextRepo::recently_updated(&conn, project_id, item_type.as_str(), limit)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::connection::{ConnectionConfig, new_in_memory};
    use crate::migrations::run_migrations;
    use crate::stores::session_store::{CreateSessionOptions, SessionStore};
    use tandem_core::model::SessionType;

    fn make_index() -> (ContextIndex, SessionStore) {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        (ContextIndex::new(pool.clone()), SessionStore::new(pool))
    }

    #[test]
    fn stored_hash_matches_content() {
        let (index, _) = make_index();
        let row = index
            .upsert("proj_1", ContextItemType::File, "/a.rs", "fn main() {}", None)
            .unwrap();
        assert_eq!(row.content_hash, content_hash("fn main() {}"));

        // Overwrite keeps the invariant
        let row = index
            .upsert("proj_1", ContextItemType::File, "/a.rs", "fn main() { run(); }", None)
            .unwrap();
        assert_eq!(row.content_hash, content_hash("fn main() { run(); }"));
    }

    #[test]
    fn get_records_each_access() {
        let (index, _) = make_index();
        let _ = index
            .upsert("proj_1", ContextItemType::File, "/a.rs", "v1", None)
            .unwrap();

        let first = index
            .get("proj_1", ContextItemType::File, "/a.rs")
            .unwrap()
            .unwrap();
        assert_eq!(first.access_count, 1);

        let second = index
            .get("proj_1", ContextItemType::File, "/a.rs")
            .unwrap()
            .unwrap();
        assert_eq!(second.access_count, 2);
        assert!(second.last_accessed_at.is_some());
    }

    #[test]
    fn peek_leaves_bookkeeping_alone() {
        let (index, _) = make_index();
        let _ = index
            .upsert("proj_1", ContextItemType::File, "/a.rs", "v1", None)
            .unwrap();

        let row = index
            .peek("proj_1", ContextItemType::File, "/a.rs")
            .unwrap()
            .unwrap();
        assert_eq!(row.access_count, 0);
        assert!(row.last_accessed_at.is_none());
    }

    #[test]
    fn get_missing_is_none() {
        let (index, _) = make_index();
        assert!(index
            .get("proj_1", ContextItemType::File, "/nope.rs")
            .unwrap()
            .is_none());
    }

    #[test]
    fn link_defaults_relevance_and_rescores() {
        let (index, sessions) = make_index();
        let session = sessions
            .create(&CreateSessionOptions {
                project_id: "proj_1",
                user_id: "user_1",
                session_type: SessionType::Code,
                title: None,
                metadata: Metadata::new(),
            })
            .unwrap();
        let item = index
            .upsert("proj_1", ContextItemType::File, "/a.rs", "v1", None)
            .unwrap();

        index.link(&session.id, &item.id, None).unwrap();
        let link = index.get_link(&session.id, &item.id).unwrap().unwrap();
        assert!((link.relevance_score - DEFAULT_RELEVANCE).abs() < f64::EPSILON);

        index.link(&session.id, &item.id, Some(0.3)).unwrap();
        let link = index.get_link(&session.id, &item.id).unwrap().unwrap();
        assert!((link.relevance_score - 0.3).abs() < f64::EPSILON);
    }
}
