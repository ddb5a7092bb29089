//! Context repository — `context_items` plus the `session_context_links`
//! relevance join.
//!
//! Items are unique per (project, type, key) and written with native
//! `ON CONFLICT … DO UPDATE` upserts; the link table has the same upsert
//! shape with latest-score-wins semantics.

use rusqlite::{Connection, OptionalExtension, params};
use tandem_core::ids;

use crate::errors::Result;
use crate::row_types::{ContextItemRow, ContextLinkRow, now_rfc3339};

const ITEM_COLUMNS: &str = "id, project_id, item_type, item_key, content, content_hash, \
     metadata, last_accessed_at, access_count, created_at, updated_at";

fn map_item(row: &rusqlite::Row<'_>) -> rusqlite::Result<ContextItemRow> {
    Ok(ContextItemRow {
        id: row.get(0)?,
        project_id: row.get(1)?,
        item_type: row.get(2)?,
        item_key: row.get(3)?,
        content: row.get(4)?,
        content_hash: row.get(5)?,
        metadata: row.get(6)?,
        last_accessed_at: row.get(7)?,
        access_count: row.get(8)?,
        created_at: row.get(9)?,
        updated_at: row.get(10)?,
    })
}

/// Column values for a context item upsert.
pub struct UpsertItem<'a> {
    /// Owning project.
    pub project_id: &'a str,
    /// Item kind.
    pub item_type: &'a str,
    /// Key, unique within (project, type).
    pub item_key: &'a str,
    /// Content.
    pub content: &'a str,
    /// SHA-256 of `content`.
    pub content_hash: &'a str,
    /// Metadata JSON.
    pub metadata: &'a str,
}

/// Context repository — stateless, every method takes `&Connection`.
pub struct ContextRepo;

impl ContextRepo {
    /// Insert or overwrite by (project, type, key).
    ///
    /// Overwrites replace content, hash, and metadata and refresh
    /// `updated_at`; access bookkeeping and `created_at` are preserved.
    pub fn upsert(conn: &Connection, item: &UpsertItem<'_>) -> Result<ContextItemRow> {
        let id = ids::context_item_id();
        let now = now_rfc3339();
        let _ = conn.execute(
            "INSERT INTO context_items (id, project_id, item_type, item_key, content,
                                        content_hash, metadata, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?5, ?6, ?7, ?8, ?8)
             ON CONFLICT (project_id, item_type, item_key) DO UPDATE SET
                 content = excluded.content,
                 content_hash = excluded.content_hash,
                 metadata = excluded.metadata,
                 updated_at = excluded.updated_at",
            params![
                id,
                item.project_id,
                item.item_type,
                item.item_key,
                item.content,
                item.content_hash,
                item.metadata,
                now
            ],
        )?;
        // Re-read: on conflict the stored row keeps its original id
        Self::get(conn, item.project_id, item.item_type, item.item_key)?.ok_or_else(|| {
            crate::errors::StoreError::Internal("context item vanished after upsert".into())
        })
    }

    /// Fetch by (project, type, key) without touching access bookkeeping.
    pub fn get(
        conn: &Connection,
        project_id: &str,
        item_type: &str,
        item_key: &str,
    ) -> Result<Option<ContextItemRow>> {
        let row = conn
            .query_row(
                &format!(
                    "SELECT {ITEM_COLUMNS} FROM context_items
                     WHERE project_id = ?1 AND item_type = ?2 AND item_key = ?3"
                ),
                params![project_id, item_type, item_key],
                map_item,
            )
            .optional()?;
        Ok(row)
    }

    /// Record one read hit: bump `access_count`, refresh `last_accessed_at`.
    pub fn record_access(conn: &Connection, item_id: &str) -> Result<bool> {
        let now = now_rfc3339();
        let changed = conn.execute(
            "UPDATE context_items
             SET access_count = access_count + 1, last_accessed_at = ?1
             WHERE id = ?2",
            params![now, item_id],
        )?;
        Ok(changed > 0)
    }

    /// Upsert a session↔item link; the latest relevance score wins.
    pub fn link_upsert(
        conn: &Connection,
        session_id: &str,
        context_item_id: &str,
        relevance_score: f64,
    ) -> Result<()> {
        let now = now_rfc3339();
        let _ = conn.execute(
            "INSERT INTO session_context_links
                 (session_id, context_item_id, relevance_score, created_at, updated_at)
             VALUES (?1, ?2, ?3, ?4, ?4)
             ON CONFLICT (session_id, context_item_id) DO UPDATE SET
                 relevance_score = excluded.relevance_score,
                 updated_at = excluded.updated_at",
            params![session_id, context_item_id, relevance_score, now],
        )?;
        Ok(())
    }

    /// Fetch one link row.
    pub fn get_link(
        conn: &Connection,
        session_id: &str,
        context_item_id: &str,
    ) -> Result<Option<ContextLinkRow>> {
        let row = conn
            .query_row(
                "SELECT session_id, context_item_id, relevance_score, created_at, updated_at
                 FROM session_context_links
                 WHERE session_id = ?1 AND context_item_id = ?2",
                params![session_id, context_item_id],
                |row| {
                    Ok(ContextLinkRow {
                        session_id: row.get(0)?,
                        context_item_id: row.get(1)?,
                        relevance_score: row.get(2)?,
                        created_at: row.get(3)?,
                        updated_at: row.get(4)?,
                    })
                },
            )
            .optional()?;
        Ok(row)
    }

    /// Items linked to a session, by relevance descending, then recency
    /// descending.
    pub fn list_for_session(
        conn: &Connection,
        session_id: &str,
    ) -> Result<Vec<(ContextItemRow, f64)>> {
        let mut stmt = conn.prepare(
            "SELECT c.id, c.project_id, c.item_type, c.item_key, c.content, c.content_hash,
                    c.metadata, c.last_accessed_at, c.access_count, c.created_at, c.updated_at,
                    l.relevance_score
             FROM session_context_links l
             JOIN context_items c ON c.id = l.context_item_id
             WHERE l.session_id = ?1
             ORDER BY l.relevance_score DESC, c.updated_at DESC",
        )?;
        let rows = stmt
            .query_map(params![session_id], |row| {
                Ok((map_item(row)?, row.get::<_, f64>(11)?))
            })?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Most recently accessed items of one type in a project.
    ///
    /// Items never read (`last_accessed_at IS NULL`) sort last.
    pub fn recently_accessed(
        conn: &Connection,
        project_id: &str,
        item_type: &str,
        limit: i64,
    ) -> Result<Vec<ContextItemRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM context_items
             WHERE project_id = ?1 AND item_type = ?2
             ORDER BY last_accessed_at IS NULL, last_accessed_at DESC
             LIMIT ?3"
        ))?;
        let rows = stmt
            .query_map(params![project_id, item_type, limit], map_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }

    /// Most recently written items of one type in a project.
    pub fn recently_updated(
        conn: &Connection,
        project_id: &str,
        item_type: &str,
        limit: i64,
    ) -> Result<Vec<ContextItemRow>> {
        let mut stmt = conn.prepare(&format!(
            "SELECT {ITEM_COLUMNS} FROM context_items
             WHERE project_id = ?1 AND item_type = ?2
             ORDER BY updated_at DESC
             LIMIT ?3"
        ))?;
        let rows = stmt
            .query_map(params![project_id, item_type, limit], map_item)?
            .collect::<rusqlite::Result<Vec<_>>>()?;
        Ok(rows)
    }
}
