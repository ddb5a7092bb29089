//! Connection pool construction.
//!
//! All database access goes through an r2d2 pool of rusqlite connections.
//! Every connection runs the same pragmas: WAL journaling, foreign keys on,
//! and a busy timeout so concurrent writers queue instead of failing
//! immediately.

use std::path::Path;
use std::time::Duration;

use r2d2_sqlite::SqliteConnectionManager;
use rusqlite::Connection;

use crate::errors::Result;

/// A pooled connection handle.
pub type PooledConnection = r2d2::PooledConnection<SqliteConnectionManager>;

/// The connection pool type used throughout the store.
pub type ConnectionPool = r2d2::Pool<SqliteConnectionManager>;

/// Pool construction options.
#[derive(Clone, Debug)]
pub struct ConnectionConfig {
    /// Maximum pool size.
    pub max_connections: u32,
    /// SQLite busy timeout per connection.
    pub busy_timeout: Duration,
}

impl Default for ConnectionConfig {
    fn default() -> Self {
        Self {
            max_connections: 8,
            busy_timeout: Duration::from_secs(5),
        }
    }
}

fn init_pragmas(conn: &Connection, busy_timeout: Duration) -> rusqlite::Result<()> {
    conn.busy_timeout(busy_timeout)?;
    conn.execute_batch(
        "PRAGMA journal_mode = WAL;
         PRAGMA foreign_keys = ON;
         PRAGMA synchronous = NORMAL;",
    )
}

/// Open (or create) a database file and build a pool around it.
pub fn new_pool(path: &Path, config: &ConnectionConfig) -> Result<ConnectionPool> {
    let busy_timeout = config.busy_timeout;
    let manager = SqliteConnectionManager::file(path)
        .with_init(move |conn| init_pragmas(conn, busy_timeout));
    let pool = r2d2::Pool::builder()
        .max_size(config.max_connections)
        .build(manager)?;
    Ok(pool)
}

/// Build a pool over a shared in-memory database (tests).
///
/// Uses a named shared-cache URI so every pooled connection sees the same
/// database; a plain `:memory:` open would give each connection its own.
/// The name is unique per call so parallel tests stay isolated.
pub fn new_in_memory(config: &ConnectionConfig) -> Result<ConnectionPool> {
    use std::sync::atomic::{AtomicU64, Ordering};
    static NEXT_DB: AtomicU64 = AtomicU64::new(0);

    let db = NEXT_DB.fetch_add(1, Ordering::Relaxed);
    let uri = format!("file:tandem_mem_{db}?mode=memory&cache=shared");
    let busy_timeout = config.busy_timeout;
    let manager = SqliteConnectionManager::file(uri)
        .with_flags(
            rusqlite::OpenFlags::SQLITE_OPEN_READ_WRITE
                | rusqlite::OpenFlags::SQLITE_OPEN_CREATE
                | rusqlite::OpenFlags::SQLITE_OPEN_URI,
        )
        .with_init(move |conn| init_pragmas(conn, busy_timeout));
    let pool = r2d2::Pool::builder()
        .max_size(config.max_connections)
        .build(manager)?;
    Ok(pool)
}
