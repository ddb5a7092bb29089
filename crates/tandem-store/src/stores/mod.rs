//! The four public store facades.
//!
//! | Module | Facade | Responsibility |
//! |--------|--------|-----------|
//! | `session_store` | [`SessionStore`](session_store::SessionStore) | session lifecycle |
//! | `message_log` | [`MessageLog`](message_log::MessageLog) | append-only transcript |
//! | `context_index` | [`ContextIndex`](context_index::ContextIndex) | shared-context items + links |
//! | `job_tracker` | [`JobTracker`](job_tracker::JobTracker) | long-running work lifecycle |
//!
//! Facades hold a cloned [`ConnectionPool`](crate::connection::ConnectionPool)
//! and commit each operation independently. There is no in-process entity
//! locking — SQLite's atomic upsert/insert semantics are the serialization
//! mechanism — but transient BUSY/LOCKED errors are retried with backoff.

use std::time::Duration;

use crate::errors::{Result, StoreError};

pub mod context_index;
pub mod job_tracker;
pub mod message_log;
pub mod session_store;

const BUSY_MAX_RETRIES: u32 = 32;

/// Retry an operation on SQLite BUSY/LOCKED with linear backoff + jitter.
///
/// Backoff base = min(attempts * 10, 500) ms, jitter ±25% to spread
/// contending writers.
pub(crate) fn retry_on_busy<T>(mut f: impl FnMut() -> Result<T>) -> Result<T> {
    let mut attempts = 0;

    loop {
        match f() {
            Ok(value) => return Ok(value),
            Err(err) if is_busy_or_locked(&err) && attempts < BUSY_MAX_RETRIES => {
                attempts += 1;
                let base_ms = u64::from(attempts).saturating_mul(10).min(500);
                let jitter_range = base_ms / 4;
                let jitter = if jitter_range > 0 {
                    rand::random::<u64>() % (jitter_range * 2 + 1)
                } else {
                    0
                };
                let backoff_ms = base_ms.saturating_sub(jitter_range) + jitter;
                std::thread::sleep(Duration::from_millis(backoff_ms));
            }
            Err(err) => return Err(err),
        }
    }
}

fn is_busy_or_locked(err: &StoreError) -> bool {
    match err {
        StoreError::Sqlite(rusqlite::Error::SqliteFailure(code, _)) => matches!(
            code.code,
            rusqlite::ErrorCode::DatabaseBusy | rusqlite::ErrorCode::DatabaseLocked
        ),
        _ => false,
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn passes_through_success() {
        let result = retry_on_busy(|| Ok::<_, StoreError>(7)).unwrap();
        assert_eq!(result, 7);
    }

    #[test]
    fn passes_through_non_busy_errors() {
        let mut calls = 0;
        let result: Result<()> = retry_on_busy(|| {
            calls += 1;
            Err(StoreError::Internal("boom".into()))
        });
        assert!(result.is_err());
        assert_eq!(calls, 1);
    }

    #[test]
    fn retries_busy_until_success() {
        let mut calls = 0;
        let result = retry_on_busy(|| {
            calls += 1;
            if calls < 3 {
                Err(StoreError::Sqlite(rusqlite::Error::SqliteFailure(
                    rusqlite::ffi::Error::new(rusqlite::ffi::SQLITE_BUSY),
                    None,
                )))
            } else {
                Ok(calls)
            }
        })
        .unwrap();
        assert_eq!(result, 3);
    }
}
