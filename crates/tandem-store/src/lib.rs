//! # tandem-store
//!
//! SQLite persistence for the Tandem orchestration core.
//!
//! Layered the usual way:
//!
//! - [`connection`] — r2d2-pooled rusqlite with WAL + foreign keys
//! - [`migrations`] — versioned schema DDL
//! - [`row_types`] — plain row structs (enum columns kept as TEXT)
//! - [`repositories`] — stateless repos, every method takes `&Connection`
//! - [`stores`] — the four public facades: [`SessionStore`], [`MessageLog`],
//!   [`ContextIndex`], [`JobTracker`]
//!
//! Every facade method commits independently — there is no cross-entity
//! transaction, so callers must tolerate partial completion after a crash.
//!
//! ## Crate Position
//!
//! Depends on: tandem-core. Depended on by: tandem-runtime.

#![deny(unsafe_code)]

pub mod connection;
pub mod errors;
pub mod migrations;
pub mod repositories;
pub mod row_types;
pub mod stores;

pub use connection::{ConnectionConfig, ConnectionPool, new_in_memory, new_pool};
pub use errors::{Result, StoreError};
pub use migrations::run_migrations;
pub use stores::context_index::ContextIndex;
pub use stores::job_tracker::{JobTracker, JobUpdate};
pub use stores::message_log::{AppendMessageOptions, MessageLog};
pub use stores::session_store::{CreateSessionOptions, SessionStore};
