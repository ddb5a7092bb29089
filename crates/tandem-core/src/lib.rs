//! # tandem-core
//!
//! Foundation types for the Tandem orchestration core.
//!
//! This crate provides the shared vocabulary that all other Tandem crates
//! depend on:
//!
//! - **IDs**: [`ids`] — prefixed UUIDv7 entity identifiers
//! - **Vocabulary**: [`model`] — session types, statuses, roles, item kinds
//! - **Messages**: [`messages::ChatMessage`] and content blocks for model replay
//! - **Metadata**: [`metadata::Metadata`] — the versioned key-value map
//! - **Hashing**: [`hash::content_hash`] — SHA-256 content fingerprints
//! - **Events**: [`events::TurnEvent`] — turn lifecycle events for streaming
//! - **Tools**: [`tools::ToolDefinition`] — tool surface shown to the model
//!
//! ## Crate Position
//!
//! Foundation crate. Depended on by all other tandem crates.

#![deny(unsafe_code)]

pub mod events;
pub mod hash;
pub mod ids;
pub mod messages;
pub mod metadata;
pub mod model;
pub mod tools;
