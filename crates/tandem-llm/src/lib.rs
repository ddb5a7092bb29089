//! # tandem-llm
//!
//! The model backend seam and its Anthropic implementation.
//!
//! [`ModelBackend`] is the one trait the agent loop talks to: a single
//! non-streaming `complete` call per round-trip. [`AnthropicBackend`]
//! implements it over the Messages API; [`testutil::ScriptedBackend`]
//! implements it over a canned script for loop tests.

#![deny(unsafe_code)]

pub mod anthropic;
pub mod backend;
pub mod errors;
pub mod testutil;

pub use anthropic::{AnthropicBackend, AnthropicConfig};
pub use backend::{ModelBackend, ModelRequest, ModelResponse, StopReason, TokenUsage};
pub use errors::{BackendError, BackendResult};
