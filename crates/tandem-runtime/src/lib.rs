//! # tandem-runtime
//!
//! The orchestration layer: drives a turn from user message to final
//! assistant reply through the model backend and tool registry, and
//! aggregates cross-agent context for the prompt.
//!
//! ## Modules
//!
//! - [`agent`] — the turn loop, history sanitizer, tool dispatch, events
//! - [`aggregator`] — recomputed cross-agent context snapshots
//! - [`prompt`] — system prompt assembly

#![deny(unsafe_code)]

pub mod agent;
pub mod aggregator;
pub mod errors;
pub mod prompt;
pub mod types;

pub use agent::agent_loop::{AgentLoop, MAX_ROUND_TRIPS};
pub use agent::event_emitter::EventEmitter;
pub use aggregator::{ContextSnapshot, CrossAgentAggregator};
pub use errors::{Result, RuntimeError};
pub use types::{ToolInvocation, TurnRequest, TurnResult};
