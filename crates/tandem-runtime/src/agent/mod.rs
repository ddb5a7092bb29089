//! The agent turn machinery.
//!
//! `agent_loop` owns the turn state machine; `history` rebuilds and
//! sanitizes the model replay; `tool_dispatch` executes one tool call
//! with full failure isolation; `event_emitter` broadcasts turn events.

pub mod agent_loop;
pub mod event_emitter;
pub mod history;
pub mod tool_dispatch;
