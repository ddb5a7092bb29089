//! Turn lifecycle events.
//!
//! [`TurnEvent`]s are emitted by the agent loop while a turn executes so a
//! transport can stream text and tool activity incrementally. They are
//! transient — never persisted — and delivery is lossy for slow receivers.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

/// Common fields carried by every turn event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BaseEvent {
    /// Session the turn belongs to.
    pub session_id: String,
    /// Turn this event belongs to.
    pub turn_id: String,
    /// ISO 8601 timestamp.
    pub timestamp: String,
}

impl BaseEvent {
    /// Base event stamped with the current time.
    #[must_use]
    pub fn now(session_id: &str, turn_id: &str) -> Self {
        Self {
            session_id: session_id.to_string(),
            turn_id: turn_id.to_string(),
            timestamp: chrono::Utc::now().to_rfc3339(),
        }
    }
}

/// A turn lifecycle event.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum TurnEvent {
    /// The loop accepted a user message and started a turn.
    #[serde(rename_all = "camelCase")]
    TurnStart {
        /// Common fields.
        base: BaseEvent,
    },
    /// A text block arrived from the model.
    #[serde(rename_all = "camelCase")]
    Text {
        /// Common fields.
        base: BaseEvent,
        /// The text content.
        text: String,
    },
    /// A tool call is about to execute.
    #[serde(rename_all = "camelCase")]
    ToolStart {
        /// Common fields.
        base: BaseEvent,
        /// Backend-assigned call ID.
        tool_call_id: String,
        /// Tool name.
        tool_name: String,
        /// Tool input.
        arguments: Map<String, Value>,
    },
    /// A tool call finished (success or failure).
    #[serde(rename_all = "camelCase")]
    ToolEnd {
        /// Common fields.
        base: BaseEvent,
        /// Backend-assigned call ID.
        tool_call_id: String,
        /// Tool name.
        tool_name: String,
        /// Whether the tool failed.
        is_error: bool,
        /// Wall-clock duration in milliseconds.
        duration_ms: u64,
    },
    /// The turn finished.
    #[serde(rename_all = "camelCase")]
    TurnEnd {
        /// Common fields.
        base: BaseEvent,
        /// Model round-trips consumed.
        round_trips: u32,
        /// Whether the iteration cap forced the exit.
        capped: bool,
    },
}

impl TurnEvent {
    /// Event type discriminator as it appears on the wire.
    #[must_use]
    pub fn event_type(&self) -> &'static str {
        match self {
            Self::TurnStart { .. } => "turnStart",
            Self::Text { .. } => "text",
            Self::ToolStart { .. } => "toolStart",
            Self::ToolEnd { .. } => "toolEnd",
            Self::TurnEnd { .. } => "turnEnd",
        }
    }

    /// Session ID this event belongs to.
    #[must_use]
    pub fn session_id(&self) -> &str {
        match self {
            Self::TurnStart { base }
            | Self::Text { base, .. }
            | Self::ToolStart { base, .. }
            | Self::ToolEnd { base, .. }
            | Self::TurnEnd { base, .. } => &base.session_id,
        }
    }
}
