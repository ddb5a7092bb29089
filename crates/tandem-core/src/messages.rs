//! Chat messages and content blocks for model replay.
//!
//! A [`ChatMessage`] is the in-memory unit sent to (and received from) a
//! model backend. Content is an ordered list of blocks — plain text, a
//! tool call requested by the model, or a tool result fed back to it.
//! The wire format is camelCase and must replay verbatim across turns.

use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};

use crate::model::MessageRole;

/// One content block inside a chat message.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(tag = "type", rename_all = "camelCase")]
pub enum ContentBlock {
    /// Plain text.
    #[serde(rename_all = "camelCase")]
    Text {
        /// The text content.
        text: String,
    },
    /// A tool invocation requested by the model.
    #[serde(rename_all = "camelCase")]
    ToolCall {
        /// Backend-assigned call ID; pairs the call with its result.
        id: String,
        /// Registered tool name.
        name: String,
        /// Schema-validated input object.
        arguments: Map<String, Value>,
    },
    /// The result of a tool invocation, fed back to the model.
    #[serde(rename_all = "camelCase")]
    ToolResult {
        /// ID of the tool call this result answers.
        tool_call_id: String,
        /// Result content (success output or failure reason).
        content: String,
        /// Whether the tool failed.
        is_error: bool,
    },
}

impl ContentBlock {
    /// Text content if this is a `Text` block.
    #[must_use]
    pub fn as_text(&self) -> Option<&str> {
        match self {
            Self::Text { text } => Some(text),
            _ => None,
        }
    }

    /// Whether this is a `ToolCall` block.
    #[must_use]
    pub fn is_tool_call(&self) -> bool {
        matches!(self, Self::ToolCall { .. })
    }
}

/// A message in model-replay form.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ChatMessage {
    /// Author role.
    pub role: MessageRole,
    /// Ordered content blocks.
    pub blocks: Vec<ContentBlock>,
}

impl ChatMessage {
    /// Plain-text user message.
    #[must_use]
    pub fn user_text(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::User,
            blocks: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Plain-text assistant message.
    #[must_use]
    pub fn assistant_text(text: impl Into<String>) -> Self {
        Self {
            role: MessageRole::Assistant,
            blocks: vec![ContentBlock::Text { text: text.into() }],
        }
    }

    /// Assistant message with explicit blocks (text and tool calls).
    #[must_use]
    pub fn assistant_blocks(blocks: Vec<ContentBlock>) -> Self {
        Self {
            role: MessageRole::Assistant,
            blocks,
        }
    }

    /// Tool message carrying one tool result.
    #[must_use]
    pub fn tool_result(
        tool_call_id: impl Into<String>,
        content: impl Into<String>,
        is_error: bool,
    ) -> Self {
        Self {
            role: MessageRole::Tool,
            blocks: vec![ContentBlock::ToolResult {
                tool_call_id: tool_call_id.into(),
                content: content.into(),
                is_error,
            }],
        }
    }

    /// Whether any block is a tool call.
    #[must_use]
    pub fn has_tool_calls(&self) -> bool {
        self.blocks.iter().any(ContentBlock::is_tool_call)
    }

    /// IDs of all tool-call blocks, in order.
    #[must_use]
    pub fn tool_call_ids(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolCall { id, .. } => Some(id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// IDs of all tool-result blocks, in order.
    #[must_use]
    pub fn tool_result_ids(&self) -> Vec<&str> {
        self.blocks
            .iter()
            .filter_map(|b| match b {
                ContentBlock::ToolResult { tool_call_id, .. } => Some(tool_call_id.as_str()),
                _ => None,
            })
            .collect()
    }

    /// Concatenated text of all `Text` blocks.
    #[must_use]
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}
