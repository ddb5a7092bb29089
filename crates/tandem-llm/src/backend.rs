//! The [`ModelBackend`] trait and its request/response types.

use async_trait::async_trait;
use tandem_core::messages::{ChatMessage, ContentBlock};
use tandem_core::tools::ToolDefinition;

use crate::errors::BackendResult;

/// Why the model stopped generating.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum StopReason {
    /// Normal completion.
    EndTurn,
    /// The model wants tool results before continuing.
    ToolUse,
    /// Output token limit reached.
    MaxTokens,
}

impl StopReason {
    /// Map a provider stop-reason string to a unified value.
    ///
    /// Unknown strings default to `EndTurn`.
    #[must_use]
    pub fn from_wire(reason: Option<&str>) -> Self {
        match reason {
            Some("tool_use") => Self::ToolUse,
            Some("max_tokens") => Self::MaxTokens,
            _ => Self::EndTurn,
        }
    }
}

/// Token accounting for one completion.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq)]
pub struct TokenUsage {
    /// Prompt tokens.
    pub input_tokens: u64,
    /// Completion tokens.
    pub output_tokens: u64,
}

/// One completion request.
#[derive(Clone, Debug, Default)]
pub struct ModelRequest {
    /// System prompt, sent out-of-band from the message list.
    pub system_prompt: Option<String>,
    /// Conversation replay, oldest first.
    pub messages: Vec<ChatMessage>,
    /// Tools the model may call this turn.
    pub tools: Vec<ToolDefinition>,
    /// Output token cap. Backends fall back to their configured default.
    pub max_tokens: Option<u32>,
}

/// One completion response.
#[derive(Clone, Debug)]
pub struct ModelResponse {
    /// Assistant content: text and tool-call blocks, in model order.
    pub blocks: Vec<ContentBlock>,
    /// Why generation stopped.
    pub stop_reason: StopReason,
    /// Token accounting.
    pub usage: TokenUsage,
}

impl ModelResponse {
    /// Tool-call blocks, in model order.
    #[must_use]
    pub fn tool_calls(&self) -> Vec<&ContentBlock> {
        self.blocks.iter().filter(|b| b.is_tool_call()).collect()
    }

    /// Concatenated text of all text blocks.
    #[must_use]
    pub fn text(&self) -> String {
        self.blocks
            .iter()
            .filter_map(ContentBlock::as_text)
            .collect::<Vec<_>>()
            .join("")
    }
}

/// A model backend: one blocking round-trip per call.
#[async_trait]
pub trait ModelBackend: Send + Sync {
    /// Model identifier used for requests.
    fn model(&self) -> &str;

    /// Run one completion.
    async fn complete(&self, request: &ModelRequest) -> BackendResult<ModelResponse>;
}
