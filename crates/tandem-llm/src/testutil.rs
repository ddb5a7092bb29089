//! Test support: a scripted backend for exercising the agent loop
//! without a network.

use std::collections::VecDeque;

use async_trait::async_trait;
use parking_lot::Mutex;
use serde_json::{Map, Value};
use tandem_core::messages::ContentBlock;

use crate::backend::{ModelBackend, ModelRequest, ModelResponse, StopReason, TokenUsage};
use crate::errors::{BackendError, BackendResult};

/// A backend that replays a fixed script of responses.
///
/// Each `complete` call pops the next scripted response; running past the
/// end of the script is an API error, which makes over-calling loops fail
/// loudly in tests. Requests are recorded for assertion.
pub struct ScriptedBackend {
    script: Mutex<VecDeque<BackendResult<ModelResponse>>>,
    requests: Mutex<Vec<ModelRequest>>,
}

impl ScriptedBackend {
    /// Build from a response script, first response first.
    #[must_use]
    pub fn new(script: Vec<BackendResult<ModelResponse>>) -> Self {
        Self {
            script: Mutex::new(script.into_iter().collect()),
            requests: Mutex::new(Vec::new()),
        }
    }

    /// Requests seen so far, in call order.
    #[must_use]
    pub fn requests(&self) -> Vec<ModelRequest> {
        self.requests.lock().clone()
    }

    /// Number of completions served.
    #[must_use]
    pub fn calls(&self) -> usize {
        self.requests.lock().len()
    }
}

#[async_trait]
impl ModelBackend for ScriptedBackend {
    fn model(&self) -> &str {
        "scripted"
    }

    async fn complete(&self, request: &ModelRequest) -> BackendResult<ModelResponse> {
        self.requests.lock().push(request.clone());
        self.script.lock().pop_front().unwrap_or_else(|| {
            Err(BackendError::Api {
                status: 400,
                message: "script exhausted".into(),
                retryable: false,
            })
        })
    }
}

/// A final text response (`end_turn`).
#[must_use]
pub fn text_response(text: &str) -> ModelResponse {
    ModelResponse {
        blocks: vec![ContentBlock::Text {
            text: text.to_string(),
        }],
        stop_reason: StopReason::EndTurn,
        usage: TokenUsage::default(),
    }
}

/// A response requesting one tool call (`tool_use`), with optional
/// leading text.
#[must_use]
pub fn tool_call_response(
    text: Option<&str>,
    call_id: &str,
    tool_name: &str,
    arguments: Value,
) -> ModelResponse {
    let mut blocks = Vec::new();
    if let Some(text) = text {
        blocks.push(ContentBlock::Text {
            text: text.to_string(),
        });
    }
    let arguments = match arguments {
        Value::Object(map) => map,
        _ => Map::new(),
    };
    blocks.push(ContentBlock::ToolCall {
        id: call_id.to_string(),
        name: tool_name.to_string(),
        arguments,
    });
    ModelResponse {
        blocks,
        stop_reason: StopReason::ToolUse,
        usage: TokenUsage::default(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[tokio::test]
    async fn replays_script_in_order() {
        let backend = ScriptedBackend::new(vec![
            Ok(tool_call_response(None, "tc_1", "ls", serde_json::json!({}))),
            Ok(text_response("done")),
        ]);

        let first = backend.complete(&ModelRequest::default()).await.unwrap();
        assert_eq!(first.stop_reason, StopReason::ToolUse);

        let second = backend.complete(&ModelRequest::default()).await.unwrap();
        assert_eq!(second.text(), "done");

        assert!(backend.complete(&ModelRequest::default()).await.is_err());
        assert_eq!(backend.calls(), 3);
    }
}
