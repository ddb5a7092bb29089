//! Anthropic Messages API backend.
//!
//! Non-streaming: one POST per round-trip, content blocks parsed out of
//! the JSON body. Auth is `x-api-key`; the model never sees credentials.

use metrics::counter;
use reqwest::header::{CONTENT_TYPE, HeaderMap, HeaderValue};
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value, json};
use tracing::{debug, error, instrument};

use async_trait::async_trait;
use tandem_core::messages::{ChatMessage, ContentBlock};
use tandem_core::model::MessageRole;

use crate::backend::{ModelBackend, ModelRequest, ModelResponse, StopReason, TokenUsage};
use crate::errors::{BackendError, BackendResult};

const DEFAULT_BASE_URL: &str = "https://api.anthropic.com";
const API_VERSION: &str = "2023-06-01";
const DEFAULT_MAX_OUTPUT_TOKENS: u32 = 8192;

/// Anthropic backend configuration.
#[derive(Clone, Debug)]
pub struct AnthropicConfig {
    /// Model identifier.
    pub model: String,
    /// API key for `x-api-key` auth.
    pub api_key: String,
    /// Base URL override (testing, proxies).
    pub base_url: Option<String>,
    /// Output token cap when the request does not set one.
    pub max_tokens: Option<u32>,
}

/// Anthropic Messages API client.
pub struct AnthropicBackend {
    config: AnthropicConfig,
    client: reqwest::Client,
}

#[derive(Serialize)]
struct WireRequest {
    model: String,
    max_tokens: u32,
    messages: Vec<WireMessage>,
    #[serde(skip_serializing_if = "Option::is_none")]
    system: Option<String>,
    #[serde(skip_serializing_if = "Option::is_none")]
    tools: Option<Vec<Value>>,
}

#[derive(Serialize)]
struct WireMessage {
    role: &'static str,
    content: Vec<Value>,
}

#[derive(Deserialize)]
struct WireResponse {
    content: Vec<Value>,
    stop_reason: Option<String>,
    #[serde(default)]
    usage: WireUsage,
}

#[derive(Deserialize, Default)]
struct WireUsage {
    #[serde(default)]
    input_tokens: u64,
    #[serde(default)]
    output_tokens: u64,
}

impl AnthropicBackend {
    /// Create a new backend with its own HTTP client.
    #[must_use]
    pub fn new(config: AnthropicConfig) -> Self {
        Self {
            config,
            client: reqwest::Client::new(),
        }
    }

    /// Create a new backend with a shared HTTP client.
    #[must_use]
    pub fn with_client(config: AnthropicConfig, client: reqwest::Client) -> Self {
        Self { config, client }
    }

    fn build_headers(&self) -> BackendResult<HeaderMap> {
        let mut headers = HeaderMap::new();
        let _ = headers.insert(CONTENT_TYPE, HeaderValue::from_static("application/json"));
        let _ = headers.insert("anthropic-version", HeaderValue::from_static(API_VERSION));
        let _ = headers.insert(
            "x-api-key",
            HeaderValue::from_str(&self.config.api_key).map_err(|e| BackendError::Auth {
                message: format!("invalid API key header: {e}"),
            })?,
        );
        Ok(headers)
    }

    /// Convert replay messages to wire form.
    ///
    /// Tool messages become `user` turns carrying `tool_result` blocks,
    /// which is how the Messages API expects results fed back. System
    /// messages are skipped; the system prompt travels out-of-band.
    fn convert_messages(messages: &[ChatMessage]) -> Vec<WireMessage> {
        let mut wire = Vec::with_capacity(messages.len());
        for msg in messages {
            let role = match msg.role {
                MessageRole::User | MessageRole::Tool => "user",
                MessageRole::Assistant => "assistant",
                MessageRole::System => continue,
            };
            let content: Vec<Value> = msg.blocks.iter().map(Self::convert_block).collect();
            if content.is_empty() {
                continue;
            }
            wire.push(WireMessage { role, content });
        }
        wire
    }

    fn convert_block(block: &ContentBlock) -> Value {
        match block {
            ContentBlock::Text { text } => json!({"type": "text", "text": text}),
            ContentBlock::ToolCall {
                id,
                name,
                arguments,
            } => json!({
                "type": "tool_use",
                "id": id,
                "name": name,
                "input": Value::Object(arguments.clone()),
            }),
            ContentBlock::ToolResult {
                tool_call_id,
                content,
                is_error,
            } => json!({
                "type": "tool_result",
                "tool_use_id": tool_call_id,
                "content": content,
                "is_error": is_error,
            }),
        }
    }

    fn build_tools(request: &ModelRequest) -> BackendResult<Option<Vec<Value>>> {
        if request.tools.is_empty() {
            return Ok(None);
        }
        let tools = request
            .tools
            .iter()
            .map(|t| {
                Ok(json!({
                    "name": t.name,
                    "description": t.description,
                    "input_schema": serde_json::to_value(&t.parameters)?,
                }))
            })
            .collect::<BackendResult<Vec<_>>>()?;
        Ok(Some(tools))
    }

    fn build_request(&self, request: &ModelRequest) -> BackendResult<WireRequest> {
        Ok(WireRequest {
            model: self.config.model.clone(),
            max_tokens: request
                .max_tokens
                .or(self.config.max_tokens)
                .unwrap_or(DEFAULT_MAX_OUTPUT_TOKENS),
            messages: Self::convert_messages(&request.messages),
            system: request.system_prompt.clone(),
            tools: Self::build_tools(request)?,
        })
    }

    /// Parse assistant content blocks out of the response body.
    ///
    /// Unknown block types (thinking, citations) are ignored rather than
    /// rejected, so API additions do not break the loop.
    fn parse_blocks(content: &[Value]) -> BackendResult<Vec<ContentBlock>> {
        let mut blocks = Vec::with_capacity(content.len());
        for value in content {
            match value.get("type").and_then(Value::as_str) {
                Some("text") => {
                    let text = value
                        .get("text")
                        .and_then(Value::as_str)
                        .ok_or_else(|| {
                            BackendError::InvalidResponse("text block without text".into())
                        })?;
                    blocks.push(ContentBlock::Text {
                        text: text.to_string(),
                    });
                }
                Some("tool_use") => {
                    let id = value.get("id").and_then(Value::as_str).ok_or_else(|| {
                        BackendError::InvalidResponse("tool_use block without id".into())
                    })?;
                    let name = value.get("name").and_then(Value::as_str).ok_or_else(|| {
                        BackendError::InvalidResponse("tool_use block without name".into())
                    })?;
                    let arguments = match value.get("input") {
                        Some(Value::Object(map)) => map.clone(),
                        _ => Map::new(),
                    };
                    blocks.push(ContentBlock::ToolCall {
                        id: id.to_string(),
                        name: name.to_string(),
                        arguments,
                    });
                }
                _ => {}
            }
        }
        Ok(blocks)
    }

    fn parse_error_message(body: &str) -> String {
        serde_json::from_str::<Value>(body)
            .ok()
            .and_then(|v| {
                v.pointer("/error/message")
                    .and_then(Value::as_str)
                    .map(String::from)
            })
            .unwrap_or_else(|| body.chars().take(200).collect())
    }
}

#[async_trait]
impl ModelBackend for AnthropicBackend {
    fn model(&self) -> &str {
        &self.config.model
    }

    #[instrument(skip_all, fields(model = %self.config.model))]
    async fn complete(&self, request: &ModelRequest) -> BackendResult<ModelResponse> {
        let wire = self.build_request(request)?;
        let base_url = self.config.base_url.as_deref().unwrap_or(DEFAULT_BASE_URL);
        let url = format!("{base_url}/v1/messages");
        let headers = self.build_headers()?;

        debug!(
            max_tokens = wire.max_tokens,
            message_count = wire.messages.len(),
            has_tools = wire.tools.is_some(),
            "sending completion request"
        );

        let response = self
            .client
            .post(&url)
            .headers(headers)
            .json(&wire)
            .send()
            .await?;

        let status = response.status();
        if !status.is_success() {
            counter!("llm_requests_total", "outcome" => "error").increment(1);
            let retry_after_ms = response
                .headers()
                .get("retry-after")
                .and_then(|v| v.to_str().ok())
                .and_then(|v| v.parse::<u64>().ok())
                .map_or(0, |secs| secs * 1000);
            let body = response.text().await.unwrap_or_default();
            let message = Self::parse_error_message(&body);
            error!(status = status.as_u16(), %message, "api error");
            if status.as_u16() == 429 {
                return Err(BackendError::RateLimited {
                    retry_after_ms,
                    message,
                });
            }
            if status.as_u16() == 401 || status.as_u16() == 403 {
                return Err(BackendError::Auth { message });
            }
            return Err(BackendError::Api {
                status: status.as_u16(),
                message,
                retryable: status.is_server_error() || status.as_u16() == 529,
            });
        }

        let body: WireResponse = response.json().await?;
        counter!("llm_requests_total", "outcome" => "ok").increment(1);

        Ok(ModelResponse {
            blocks: Self::parse_blocks(&body.content)?,
            stop_reason: StopReason::from_wire(body.stop_reason.as_deref()),
            usage: TokenUsage {
                input_tokens: body.usage.input_tokens,
                output_tokens: body.usage.output_tokens,
            },
        })
    }
}

// ─────────────────────────────────────────────────────────────────────────────
// Tests
// ─────────────────────────────────────────────────────────────────────────────
