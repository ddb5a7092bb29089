//! Shared test utilities for tool and dispatch tests.
//!
//! Provides `make_ctx()` plus small deterministic tools: `EchoTool`,
//! `FailingTool`, and `ArtifactTool` for exercising artifact indexing.

use async_trait::async_trait;
use serde_json::Value;
use tandem_core::model::ContextItemType;
use tandem_core::tools::ToolParameterSchema;
use tokio_util::sync::CancellationToken;

use crate::errors::{ToolError, ToolResult};
use crate::traits::{AgentTool, ContextArtifact, ToolContext, ToolOutput};

/// Build a standard test `ToolContext`.
#[must_use]
pub fn make_ctx() -> ToolContext {
    ToolContext {
        project_id: "proj_1".into(),
        session_id: "sess_1".into(),
        user_id: "user_1".into(),
        workspace: None,
        cancellation: CancellationToken::new(),
    }
}

/// Echoes its `text` input back as output.
pub struct EchoTool {
    name: String,
    description: String,
}

impl EchoTool {
    /// Echo tool with a custom name.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self::with_description(name, "Echo the input text")
    }

    /// Echo tool with custom name and description.
    #[must_use]
    pub fn with_description(name: &str, description: &str) -> Self {
        Self {
            name: name.to_string(),
            description: description.to_string(),
        }
    }
}

#[async_trait]
impl AgentTool for EchoTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        &self.description
    }

    fn input_schema(&self) -> ToolParameterSchema {
        ToolParameterSchema::empty_object()
    }

    async fn execute(&self, input: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        let text = input
            .get("text")
            .and_then(Value::as_str)
            .unwrap_or_default();
        Ok(ToolOutput::text(format!("echo: {text}")))
    }
}

/// Always fails with `ExecutionFailed`.
pub struct FailingTool {
    name: String,
}

impl FailingTool {
    /// Failing tool with a custom name.
    #[must_use]
    pub fn named(name: &str) -> Self {
        Self {
            name: name.to_string(),
        }
    }
}

#[async_trait]
impl AgentTool for FailingTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Always fails"
    }

    fn input_schema(&self) -> ToolParameterSchema {
        ToolParameterSchema::empty_object()
    }

    async fn execute(&self, _input: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        Err(ToolError::ExecutionFailed("deliberate failure".into()))
    }
}

/// Succeeds and emits one fixed context artifact.
pub struct ArtifactTool {
    name: String,
    artifact: ContextArtifact,
}

impl ArtifactTool {
    /// Tool that emits a `file` artifact with the given key and content.
    #[must_use]
    pub fn file(name: &str, key: &str, content: &str) -> Self {
        Self {
            name: name.to_string(),
            artifact: ContextArtifact {
                kind: ContextItemType::File,
                key: key.to_string(),
                content: content.to_string(),
            },
        }
    }
}

#[async_trait]
impl AgentTool for ArtifactTool {
    fn name(&self) -> &str {
        &self.name
    }

    fn description(&self) -> &str {
        "Emits a context artifact"
    }

    fn input_schema(&self) -> ToolParameterSchema {
        ToolParameterSchema::empty_object()
    }

    async fn execute(&self, _input: Value, _ctx: &ToolContext) -> ToolResult<ToolOutput> {
        Ok(ToolOutput {
            content: format!("wrote {}", self.artifact.key),
            artifacts: vec![self.artifact.clone()],
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[tokio::test]
    async fn echo_round_trips_text() {
        let tool = EchoTool::named("echo");
        let out = tool
            .execute(json!({"text": "hi"}), &make_ctx())
            .await
            .unwrap();
        assert_eq!(out.content, "echo: hi");
        assert!(out.artifacts.is_empty());
    }

    #[tokio::test]
    async fn failing_tool_fails() {
        let tool = FailingTool::named("boom");
        let err = tool.execute(json!({}), &make_ctx()).await.unwrap_err();
        assert!(matches!(err, ToolError::ExecutionFailed(_)));
    }

    #[tokio::test]
    async fn artifact_tool_emits_file() {
        let tool = ArtifactTool::file("write", "/src/a.rs", "fn a() {}");
        let out = tool.execute(json!({}), &make_ctx()).await.unwrap();
        assert_eq!(out.artifacts.len(), 1);
        assert_eq!(out.artifacts[0].kind, ContextItemType::File);
    }
}
