//! The [`AgentTool`] trait and its execution context.

use std::path::PathBuf;

use async_trait::async_trait;
use serde_json::Value;
use tandem_core::model::ContextItemType;
use tandem_core::tools::{ToolDefinition, ToolParameterSchema};
use tokio_util::sync::CancellationToken;

use crate::errors::ToolResult;

/// Ambient context handed to every tool execution.
#[derive(Clone, Debug)]
pub struct ToolContext {
    /// Project the session belongs to.
    pub project_id: String,
    /// Session driving the turn.
    pub session_id: String,
    /// Acting user.
    pub user_id: String,
    /// Workspace root, when the session has one.
    pub workspace: Option<PathBuf>,
    /// Cooperative cancellation for long-running tools.
    pub cancellation: CancellationToken,
}

/// A piece of shared context produced by a tool run.
///
/// Artifacts are upserted into the cross-session context index by the
/// dispatcher; the tool itself never touches storage.
#[derive(Clone, Debug, PartialEq)]
pub struct ContextArtifact {
    /// Item kind in the index.
    pub kind: ContextItemType,
    /// Item key, unique within (project, kind).
    pub key: String,
    /// Item content.
    pub content: String,
}

/// What a successful tool execution hands back.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct ToolOutput {
    /// Result content fed back to the model.
    pub content: String,
    /// Shared-context artifacts to index.
    pub artifacts: Vec<ContextArtifact>,
}

impl ToolOutput {
    /// Plain-text output with no artifacts.
    #[must_use]
    pub fn text(content: impl Into<String>) -> Self {
        Self {
            content: content.into(),
            artifacts: Vec::new(),
        }
    }
}

/// A capability the model may invoke.
#[async_trait]
pub trait AgentTool: Send + Sync {
    /// Unique tool name.
    fn name(&self) -> &str;

    /// What the tool does, for the model.
    fn description(&self) -> &str;

    /// Input schema advertised to the model.
    fn input_schema(&self) -> ToolParameterSchema;

    /// Run the tool.
    async fn execute(&self, input: Value, ctx: &ToolContext) -> ToolResult<ToolOutput>;

    /// Definition as advertised to the model.
    fn definition(&self) -> ToolDefinition {
        ToolDefinition {
            name: self.name().to_string(),
            description: self.description().to_string(),
            parameters: self.input_schema(),
        }
    }
}
