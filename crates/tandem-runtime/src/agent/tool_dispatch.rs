//! Single tool call execution with failure isolation.
//!
//! A failing tool becomes an error tool message plus an `error` context
//! item; it never ends the turn. Only storage failures propagate.

use std::sync::Arc;
use std::time::Instant;

use metrics::{counter, histogram};
use serde_json::{Map, Value};
use tandem_core::events::{BaseEvent, TurnEvent};
use tandem_core::messages::{ChatMessage, ContentBlock};
use tandem_core::model::{ContextItemType, MessageRole};
use tandem_store::{AppendMessageOptions, ContextIndex, MessageLog};
use tandem_tools::{ContextArtifact, ToolContext, ToolRegistry};
use tokio_util::sync::CancellationToken;
use tracing::{debug, instrument, warn};

use crate::agent::event_emitter::EventEmitter;
use crate::errors::Result;
use crate::types::ToolInvocation;

/// Per-turn identity handed to each dispatch.
#[derive(Clone)]
pub struct TurnScope {
    /// Session driving the turn.
    pub session_id: String,
    /// Project the session belongs to.
    pub project_id: String,
    /// Acting user.
    pub user_id: String,
    /// Agent role tag for persisted messages.
    pub agent_type: Option<tandem_core::model::AgentRole>,
    /// Turn identifier, for events.
    pub turn_id: String,
    /// Cancellation shared with every tool this turn runs.
    pub cancellation: CancellationToken,
}

/// What one dispatch produced.
pub struct DispatchOutcome {
    /// The invocation record for the turn result.
    pub invocation: ToolInvocation,
    /// The tool-result message to extend the in-memory replay with.
    pub replay_message: ChatMessage,
    /// Artifacts the tool emitted (already indexed).
    pub artifacts: Vec<ContextArtifact>,
}

/// Executes tool calls one at a time.
pub struct ToolDispatcher {
    registry: Arc<ToolRegistry>,
    messages: MessageLog,
    context: ContextIndex,
    emitter: Arc<EventEmitter>,
}

impl ToolDispatcher {
    /// Build a dispatcher over the shared collaborators.
    pub fn new(
        registry: Arc<ToolRegistry>,
        messages: MessageLog,
        context: ContextIndex,
        emitter: Arc<EventEmitter>,
    ) -> Self {
        Self {
            registry,
            messages,
            context,
            emitter,
        }
    }

    /// Execute one tool call end to end.
    ///
    /// Persists the tool message (success or error), indexes artifacts,
    /// and records an `error` context item on failure. A missing tool is
    /// a failure like any other.
    #[instrument(skip(self, scope, arguments), fields(tool_name, tool_call_id))]
    pub async fn dispatch(
        &self,
        scope: &TurnScope,
        tool_call_id: &str,
        tool_name: &str,
        arguments: &Map<String, Value>,
    ) -> Result<DispatchOutcome> {
        let _ = self.emitter.emit(TurnEvent::ToolStart {
            base: BaseEvent::now(&scope.session_id, &scope.turn_id),
            tool_call_id: tool_call_id.to_string(),
            tool_name: tool_name.to_string(),
            arguments: arguments.clone(),
        });

        let started = Instant::now();
        let input = Value::Object(arguments.clone());

        let execution = match self.registry.get(tool_name) {
            Some(tool) => {
                let ctx = ToolContext {
                    project_id: scope.project_id.clone(),
                    session_id: scope.session_id.clone(),
                    user_id: scope.user_id.clone(),
                    workspace: None,
                    cancellation: scope.cancellation.clone(),
                };
                tool.execute(input.clone(), &ctx).await
            }
            None => {
                warn!(tool = tool_name, "tool not registered");
                Err(tandem_tools::ToolError::ExecutionFailed(format!(
                    "tool not found: {tool_name}"
                )))
            }
        };
        let duration_ms = started.elapsed().as_millis() as u64;

        let (output, ok, artifacts) = match execution {
            Ok(out) => (out.content, true, out.artifacts),
            Err(err) => (err.to_string(), false, Vec::new()),
        };

        self.persist_tool_message(scope, tool_call_id, tool_name, &input, &output, ok)?;
        if ok {
            self.index_artifacts(scope, &artifacts)?;
        } else {
            self.record_error_item(scope, tool_call_id, tool_name, &output)?;
        }

        counter!("tool_executions_total", "outcome" => if ok { "ok" } else { "error" })
            .increment(1);
        histogram!("tool_execution_duration_ms").record(duration_ms as f64);
        let _ = self.emitter.emit(TurnEvent::ToolEnd {
            base: BaseEvent::now(&scope.session_id, &scope.turn_id),
            tool_call_id: tool_call_id.to_string(),
            tool_name: tool_name.to_string(),
            is_error: !ok,
            duration_ms,
        });
        debug!(tool = tool_name, ok, duration_ms, "tool dispatched");

        Ok(DispatchOutcome {
            invocation: ToolInvocation {
                tool_call_id: tool_call_id.to_string(),
                name: tool_name.to_string(),
                input,
                output: output.clone(),
                ok,
                duration_ms,
            },
            replay_message: ChatMessage::tool_result(tool_call_id, output, !ok),
            artifacts,
        })
    }

    fn persist_tool_message(
        &self,
        scope: &TurnScope,
        tool_call_id: &str,
        tool_name: &str,
        input: &Value,
        output: &str,
        ok: bool,
    ) -> Result<()> {
        let blocks = vec![ContentBlock::ToolResult {
            tool_call_id: tool_call_id.to_string(),
            content: output.to_string(),
            is_error: !ok,
        }];
        let content = serde_json::to_string(&blocks)?;
        let tool_input = serde_json::to_string(input)?;
        let _ = self.messages.append(
            &scope.session_id,
            MessageRole::Tool,
            &content,
            &AppendMessageOptions {
                agent_type: scope.agent_type,
                content_type: Some("blocks"),
                tool_name: Some(tool_name),
                tool_input: Some(&tool_input),
                tool_output: Some(output),
                tool_status: Some(if ok { "success" } else { "error" }),
                ..AppendMessageOptions::default()
            },
        )?;
        Ok(())
    }

    fn index_artifacts(&self, scope: &TurnScope, artifacts: &[ContextArtifact]) -> Result<()> {
        for artifact in artifacts {
            let item = self.context.upsert(
                &scope.project_id,
                artifact.kind,
                &artifact.key,
                &artifact.content,
                None,
            )?;
            self.context.link(&scope.session_id, &item.id, None)?;
        }
        Ok(())
    }

    fn record_error_item(
        &self,
        scope: &TurnScope,
        tool_call_id: &str,
        tool_name: &str,
        reason: &str,
    ) -> Result<()> {
        let key = format!("{tool_name}:{tool_call_id}");
        let item = self
            .context
            .upsert(&scope.project_id, ContextItemType::Error, &key, reason, None)?;
        self.context.link(&scope.session_id, &item.id, None)?;
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use tandem_core::metadata::Metadata;
    use tandem_core::model::SessionType;
    use tandem_store::{
        ConnectionConfig, CreateSessionOptions, SessionStore, new_in_memory, run_migrations,
    };
    use tandem_tools::testutil::{ArtifactTool, EchoTool, FailingTool};

    struct Fixture {
        dispatcher: ToolDispatcher,
        messages: MessageLog,
        context: ContextIndex,
        scope: TurnScope,
    }

    fn make_fixture(tools: Vec<Arc<dyn tandem_tools::AgentTool>>) -> Fixture {
        let pool = new_in_memory(&ConnectionConfig::default()).unwrap();
        {
            let conn = pool.get().unwrap();
            let _ = run_migrations(&conn).unwrap();
        }
        let sessions = SessionStore::new(pool.clone());
        let session = sessions
            .create(&CreateSessionOptions {
                project_id: "proj_1",
                user_id: "user_1",
                session_type: SessionType::Code,
                title: None,
                metadata: Metadata::new(),
            })
            .unwrap();

        let registry = Arc::new(ToolRegistry::new());
        for tool in tools {
            registry.register(tool);
        }
        let messages = MessageLog::new(pool.clone());
        let context = ContextIndex::new(pool);
        Fixture {
            dispatcher: ToolDispatcher::new(
                registry,
                messages.clone(),
                context.clone(),
                Arc::new(EventEmitter::new()),
            ),
            messages,
            context,
            scope: TurnScope {
                session_id: session.id,
                project_id: "proj_1".into(),
                user_id: "user_1".into(),
                agent_type: None,
                turn_id: "turn_1".into(),
                cancellation: CancellationToken::new(),
            },
        }
    }

    fn args() -> Map<String, Value> {
        let mut map = Map::new();
        let _ = map.insert("text".into(), Value::String("hi".into()));
        map
    }

    #[tokio::test]
    async fn success_persists_tool_message() {
        let fx = make_fixture(vec![Arc::new(EchoTool::named("echo"))]);
        let outcome = fx
            .dispatcher
            .dispatch(&fx.scope, "tc_1", "echo", &args())
            .await
            .unwrap();

        assert!(outcome.invocation.ok);
        assert_eq!(outcome.invocation.output, "echo: hi");

        let rows = fx.messages.read(&fx.scope.session_id, None).unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0].role, "tool");
        assert_eq!(rows[0].tool_status.as_deref(), Some("success"));
        assert_eq!(rows[0].tool_name.as_deref(), Some("echo"));
    }

    #[tokio::test]
    async fn failure_is_isolated_and_recorded() {
        let fx = make_fixture(vec![Arc::new(FailingTool::named("boom"))]);
        let outcome = fx
            .dispatcher
            .dispatch(&fx.scope, "tc_1", "boom", &Map::new())
            .await
            .unwrap();

        assert!(!outcome.invocation.ok);

        let rows = fx.messages.read(&fx.scope.session_id, None).unwrap();
        assert_eq!(rows[0].tool_status.as_deref(), Some("error"));

        // An error context item keyed tool:call was indexed and linked
        let item = fx
            .context
            .peek("proj_1", ContextItemType::Error, "boom:tc_1")
            .unwrap()
            .unwrap();
        assert!(item.content.contains("deliberate failure"));
        assert!(fx
            .context
            .get_link(&fx.scope.session_id, &item.id)
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn missing_tool_is_a_tool_failure() {
        let fx = make_fixture(vec![]);
        let outcome = fx
            .dispatcher
            .dispatch(&fx.scope, "tc_1", "ghost", &Map::new())
            .await
            .unwrap();

        assert!(!outcome.invocation.ok);
        assert!(outcome.invocation.output.contains("tool not found"));
        // Still persisted as an error tool message
        let rows = fx.messages.read(&fx.scope.session_id, None).unwrap();
        assert_eq!(rows[0].tool_status.as_deref(), Some("error"));
    }

    #[tokio::test]
    async fn artifacts_are_indexed_and_linked() {
        let fx = make_fixture(vec![Arc::new(ArtifactTool::file(
            "write", "/src/a.rs", "fn a() {}",
        ))]);
        let outcome = fx
            .dispatcher
            .dispatch(&fx.scope, "tc_1", "write", &Map::new())
            .await
            .unwrap();

        assert_eq!(outcome.artifacts.len(), 1);
        let item = fx
            .context
            .peek("proj_1", ContextItemType::File, "/src/a.rs")
            .unwrap()
            .unwrap();
        assert_eq!(item.content, "fn a() {}");
        assert!(fx
            .context
            .get_link(&fx.scope.session_id, &item.id)
            .unwrap()
            .is_some());
    }

    #[tokio::test]
    async fn replay_message_pairs_with_call() {
        let fx = make_fixture(vec![Arc::new(EchoTool::named("echo"))]);
        let outcome = fx
            .dispatcher
            .dispatch(&fx.scope, "tc_42", "echo", &args())
            .await
            .unwrap();
        assert_eq!(outcome.replay_message.tool_result_ids(), vec!["tc_42"]);
    }
}
