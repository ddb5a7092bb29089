//! The agent turn loop.
//!
//! One call to [`AgentLoop::run_turn`] drives a full turn: persist the
//! user message, replay the sanitized transcript to the model, execute
//! requested tools sequentially, feed results back, and repeat until the
//! model stops calling tools or the round-trip cap is hit.

use std::sync::Arc;

use metrics::{counter, histogram};
use serde_json::{Map, Value};
use tandem_core::events::{BaseEvent, TurnEvent};
use tandem_core::ids;
use tandem_core::messages::{ChatMessage, ContentBlock};
use tandem_core::model::{ContextItemType, JobStatus, MessageRole};
use tandem_llm::{ModelBackend, ModelRequest};
use tandem_store::row_types::SessionRow;
use tandem_store::{
    AppendMessageOptions, ConnectionPool, ContextIndex, JobTracker, JobUpdate, MessageLog,
    SessionStore,
};
use tandem_tools::ToolRegistry;
use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;
use tracing::{info, instrument, warn};

use crate::agent::event_emitter::EventEmitter;
use crate::agent::history;
use crate::agent::tool_dispatch::{ToolDispatcher, TurnScope};
use crate::aggregator::CrossAgentAggregator;
use crate::errors::{Result, RuntimeError};
use crate::prompt;
use crate::types::{ToolInvocation, TurnRequest, TurnResult};

/// Hard cap on model round-trips per turn.
pub const MAX_ROUND_TRIPS: u32 = 15;

/// Drives turns for one backend + tool registry pair.
pub struct AgentLoop {
    backend: Arc<dyn ModelBackend>,
    registry: Arc<ToolRegistry>,
    sessions: SessionStore,
    messages: MessageLog,
    context: ContextIndex,
    jobs: JobTracker,
    aggregator: CrossAgentAggregator,
    emitter: Arc<EventEmitter>,
    dispatcher: ToolDispatcher,
    base_instructions: String,
}

impl AgentLoop {
    /// Build a loop over a connection pool.
    pub fn new(
        backend: Arc<dyn ModelBackend>,
        registry: Arc<ToolRegistry>,
        pool: ConnectionPool,
        base_instructions: impl Into<String>,
    ) -> Self {
        let messages = MessageLog::new(pool.clone());
        let context = ContextIndex::new(pool.clone());
        let jobs = JobTracker::new(pool.clone());
        let emitter = Arc::new(EventEmitter::new());
        Self {
            backend,
            registry: Arc::clone(&registry),
            sessions: SessionStore::new(pool),
            aggregator: CrossAgentAggregator::new(
                messages.clone(),
                context.clone(),
                jobs.clone(),
            ),
            dispatcher: ToolDispatcher::new(
                registry,
                messages.clone(),
                context.clone(),
                Arc::clone(&emitter),
            ),
            messages,
            context,
            jobs,
            emitter,
            base_instructions: base_instructions.into(),
        }
    }

    /// The turn event emitter.
    #[must_use]
    pub fn emitter(&self) -> &Arc<EventEmitter> {
        &self.emitter
    }

    /// Subscribe to turn events.
    #[must_use]
    pub fn subscribe(&self) -> broadcast::Receiver<TurnEvent> {
        self.emitter.subscribe()
    }

    /// Run one turn.
    ///
    /// Tool messages are persisted as each tool finishes, the final
    /// assistant message only at the end. If the process dies mid-turn
    /// the transcript keeps the completed tool results and no assistant
    /// reply; the next turn's sanitizer drops those orphaned results, so
    /// a partial turn degrades to a no-op rather than a corrupt replay.
    ///
    /// If the request names a job, it is transitioned to `running` before
    /// the turn and to `completed` (or `error`) after it.
    #[instrument(skip(self, request), fields(session_id = %request.session_id))]
    pub async fn run_turn(&self, request: &TurnRequest) -> Result<TurnResult> {
        if request.user_text.trim().is_empty() {
            return Err(RuntimeError::Validation("empty user message".into()));
        }
        let session = self.sessions.get_required(&request.session_id)?;

        if let Some(job_id) = &request.job_id {
            let _ = self
                .jobs
                .update_status(job_id, JobStatus::Running, &JobUpdate::default())?;
        }

        let turn_id = ids::turn_id();
        let outcome = self.drive(request, &session, &turn_id).await;

        if let Some(job_id) = &request.job_id {
            let transition = match &outcome {
                Ok(_) => self
                    .jobs
                    .update_status(job_id, JobStatus::Completed, &JobUpdate::default()),
                Err(err) => {
                    let message = err.to_string();
                    self.jobs.update_status(
                        job_id,
                        JobStatus::Error,
                        &JobUpdate {
                            error_message: Some(&message),
                            ..JobUpdate::default()
                        },
                    )
                }
            };
            if let Err(err) = transition {
                warn!(job_id = %job_id, error = %err, "job transition after turn failed");
            }
        }
        outcome
    }

    async fn drive(
        &self,
        request: &TurnRequest,
        session: &SessionRow,
        turn_id: &str,
    ) -> Result<TurnResult> {
        let append_opts = AppendMessageOptions {
            agent_type: request.agent_role,
            ..AppendMessageOptions::default()
        };
        let _ = self.messages.append(
            &request.session_id,
            MessageRole::User,
            &request.user_text,
            &append_opts,
        )?;

        let _ = self.emitter.emit(TurnEvent::TurnStart {
            base: BaseEvent::now(&request.session_id, turn_id),
        });

        let rows = self.messages.read(&request.session_id, None)?;
        let mut replay = history::sanitize(&history::build_replay(&rows));

        let scope = TurnScope {
            session_id: request.session_id.clone(),
            project_id: session.project_id.clone(),
            user_id: session.user_id.clone(),
            agent_type: request.agent_role,
            turn_id: turn_id.to_string(),
            cancellation: CancellationToken::new(),
        };
        let tools = self.registry.definitions();

        let mut invocations: Vec<ToolInvocation> = Vec::new();
        let mut errors: Vec<String> = Vec::new();
        let mut files_touched: Vec<String> = Vec::new();
        let mut commands_run: Vec<String> = Vec::new();
        let mut final_text = String::new();
        let mut round_trips: u32 = 0;
        let mut capped = true;

        while round_trips < MAX_ROUND_TRIPS {
            let linked = self.context.list_for_session(&request.session_id)?;
            let snapshot = self.aggregator.snapshot(&session.project_id)?;
            let system_prompt =
                prompt::build_system_prompt(&self.base_instructions, &linked, &snapshot);

            let response = self
                .backend
                .complete(&ModelRequest {
                    system_prompt: Some(system_prompt),
                    messages: replay.clone(),
                    tools: tools.clone(),
                    max_tokens: None,
                })
                .await?;
            round_trips += 1;
            counter!("model_round_trips_total").increment(1);

            let text = response.text();
            if !text.is_empty() {
                let _ = self.emitter.emit(TurnEvent::Text {
                    base: BaseEvent::now(&request.session_id, turn_id),
                    text: text.clone(),
                });
                if !final_text.is_empty() {
                    final_text.push('\n');
                }
                final_text.push_str(&text);
            }

            let calls = collect_tool_calls(&response.blocks);
            if calls.is_empty() {
                capped = false;
                break;
            }

            replay.push(ChatMessage::assistant_blocks(response.blocks.clone()));
            for (call_id, name, arguments) in calls {
                let outcome = self
                    .dispatcher
                    .dispatch(&scope, &call_id, &name, &arguments)
                    .await?;
                if !outcome.invocation.ok {
                    errors.push(outcome.invocation.output.clone());
                }
                for artifact in &outcome.artifacts {
                    match artifact.kind {
                        ContextItemType::File => files_touched.push(artifact.key.clone()),
                        ContextItemType::TerminalOutput => {
                            commands_run.push(artifact.key.clone());
                        }
                        _ => {}
                    }
                }
                replay.push(outcome.replay_message.clone());
                invocations.push(outcome.invocation);
            }
        }

        if !final_text.is_empty() {
            let _ = self.messages.append(
                &request.session_id,
                MessageRole::Assistant,
                &final_text,
                &append_opts,
            )?;
        }

        histogram!("turn_round_trips").record(f64::from(round_trips));
        let _ = self.emitter.emit(TurnEvent::TurnEnd {
            base: BaseEvent::now(&request.session_id, turn_id),
            round_trips,
            capped,
        });
        info!(
            round_trips,
            capped,
            tool_calls = invocations.len(),
            "turn finished"
        );

        Ok(TurnResult {
            turn_id: turn_id.to_string(),
            final_text,
            tool_invocations: invocations,
            files_touched,
            commands_run,
            errors,
            round_trips,
            capped,
        })
    }
}

fn collect_tool_calls(blocks: &[ContentBlock]) -> Vec<(String, String, Map<String, Value>)> {
    blocks
        .iter()
        .filter_map(|block| match block {
            ContentBlock::ToolCall {
                id,
                name,
                arguments,
            } => Some((id.clone(), name.clone(), arguments.clone())),
            _ => None,
        })
        .collect()
}
