//! Turn request/result types.

use serde_json::Value;
use tandem_core::model::AgentRole;

/// One user turn to run.
#[derive(Clone, Debug)]
pub struct TurnRequest {
    /// Session driving the turn.
    pub session_id: String,
    /// The user message.
    pub user_text: String,
    /// Agent role tag recorded on the messages this turn writes.
    pub agent_role: Option<AgentRole>,
    /// Tracked job to transition running → completed/error, if any.
    pub job_id: Option<String>,
}

/// One executed tool call, in dispatch order.
#[derive(Clone, Debug)]
pub struct ToolInvocation {
    /// Backend-assigned call ID.
    pub tool_call_id: String,
    /// Tool name.
    pub name: String,
    /// Input arguments.
    pub input: Value,
    /// Output content, or the failure reason.
    pub output: String,
    /// Whether the tool succeeded.
    pub ok: bool,
    /// Wall-clock duration in milliseconds.
    pub duration_ms: u64,
}

/// What a completed turn produced.
#[derive(Clone, Debug)]
pub struct TurnResult {
    /// Turn identifier.
    pub turn_id: String,
    /// Final assistant text (possibly empty if the cap truncated the turn).
    pub final_text: String,
    /// Executed tool calls, in order.
    pub tool_invocations: Vec<ToolInvocation>,
    /// Files written to the context index this turn.
    pub files_touched: Vec<String>,
    /// Terminal commands recorded this turn.
    pub commands_run: Vec<String>,
    /// Failure reasons from failed tool calls.
    pub errors: Vec<String>,
    /// Model round-trips consumed.
    pub round_trips: u32,
    /// Whether the round-trip cap forced the exit.
    pub capped: bool,
}
