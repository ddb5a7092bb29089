//! Cross-agent context aggregation.
//!
//! The snapshot is recomputed from storage on every call. There is no
//! cache to invalidate, so a snapshot taken after a write always sees it.

use tandem_core::model::{AgentRole, ContextItemType};
use tandem_store::row_types::{ContextItemRow, JobRow, MessageRow};
use tandem_store::{ContextIndex, JobTracker, MessageLog};
use tracing::instrument;

use crate::errors::Result;

/// Messages included per agent role.
const MESSAGES_PER_ROLE: i64 = 10;
/// Most-recently-accessed file items included.
const FILE_LIMIT: i64 = 20;
/// Most recent error items included.
const ERROR_LIMIT: i64 = 10;

/// What each agent gets to see of the other's work.
#[derive(Clone, Debug)]
pub struct ContextSnapshot {
    /// Last messages from code-agent sessions, newest first.
    pub code_messages: Vec<MessageRow>,
    /// Last messages from terminal-agent sessions, newest first.
    pub terminal_messages: Vec<MessageRow>,
    /// Most recently accessed file items.
    pub recent_files: Vec<ContextItemRow>,
    /// Most recent error items.
    pub recent_errors: Vec<ContextItemRow>,
    /// All pending/running jobs across the project.
    pub active_jobs: Vec<JobRow>,
}

/// Builds [`ContextSnapshot`]s for a project.
#[derive(Clone)]
pub struct CrossAgentAggregator {
    messages: MessageLog,
    context: ContextIndex,
    jobs: JobTracker,
}

impl CrossAgentAggregator {
    /// Build over the shared store facades.
    pub fn new(messages: MessageLog, context: ContextIndex, jobs: JobTracker) -> Self {
        Self {
            messages,
            context,
            jobs,
        }
    }

    /// Compute a fresh snapshot for a project.
    #[instrument(skip(self), fields(project_id))]
    pub fn snapshot(&self, project_id: &str) -> Result<ContextSnapshot> {
        Ok(ContextSnapshot {
            code_messages: self
                .messages
                .recent_by_agent(project_id, AgentRole::Code, MESSAGES_PER_ROLE)?,
            terminal_messages: self.messages.recent_by_agent(
                project_id,
                AgentRole::Terminal,
                MESSAGES_PER_ROLE,
            )?,
            recent_files: self
                .context
                .recently_accessed(project_id, ContextItemType::File, FILE_LIMIT)?,
            recent_errors: self.context.recently_updated(
                project_id,
                ContextItemType::Error,
                ERROR_LIMIT,
            )?,
            active_jobs: self.jobs.list_active_by_project(project_id)?,
        })
    }
}
