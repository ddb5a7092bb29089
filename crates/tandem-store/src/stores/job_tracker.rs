//! `JobTracker` — long-running work lifecycle.
//!
//! Status writes go through the [`tandem_core::model::JobStatus`] state
//! machine: pending → running → {completed | error | cancelled}, with any
//! non-terminal status also cancellable directly. Terminal states are
//! frozen; an illegal transition fails with `InvalidTransition` and the
//! row is left untouched.

use tandem_core::model::JobStatus;
use tracing::{info, instrument};

use crate::connection::ConnectionPool;
use crate::errors::{Result, StoreError};
use crate::repositories::job::{JobFieldUpdate, JobRepo, NewJob};
use crate::repositories::session::SessionRepo;
use crate::row_types::JobRow;
use crate::stores::retry_on_busy;

/// Optional fields carried by a status update.
#[derive(Default)]
pub struct JobUpdate<'a> {
    /// Progress percentage. Defaults to 100 on terminal transitions and
    /// to 0 otherwise.
    pub progress_percentage: Option<i64>,
    /// Output payload JSON. When absent any existing output is kept.
    pub output: Option<&'a str>,
    /// Error message. When absent any existing message is kept.
    pub error_message: Option<&'a str>,
}

/// Tracks background jobs attached to sessions.
#[derive(Clone)]
pub struct JobTracker {
    pool: ConnectionPool,
}

impl JobTracker {
    /// Build over a connection pool.
    pub fn new(pool: ConnectionPool) -> Self {
        Self { pool }
    }

    /// Create a job in `pending` status under an existing session.
    #[instrument(skip(self, description, input), fields(session_id, job_type))]
    pub fn create(
        &self,
        session_id: &str,
        job_type: &str,
        description: Option<&str>,
        input: Option<&str>,
    ) -> Result<JobRow> {
        let row = retry_on_busy(|| {
            let conn = self.pool.get()?;
            if SessionRepo::get_by_id(&conn, session_id)?.is_none() {
                return Err(StoreError::SessionNotFound(session_id.to_string()));
            }
            JobRepo::create(
                &conn,
                &NewJob {
                    session_id,
                    job_type,
                    description,
                    input,
                },
            )
        })?;
        info!(job_id = %row.id, "job created");
        Ok(row)
    }

    /// Get a job by ID.
    pub fn get(&self, job_id: &str) -> Result<Option<JobRow>> {
        let conn = self.pool.get()?;
        JobRepo::get_by_id(&conn, job_id)
    }

    /// Get a job by ID, failing if it does not exist.
    pub fn get_required(&self, job_id: &str) -> Result<JobRow> {
        self.get(job_id)?
            .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))
    }

    /// Transition a job to a new status.
    ///
    /// Timestamps are automatic: the first move to `running` stamps
    /// `started_at` (subsequent retries never overwrite it), and every
    /// terminal transition stamps `completed_at`. When the update carries
    /// no progress, terminal transitions default it to 100 and
    /// non-terminal transitions to 0.
    #[instrument(skip(self, update), fields(job_id, status = %status))]
    pub fn update_status(
        &self,
        job_id: &str,
        status: JobStatus,
        update: &JobUpdate<'_>,
    ) -> Result<JobRow> {
        retry_on_busy(|| {
            let conn = self.pool.get()?;
            let tx = conn.unchecked_transaction()?;

            let current = JobRepo::get_by_id(&tx, job_id)?
                .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))?;
            let from: JobStatus = current
                .status
                .parse()
                .map_err(|_| StoreError::Internal(format!("bad stored status: {}", current.status)))?;
            if !from.can_transition_to(status) {
                return Err(StoreError::InvalidTransition {
                    from: from.as_str().to_string(),
                    to: status.as_str().to_string(),
                });
            }

            let progress = match update.progress_percentage {
                Some(p) => p,
                None if status.is_terminal() => 100,
                None => 0,
            };
            let _ = JobRepo::update_status(
                &tx,
                job_id,
                status.as_str(),
                &JobFieldUpdate {
                    progress_percentage: progress,
                    output: update.output,
                    error_message: update.error_message,
                },
            )?;

            if status == JobStatus::Running {
                JobRepo::set_started_at_if_unset(&tx, job_id)?;
            }
            if status.is_terminal() {
                JobRepo::set_completed_at(&tx, job_id)?;
            }

            let row = JobRepo::get_by_id(&tx, job_id)?
                .ok_or_else(|| StoreError::JobNotFound(job_id.to_string()))?;
            tx.commit()?;
            Ok(row)
        })
    }

    /// Cancel a job if it is still pending or running. Returns the row
    /// after cancellation, or `InvalidTransition` if already terminal.
    pub fn cancel(&self, job_id: &str) -> Result<JobRow> {
        self.update_status(job_id, JobStatus::Cancelled, &JobUpdate::default())
    }

    /// All pending/running jobs across a project's non-deleted sessions.
    pub fn list_active_by_project(&self, project_id: &str) -> Result<Vec<JobRow>> {
        let conn = self.pool.get()?;
        JobRepo::list_active_by_project(&conn, project_id)
    }
}
