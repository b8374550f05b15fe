//! Per-job state tracking.

use std::sync::Arc;

use tracing::warn;
use vcomp_models::{JobId, JobSnapshot, JobStatus};
use vcomp_storage::JobStore;

use crate::error::{WorkerError, WorkerResult};

/// Owns one job's snapshot and persists every change through a [`JobStore`].
///
/// Only the supervisor driving a job holds its tracker, so writes for a
/// job are strictly ordered. Transitions outside
/// `queued → processing → {completed | failed}` (plus `queued → failed`)
/// are rejected. The terminal state is written once; a failed terminal
/// write is attempted a second time before the error is returned.
pub struct JobTracker {
    store: Arc<dyn JobStore>,
    snapshot: JobSnapshot,
}

impl JobTracker {
    /// Record a new job as `queued`.
    pub async fn create(store: Arc<dyn JobStore>, job_id: JobId) -> WorkerResult<Self> {
        let snapshot = store.record(&job_id, JobStatus::Queued, 0, None).await?;
        Ok(Self { store, snapshot })
    }

    pub fn job_id(&self) -> &JobId {
        &self.snapshot.job_id
    }

    pub fn snapshot(&self) -> &JobSnapshot {
        &self.snapshot
    }

    pub fn into_snapshot(self) -> JobSnapshot {
        self.snapshot
    }

    /// `queued → processing`.
    pub async fn start(&mut self) -> WorkerResult<()> {
        self.transition(JobStatus::Processing, 0, None).await
    }

    /// Persist a running percentage.
    ///
    /// Returns `false` without writing when the job is not processing, the
    /// value is 100 or more, or it equals what is already stored.
    pub async fn progress(&mut self, percent: u8) -> WorkerResult<bool> {
        if self.snapshot.status != JobStatus::Processing
            || percent >= 100
            || percent == self.snapshot.progress
        {
            return Ok(false);
        }

        self.transition(JobStatus::Processing, percent, None).await?;
        Ok(true)
    }

    /// `processing → completed` with progress 100.
    pub async fn complete(&mut self) -> WorkerResult<()> {
        self.transition(JobStatus::Completed, 100, None).await
    }

    /// Move to `failed`, keeping the last progress value.
    pub async fn fail(&mut self, message: impl Into<String>) -> WorkerResult<()> {
        let progress = self.snapshot.progress;
        self.transition(JobStatus::Failed, progress, Some(message.into()))
            .await
    }

    async fn transition(
        &mut self,
        status: JobStatus,
        progress: u8,
        error: Option<String>,
    ) -> WorkerResult<()> {
        let from = self.snapshot.status;
        if !from.can_transition_to(status) {
            return Err(WorkerError::InvalidTransition { from, to: status });
        }

        let next = JobSnapshot::new(self.snapshot.job_id.clone(), status, progress, error);
        if let Err(e) = self.store.save(&next).await {
            if !status.is_terminal() {
                return Err(e.into());
            }
            warn!(
                job_id = %next.job_id,
                status = status.as_str(),
                "Retrying terminal state write: {}", e
            );
            self.store.save(&next).await?;
        }
        self.snapshot = next;
        Ok(())
    }
}
