//! Job snapshot store abstraction.

use async_trait::async_trait;

use vcomp_models::{JobId, JobSnapshot, JobStatus};

use crate::error::StorageResult;

/// Durable key-value store of job snapshots.
///
/// `load` distinguishes three outcomes: a snapshot, `Ok(None)` for a job
/// that is unknown or not yet readable, and `Err` for a store that cannot
/// be reached at all. A snapshot caught mid-write is `Ok(None)`.
#[async_trait]
pub trait JobStore: Send + Sync {
    /// Persist a complete snapshot, replacing any previous one.
    async fn save(&self, snapshot: &JobSnapshot) -> StorageResult<()>;

    /// Current snapshot of a job.
    async fn load(&self, job_id: &JobId) -> StorageResult<Option<JobSnapshot>>;

    /// Every readable snapshot, newest first.
    async fn list(&self) -> StorageResult<Vec<JobSnapshot>>;

    /// Build a snapshot stamped with the current time and persist it.
    async fn record(
        &self,
        job_id: &JobId,
        status: JobStatus,
        progress: u8,
        error: Option<String>,
    ) -> StorageResult<JobSnapshot> {
        let snapshot = JobSnapshot::new(job_id.clone(), status, progress, error);
        self.save(&snapshot).await?;
        Ok(snapshot)
    }
}

pub(crate) fn sort_newest_first(snapshots: &mut [JobSnapshot]) {
    snapshots.sort_by(|a, b| {
        b.updated_at
            .cmp(&a.updated_at)
            .then_with(|| a.job_id.as_str().cmp(b.job_id.as_str()))
    });
}
