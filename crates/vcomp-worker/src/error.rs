//! Worker error types.

use thiserror::Error;

use vcomp_models::JobStatus;

pub type WorkerResult<T> = Result<T, WorkerError>;

#[derive(Debug, Error)]
pub enum WorkerError {
    #[error("Invalid overlays: {0}")]
    InvalidOverlays(#[from] vcomp_models::ModelError),

    #[error("Job not found: {0}")]
    JobNotFound(String),

    #[error("Job {job_id} is not completed (status: {status})")]
    NotReady { job_id: String, status: JobStatus },

    #[error("Output file missing for job {0}")]
    ArtifactMissing(String),

    #[error("Invalid status transition {from} -> {to}")]
    InvalidTransition { from: JobStatus, to: JobStatus },

    #[error("Storage error: {0}")]
    Storage(#[from] vcomp_storage::StorageError),

    #[error("Media error: {0}")]
    Media(#[from] vcomp_media::MediaError),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl WorkerError {
    pub fn job_not_found(job_id: impl Into<String>) -> Self {
        Self::JobNotFound(job_id.into())
    }

    /// Whether the caller sent something unusable, as opposed to a server fault.
    pub fn is_input_error(&self) -> bool {
        matches!(self, WorkerError::InvalidOverlays(_))
    }
}
