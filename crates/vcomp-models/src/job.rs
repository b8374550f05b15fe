//! Job identifiers, statuses and persisted snapshots.
//!
//! A job moves through `queued → processing → {completed | failed}`.
//! Terminal states absorb: once reached, no further transition is valid.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use uuid::Uuid;

/// Unique identifier for a job.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(transparent)]
pub struct JobId(pub String);

impl JobId {
    /// Generate a new random job ID.
    pub fn new() -> Self {
        Self(Uuid::new_v4().to_string())
    }

    /// Create from an existing string.
    pub fn from_string(s: impl Into<String>) -> Self {
        Self(s.into())
    }

    /// Get the inner string.
    pub fn as_str(&self) -> &str {
        &self.0
    }

    /// Whether the identifier is safe to use as a file stem.
    ///
    /// Only ASCII alphanumerics, `-` and `_` are accepted.
    pub fn is_path_safe(&self) -> bool {
        !self.0.is_empty()
            && self.0.len() <= 128
            && self
                .0
                .chars()
                .all(|c| c.is_ascii_alphanumeric() || c == '-' || c == '_')
    }
}

impl Default for JobId {
    fn default() -> Self {
        Self::new()
    }
}

impl fmt::Display for JobId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.0)
    }
}

/// Job processing status.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Default)]
#[serde(rename_all = "snake_case")]
pub enum JobStatus {
    /// Job is recorded and waiting for a supervisor
    #[default]
    Queued,
    /// Job is actively being processed
    Processing,
    /// Job completed successfully
    Completed,
    /// Job failed with an error
    Failed,
}

impl JobStatus {
    /// Get string representation of the status.
    pub fn as_str(&self) -> &'static str {
        match self {
            JobStatus::Queued => "queued",
            JobStatus::Processing => "processing",
            JobStatus::Completed => "completed",
            JobStatus::Failed => "failed",
        }
    }

    /// Check if this is a terminal state (no more updates expected).
    pub fn is_terminal(&self) -> bool {
        matches!(self, JobStatus::Completed | JobStatus::Failed)
    }

    /// Whether moving from `self` to `next` is a valid transition.
    ///
    /// Re-entering the same non-terminal state is allowed so progress
    /// updates can be written as `processing → processing`.
    pub fn can_transition_to(&self, next: JobStatus) -> bool {
        use JobStatus::*;
        match (self, next) {
            (Completed | Failed, _) => false,
            (Queued, Queued | Processing | Failed) => true,
            (Processing, Processing | Completed | Failed) => true,
            _ => false,
        }
    }
}

impl fmt::Display for JobStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.as_str())
    }
}

/// Complete persisted state of one job.
///
/// Snapshots replace each other wholesale; there are no partial updates.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct JobSnapshot {
    /// Unique job identifier
    pub job_id: JobId,
    /// Current job status
    pub status: JobStatus,
    /// Progress percentage (0-100)
    pub progress: u8,
    /// Error message if the job failed
    #[serde(default)]
    pub error: Option<String>,
    /// When the snapshot was written
    pub updated_at: DateTime<Utc>,
}

impl JobSnapshot {
    /// Create a snapshot stamped with the current time.
    pub fn new(
        job_id: JobId,
        status: JobStatus,
        progress: u8,
        error: Option<String>,
    ) -> Self {
        Self {
            job_id,
            status,
            progress: progress.min(100),
            error,
            updated_at: Utc::now(),
        }
    }

    /// Whether the finished artifact may be exposed to readers.
    pub fn has_artifact(&self) -> bool {
        self.status == JobStatus::Completed
    }
}
