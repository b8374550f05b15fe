//! Structured logging for composition jobs.
//!
//! Every event carries a `job_id` field; failures also carry the `stage`
//! they happened in, which is the same label the failure metric uses.

use std::path::Path;
use std::time::Duration;

use tracing::{debug, error, info, info_span, warn, Span};
use vcomp_media::SkippedOverlay;
use vcomp_models::JobId;

use crate::error::WorkerError;

/// Where a job failed.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FailureStage {
    /// Recording the `processing` state
    Start,
    /// Probing the base video
    Probe,
    /// Spawning FFmpeg
    Launch,
    /// FFmpeg exited unsuccessfully
    Transcode,
    /// The executor closed before the job got a slot
    Shutdown,
}

impl FailureStage {
    pub fn as_str(&self) -> &'static str {
        match self {
            FailureStage::Start => "start",
            FailureStage::Probe => "probe",
            FailureStage::Launch => "launch",
            FailureStage::Transcode => "transcode",
            FailureStage::Shutdown => "shutdown",
        }
    }
}

/// Lifecycle events of one composition job.
#[derive(Debug, Clone)]
pub struct JobLogger {
    job_id: JobId,
}

impl JobLogger {
    pub fn new(job_id: &JobId) -> Self {
        Self {
            job_id: job_id.clone(),
        }
    }

    pub fn job_id(&self) -> &JobId {
        &self.job_id
    }

    /// Span the job's background task runs in.
    pub fn span(&self) -> Span {
        info_span!("compose", job_id = %self.job_id)
    }

    pub fn started(&self, input: &Path, overlays: usize) {
        info!(
            job_id = %self.job_id,
            input = %input.display(),
            overlays,
            "Composition started"
        );
    }

    /// Summarize the compiled graph, warning once if overlays were dropped.
    pub fn compiled(&self, extra_inputs: usize, skipped: &[SkippedOverlay]) {
        if skipped.is_empty() {
            debug!(job_id = %self.job_id, extra_inputs, "Filter graph compiled");
            return;
        }

        let indices = skipped
            .iter()
            .map(|s| s.index.to_string())
            .collect::<Vec<_>>()
            .join(",");
        warn!(
            job_id = %self.job_id,
            extra_inputs,
            skipped = skipped.len(),
            indices = %indices,
            "Overlays skipped: asset not found"
        );
    }

    pub fn progress(&self, percent: u8) {
        info!(job_id = %self.job_id, progress = percent, "Job progress: {}%", percent);
    }

    /// A job store write that did not go through.
    pub fn store_error(&self, action: &str, error: &WorkerError) {
        warn!(job_id = %self.job_id, action, error = %error, "Job store write failed");
    }

    pub fn failed(&self, stage: FailureStage, message: &str) {
        error!(
            job_id = %self.job_id,
            stage = stage.as_str(),
            "Job failed: {}", message
        );
    }

    pub fn completed(&self, output: &Path, elapsed: Duration) {
        info!(
            job_id = %self.job_id,
            output = %output.display(),
            elapsed_secs = elapsed.as_secs_f64(),
            "Composition completed"
        );
    }
}
