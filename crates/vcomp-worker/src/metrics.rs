//! Job metrics.

use metrics::{counter, histogram};

use crate::logging::FailureStage;

/// Metric names as constants for consistency.
pub mod names {
    pub const JOBS_SUBMITTED_TOTAL: &str = "vcomp_jobs_submitted_total";
    pub const JOBS_COMPLETED_TOTAL: &str = "vcomp_jobs_completed_total";
    pub const JOBS_FAILED_TOTAL: &str = "vcomp_jobs_failed_total";
    pub const OVERLAYS_SKIPPED_TOTAL: &str = "vcomp_overlays_skipped_total";
    pub const FFMPEG_DURATION_SECONDS: &str = "vcomp_ffmpeg_duration_seconds";
}

pub fn record_job_submitted() {
    counter!(names::JOBS_SUBMITTED_TOTAL).increment(1);
}

pub fn record_job_completed() {
    counter!(names::JOBS_COMPLETED_TOTAL).increment(1);
}

pub fn record_job_failed(stage: FailureStage) {
    counter!(names::JOBS_FAILED_TOTAL, "stage" => stage.as_str()).increment(1);
}

pub fn record_overlays_skipped(count: usize) {
    if count > 0 {
        counter!(names::OVERLAYS_SKIPPED_TOTAL).increment(count as u64);
    }
}

pub fn record_ffmpeg_duration(duration_secs: f64, success: bool) {
    let labels = [("success", success.to_string())];
    histogram!(names::FFMPEG_DURATION_SECONDS, &labels).record(duration_secs);
}
