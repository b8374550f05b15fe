//! Worker configuration.

use std::time::Duration;

use vcomp_models::EncodingConfig;

/// Worker configuration.
#[derive(Debug, Clone)]
pub struct WorkerConfig {
    /// Maximum concurrent jobs
    pub max_concurrent_jobs: usize,
    /// FFmpeg binary name or path
    pub ffmpeg_bin: String,
    /// FFprobe binary name or path
    pub ffprobe_bin: String,
    /// Diagnostic lines kept for a failed job's error message
    pub stderr_tail_lines: usize,
    /// Output encoding parameters
    pub encoding: EncodingConfig,
    /// How long shutdown waits for running jobs
    pub shutdown_timeout: Duration,
}

impl Default for WorkerConfig {
    fn default() -> Self {
        Self {
            max_concurrent_jobs: 2,
            ffmpeg_bin: "ffmpeg".to_string(),
            ffprobe_bin: "ffprobe".to_string(),
            stderr_tail_lines: 20,
            encoding: EncodingConfig::default(),
            shutdown_timeout: Duration::from_secs(30),
        }
    }
}

impl WorkerConfig {
    /// Create config from environment variables.
    pub fn from_env() -> Self {
        let defaults = Self::default();

        let mut encoding = defaults.encoding.clone();
        if let Ok(codec) = std::env::var("WORKER_VIDEO_CODEC") {
            encoding = encoding.with_codec(codec);
        }
        if let Ok(preset) = std::env::var("WORKER_PRESET") {
            encoding = encoding.with_preset(preset);
        }
        if let Some(crf) = std::env::var("WORKER_CRF").ok().and_then(|s| s.parse().ok()) {
            encoding = encoding.with_crf(crf);
        }

        Self {
            max_concurrent_jobs: std::env::var("WORKER_MAX_JOBS")
                .ok()
                .and_then(|s| s.parse().ok())
                .filter(|n: &usize| *n > 0)
                .unwrap_or(defaults.max_concurrent_jobs),
            ffmpeg_bin: std::env::var("FFMPEG_BIN").unwrap_or(defaults.ffmpeg_bin),
            ffprobe_bin: std::env::var("FFPROBE_BIN").unwrap_or(defaults.ffprobe_bin),
            stderr_tail_lines: std::env::var("WORKER_STDERR_TAIL_LINES")
                .ok()
                .and_then(|s| s.parse().ok())
                .unwrap_or(defaults.stderr_tail_lines),
            encoding,
            shutdown_timeout: Duration::from_secs(
                std::env::var("WORKER_SHUTDOWN_TIMEOUT")
                    .ok()
                    .and_then(|s| s.parse().ok())
                    .unwrap_or(30),
            ),
        }
    }
}
