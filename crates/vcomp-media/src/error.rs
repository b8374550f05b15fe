//! Error types for media operations.

use std::path::PathBuf;
use thiserror::Error;

/// Result type for media operations.
pub type MediaResult<T> = Result<T, MediaError>;

/// Errors that can occur during media processing.
#[derive(Debug, Error)]
pub enum MediaError {
    #[error("FFmpeg not found in PATH")]
    FfmpegNotFound,

    #[error("FFprobe not found in PATH")]
    FfprobeNotFound,

    #[error("FFmpeg command failed: {message}")]
    FfmpegFailed {
        message: String,
        stderr: Option<String>,
        exit_code: Option<i32>,
    },

    #[error("FFprobe command failed: {message}")]
    FfprobeFailed {
        message: String,
        stderr: Option<String>,
    },

    #[error("{0}")]
    ProbeFailed(String),

    #[error("File not found: {0}")]
    FileNotFound(PathBuf),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Internal error: {0}")]
    Internal(String),
}

impl MediaError {
    /// Create an FFmpeg failure error.
    pub fn ffmpeg_failed(
        message: impl Into<String>,
        stderr: Option<String>,
        exit_code: Option<i32>,
    ) -> Self {
        Self::FfmpegFailed {
            message: message.into(),
            stderr,
            exit_code,
        }
    }

    /// Create a probe failure error.
    pub fn probe_failed(message: impl Into<String>) -> Self {
        Self::ProbeFailed(message.into())
    }

    /// Create an internal error.
    pub fn internal(message: impl Into<String>) -> Self {
        Self::Internal(message.into())
    }

    /// Human-readable description including captured diagnostics.
    ///
    /// This is what ends up in a failed job's `error` field.
    pub fn describe(&self) -> String {
        match self {
            MediaError::FfmpegFailed {
                message,
                stderr,
                exit_code,
            } => {
                let mut out = message.clone();
                if let Some(code) = exit_code {
                    out.push_str(&format!(" (exit code {code})"));
                }
                if let Some(stderr) = stderr.as_deref().map(str::trim).filter(|s| !s.is_empty()) {
                    out.push_str(": ");
                    out.push_str(stderr);
                }
                out
            }
            MediaError::FfprobeFailed { message, stderr } => match stderr.as_deref().map(str::trim) {
                Some(stderr) if !stderr.is_empty() => format!("{message}: {stderr}"),
                _ => message.clone(),
            },
            other => other.to_string(),
        }
    }
}
