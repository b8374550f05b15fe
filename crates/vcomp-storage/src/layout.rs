//! Data directory layout.

use std::io::ErrorKind;
use std::path::{Path, PathBuf};
use tokio::fs;
use tracing::info;

use vcomp_models::JobId;

use crate::error::StorageResult;

/// Directories under the data root.
///
/// ```text
/// <root>/videos/<job_id>_<filename>   uploaded base videos
/// <root>/overlays/<asset_ref>         registered overlay assets
/// <root>/outputs/<job_id>.mp4         rendered artifacts
/// <root>/jobs/<job_id>.json           job snapshots
/// ```
#[derive(Debug, Clone)]
pub struct StorageLayout {
    videos: PathBuf,
    overlays: PathBuf,
    outputs: PathBuf,
    jobs: PathBuf,
}

impl StorageLayout {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        let root = root.into();
        Self {
            videos: root.join("videos"),
            overlays: root.join("overlays"),
            outputs: root.join("outputs"),
            jobs: root.join("jobs"),
        }
    }

    /// Create every directory and drop job records left by a previous run.
    ///
    /// No supervisor is attached to those records any more, so they would
    /// report `processing` forever.
    pub async fn prepare(&self) -> StorageResult<()> {
        match fs::remove_dir_all(&self.jobs).await {
            Ok(()) => info!("Cleared stale job records in {}", self.jobs.display()),
            Err(e) if e.kind() == ErrorKind::NotFound => {}
            Err(e) => return Err(e.into()),
        }

        for dir in [&self.videos, &self.overlays, &self.outputs, &self.jobs] {
            fs::create_dir_all(dir).await?;
        }
        Ok(())
    }

    pub fn videos_dir(&self) -> &Path {
        &self.videos
    }

    pub fn overlays_dir(&self) -> &Path {
        &self.overlays
    }

    pub fn outputs_dir(&self) -> &Path {
        &self.outputs
    }

    pub fn jobs_dir(&self) -> &Path {
        &self.jobs
    }

    /// Where an uploaded base video for `job_id` is stored.
    pub fn video_path(&self, job_id: &JobId, filename: &str) -> PathBuf {
        self.videos
            .join(format!("{}_{}", job_id.as_str(), sanitize_filename(filename)))
    }

    /// Where the rendered artifact for `job_id` is written.
    pub fn output_path(&self, job_id: &JobId) -> PathBuf {
        self.outputs.join(format!("{}.mp4", job_id.as_str()))
    }
}

/// Reduce a client-supplied file name to a safe single path component.
pub fn sanitize_filename(name: &str) -> String {
    let base = name
        .rsplit(['/', '\\'])
        .next()
        .unwrap_or_default()
        .trim();

    let cleaned: String = base
        .chars()
        .map(|c| {
            if c.is_ascii_alphanumeric() || matches!(c, '.' | '-' | '_') {
                c
            } else {
                '_'
            }
        })
        .collect();
    let cleaned = cleaned.trim_start_matches('.');

    if cleaned.is_empty() {
        "video.mp4".to_string()
    } else {
        cleaned.chars().take(100).collect()
    }
}
