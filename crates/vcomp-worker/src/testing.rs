//! Scripted transcoder and job store for tests.

use async_trait::async_trait;
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Mutex;
use tokio::sync::mpsc;

use vcomp_media::{FfmpegCommand, MediaError, MediaResult, TranscodeHandle, Transcoder};
use vcomp_models::{FrameGeometry, JobId, JobSnapshot};
use vcomp_storage::{JobStore, MemoryJobStore, StorageError, StorageResult};

pub(crate) struct FakeTranscoder {
    geometry: Option<FrameGeometry>,
    lines: Vec<String>,
    exit_code: Option<i32>,
    pub launches: AtomicUsize,
    pub commands: Mutex<Vec<Vec<String>>>,
}

impl FakeTranscoder {
    /// Probes as 1920x1080, 100s and exits successfully.
    pub fn succeeding(lines: &[&str]) -> Self {
        Self {
            geometry: Some(FrameGeometry::new(1920, 1080, 100.0)),
            lines: lines.iter().map(|l| l.to_string()).collect(),
            exit_code: None,
            launches: AtomicUsize::new(0),
            commands: Mutex::new(Vec::new()),
        }
    }

    pub fn failing_probe() -> Self {
        Self {
            geometry: None,
            ..Self::succeeding(&[])
        }
    }

    pub fn exiting_with(code: i32, lines: &[&str]) -> Self {
        Self {
            exit_code: Some(code),
            ..Self::succeeding(lines)
        }
    }

    pub fn launch_count(&self) -> usize {
        self.launches.load(Ordering::SeqCst)
    }

    pub fn last_args(&self) -> Vec<String> {
        self.commands
            .lock()
            .unwrap()
            .last()
            .cloned()
            .unwrap_or_default()
    }
}

#[async_trait]
impl Transcoder for FakeTranscoder {
    async fn probe(&self, input: &Path) -> MediaResult<FrameGeometry> {
        if !input.exists() {
            return Err(MediaError::FileNotFound(input.to_path_buf()));
        }
        self.geometry.ok_or_else(|| {
            MediaError::probe_failed("Could not determine video duration. Is the file corrupted?")
        })
    }

    async fn launch(&self, command: &FfmpegCommand) -> MediaResult<TranscodeHandle> {
        self.launches.fetch_add(1, Ordering::SeqCst);
        self.commands.lock().unwrap().push(command.build_args());

        let (tx, rx) = mpsc::channel(self.lines.len().max(1));
        for line in &self.lines {
            let _ = tx.try_send(line.clone());
        }
        drop(tx);

        let output: PathBuf = command.output().to_path_buf();
        let exit_code = self.exit_code;
        let completion = tokio::spawn(async move {
            match exit_code {
                None => tokio::fs::write(&output, b"rendered")
                    .await
                    .map_err(MediaError::from),
                Some(code) => Err(MediaError::ffmpeg_failed(
                    "FFmpeg exited with non-zero status",
                    Some("Invalid data found when processing input".to_string()),
                    Some(code),
                )),
            }
        });

        Ok(TranscodeHandle::new(rx, completion))
    }
}

/// In-memory job store whose chosen `save` calls (counted from 1) fail.
pub(crate) struct FlakyStore {
    inner: MemoryJobStore,
    failing: Vec<usize>,
    saves: AtomicUsize,
}

impl FlakyStore {
    pub fn failing_saves(calls: &[usize]) -> Self {
        Self {
            inner: MemoryJobStore::new(),
            failing: calls.to_vec(),
            saves: AtomicUsize::new(0),
        }
    }

    /// Number of `save` calls so far, failed ones included.
    pub fn save_count(&self) -> usize {
        self.saves.load(Ordering::SeqCst)
    }
}

#[async_trait]
impl JobStore for FlakyStore {
    async fn save(&self, snapshot: &JobSnapshot) -> StorageResult<()> {
        let call = self.saves.fetch_add(1, Ordering::SeqCst) + 1;
        if self.failing.contains(&call) {
            return Err(StorageError::write_failed(format!("save #{call} rejected")));
        }
        self.inner.save(snapshot).await
    }

    async fn load(&self, job_id: &JobId) -> StorageResult<Option<JobSnapshot>> {
        self.inner.load(job_id).await
    }

    async fn list(&self) -> StorageResult<Vec<JobSnapshot>> {
        self.inner.list().await
    }
}
