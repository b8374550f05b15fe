//! Job executor.

use std::path::PathBuf;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::Semaphore;
use tracing::{info, warn, Instrument};

use vcomp_media::{FfmpegRunner, FfmpegTranscoder, Transcoder};
use vcomp_models::{validate_overlays, AssetRef, JobId, JobSnapshot, Overlay};
use vcomp_storage::{AssetStore, JobStore, StorageLayout};

use crate::config::WorkerConfig;
use crate::error::{WorkerError, WorkerResult};
use crate::logging::{FailureStage, JobLogger};
use crate::metrics;
use crate::supervisor::{finish_failed, CompositionJob, TranscodeSupervisor};
use crate::tracker::JobTracker;

/// Runs composition jobs in the background with bounded concurrency.
///
/// Submission returns as soon as the job is recorded as `queued`; the job
/// then waits for one of `max_concurrent_jobs` slots. There are no retries,
/// no cancellation and no timeout.
pub struct JobExecutor {
    config: WorkerConfig,
    layout: StorageLayout,
    store: Arc<dyn JobStore>,
    assets: Arc<AssetStore>,
    supervisor: Arc<TranscodeSupervisor>,
    job_semaphore: Arc<Semaphore>,
    in_flight: Arc<AtomicUsize>,
}

impl JobExecutor {
    /// Create a new job executor.
    pub fn new(
        config: WorkerConfig,
        layout: StorageLayout,
        store: Arc<dyn JobStore>,
        transcoder: Arc<dyn Transcoder>,
    ) -> Self {
        let assets = Arc::new(AssetStore::new(layout.overlays_dir()));
        let supervisor = Arc::new(TranscodeSupervisor::new(
            transcoder,
            assets.clone(),
            config.encoding.clone(),
        ));
        let job_semaphore = Arc::new(Semaphore::new(config.max_concurrent_jobs.max(1)));

        Self {
            config,
            layout,
            store,
            assets,
            supervisor,
            job_semaphore,
            in_flight: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// Create an executor that shells out to the configured FFmpeg binaries.
    pub fn with_ffmpeg(config: WorkerConfig, layout: StorageLayout, store: Arc<dyn JobStore>) -> Self {
        let runner = FfmpegRunner::new(&config.ffmpeg_bin).with_stderr_tail(config.stderr_tail_lines);
        let transcoder = Arc::new(FfmpegTranscoder::new(runner, &config.ffprobe_bin));
        Self::new(config, layout, store, transcoder)
    }

    pub fn config(&self) -> &WorkerConfig {
        &self.config
    }

    pub fn layout(&self) -> &StorageLayout {
        &self.layout
    }

    /// Submit a job under a fresh identifier.
    pub async fn submit(&self, video_path: PathBuf, overlays: Vec<Overlay>) -> WorkerResult<JobId> {
        self.submit_with_id(JobId::new(), video_path, overlays).await
    }

    /// Submit a job whose identifier was chosen by the caller, e.g. to name
    /// the uploaded video after it.
    pub async fn submit_with_id(
        &self,
        job_id: JobId,
        video_path: PathBuf,
        overlays: Vec<Overlay>,
    ) -> WorkerResult<JobId> {
        validate_overlays(&overlays)?;

        let tracker = JobTracker::create(self.store.clone(), job_id.clone()).await?;
        metrics::record_job_submitted();

        let job = CompositionJob {
            output: self.layout.output_path(&job_id),
            job_id: job_id.clone(),
            input: video_path,
            overlays,
        };

        let logger = JobLogger::new(&job_id);
        let span = logger.span();
        let supervisor = Arc::clone(&self.supervisor);
        let semaphore = Arc::clone(&self.job_semaphore);
        let in_flight = Arc::clone(&self.in_flight);
        in_flight.fetch_add(1, Ordering::SeqCst);

        tokio::spawn(
            async move {
                match semaphore.acquire_owned().await {
                    Ok(permit) => {
                        let _permit = permit;
                        supervisor.run(job, tracker).await;
                    }
                    Err(_) => {
                        finish_failed(
                            tracker,
                            &logger,
                            FailureStage::Shutdown,
                            "Executor shut down before the job started".to_string(),
                        )
                        .await;
                    }
                }
                in_flight.fetch_sub(1, Ordering::SeqCst);
            }
            .instrument(span),
        );

        info!(job_id = %job_id, "Job queued");
        Ok(job_id)
    }

    /// Current snapshot, or `None` if the job is unknown or not readable yet.
    pub async fn status(&self, job_id: &JobId) -> Option<JobSnapshot> {
        match self.store.load(job_id).await {
            Ok(snapshot) => snapshot,
            Err(e) => {
                warn!(job_id = %job_id, "Job snapshot unavailable: {}", e);
                None
            }
        }
    }

    /// Every known job snapshot, newest first.
    pub async fn list(&self) -> WorkerResult<Vec<JobSnapshot>> {
        Ok(self.store.list().await?)
    }

    /// Path of a completed job's rendered video.
    pub async fn artifact(&self, job_id: &JobId) -> WorkerResult<PathBuf> {
        let snapshot = self
            .status(job_id)
            .await
            .ok_or_else(|| WorkerError::job_not_found(job_id.as_str()))?;

        if !snapshot.has_artifact() {
            return Err(WorkerError::NotReady {
                job_id: job_id.to_string(),
                status: snapshot.status,
            });
        }

        let path = self.layout.output_path(job_id);
        if !tokio::fs::try_exists(&path).await.unwrap_or(false) {
            return Err(WorkerError::ArtifactMissing(job_id.to_string()));
        }
        Ok(path)
    }

    /// Register a reusable overlay asset.
    pub async fn register_asset(&self, data: &[u8], original_name: Option<&str>) -> WorkerResult<AssetRef> {
        Ok(self.assets.register(data, original_name).await?)
    }

    /// Number of submitted jobs that have not finished yet.
    pub fn in_flight(&self) -> usize {
        self.in_flight.load(Ordering::SeqCst)
    }

    /// Stop accepting queued jobs and wait for running ones, up to the
    /// configured shutdown timeout.
    pub async fn shutdown(&self) {
        self.job_semaphore.close();
        info!("Waiting for in-flight jobs to complete...");
        if tokio::time::timeout(self.config.shutdown_timeout, self.wait_for_jobs())
            .await
            .is_err()
        {
            warn!(
                "Shutdown timeout reached with {} job(s) still running",
                self.in_flight()
            );
        }
    }

    /// Wait until every submitted job has reached a terminal state.
    pub async fn wait_for_jobs(&self) {
        while self.in_flight() > 0 {
            tokio::time::sleep(Duration::from_millis(50)).await;
        }
    }
}
