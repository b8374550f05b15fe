//! Transcode supervision.
//!
//! One run drives one job from `queued` to a terminal state:
//! probe the base video, compile the overlay timeline, launch FFmpeg,
//! stream its progress into the job store and record the outcome.
//! Every failure ends up in the job snapshot; nothing is returned as an
//! error to the caller.

use std::path::PathBuf;
use std::sync::Arc;
use std::time::Instant;

use vcomp_media::{compile, FfmpegCommand, MediaError, ProgressExtractor, Transcoder};
use vcomp_models::{AssetResolver, EncodingConfig, JobId, JobSnapshot, Overlay};

use crate::logging::{FailureStage, JobLogger};
use crate::metrics;
use crate::tracker::JobTracker;

/// Everything needed to render one job.
#[derive(Debug, Clone)]
pub struct CompositionJob {
    pub job_id: JobId,
    /// Uploaded base video
    pub input: PathBuf,
    /// Where the rendered video is written
    pub output: PathBuf,
    /// Overlays in compositing order
    pub overlays: Vec<Overlay>,
}

/// Drives composition jobs through the transcoder.
pub struct TranscodeSupervisor {
    transcoder: Arc<dyn Transcoder>,
    assets: Arc<dyn AssetResolver>,
    encoding: EncodingConfig,
}

impl TranscodeSupervisor {
    pub fn new(
        transcoder: Arc<dyn Transcoder>,
        assets: Arc<dyn AssetResolver>,
        encoding: EncodingConfig,
    ) -> Self {
        Self {
            transcoder,
            assets,
            encoding,
        }
    }

    /// Run a job to completion and return its final snapshot.
    pub async fn run(&self, job: CompositionJob, mut tracker: JobTracker) -> JobSnapshot {
        let logger = JobLogger::new(&job.job_id);
        logger.started(&job.input, job.overlays.len());

        // Without a recorded `processing` state no later write could land.
        if let Err(e) = tracker.start().await {
            return finish_failed(
                tracker,
                &logger,
                FailureStage::Start,
                format!("Failed to record processing state: {e}"),
            )
            .await;
        }

        let geometry = match self.transcoder.probe(&job.input).await {
            Ok(geometry) => geometry,
            Err(e) => {
                return finish_failed(tracker, &logger, FailureStage::Probe, probe_failure_message(&e))
                    .await;
            }
        };

        let compiled = compile(&geometry, &job.overlays, self.assets.as_ref());
        metrics::record_overlays_skipped(compiled.skipped.len());
        logger.compiled(compiled.inputs.len(), &compiled.skipped);

        let command = FfmpegCommand::new(&job.input, &job.output)
            .add_inputs(&compiled.inputs)
            .filter_complex(compiled.filter_complex.clone())
            .map_label(&compiled.output_label)
            .map_optional_audio()
            .encoding(&self.encoding);

        let started = Instant::now();
        let mut handle = match self.transcoder.launch(&command).await {
            Ok(handle) => handle,
            Err(e) => {
                return finish_failed(tracker, &logger, FailureStage::Launch, e.describe()).await;
            }
        };

        let mut extractor = ProgressExtractor::new(geometry.duration);
        while let Some(line) = handle.next_line().await {
            let Some(percent) = extractor.feed(&line) else {
                continue;
            };
            match tracker.progress(percent).await {
                Ok(true) => logger.progress(percent),
                Ok(false) => {}
                // A stale percentage is harmless; the next line retries.
                Err(e) => logger.store_error("progress", &e),
            }
        }

        let outcome = handle.wait().await;
        let elapsed = started.elapsed();
        metrics::record_ffmpeg_duration(elapsed.as_secs_f64(), outcome.is_ok());

        match outcome {
            Ok(()) => {
                match tracker.complete().await {
                    Ok(()) => {
                        metrics::record_job_completed();
                        logger.completed(&job.output, elapsed);
                    }
                    Err(e) => logger.store_error("complete", &e),
                }
                tracker.into_snapshot()
            }
            Err(e) => finish_failed(tracker, &logger, FailureStage::Transcode, e.describe()).await,
        }
    }
}

/// Log, count and record a failure.
pub(crate) async fn finish_failed(
    mut tracker: JobTracker,
    logger: &JobLogger,
    stage: FailureStage,
    message: String,
) -> JobSnapshot {
    metrics::record_job_failed(stage);
    logger.failed(stage, &message);
    if let Err(e) = tracker.fail(message).await {
        logger.store_error("fail", &e);
    }
    tracker.into_snapshot()
}

fn probe_failure_message(error: &MediaError) -> String {
    match error {
        MediaError::ProbeFailed(message) => message.clone(),
        other => format!(
            "Could not determine video duration/dimensions: {}",
            other.describe()
        ),
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::collections::HashMap;
    use tempfile::TempDir;
    use vcomp_models::JobStatus;
    use vcomp_storage::{JobStore, MemoryJobStore};

    use crate::testing::{FakeTranscoder, FlakyStore};

    #[derive(Default)]
    struct MapResolver(HashMap<String, PathBuf>);

    impl AssetResolver for MapResolver {
        fn resolve(&self, reference: &str) -> Option<PathBuf> {
            self.0.get(reference).cloned()
        }
    }

    struct Fixture {
        _dir: TempDir,
        store: Arc<MemoryJobStore>,
        job: CompositionJob,
    }

    fn fixture(overlays: Vec<Overlay>) -> Fixture {
        let dir = TempDir::new().unwrap();
        let input = dir.path().join("base.mp4");
        std::fs::write(&input, b"video").unwrap();
        Fixture {
            job: CompositionJob {
                job_id: JobId::new(),
                input,
                output: dir.path().join("out.mp4"),
                overlays,
            },
            store: Arc::new(MemoryJobStore::new()),
            _dir: dir,
        }
    }

    async fn run(
        fixture: &Fixture,
        transcoder: Arc<FakeTranscoder>,
        resolver: MapResolver,
    ) -> JobSnapshot {
        let supervisor =
            TranscodeSupervisor::new(transcoder, Arc::new(resolver), EncodingConfig::default());
        let tracker = JobTracker::create(fixture.store.clone(), fixture.job.job_id.clone())
            .await
            .unwrap();
        supervisor.run(fixture.job.clone(), tracker).await
    }

    #[tokio::test]
    async fn test_success_reaches_completed_at_100() {
        let fixture = fixture(vec![Overlay::text("Hi", 1.0, 3.0, 0.5, 0.5)]);
        let transcoder = Arc::new(FakeTranscoder::succeeding(&[
            "out_time=00:00:25.000000",
            "out_time=00:00:50.000000",
            "progress=end",
        ]));

        let snapshot = run(&fixture, transcoder.clone(), MapResolver::default()).await;

        assert_eq!(snapshot.status, JobStatus::Completed);
        assert_eq!(snapshot.progress, 100);
        assert!(snapshot.error.is_none());
        assert_eq!(transcoder.launch_count(), 1);

        let stored = fixture.store.load(&fixture.job.job_id).await.unwrap().unwrap();
        assert_eq!(stored, snapshot);
        assert!(fixture.job.output.exists());

        let args = transcoder.last_args();
        let filter = &args[args.iter().position(|a| a == "-filter_complex").unwrap() + 1];
        assert!(filter.contains("x=960:y=540:enable='between(t,1,3)'[v1]"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "[v1]"));
        assert!(args.windows(2).any(|w| w[0] == "-map" && w[1] == "0:a?"));
    }

    #[tokio::test]
    async fn test_running_progress_never_reaches_100() {
        let fixture = fixture(vec![]);
        // Elapsed beyond the probed duration, and the process then fails.
        let transcoder = Arc::new(FakeTranscoder::exiting_with(
            1,
            &["out_time=00:01:40.00", "out_time=00:02:00.00"],
        ));

        let snapshot = run(&fixture, transcoder, MapResolver::default()).await;

        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(snapshot.progress, 99);
    }

    #[tokio::test]
    async fn test_probe_failure_never_launches() {
        let fixture = fixture(vec![Overlay::text("Hi", 0.0, 1.0, 0.0, 0.0)]);
        let transcoder = Arc::new(FakeTranscoder::failing_probe());

        let snapshot = run(&fixture, transcoder.clone(), MapResolver::default()).await;

        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(transcoder.launch_count(), 0);
        assert!(snapshot
            .error
            .as_deref()
            .unwrap()
            .starts_with("Could not determine video duration"));
    }

    #[tokio::test]
    async fn test_missing_input_is_probe_failure() {
        let mut fixture = fixture(vec![]);
        fixture.job.input = fixture.job.input.with_file_name("nope.mp4");
        let transcoder = Arc::new(FakeTranscoder::succeeding(&[]));

        let snapshot = run(&fixture, transcoder.clone(), MapResolver::default()).await;

        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(transcoder.launch_count(), 0);
        assert!(snapshot
            .error
            .as_deref()
            .unwrap()
            .starts_with("Could not determine video duration/dimensions: "));
    }

    #[tokio::test]
    async fn test_nonzero_exit_records_diagnostics() {
        let fixture = fixture(vec![]);
        let transcoder = Arc::new(FakeTranscoder::exiting_with(183, &[]));

        let snapshot = run(&fixture, transcoder, MapResolver::default()).await;

        assert_eq!(snapshot.status, JobStatus::Failed);
        let error = snapshot.error.unwrap();
        assert!(error.contains("exit code 183"));
        assert!(error.contains("Invalid data found"));
    }

    #[tokio::test]
    async fn test_missing_asset_still_completes() {
        let fixture = fixture(vec![
            Overlay::image("gone.png", 0.0, 2.0, 0.1, 0.1),
            Overlay::text("kept", 0.0, 2.0, 0.0, 0.0),
        ]);
        let transcoder = Arc::new(FakeTranscoder::succeeding(&[]));

        let snapshot = run(&fixture, transcoder.clone(), MapResolver::default()).await;

        assert_eq!(snapshot.status, JobStatus::Completed);
        let args = transcoder.last_args();
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 1);
        assert!(args.iter().any(|a| a.contains("drawtext=text=kept")));
    }

    #[tokio::test]
    async fn test_assets_become_extra_inputs() {
        let fixture = fixture(vec![Overlay::clip("pip.mp4", 0.0, 2.0, 0.5, 0.5)]);
        let mut resolver = MapResolver::default();
        resolver
            .0
            .insert("pip.mp4".to_string(), PathBuf::from("/assets/pip.mp4"));
        let transcoder = Arc::new(FakeTranscoder::succeeding(&[]));

        run(&fixture, transcoder.clone(), resolver).await;

        let args = transcoder.last_args();
        assert!(args.windows(2).any(|w| w[0] == "-i" && w[1] == "/assets/pip.mp4"));
        assert!(args.iter().any(|a| a.starts_with("[1:v]scale=384:216[sc0]")));
    }

    async fn run_with_store(
        fixture: &Fixture,
        store: Arc<FlakyStore>,
        transcoder: Arc<FakeTranscoder>,
    ) -> JobSnapshot {
        let supervisor = TranscodeSupervisor::new(
            transcoder,
            Arc::new(MapResolver::default()),
            EncodingConfig::default(),
        );
        let tracker = JobTracker::create(store, fixture.job.job_id.clone())
            .await
            .unwrap();
        supervisor.run(fixture.job.clone(), tracker).await
    }

    #[tokio::test]
    async fn test_unrecorded_start_fails_before_launch() {
        let fixture = fixture(vec![]);
        // Save #1 records `queued`; save #2 would record `processing`.
        let store = Arc::new(FlakyStore::failing_saves(&[2]));
        let transcoder = Arc::new(FakeTranscoder::succeeding(&["out_time=00:00:50.00"]));

        let snapshot = run_with_store(&fixture, store.clone(), transcoder.clone()).await;

        assert_eq!(snapshot.status, JobStatus::Failed);
        assert_eq!(transcoder.launch_count(), 0);
        assert!(snapshot
            .error
            .as_deref()
            .unwrap()
            .starts_with("Failed to record processing state"));

        let stored = store.load(&fixture.job.job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Failed);
    }

    #[tokio::test]
    async fn test_rejected_completion_write_is_retried() {
        let fixture = fixture(vec![]);
        // queued, processing, then the completion write fails once.
        let store = Arc::new(FlakyStore::failing_saves(&[3]));
        let transcoder = Arc::new(FakeTranscoder::succeeding(&[]));

        let snapshot = run_with_store(&fixture, store.clone(), transcoder).await;

        assert_eq!(snapshot.status, JobStatus::Completed);
        let stored = store.load(&fixture.job.job_id).await.unwrap().unwrap();
        assert_eq!(stored.status, JobStatus::Completed);
        assert_eq!(stored.progress, 100);
    }
}
