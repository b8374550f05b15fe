//! The transcoding seam between job supervision and FFmpeg.

use async_trait::async_trait;
use std::path::{Path, PathBuf};

use vcomp_models::FrameGeometry;

use crate::command::{FfmpegCommand, FfmpegRunner, TranscodeHandle};
use crate::error::MediaResult;
use crate::probe::probe_geometry;

/// Probes inputs and launches transcodes.
#[async_trait]
pub trait Transcoder: Send + Sync {
    /// Read duration and dimensions of the base video.
    async fn probe(&self, input: &Path) -> MediaResult<FrameGeometry>;

    /// Start a transcode and return its diagnostic stream.
    async fn launch(&self, command: &FfmpegCommand) -> MediaResult<TranscodeHandle>;
}

/// [`Transcoder`] backed by the `ffmpeg` and `ffprobe` executables.
#[derive(Debug, Clone)]
pub struct FfmpegTranscoder {
    runner: FfmpegRunner,
    ffprobe: PathBuf,
}

impl Default for FfmpegTranscoder {
    fn default() -> Self {
        Self::new(FfmpegRunner::default(), "ffprobe")
    }
}

impl FfmpegTranscoder {
    pub fn new(runner: FfmpegRunner, ffprobe: impl Into<PathBuf>) -> Self {
        Self {
            runner,
            ffprobe: ffprobe.into(),
        }
    }
}

#[async_trait]
impl Transcoder for FfmpegTranscoder {
    async fn probe(&self, input: &Path) -> MediaResult<FrameGeometry> {
        probe_geometry(&self.ffprobe, input).await
    }

    async fn launch(&self, command: &FfmpegCommand) -> MediaResult<TranscodeHandle> {
        self.runner.spawn(command)
    }
}
