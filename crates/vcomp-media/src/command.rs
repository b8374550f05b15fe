//! FFmpeg command builder and runner.

use std::collections::VecDeque;
use std::path::{Path, PathBuf};
use std::process::Stdio;
use tokio::io::{AsyncBufReadExt, BufReader};
use tokio::process::{Child, ChildStderr, Command};
use tokio::sync::mpsc;
use tokio::task::JoinHandle;
use tracing::{debug, warn};

use vcomp_models::EncodingConfig;

use crate::error::{MediaError, MediaResult};
use crate::filter_graph::StreamLabel;

/// Lines buffered between the stderr reader and the consumer.
const LINE_CHANNEL_CAPACITY: usize = 256;

/// Default number of diagnostic lines kept for error messages.
pub const DEFAULT_STDERR_TAIL_LINES: usize = 20;

/// Builder for FFmpeg commands.
#[derive(Debug, Clone)]
pub struct FfmpegCommand {
    /// Input file paths, base video first
    inputs: Vec<PathBuf>,
    /// Output file path
    output: PathBuf,
    /// Output arguments (after the last -i)
    output_args: Vec<String>,
}

impl FfmpegCommand {
    /// Create a new FFmpeg command for a base input.
    pub fn new(input: impl AsRef<Path>, output: impl AsRef<Path>) -> Self {
        Self {
            inputs: vec![input.as_ref().to_path_buf()],
            output: output.as_ref().to_path_buf(),
            output_args: Vec::new(),
        }
    }

    /// Append inputs in order; the first becomes input index 1.
    pub fn add_inputs<I, P>(mut self, inputs: I) -> Self
    where
        I: IntoIterator<Item = P>,
        P: AsRef<Path>,
    {
        self.inputs
            .extend(inputs.into_iter().map(|p| p.as_ref().to_path_buf()));
        self
    }

    /// Add output arguments (after -i).
    pub fn output_arg(mut self, arg: impl Into<String>) -> Self {
        self.output_args.push(arg.into());
        self
    }

    /// Set filter complex.
    pub fn filter_complex(self, filter: impl Into<String>) -> Self {
        self.output_arg("-filter_complex").output_arg(filter)
    }

    /// Map a filter-graph output label.
    pub fn map_label(self, label: &StreamLabel) -> Self {
        self.output_arg("-map").output_arg(label.to_string())
    }

    /// Map the base input's audio if it has any.
    pub fn map_optional_audio(self) -> Self {
        self.output_arg("-map").output_arg("0:a?")
    }

    /// Set video codec.
    pub fn video_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:v").output_arg(codec)
    }

    /// Set audio codec.
    pub fn audio_codec(self, codec: impl Into<String>) -> Self {
        self.output_arg("-c:a").output_arg(codec)
    }

    /// Set CRF (quality).
    pub fn crf(self, crf: u8) -> Self {
        self.output_arg("-crf").output_arg(crf.to_string())
    }

    /// Set preset.
    pub fn preset(self, preset: impl Into<String>) -> Self {
        self.output_arg("-preset").output_arg(preset)
    }

    /// Set output pixel format.
    pub fn pixel_format(self, pix_fmt: impl Into<String>) -> Self {
        self.output_arg("-pix_fmt").output_arg(pix_fmt)
    }

    /// Move the moov atom to the front for progressive playback.
    pub fn faststart(self) -> Self {
        self.output_arg("-movflags").output_arg("+faststart")
    }

    /// Apply all codec parameters from an encoding config.
    pub fn encoding(self, encoding: &EncodingConfig) -> Self {
        self.video_codec(encoding.codec.clone())
            .preset(encoding.preset.clone())
            .crf(encoding.crf)
            .pixel_format(encoding.pixel_format.clone())
            .audio_codec(encoding.audio_codec.clone())
            .faststart()
    }

    /// Output path.
    pub fn output(&self) -> &Path {
        &self.output
    }

    /// Build the command arguments.
    pub fn build_args(&self) -> Vec<String> {
        let mut args = vec!["-y".to_string(), "-hide_banner".to_string()];

        // Progress goes to stderr as newline-terminated key=value lines;
        // the carriage-return stats line is suppressed.
        args.push("-nostats".to_string());
        args.push("-v".to_string());
        args.push("error".to_string());
        args.push("-progress".to_string());
        args.push("pipe:2".to_string());

        for input in &self.inputs {
            args.push("-i".to_string());
            args.push(input.to_string_lossy().to_string());
        }

        args.extend(self.output_args.clone());

        args.push(self.output.to_string_lossy().to_string());

        args
    }
}

/// A launched transcode: diagnostic lines as they arrive, then the outcome.
pub struct TranscodeHandle {
    lines: mpsc::Receiver<String>,
    completion: JoinHandle<MediaResult<()>>,
}

impl TranscodeHandle {
    /// Assemble a handle from a line channel and a completion task.
    pub fn new(lines: mpsc::Receiver<String>, completion: JoinHandle<MediaResult<()>>) -> Self {
        Self { lines, completion }
    }

    /// Next diagnostic line, or `None` once the stream is closed.
    pub async fn next_line(&mut self) -> Option<String> {
        self.lines.recv().await
    }

    /// Wait for the process to exit.
    pub async fn wait(self) -> MediaResult<()> {
        drop(self.lines);
        self.completion
            .await
            .map_err(|e| MediaError::internal(format!("FFmpeg supervision task failed: {e}")))?
    }
}

/// Runner that launches FFmpeg and streams its diagnostics.
#[derive(Debug, Clone)]
pub struct FfmpegRunner {
    /// FFmpeg binary name or path
    binary: PathBuf,
    /// Number of diagnostic lines kept for error reporting
    stderr_tail_lines: usize,
}

impl Default for FfmpegRunner {
    fn default() -> Self {
        Self::new("ffmpeg")
    }
}

impl FfmpegRunner {
    /// Create a new runner.
    pub fn new(binary: impl Into<PathBuf>) -> Self {
        Self {
            binary: binary.into(),
            stderr_tail_lines: DEFAULT_STDERR_TAIL_LINES,
        }
    }

    /// Set how many diagnostic lines are kept for error messages.
    pub fn with_stderr_tail(mut self, lines: usize) -> Self {
        self.stderr_tail_lines = lines;
        self
    }

    /// Launch an FFmpeg command.
    ///
    /// There is no timeout or cancellation: the process runs until it exits.
    pub fn spawn(&self, cmd: &FfmpegCommand) -> MediaResult<TranscodeHandle> {
        let binary = which::which(&self.binary).map_err(|_| MediaError::FfmpegNotFound)?;

        let args = cmd.build_args();
        debug!("Running FFmpeg: {} {}", binary.display(), args.join(" "));

        let mut child = Command::new(&binary)
            .args(&args)
            .stdin(Stdio::null())
            .stdout(Stdio::null())
            .stderr(Stdio::piped())
            .spawn()
            .map_err(|e| MediaError::ffmpeg_failed(format!("Failed to spawn FFmpeg: {e}"), None, None))?;

        let stderr = child
            .stderr
            .take()
            .ok_or_else(|| MediaError::internal("FFmpeg stderr not captured"))?;

        let (tx, rx) = mpsc::channel(LINE_CHANNEL_CAPACITY);

        let completion = tokio::spawn(supervise(child, stderr, tx, self.stderr_tail_lines));

        Ok(TranscodeHandle::new(rx, completion))
    }
}

/// Drain stderr, then wait for the process and classify its exit.
async fn supervise(
    mut child: Child,
    stderr: ChildStderr,
    tx: mpsc::Sender<String>,
    tail_lines: usize,
) -> MediaResult<()> {
    let tail = pump_stderr(stderr, tx, tail_lines).await;
    let status = child.wait().await?;

    if status.success() {
        return Ok(());
    }

    let stderr = (!tail.is_empty()).then(|| Vec::from(tail).join("\n"));
    Err(MediaError::ffmpeg_failed(
        "FFmpeg exited with non-zero status",
        stderr,
        status.code(),
    ))
}

/// Forward stderr lines to `tx` until EOF, returning the diagnostic tail.
///
/// Reading continues after the receiver is gone so the child never blocks
/// on a full pipe.
async fn pump_stderr(
    stderr: ChildStderr,
    tx: mpsc::Sender<String>,
    tail_lines: usize,
) -> VecDeque<String> {
    let mut reader = BufReader::new(stderr);
    let mut buf = Vec::new();
    let mut tail = VecDeque::with_capacity(tail_lines);
    let mut forward = true;

    loop {
        buf.clear();
        match reader.read_until(b'\n', &mut buf).await {
            Ok(0) => break,
            Ok(_) => {
                let chunk = String::from_utf8_lossy(&buf);
                for line in chunk.split(['\r', '\n']).filter(|l| !l.trim().is_empty()) {
                    if !is_progress_key(line) && tail_lines > 0 {
                        if tail.len() == tail_lines {
                            tail.pop_front();
                        }
                        tail.push_back(line.to_string());
                    }
                    if forward && tx.send(line.to_string()).await.is_err() {
                        forward = false;
                    }
                }
            }
            Err(e) => {
                warn!("Failed reading FFmpeg stderr: {}", e);
                break;
            }
        }
    }

    tail
}

/// Whether a line is a `-progress` key/value pair rather than a diagnostic.
fn is_progress_key(line: &str) -> bool {
    line.split_once('=').is_some_and(|(key, _)| {
        !key.is_empty() && key.chars().all(|c| c.is_ascii_alphanumeric() || c == '_')
    })
}

/// Locate an FFmpeg binary by name or path.
pub fn check_ffmpeg(binary: impl AsRef<Path>) -> MediaResult<PathBuf> {
    which::which(binary.as_ref()).map_err(|_| MediaError::FfmpegNotFound)
}

/// Locate an FFprobe binary by name or path.
pub fn check_ffprobe(binary: impl AsRef<Path>) -> MediaResult<PathBuf> {
    which::which(binary.as_ref()).map_err(|_| MediaError::FfprobeNotFound)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_builder() {
        let cmd = FfmpegCommand::new("base.mp4", "out.mp4")
            .add_inputs(["logo.png", "pip.mp4"])
            .filter_complex("[0:v]null[v0]")
            .map_label(&StreamLabel::new("v0"))
            .map_optional_audio()
            .encoding(&EncodingConfig::default());

        let args = cmd.build_args();
        let joined = args.join(" ");
        assert!(joined.starts_with("-y -hide_banner -nostats -v error -progress pipe:2"));
        assert!(joined.contains("-i base.mp4 -i logo.png -i pip.mp4"));
        assert!(joined.contains("-filter_complex [0:v]null[v0]"));
        assert!(joined.contains("-map [v0] -map 0:a?"));
        assert!(joined.contains("-c:v libx264 -preset ultrafast"));
        assert!(joined.contains("-c:a aac"));
        assert_eq!(args.last().map(String::as_str), Some("out.mp4"));
        assert_eq!(args.iter().filter(|a| *a == "-i").count(), 3);
    }

    #[test]
    fn test_filter_complex_is_single_argument() {
        let expr = "[0:v]drawtext=text=a b\\;c:x=0:y=0[v1]";
        let args = FfmpegCommand::new("in.mp4", "out.mp4")
            .filter_complex(expr)
            .build_args();
        let idx = args.iter().position(|a| a == "-filter_complex").unwrap();
        assert_eq!(args[idx + 1], expr);
    }

    #[test]
    fn test_is_progress_key() {
        assert!(is_progress_key("out_time=00:00:01.000000"));
        assert!(is_progress_key("progress=continue"));
        assert!(!is_progress_key("Error opening input file in.mp4."));
        assert!(!is_progress_key("[libx264 @ 0x55] crf=23 something"));
    }

    #[tokio::test]
    async fn test_missing_binary() {
        let runner = FfmpegRunner::new("definitely-not-ffmpeg-binary");
        let cmd = FfmpegCommand::new("in.mp4", "out.mp4");
        assert!(matches!(runner.spawn(&cmd), Err(MediaError::FfmpegNotFound)));
    }

    #[tokio::test]
    async fn test_handle_streams_then_completes() {
        let (tx, rx) = mpsc::channel(4);
        let completion = tokio::spawn(async move {
            tx.send("out_time=00:00:01.00".to_string()).await.ok();
            tx.send("progress=end".to_string()).await.ok();
            Ok(())
        });
        let mut handle = TranscodeHandle::new(rx, completion);

        let mut lines = Vec::new();
        while let Some(line) = handle.next_line().await {
            lines.push(line);
        }
        assert_eq!(lines.len(), 2);
        tokio_test::assert_ok!(handle.wait().await);
    }
}
