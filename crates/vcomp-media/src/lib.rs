#![deny(unreachable_patterns)]
//! Overlay compositing on top of the FFmpeg CLI.
//!
//! This crate provides:
//! - A typed filter-graph IR and its renderer (all escaping lives there)
//! - The overlay timeline compiler
//! - Progress extraction from FFmpeg diagnostics
//! - FFprobe geometry probing
//! - Type-safe FFmpeg command building and a streaming process runner
//! - The `Transcoder` seam used by the job supervisor

pub mod command;
pub mod compiler;
pub mod error;
pub mod filter_graph;
pub mod probe;
pub mod progress;
pub mod transcoder;

pub use command::{check_ffmpeg, check_ffprobe, FfmpegCommand, FfmpegRunner, TranscodeHandle};
pub use compiler::{compile, CompiledGraph, SkippedOverlay, MIN_FONT_SIZE};
pub use error::{MediaError, MediaResult};
pub use filter_graph::{escape_drawtext, FilterGraph, FilterStage, StreamLabel, TimeWindow};
pub use probe::{parse_dimensions, parse_duration, probe_geometry};
pub use progress::{parse_clock, ProgressExtractor, MAX_RUNNING_PROGRESS};
pub use transcoder::{FfmpegTranscoder, Transcoder};
