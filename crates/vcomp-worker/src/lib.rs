//! Background composition jobs.
//!
//! This crate provides:
//! - The transcode supervisor (probe, compile, launch, stream, finalize)
//! - Per-job state tracking on top of a `JobStore`
//! - The job executor with bounded concurrency
//! - Worker configuration and structured job logging

pub mod config;
pub mod error;
pub mod executor;
pub mod logging;
pub mod metrics;
pub mod supervisor;
pub mod tracker;

#[cfg(test)]
mod testing;

pub use config::WorkerConfig;
pub use error::{WorkerError, WorkerResult};
pub use executor::JobExecutor;
pub use logging::{FailureStage, JobLogger};
pub use supervisor::{CompositionJob, TranscodeSupervisor};
pub use tracker::JobTracker;
