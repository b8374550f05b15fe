//! Shared data models for the vcomp compositor.
//!
//! This crate provides Serde-serializable types for:
//! - Overlay timelines and their validation
//! - Job identifiers, statuses and persisted snapshots
//! - Probed frame geometry and pixel conversions
//! - Output encoding parameters
//! - Overlay asset references

pub mod asset;
pub mod encoding;
pub mod error;
pub mod geometry;
pub mod job;
pub mod overlay;

// Re-export common types
pub use asset::{AssetRef, AssetResolver};
pub use encoding::EncodingConfig;
pub use error::{ModelError, ModelResult};
pub use geometry::FrameGeometry;
pub use job::{JobId, JobSnapshot, JobStatus};
pub use overlay::{parse_overlays, validate_overlays, Overlay, OverlayKind};
