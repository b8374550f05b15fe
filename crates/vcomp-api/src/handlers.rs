//! HTTP handlers.

pub mod health;
pub mod jobs;
pub mod overlays;

pub use health::{health, root};
