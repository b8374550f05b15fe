//! Local storage for the compositor.
//!
//! This crate provides:
//! - The `JobStore` snapshot store, file-backed and in-memory
//! - Overlay asset registration and resolution
//! - The data directory layout and its startup cleanup

pub mod assets;
pub mod error;
pub mod fs_store;
pub mod job_store;
pub mod layout;
pub mod memory_store;

pub use assets::AssetStore;
pub use error::{StorageError, StorageResult};
pub use fs_store::FsJobStore;
pub use job_store::JobStore;
pub use layout::{sanitize_filename, StorageLayout};
pub use memory_store::MemoryJobStore;
