//! Axum HTTP API server.
//!
//! This crate provides:
//! - Upload, status, result and listing routes over the job executor
//! - Overlay asset registration
//! - Request id, logging and CORS middleware
//! - Prometheus metrics

pub mod config;
pub mod error;
pub mod handlers;
pub mod metrics;
pub mod middleware;
pub mod routes;
pub mod state;

pub use config::ApiConfig;
pub use error::{ApiError, ApiResult};
pub use routes::create_router;
pub use state::AppState;
