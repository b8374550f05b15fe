//! Validation errors for submitted payloads.

use thiserror::Error;

/// Result type for model validation.
pub type ModelResult<T> = Result<T, ModelError>;

/// Errors raised while validating caller-supplied data.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum ModelError {
    #[error("Overlay {index}: content cannot be empty")]
    EmptyContent { index: usize },

    #[error("Overlay {index}: {field} must be a finite number")]
    NotFinite { index: usize, field: &'static str },

    #[error("Overlay {index}: {field} cannot be negative")]
    Negative { index: usize, field: &'static str },

    #[error("Overlay {index}: {field} must be within [0, 1], got {value}")]
    OutOfRange {
        index: usize,
        field: &'static str,
        value: f64,
    },

    #[error("Invalid overlay payload: {0}")]
    InvalidPayload(String),
}
