//! Error types for volviz.

use thiserror::Error;

/// The main error type for volviz operations.
#[derive(Error, Debug)]
pub enum VizError {
    /// No isosurface is registered under the given id.
    #[error("isosurface {0} not found")]
    UnknownIsosurface(u32),

    /// No volume visual is registered under the given id.
    #[error("volume {0} not found")]
    UnknownVolume(u32),

    /// An argument was out of range or otherwise unusable.
    #[error("invalid argument: {0}")]
    InvalidArgument(String),

    /// Data size mismatch.
    #[error("data size mismatch: expected {expected}, got {actual}")]
    SizeMismatch { expected: usize, actual: usize },

    /// Storage for triangles or textures could not be allocated.
    #[error("resource exhausted: {0}")]
    ResourceExhausted(String),

    /// The texture collaborator rejected an operation.
    #[error("texture error: {0}")]
    Texture(String),

    /// JSON serialization error.
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
}

impl From<std::collections::TryReserveError> for VizError {
    fn from(err: std::collections::TryReserveError) -> Self {
        VizError::ResourceExhausted(err.to_string())
    }
}

/// A specialized Result type for volviz operations.
pub type Result<T> = std::result::Result<T, VizError>;
