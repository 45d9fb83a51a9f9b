//! Custom error types for neural-style.

use std::path::PathBuf;
use thiserror::Error;

/// Boxed cause from an inference runtime or a test engine.
pub type BoxError = Box<dyn std::error::Error + Send + Sync>;

/// Main error type for the neural-style library.
#[derive(Error, Debug)]
pub enum Error {
    /// Image bytes could not be decoded into a raster image.
    #[error("failed to decode image: {source}")]
    Decode {
        #[source]
        source: image::ImageError,
    },

    /// Failed to read an image file.
    #[error("failed to load image from {path}: {source}")]
    ImageLoad {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Failed to save an image file.
    #[error("failed to save image to {path}: {source}")]
    ImageSave {
        path: PathBuf,
        #[source]
        source: image::ImageError,
    },

    /// Failed to encode an image in memory.
    #[error("failed to encode image: {source}")]
    Encode {
        #[source]
        source: image::ImageError,
    },

    /// Model file is missing or the session could not be created.
    #[error("failed to load model {name}: {source}")]
    ModelLoad {
        name: String,
        #[source]
        source: BoxError,
    },

    /// Model inference failed.
    #[error("model inference failed: {source}")]
    Inference {
        #[source]
        source: BoxError,
    },

    /// The engine returned no usable output tensor.
    #[error("model produced no usable output: {reason}")]
    MissingOutput { reason: String },

    /// Output tensor shape matches none of the supported layouts.
    #[error("unrecognized output tensor shape {shape:?}")]
    UnrecognizedShape { shape: Vec<usize> },

    /// Tensor data length disagrees with its shape.
    #[error("tensor shape mismatch: expected {expected}, got {actual}")]
    ShapeMismatch { expected: String, actual: String },

    /// Invalid parameter value.
    #[error("invalid parameter {name}: {reason}")]
    InvalidParameter { name: String, reason: String },

    /// IO error.
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

impl From<ort::Error> for Error {
    fn from(err: ort::Error) -> Self {
        Self::Inference {
            source: Box::new(err),
        }
    }
}

/// Result type alias for neural-style operations.
pub type Result<T> = std::result::Result<T, Error>;
