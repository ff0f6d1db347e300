//! Error types for the genre feature pipeline

use thiserror::Error;

/// Errors that can occur while turning audio into genre predictions
///
/// Feature extraction and stream accumulation never fail; these variants
/// cover the collaborators around them (decoding, resampling, inference)
/// and configuration mistakes.
#[derive(Debug, Clone, Error)]
pub enum GenreError {
    /// Invalid input parameters or configuration
    #[error("Invalid input: {0}")]
    InvalidInput(String),

    /// Audio container could not be decoded
    #[error("Decoding error: {0}")]
    DecodingError(String),

    /// Sample rate conversion failed
    #[error("Resampling error: {0}")]
    ResamplingError(String),

    /// Classifier failed or returned a malformed probability vector
    #[error("Inference error: {0}")]
    InferenceError(String),

    /// Session registry is full and no idle session could be evicted
    #[error("Session limit reached: {0}")]
    SessionLimit(String),
}
