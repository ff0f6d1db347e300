//! ML inference modules
//!
//! Optional ONNX model inference for the genre classifier.

#[cfg(feature = "ml")]
pub mod onnx_model;

#[cfg(feature = "ml")]
pub use onnx_model::OnnxGenreModel;
