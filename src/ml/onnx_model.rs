//! ONNX model loading and inference
//!
//! Runs an ONNX export of the genre classifier. The model takes one f32
//! tensor shaped `[1, n_mels, frames, 1]` (batch, height, width, channel)
//! and returns the per-genre probabilities as its first output.

use std::path::Path;

use ort::session::builder::{GraphOptimizationLevel, SessionBuilder};
use ort::session::Session;
use ort::value::Value;
use parking_lot::Mutex;

use crate::analysis::classifier::GenreClassifier;
use crate::analysis::result::GENRES;
use crate::error::GenreError;
use crate::features::extractor::FeatureWindow;

fn ort_error(context: &str, err: impl std::fmt::Display) -> GenreError {
    GenreError::InferenceError(format!("{}: {}", context, err))
}

/// ONNX genre classifier
pub struct OnnxGenreModel {
    session: Mutex<Session>,
    input_name: String,
    output_name: String,
}

impl std::fmt::Debug for OnnxGenreModel {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("OnnxGenreModel")
            .field("input_name", &self.input_name)
            .field("output_name", &self.output_name)
            .finish()
    }
}

impl OnnxGenreModel {
    /// Load an ONNX model from file
    ///
    /// # Arguments
    ///
    /// * `path` - Path to the `.onnx` file
    /// * `num_threads` - Intra-op threads, `None` for the runtime default
    ///
    /// # Errors
    ///
    /// Returns `GenreError::InferenceError` if the runtime cannot load the
    /// model or the model has no inputs/outputs.
    pub fn load<P: AsRef<Path>>(path: P, num_threads: Option<usize>) -> Result<Self, GenreError> {
        let path = path.as_ref();
        log::info!("Loading genre model from: {:?}", path);

        let mut builder = SessionBuilder::new()
            .map_err(|e| ort_error("Failed to create session builder", e))?
            .with_optimization_level(GraphOptimizationLevel::Level3)
            .map_err(|e| ort_error("Failed to set optimization level", e))?;

        if let Some(threads) = num_threads {
            builder = builder
                .with_intra_threads(threads)
                .map_err(|e| ort_error("Failed to set intra threads", e))?;
        }

        let session = builder
            .commit_from_file(path)
            .map_err(|e| ort_error("Failed to load genre model", e))?;

        let input_name = session
            .inputs
            .first()
            .map(|input| input.name.clone())
            .ok_or_else(|| GenreError::InferenceError("Model has no inputs".to_string()))?;
        let output_name = session
            .outputs
            .first()
            .map(|output| output.name.clone())
            .ok_or_else(|| GenreError::InferenceError("Model has no outputs".to_string()))?;

        log::debug!("Genre model I/O: input='{}', output='{}'", input_name, output_name);

        Ok(Self {
            session: Mutex::new(session),
            input_name,
            output_name,
        })
    }
}

impl GenreClassifier for OnnxGenreModel {
    fn predict(&self, window: &FeatureWindow) -> Result<Vec<f32>, GenreError> {
        let (n_mels, frames) = window.shape();
        log::debug!("Running ONNX inference on {}x{} window", n_mels, frames);

        let input_value: Value = Value::from_array(([1, n_mels, frames, 1], window.as_slice().to_vec()))
            .map_err(|e| ort_error("Failed to create input tensor", e))?
            .into();

        let mut session = self.session.lock();
        let outputs = session
            .run(vec![(self.input_name.as_str(), input_value)])
            .map_err(|e| ort_error("Failed to run genre model", e))?;

        let output = outputs
            .get(self.output_name.as_str())
            .ok_or_else(|| GenreError::InferenceError(format!("No '{}' output", self.output_name)))?;
        let (_, probs) = output
            .try_extract_tensor::<f32>()
            .map_err(|e| ort_error("Failed to extract output tensor", e))?;

        if probs.len() < GENRES.len() {
            return Err(GenreError::InferenceError(format!(
                "Model returned {} values, expected {}",
                probs.len(),
                GENRES.len()
            )));
        }

        Ok(probs[..GENRES.len()].to_vec())
    }
}
