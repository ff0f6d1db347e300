//! # Genre DSP
//!
//! Audio front end for a music genre classifier. Turns either a complete
//! clip or a live stream of short chunks into fixed-size log-mel feature
//! windows, with identical numbers on both paths.
//!
//! ## Features
//!
//! - **Decoding**: WAV, FLAC, OGG/Vorbis and MP3 via Symphonia
//! - **Normalization**: channel averaging and sinc resampling to 22050 Hz
//! - **Features**: 128-band log-mel windows of 256 frames, globally normalized
//! - **Streaming**: bounded per-session accumulators with idle eviction
//! - **Classification**: pluggable classifier, optional ONNX runtime (`ml` feature)
//! - **Smoothing**: moving average and hysteresis for live genre display
//!
//! ## Quick Start
//!
//! ```no_run
//! use genre_dsp::{clip_to_features, FeatureExtractor};
//!
//! // Mono samples at 22050 Hz
//! let samples: Vec<f32> = vec![0.0; 22050 * 30];
//!
//! let extractor = FeatureExtractor::default();
//! let window = clip_to_features(&extractor, &samples);
//! assert_eq!(window.shape(), (128, 256));
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Clip:   bytes → decode → mono → resample → extract → classify
//! Stream: bytes → decode → mono → resample → accumulate → (ready) extract → classify
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod pipeline;
pub mod preprocessing;
pub mod service;
pub mod stream;

#[cfg(feature = "ml")]
pub mod ml;

// Re-export main types
pub use analysis::classifier::{classify, GenreClassifier};
pub use analysis::result::{ChunkResponse, Genre, Prediction, GENRES};
pub use analysis::smoother::{PredictionSmoother, SmoothedPrediction};
pub use config::{PipelineConfig, SessionConfig, SmoothingConfig, SpectrogramParams, StreamConfig};
pub use error::GenreError;
pub use features::extractor::{FeatureExtractor, FeatureWindow};
pub use features::filterbank::MelFilterbank;
pub use io::decoder::{decode_audio_bytes, DecodedAudio};
pub use pipeline::{FeaturePipeline, StreamFeatures};
pub use preprocessing::waveform::WaveformNormalizer;
pub use service::GenreService;
pub use stream::accumulator::{PushOutcome, StreamAccumulator};
pub use stream::session::SessionRegistry;

/// Clip pipeline: feature window for a whole normalized waveform
///
/// Stateless; the extractor pads short clips and truncates long ones.
///
/// # Arguments
///
/// * `extractor` - Shared feature extractor
/// * `waveform` - Mono samples at the extractor's sample rate, any length
///
/// # Returns
///
/// A `(128 × 256)` window with the default parameters
pub fn clip_to_features(extractor: &FeatureExtractor, waveform: &[f32]) -> FeatureWindow {
    extractor.extract(waveform)
}

/// Stream pipeline: push one normalized chunk and extract when ready
///
/// # Arguments
///
/// * `extractor` - Shared feature extractor
/// * `session` - The stream's accumulator
/// * `chunk` - Mono samples at the session's sample rate
///
/// # Returns
///
/// `Ready` with the window for the most recent samples, or `NotReady` with
/// the exact number of samples still missing
pub fn chunk_to_features(
    extractor: &FeatureExtractor,
    session: &mut StreamAccumulator,
    chunk: &[f32],
) -> StreamFeatures {
    match session.push(chunk) {
        PushOutcome::Ready(window) => StreamFeatures::Ready(extractor.extract(&window)),
        PushOutcome::NotReady { needed_samples } => StreamFeatures::NotReady { needed_samples },
    }
}
