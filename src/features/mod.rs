//! Feature extraction modules
//!
//! This module contains the spectral front end that turns a mono waveform
//! into a model-ready log-mel window:
//! - Analysis windows
//! - Pad-to-cover STFT and power spectrum
//! - Linear-to-mel filterbank
//! - Log compression, shape forcing and global normalization

pub mod extractor;
pub mod filterbank;
pub mod stft;
pub mod window;

pub use extractor::{FeatureExtractor, FeatureWindow};
pub use filterbank::MelFilterbank;
