//! Audio preprocessing modules
//!
//! This module contains utilities for preparing decoded audio for feature
//! extraction:
//! - Channel mixing (multi-channel to mono)
//! - Sample rate conversion
//! - Waveform normalization (the two steps above, in order)

pub mod channel_mixer;
pub mod resampler;
pub mod waveform;

pub use waveform::WaveformNormalizer;
