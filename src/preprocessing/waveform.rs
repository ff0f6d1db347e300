//! Waveform normalization: decoded PCM to model-rate mono
//!
//! Every waveform that reaches the feature extractor passes through here,
//! so both the clip and the streaming paths see identical preprocessing:
//!
//! 1. Average all channels to mono
//! 2. Resample to the target rate when the source rate differs

use crate::config::SAMPLE_RATE;
use crate::error::GenreError;
use crate::io::decoder::DecodedAudio;

use super::channel_mixer::downmix_to_mono;
use super::resampler::resample;

/// Converts decoded audio into a single-channel waveform at a fixed rate
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct WaveformNormalizer {
    target_rate: u32,
}

impl Default for WaveformNormalizer {
    fn default() -> Self {
        Self::new(SAMPLE_RATE)
    }
}

impl WaveformNormalizer {
    /// Create a normalizer targeting `target_rate` Hz
    pub fn new(target_rate: u32) -> Self {
        Self { target_rate }
    }

    /// Target sample rate in Hz
    pub fn target_rate(&self) -> u32 {
        self.target_rate
    }

    /// Downmix and resample decoded audio
    ///
    /// # Errors
    ///
    /// Returns `GenreError::InvalidInput` for an inconsistent channel layout
    /// and `GenreError::ResamplingError` if rate conversion fails.
    pub fn normalize(&self, audio: &DecodedAudio) -> Result<Vec<f32>, GenreError> {
        let mono = downmix_to_mono(&audio.samples, audio.channels)?;
        let waveform = resample(&mono, audio.sample_rate, self.target_rate)?;

        log::debug!(
            "Normalized waveform: {} frames ({:.2}s) @ {} Hz -> {} samples @ {} Hz",
            audio.frames(),
            audio.duration_seconds(),
            audio.sample_rate,
            waveform.len(),
            self.target_rate
        );

        Ok(waveform)
    }
}
