//! Log-mel feature window extraction
//!
//! Converts a mono waveform at the model sample rate into a fixed-shape
//! `(n_mels × frames)` matrix, by default `(128 × 256)`.
//!
//! # Algorithm
//!
//! 1. Pad-to-cover STFT with a periodic Hann window (see [`super::stft`])
//! 2. Power spectrogram `|X|²`, shape `(time × (n_fft/2 + 1))`
//! 3. Mel projection through the shared [`MelFilterbank`]
//! 4. Transpose to `(mel × time)`
//! 5. `log(1 + x)` compression
//! 6. Force the time axis to exactly `frames`: zero-pad on the right, or keep
//!    the first `frames` columns
//! 7. Global normalization over the whole window:
//!    `(x - mean) / (std + 1e-6)` with population std
//!
//! Step 6 never needs frames past `frames`, so they are not computed at all.
//! Because `log1p(0) == 0`, padding after compression is the same as padding
//! the mel matrix with zeros.
//!
//! NaN or infinite input samples are not sanitized; they propagate into the
//! statistics and therefore into every output value.
//!
//! # Example
//!
//! ```no_run
//! use genre_dsp::features::extractor::FeatureExtractor;
//!
//! let extractor = FeatureExtractor::default();
//! let waveform = vec![0.0f32; 22050 * 3];
//! let window = extractor.extract(&waveform);
//! assert_eq!(window.shape(), (128, 256));
//! ```

use std::sync::Arc;

use serde::Serialize;

use crate::config::SpectrogramParams;
use crate::error::GenreError;

use super::filterbank::MelFilterbank;
use super::stft::{num_frames, Stft};

/// Guards the division when the whole window is constant (e.g. silence)
pub const NORMALIZATION_EPSILON: f64 = 1e-6;

/// Fixed-shape, globally normalized log-mel matrix
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FeatureWindow {
    n_mels: usize,
    frames: usize,
    /// Row-major `(n_mels × frames)`
    data: Vec<f32>,
}

impl FeatureWindow {
    /// `(n_mels, frames)`
    pub fn shape(&self) -> (usize, usize) {
        (self.n_mels, self.frames)
    }

    /// Number of mel bands (rows)
    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    /// Number of time frames (columns)
    pub fn frames(&self) -> usize {
        self.frames
    }

    /// Value at mel band `mel`, frame `frame`
    pub fn get(&self, mel: usize, frame: usize) -> f32 {
        self.data[mel * self.frames + frame]
    }

    /// One mel band across all frames
    pub fn row(&self, mel: usize) -> &[f32] {
        &self.data[mel * self.frames..(mel + 1) * self.frames]
    }

    /// Row-major values
    pub fn as_slice(&self) -> &[f32] {
        &self.data
    }

    /// Consume into row-major values
    pub fn into_vec(self) -> Vec<f32> {
        self.data
    }

    /// True when no value is NaN or infinite
    pub fn is_finite(&self) -> bool {
        self.data.iter().all(|x| x.is_finite())
    }

    /// Mean over all values
    pub fn mean(&self) -> f32 {
        mean_and_std(&self.data).0 as f32
    }

    /// Population standard deviation over all values
    pub fn std(&self) -> f32 {
        mean_and_std(&self.data).1 as f32
    }
}

/// Spectral feature extractor
///
/// Holds everything that does not depend on the input: the shared mel
/// filterbank, the Hann window and the planned FFT. It is `Send + Sync`, so a
/// single instance behind an `Arc` can serve any number of concurrent
/// callers; each call allocates its own scratch space.
#[derive(Debug, Clone)]
pub struct FeatureExtractor {
    params: SpectrogramParams,
    filterbank: Arc<MelFilterbank>,
    stft: Stft,
}

impl Default for FeatureExtractor {
    fn default() -> Self {
        let params = SpectrogramParams::default();
        let filterbank = Arc::new(MelFilterbank::new(&params));
        Self::build(params, filterbank)
    }
}

impl FeatureExtractor {
    /// Create an extractor, building a filterbank for `params`
    ///
    /// # Errors
    ///
    /// Returns `GenreError::InvalidInput` if the parameters are invalid.
    pub fn new(params: SpectrogramParams) -> Result<Self, GenreError> {
        params.validate()?;
        let filterbank = Arc::new(MelFilterbank::new(&params));
        Ok(Self::build(params, filterbank))
    }

    /// Create an extractor around an already-built filterbank
    ///
    /// # Errors
    ///
    /// Returns `GenreError::InvalidInput` if the parameters are invalid or the
    /// filterbank shape does not match them.
    pub fn with_filterbank(
        params: SpectrogramParams,
        filterbank: Arc<MelFilterbank>,
    ) -> Result<Self, GenreError> {
        params.validate()?;
        if filterbank.num_bins() != params.num_spectrogram_bins()
            || filterbank.n_mels() != params.n_mels
        {
            return Err(GenreError::InvalidInput(format!(
                "Filterbank shape ({} x {}) does not match parameters ({} x {})",
                filterbank.num_bins(),
                filterbank.n_mels(),
                params.num_spectrogram_bins(),
                params.n_mels
            )));
        }
        Ok(Self::build(params, filterbank))
    }

    fn build(params: SpectrogramParams, filterbank: Arc<MelFilterbank>) -> Self {
        let stft = Stft::new(params.n_fft, params.hop_length);
        Self {
            params,
            filterbank,
            stft,
        }
    }

    /// Parameters this extractor was built with
    pub fn params(&self) -> &SpectrogramParams {
        &self.params
    }

    /// Shared filterbank
    pub fn filterbank(&self) -> &Arc<MelFilterbank> {
        &self.filterbank
    }

    /// Extract a feature window from a mono waveform of any length
    ///
    /// # Arguments
    ///
    /// * `samples` - Mono samples at `params().sample_rate`
    ///
    /// # Returns
    ///
    /// A `(n_mels × frames)` window; finite for any finite input, all zeros
    /// for silent input.
    pub fn extract(&self, samples: &[f32]) -> FeatureWindow {
        let n_mels = self.params.n_mels;
        let frames = self.params.frames;

        let available = num_frames(samples.len(), self.params.hop_length);
        let used = available.min(frames);

        log::debug!(
            "Extracting features: {} samples -> {} STFT frames ({} used, {} padded)",
            samples.len(),
            available,
            used,
            frames - used
        );

        // Zero-initialised: columns past `used` are the right padding
        let mut data = vec![0.0f32; n_mels * frames];

        let mut scratch = self.stft.scratch();
        let mut power = vec![0.0f32; self.stft.num_bins()];
        let mut bands = vec![0.0f32; n_mels];

        for t in 0..used {
            self.stft.power_frame(samples, t, &mut scratch, &mut power);
            self.filterbank.project(&power, &mut bands);
            for (mel, &energy) in bands.iter().enumerate() {
                data[mel * frames + t] = energy.ln_1p();
            }
        }

        normalize_global(&mut data);

        FeatureWindow {
            n_mels,
            frames,
            data,
        }
    }
}

/// Mean and population standard deviation, accumulated in f64
fn mean_and_std(values: &[f32]) -> (f64, f64) {
    if values.is_empty() {
        return (0.0, 0.0);
    }
    let n = values.len() as f64;
    let mean = values.iter().map(|&x| x as f64).sum::<f64>() / n;
    let var = values
        .iter()
        .map(|&x| {
            let d = x as f64 - mean;
            d * d
        })
        .sum::<f64>()
        / n;
    (mean, var.sqrt())
}

/// `(x - mean) / (std + eps)` over the whole slice
fn normalize_global(values: &mut [f32]) {
    let (mean, std) = mean_and_std(values);
    let denom = std + NORMALIZATION_EPSILON;
    for x in values.iter_mut() {
        *x = ((*x as f64 - mean) / denom) as f32;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{FRAMES, N_MELS, WIN_SAMPLES};

    fn noise(len: usize, seed: u32) -> Vec<f32> {
        // Small LCG: deterministic, no extra dev-dependency
        let mut state = seed.wrapping_mul(747796405).wrapping_add(2891336453);
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1664525).wrapping_add(1013904223);
                (state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0
            })
            .collect()
    }

    fn small_params() -> SpectrogramParams {
        SpectrogramParams {
            sample_rate: 8000,
            n_fft: 64,
            hop_length: 16,
            n_mels: 8,
            frames: 10,
            lower_edge_hz: 0.0,
            upper_edge_hz: 4000.0,
        }
    }

    #[test]
    fn test_shape_for_any_length() {
        let extractor = FeatureExtractor::new(small_params()).unwrap();
        for len in [0, 1, 15, 16, 17, 100, 160, 161, 1000] {
            let window = extractor.extract(&noise(len, len as u32));
            assert_eq!(window.shape(), (8, 10), "len={}", len);
            assert!(window.is_finite(), "len={}", len);
        }
    }

    #[test]
    fn test_default_shape() {
        let extractor = FeatureExtractor::default();
        let window = extractor.extract(&noise(22050, 7));
        assert_eq!(window.shape(), (N_MELS, FRAMES));
        assert!(window.is_finite());
    }

    #[test]
    fn test_silence_is_all_zero() {
        let extractor = FeatureExtractor::new(small_params()).unwrap();
        for len in [0, 50, 500] {
            let window = extractor.extract(&vec![0.0f32; len]);
            assert!(window.as_slice().iter().all(|&x| x == 0.0), "len={}", len);
        }
    }

    #[test]
    fn test_global_normalization() {
        let extractor = FeatureExtractor::new(small_params()).unwrap();
        let window = extractor.extract(&noise(400, 3));
        assert!(window.mean().abs() < 1e-4, "mean={}", window.mean());
        assert!((window.std() - 1.0).abs() < 1e-3, "std={}", window.std());
    }

    #[test]
    fn test_short_input_pads_right() {
        let extractor = FeatureExtractor::new(small_params()).unwrap();
        // 40 samples -> 3 frames, 7 padded columns
        let window = extractor.extract(&noise(40, 11));
        let pad_value = window.get(0, 3);
        for mel in 0..8 {
            for frame in 3..10 {
                assert_eq!(window.get(mel, frame), pad_value);
            }
        }
        // Padding is the smallest value: log1p output is >= 0 before normalization
        assert!(window.as_slice().iter().all(|&x| x >= pad_value));
    }

    #[test]
    fn test_long_input_truncates_left_aligned() {
        let params = small_params();
        let extractor = FeatureExtractor::new(params).unwrap();
        let long = noise(2000, 5);

        // The first `frames` frames only touch this prefix
        let touched = (params.frames - 1) * params.hop_length + params.n_fft;
        let prefix = &long[..touched];

        assert_eq!(extractor.extract(&long), extractor.extract(prefix));
    }

    #[test]
    fn test_exact_window_needs_no_padding() {
        assert_eq!(num_frames(WIN_SAMPLES, 512), FRAMES);

        let params = small_params();
        let extractor = FeatureExtractor::new(params).unwrap();
        let exact = noise(params.window_samples(), 9);
        assert_eq!(num_frames(exact.len(), params.hop_length), params.frames);

        // The exact window fills every column itself, and its last frame's
        // tail sees the same zeros as a longer, silence-extended input that
        // takes the truncation path
        let mut extended = exact.clone();
        extended.resize(exact.len() + params.n_fft * 3, 0.0);
        assert!(num_frames(extended.len(), params.hop_length) > params.frames);
        assert_eq!(extractor.extract(&exact), extractor.extract(&extended));

        // Frames past the window never leak in
        let mut noisy_tail = extended.clone();
        let touched = (params.frames - 1) * params.hop_length + params.n_fft;
        for (x, n) in noisy_tail[touched..].iter_mut().zip(noise(params.n_fft * 3, 21)) {
            *x = n;
        }
        assert_eq!(extractor.extract(&extended), extractor.extract(&noisy_tail));
    }

    #[test]
    fn test_deterministic() {
        let extractor = FeatureExtractor::default();
        let samples = noise(WIN_SAMPLES, 1);
        assert_eq!(extractor.extract(&samples), extractor.extract(&samples));
    }

    #[test]
    fn test_nan_propagates() {
        let extractor = FeatureExtractor::new(small_params()).unwrap();
        let mut samples = noise(100, 2);
        samples[10] = f32::NAN;
        let window = extractor.extract(&samples);
        assert!(window.as_slice().iter().all(|x| x.is_nan()));
    }

    #[test]
    fn test_with_filterbank_shape_mismatch() {
        let bank = Arc::new(MelFilterbank::new(&small_params()));
        assert!(FeatureExtractor::with_filterbank(SpectrogramParams::default(), bank.clone()).is_err());
        assert!(FeatureExtractor::with_filterbank(small_params(), bank).is_ok());
    }

    #[test]
    fn test_extractor_is_send_sync() {
        fn assert_send_sync<T: Send + Sync>() {}
        assert_send_sync::<FeatureExtractor>();
    }
}
