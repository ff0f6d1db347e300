//! Linear-to-mel filterbank
//!
//! Builds the `(num_spectrogram_bins × n_mels)` weight matrix that projects a
//! one-sided power spectrum onto mel bands. The construction follows the
//! HTK-style convention the classifier was trained with:
//!
//! 1. Mel scale: `mel(f) = 1127 * ln(1 + f / 700)`
//! 2. Spectrogram bin centres are spaced linearly over `[0, sample_rate / 2]`
//! 3. `n_mels + 2` band edges are spaced linearly on the mel axis over
//!    `[mel(lower_edge_hz), mel(upper_edge_hz)]`
//! 4. Each band is a triangle on the mel axis:
//!    `max(0, min((m - lower) / (center - lower), (upper - m) / (upper - center)))`
//! 5. The DC bin contributes to no band (its row is all zeros)
//!
//! The matrix depends only on the contract constants, so it is built once
//! and shared read-only (typically behind an `Arc`) by every extractor.

use std::ops::Range;

use crate::config::SpectrogramParams;

/// Hz to mel (HTK natural-log form)
pub fn hz_to_mel(hz: f64) -> f64 {
    1127.0 * (1.0 + hz / 700.0).ln()
}

/// Mel to Hz (inverse of [`hz_to_mel`])
#[cfg(test)]
fn mel_to_hz(mel: f64) -> f64 {
    700.0 * ((mel / 1127.0).exp() - 1.0)
}

/// Immutable linear-to-mel weight matrix
#[derive(Debug, Clone, PartialEq)]
pub struct MelFilterbank {
    num_bins: usize,
    n_mels: usize,
    /// Row-major `(num_bins × n_mels)`
    weights: Vec<f32>,
    /// Per band: bins with a nonzero weight (contiguous by construction)
    support: Vec<Range<usize>>,
}

impl MelFilterbank {
    /// Build the filterbank for the given parameters
    ///
    /// Parameters are assumed valid (see [`SpectrogramParams::validate`]).
    pub fn new(params: &SpectrogramParams) -> Self {
        let num_bins = params.num_spectrogram_bins();
        let n_mels = params.n_mels;
        let nyquist = params.sample_rate as f64 / 2.0;

        log::debug!(
            "Building mel filterbank: {} bins -> {} bands, {:.1}-{:.1} Hz",
            num_bins,
            n_mels,
            params.lower_edge_hz,
            params.upper_edge_hz
        );

        let bin_mels: Vec<f64> = (0..num_bins)
            .map(|bin| {
                let hz = if num_bins > 1 {
                    nyquist * bin as f64 / (num_bins - 1) as f64
                } else {
                    0.0
                };
                hz_to_mel(hz)
            })
            .collect();

        let mel_lo = hz_to_mel(params.lower_edge_hz as f64);
        let mel_hi = hz_to_mel(params.upper_edge_hz as f64);
        let edges: Vec<f64> = (0..n_mels + 2)
            .map(|i| mel_lo + (mel_hi - mel_lo) * i as f64 / (n_mels + 1) as f64)
            .collect();

        let mut weights = vec![0.0f32; num_bins * n_mels];
        let mut support = Vec::with_capacity(n_mels);

        for band in 0..n_mels {
            let (lower, center, upper) = (edges[band], edges[band + 1], edges[band + 2]);
            let mut first = None;
            let mut last = 0;

            // Bin 0 (DC) is left at zero
            for (bin, &m) in bin_mels.iter().enumerate().skip(1) {
                let rising = (m - lower) / (center - lower);
                let falling = (upper - m) / (upper - center);
                let w = rising.min(falling).max(0.0);
                if w > 0.0 {
                    weights[bin * n_mels + band] = w as f32;
                    first.get_or_insert(bin);
                    last = bin;
                }
            }

            support.push(match first {
                Some(first) => first..last + 1,
                None => 0..0,
            });
        }

        Self {
            num_bins,
            n_mels,
            weights,
            support,
        }
    }

    /// Number of spectrogram bins (matrix rows)
    pub fn num_bins(&self) -> usize {
        self.num_bins
    }

    /// Number of mel bands (matrix columns)
    pub fn n_mels(&self) -> usize {
        self.n_mels
    }

    /// Weight of spectrogram bin `bin` in band `band`
    pub fn weight(&self, bin: usize, band: usize) -> f32 {
        self.weights[bin * self.n_mels + band]
    }

    /// Range of bins with nonzero weight in `band`
    pub fn support(&self, band: usize) -> Range<usize> {
        self.support[band].clone()
    }

    /// Row-major `(num_bins × n_mels)` weight matrix
    pub fn as_slice(&self) -> &[f32] {
        &self.weights
    }

    /// Project one power-spectrum frame onto the mel bands
    ///
    /// Equivalent to the row-vector product `power · W`. Zero weights outside
    /// each band's support are skipped; accumulation runs in ascending bin
    /// order, so results are reproducible across calls.
    pub fn project(&self, power: &[f32], out: &mut [f32]) {
        debug_assert_eq!(power.len(), self.num_bins);
        debug_assert_eq!(out.len(), self.n_mels);

        for (band, slot) in out.iter_mut().enumerate() {
            let mut acc = 0.0f32;
            for bin in self.support[band].clone() {
                acc += power[bin] * self.weights[bin * self.n_mels + band];
            }
            *slot = acc;
        }
    }
}
