//! Short-time Fourier transform with pad-to-cover framing
//!
//! Frames start every `hop` samples from sample 0. The frame count is
//! `ceil(len / hop)` (zero for an empty signal), and any frame that runs
//! past the end of the signal is zero-padded, so every input sample lands in
//! at least one frame and no incomplete tail is dropped. There is no
//! centring or reflection padding at the start.
//!
//! Each frame is multiplied by a periodic Hann window of length `n_fft` and
//! transformed with a forward FFT of the same length; only the one-sided
//! power spectrum (`n_fft / 2 + 1` bins of `|X|²`) is kept.

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use super::window::hann_window;

/// Number of pad-to-cover frames for a signal of `len` samples
pub fn num_frames(len: usize, hop: usize) -> usize {
    if len == 0 {
        0
    } else {
        len.div_ceil(hop)
    }
}

/// Planned STFT: window and FFT are built once and reused for every frame
#[derive(Clone)]
pub struct Stft {
    n_fft: usize,
    hop: usize,
    window: Vec<f32>,
    fft: Arc<dyn Fft<f32>>,
}

impl std::fmt::Debug for Stft {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Stft")
            .field("n_fft", &self.n_fft)
            .field("hop", &self.hop)
            .finish()
    }
}

/// Per-call scratch space so frames can be computed without reallocating
pub struct StftScratch {
    buffer: Vec<Complex<f32>>,
    fft_scratch: Vec<Complex<f32>>,
}

impl Stft {
    /// Plan an STFT with frame/FFT length `n_fft` and hop `hop`
    pub fn new(n_fft: usize, hop: usize) -> Self {
        let mut planner = FftPlanner::new();
        let fft = planner.plan_fft_forward(n_fft);
        Self {
            n_fft,
            hop,
            window: hann_window(n_fft),
            fft,
        }
    }

    /// FFT length
    pub fn n_fft(&self) -> usize {
        self.n_fft
    }

    /// Hop length
    pub fn hop(&self) -> usize {
        self.hop
    }

    /// One-sided bin count (`n_fft / 2 + 1`)
    pub fn num_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Allocate scratch buffers sized for this plan
    pub fn scratch(&self) -> StftScratch {
        StftScratch {
            buffer: vec![Complex::new(0.0, 0.0); self.n_fft],
            fft_scratch: vec![Complex::new(0.0, 0.0); self.fft.get_inplace_scratch_len()],
        }
    }

    /// Power spectrum of frame `index` of `samples`, written into `power`
    ///
    /// `power` must hold `num_bins()` values. Samples past the end of the
    /// signal are treated as zeros.
    pub fn power_frame(
        &self,
        samples: &[f32],
        index: usize,
        scratch: &mut StftScratch,
        power: &mut [f32],
    ) {
        debug_assert_eq!(power.len(), self.num_bins());

        let start = index * self.hop;
        let available = samples.len().saturating_sub(start).min(self.n_fft);

        for (j, slot) in scratch.buffer.iter_mut().enumerate() {
            let x = if j < available { samples[start + j] } else { 0.0 };
            *slot = Complex::new(x * self.window[j], 0.0);
        }

        self.fft
            .process_with_scratch(&mut scratch.buffer, &mut scratch.fft_scratch);

        for (slot, c) in power.iter_mut().zip(scratch.buffer.iter()) {
            *slot = c.norm_sqr();
        }
    }

    /// Full power spectrogram, row-major `(frames × num_bins)`
    ///
    /// At most `max_frames` leading frames are computed when given.
    #[cfg(test)]
    fn power_spectrogram(&self, samples: &[f32], max_frames: Option<usize>) -> Vec<Vec<f32>> {
        let total = num_frames(samples.len(), self.hop);
        let frames = max_frames.map_or(total, |m| total.min(m));

        let mut scratch = self.scratch();
        (0..frames)
            .map(|t| {
                let mut power = vec![0.0f32; self.num_bins()];
                self.power_frame(samples, t, &mut scratch, &mut power);
                power
            })
            .collect()
    }
}
