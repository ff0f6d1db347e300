//! Analysis window functions

use std::f64::consts::PI;

/// Periodic Hann window of length `size`
///
/// `w[n] = 0.5 - 0.5 * cos(2πn / size)`, i.e. the DFT-even variant whose
/// last sample is not forced back to zero. Evaluated in f64 and stored as f32.
pub fn hann_window(size: usize) -> Vec<f32> {
    (0..size)
        .map(|n| (0.5 - 0.5 * (2.0 * PI * n as f64 / size as f64).cos()) as f32)
        .collect()
}
