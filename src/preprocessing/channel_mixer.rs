//! Channel mixing utilities (multi-channel to mono conversion)

use crate::error::GenreError;

/// Average interleaved multi-channel samples down to mono
///
/// Each output sample is the arithmetic mean of one frame's channels.
/// Mono input is returned unchanged.
///
/// # Arguments
///
/// * `interleaved` - Samples laid out as `frame * channels + channel`
/// * `channels` - Channel count (must be > 0)
///
/// # Returns
///
/// Mono samples, one per frame
///
/// # Errors
///
/// Returns `GenreError::InvalidInput` if `channels == 0` or the sample count
/// is not a multiple of the channel count.
pub fn downmix_to_mono(interleaved: &[f32], channels: usize) -> Result<Vec<f32>, GenreError> {
    if channels == 0 {
        return Err(GenreError::InvalidInput(
            "Channel count must be > 0".to_string(),
        ));
    }

    if interleaved.len() % channels != 0 {
        return Err(GenreError::InvalidInput(format!(
            "{} samples is not a whole number of {}-channel frames",
            interleaved.len(),
            channels
        )));
    }

    if channels == 1 {
        return Ok(interleaved.to_vec());
    }

    log::debug!(
        "Downmixing {} frames from {} channels to mono",
        interleaved.len() / channels,
        channels
    );

    let scale = channels as f32;
    Ok(interleaved
        .chunks_exact(channels)
        .map(|frame| frame.iter().sum::<f32>() / scale)
        .collect())
}
