//! Audio resampling using rubato

use rubato::{
    Resampler as RubatoResampler, SincFixedIn, SincInterpolationParameters,
    SincInterpolationType, WindowFunction,
};

use crate::error::GenreError;

/// Sinc interpolation length in input samples
const SINC_LEN: usize = 256;

/// Output length for `len` input samples: `ceil(len * to_sr / from_sr)`
pub fn resampled_len(len: usize, from_sr: u32, to_sr: u32) -> usize {
    (len as u64 * to_sr as u64).div_ceil(from_sr.max(1) as u64) as usize
}

/// Resample mono audio from one sample rate to another
///
/// Uses a single band-limited sinc pass over the whole buffer, then flushes
/// the filter's lookahead with silence so the final samples are not lost.
/// The result always holds [`resampled_len`] samples, aligned with the input.
/// Matching rates and empty input are returned as-is.
///
/// # Errors
///
/// Returns `GenreError::ResamplingError` if either rate is zero or rubato
/// rejects the conversion.
pub fn resample(samples: &[f32], from_sr: u32, to_sr: u32) -> Result<Vec<f32>, GenreError> {
    if from_sr == 0 || to_sr == 0 {
        return Err(GenreError::ResamplingError(format!(
            "Invalid sample rates: {} -> {}",
            from_sr, to_sr
        )));
    }

    if from_sr == to_sr || samples.is_empty() {
        return Ok(samples.to_vec());
    }

    let expected = resampled_len(samples.len(), from_sr, to_sr);

    log::debug!(
        "Resampling {} samples: {} Hz -> {} Hz ({} out)",
        samples.len(),
        from_sr,
        to_sr,
        expected
    );

    let params = SincInterpolationParameters {
        sinc_len: SINC_LEN,
        f_cutoff: 0.95,
        interpolation: SincInterpolationType::Linear,
        oversampling_factor: 256,
        window: WindowFunction::BlackmanHarris2,
    };

    let mut resampler = SincFixedIn::<f32>::new(
        to_sr as f64 / from_sr as f64,
        2.0,
        params,
        samples.len(),
        1,
    )
    .map_err(|e| GenreError::ResamplingError(e.to_string()))?;

    let input = vec![samples.to_vec()];
    let mut output = resampler
        .process(&input, None)
        .map_err(|e| GenreError::ResamplingError(e.to_string()))?
        .into_iter()
        .next()
        .unwrap_or_default();

    // The last SINC_LEN / 2 input samples are still inside the filter; push
    // silent chunks until they have come out. Tiny buffers may need several.
    let mut flushes = 0;
    while output.len() < expected && flushes <= SINC_LEN {
        let tail = resampler
            .process_partial(None::<&[Vec<f32>]>, None)
            .map_err(|e| GenreError::ResamplingError(e.to_string()))?;
        output.extend(tail.into_iter().next().unwrap_or_default());
        flushes += 1;
    }

    output.resize(expected, 0.0);
    Ok(output)
}
