//! Genre classifier seam
//!
//! The trained model is opaque to this crate: anything that maps a feature
//! window to a probability vector over [`GENRES`] can be plugged in.

use std::time::Instant;

use crate::error::GenreError;
use crate::features::extractor::FeatureWindow;

use super::result::{Genre, Prediction, GENRES};

/// Inference function: feature window to per-genre probabilities
///
/// Implementations must be shareable across threads; the returned vector is
/// indexed like [`GENRES`].
pub trait GenreClassifier: Send + Sync {
    /// Probabilities for one `(128 × 256)` window
    fn predict(&self, window: &FeatureWindow) -> Result<Vec<f32>, GenreError>;
}

impl<F> GenreClassifier for F
where
    F: Fn(&FeatureWindow) -> Result<Vec<f32>, GenreError> + Send + Sync,
{
    fn predict(&self, window: &FeatureWindow) -> Result<Vec<f32>, GenreError> {
        self(window)
    }
}

/// Index of the largest value; the first one wins ties
fn argmax(values: &[f32]) -> Option<usize> {
    let mut best: Option<(usize, f32)> = None;
    for (i, &v) in values.iter().enumerate() {
        if best.map_or(true, |(_, b)| v > b) {
            best = Some((i, v));
        }
    }
    best.map(|(i, _)| i)
}

/// Turn a raw probability vector into a [`Prediction`]
///
/// # Errors
///
/// Returns `GenreError::InferenceError` unless the vector has exactly one
/// finite value per genre.
pub fn to_prediction(probs: &[f32], started: Instant) -> Result<Prediction, GenreError> {
    if probs.len() != GENRES.len() {
        return Err(GenreError::InferenceError(format!(
            "Expected {} probabilities, got {}",
            GENRES.len(),
            probs.len()
        )));
    }
    if probs.iter().any(|p| !p.is_finite()) {
        return Err(GenreError::InferenceError(
            "Classifier returned non-finite probabilities".to_string(),
        ));
    }

    let top = argmax(probs)
        .and_then(Genre::from_index)
        .ok_or_else(|| GenreError::InferenceError("Empty probability vector".to_string()))?;

    let latency_ms = started.elapsed().as_secs_f32() * 1000.0;

    Ok(Prediction {
        top,
        latency_ms,
        probs: GENRES.iter().copied().zip(probs.iter().copied()).collect(),
    })
}

/// Run `classifier` on `window` and build a [`Prediction`]
///
/// `started` marks the beginning of the request; latency covers everything
/// from then until the prediction is built.
pub fn classify(
    classifier: &dyn GenreClassifier,
    window: &FeatureWindow,
    started: Instant,
) -> Result<Prediction, GenreError> {
    let probs = classifier.predict(window)?;
    let prediction = to_prediction(&probs, started)?;

    log::debug!(
        "Classified window: top={} ({:.3}) in {:.1} ms",
        prediction.top,
        prediction.probability(prediction.top),
        prediction.latency_ms
    );

    Ok(prediction)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::features::extractor::FeatureExtractor;

    fn silent_window() -> FeatureWindow {
        FeatureExtractor::default().extract(&[])
    }

    #[test]
    fn test_argmax_first_wins() {
        assert_eq!(argmax(&[0.1, 0.4, 0.4, 0.1]), Some(1));
        assert_eq!(argmax(&[]), None);
        assert_eq!(argmax(&[0.5]), Some(0));
    }

    #[test]
    fn test_classify_with_closure() {
        let classifier = |_: &FeatureWindow| -> Result<Vec<f32>, GenreError> {
            let mut probs = vec![0.02f32; 10];
            probs[Genre::Metal.index()] = 0.82;
            Ok(probs)
        };

        let prediction = classify(&classifier, &silent_window(), Instant::now()).unwrap();
        assert_eq!(prediction.top, Genre::Metal);
        assert!((prediction.probability(Genre::Metal) - 0.82).abs() < 1e-6);
        assert_eq!(prediction.probs.len(), 10);
        assert!(prediction.latency_ms >= 0.0);
    }

    #[test]
    fn test_wrong_length_rejected() {
        let result = to_prediction(&[0.5, 0.5], Instant::now());
        assert!(matches!(result, Err(GenreError::InferenceError(_))));
    }

    #[test]
    fn test_non_finite_rejected() {
        let mut probs = vec![0.1f32; 10];
        probs[3] = f32::NAN;
        assert!(to_prediction(&probs, Instant::now()).is_err());
    }

    #[test]
    fn test_classifier_error_propagates() {
        let failing = |_: &FeatureWindow| -> Result<Vec<f32>, GenreError> {
            Err(GenreError::InferenceError("model offline".to_string()))
        };
        assert!(classify(&failing, &silent_window(), Instant::now()).is_err());
    }
}
