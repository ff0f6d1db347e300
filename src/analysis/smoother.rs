//! Smoothing of successive stream predictions
//!
//! A live stream produces one prediction per ready chunk, and raw
//! per-window probabilities flicker between neighbouring genres. Two stages
//! steady the output:
//!
//! 1. Exponential moving average per genre, renormalized to sum 1:
//!    `s = alpha * p + (1 - alpha) * s`. The first update is taken as-is.
//! 2. Stable top selection: the shown genre only changes when a challenger
//!    leads it by at least `margin` for `hold_frames` consecutive updates.
//!    Any update where the challenger falls short resets the count.
//!
//! Both stages are per stream; call [`PredictionSmoother::reset`] when the
//! stream restarts.

use std::collections::BTreeMap;

use serde::Serialize;

use crate::config::SmoothingConfig;

use super::result::{Genre, Prediction};

/// Highest probability; the first genre in label order wins ties
fn leader(probs: &BTreeMap<Genre, f32>) -> Option<(Genre, f32)> {
    let mut best: Option<(Genre, f32)> = None;
    for (&genre, &p) in probs {
        if best.map_or(true, |(_, b)| p > b) {
            best = Some((genre, p));
        }
    }
    best
}

/// Per-genre exponential moving average
#[derive(Debug, Clone, PartialEq)]
pub struct EmaSmoother {
    alpha: f32,
    state: Option<BTreeMap<Genre, f32>>,
}

impl EmaSmoother {
    /// Create a smoother weighting each new update by `alpha`
    pub fn new(alpha: f32) -> Self {
        Self { alpha, state: None }
    }

    /// Fold `probs` into the average and return the smoothed distribution
    pub fn update(&mut self, probs: &BTreeMap<Genre, f32>) -> &BTreeMap<Genre, f32> {
        let alpha = self.alpha;
        let state = match self.state.take() {
            None => probs.clone(),
            Some(mut state) => {
                for (&genre, &p) in probs {
                    let prev = state.get(&genre).copied().unwrap_or(0.0);
                    state.insert(genre, alpha * p + (1.0 - alpha) * prev);
                }

                let sum: f32 = state.values().sum();
                let sum = if sum == 0.0 { 1.0 } else { sum };
                for p in state.values_mut() {
                    *p /= sum;
                }
                state
            }
        };
        self.state.insert(state)
    }

    /// Current average, if any update has been seen
    pub fn state(&self) -> Option<&BTreeMap<Genre, f32>> {
        self.state.as_ref()
    }

    /// Forget all history
    pub fn reset(&mut self) {
        self.state = None;
    }
}

/// Hysteresis on the displayed top genre
#[derive(Debug, Clone, PartialEq)]
pub struct StableTop {
    margin: f32,
    hold_frames: u32,
    current: Option<Genre>,
    streak: u32,
}

impl StableTop {
    /// Create a selector with the given switching margin and hold length
    pub fn new(margin: f32, hold_frames: u32) -> Self {
        Self {
            margin,
            hold_frames,
            current: None,
            streak: 0,
        }
    }

    /// Genre currently shown
    pub fn current(&self) -> Option<Genre> {
        self.current
    }

    /// Feed one distribution and return the genre to show
    ///
    /// Returns `None` only while no update has produced a leader.
    pub fn update(&mut self, probs: &BTreeMap<Genre, f32>) -> Option<Genre> {
        let (best, best_p) = leader(probs)?;

        let current = match self.current {
            None => {
                self.current = Some(best);
                self.streak = 0;
                return self.current;
            }
            Some(current) => current,
        };

        if best == current {
            self.streak = 0;
            return self.current;
        }

        let current_p = probs.get(&current).copied().unwrap_or(0.0);
        if best_p >= current_p + self.margin {
            self.streak += 1;
            if self.streak >= self.hold_frames {
                log::debug!(
                    "Stable top switched {} -> {} after {} updates",
                    current,
                    best,
                    self.streak
                );
                self.current = Some(best);
                self.streak = 0;
            }
        } else {
            self.streak = 0;
        }

        self.current
    }

    /// Forget the shown genre and any pending challenge
    pub fn reset(&mut self) {
        self.current = None;
        self.streak = 0;
    }
}

/// Smoothed view of a stream's latest prediction
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SmoothedPrediction {
    /// Genre to display, after hysteresis
    pub top: Genre,

    /// Highest smoothed probability right now (may differ from `top`)
    pub leader: Genre,

    /// Smoothed probability per genre, summing to 1
    pub probs: BTreeMap<Genre, f32>,
}

/// Moving average plus stable top selection for one stream
#[derive(Debug, Clone, PartialEq)]
pub struct PredictionSmoother {
    ema: EmaSmoother,
    stable: StableTop,
}

impl Default for PredictionSmoother {
    fn default() -> Self {
        Self::new(&SmoothingConfig::default())
    }
}

impl PredictionSmoother {
    /// Create a smoother from configuration
    pub fn new(config: &SmoothingConfig) -> Self {
        Self {
            ema: EmaSmoother::new(config.alpha),
            stable: StableTop::new(config.margin, config.hold_frames),
        }
    }

    /// Fold in the next prediction of the stream
    ///
    /// Returns `None` only for a prediction without probabilities.
    pub fn update(&mut self, prediction: &Prediction) -> Option<SmoothedPrediction> {
        let probs = self.ema.update(&prediction.probs).clone();
        let (leader, _) = leader(&probs)?;
        let top = self.stable.update(&probs)?;
        Some(SmoothedPrediction { top, leader, probs })
    }

    /// Start over, e.g. when the stream's session is reset
    pub fn reset(&mut self) {
        self.ema.reset();
        self.stable.reset();
    }
}
