//! Rolling sample accumulator for streamed audio
//!
//! Chunks are appended in arrival order. The buffer is capped at
//! `max_samples` by dropping the oldest samples, and once at least
//! `win_samples` are held every push yields a copy of the most recent
//! `win_samples` samples.
//!
//! An accumulator is single-writer state: callers that share one across
//! threads must serialize pushes (see [`crate::stream::session`]).

use crate::config::StreamConfig;
use crate::error::GenreError;

/// Result of pushing a chunk
#[derive(Debug, Clone, PartialEq)]
pub enum PushOutcome {
    /// The most recent `win_samples` samples, owned by the caller
    Ready(Vec<f32>),
    /// Not enough audio yet
    NotReady {
        /// Additional samples required to fill one window
        needed_samples: usize,
    },
}

impl PushOutcome {
    /// True for `Ready`
    pub fn is_ready(&self) -> bool {
        matches!(self, PushOutcome::Ready(_))
    }
}

/// Bounded rolling buffer of mono samples
#[derive(Debug, Clone)]
pub struct StreamAccumulator {
    config: StreamConfig,
    buffer: Vec<f32>,
}

impl StreamAccumulator {
    /// Create an empty accumulator
    ///
    /// # Errors
    ///
    /// Returns `GenreError::InvalidInput` if the configuration is invalid.
    pub fn new(config: StreamConfig) -> Result<Self, GenreError> {
        config.validate()?;
        Ok(Self {
            config,
            buffer: Vec::with_capacity(config.max_samples),
        })
    }

    /// Configuration fixed at construction
    pub fn config(&self) -> &StreamConfig {
        &self.config
    }

    /// Samples currently held
    pub fn len(&self) -> usize {
        self.buffer.len()
    }

    /// True when nothing has been buffered
    pub fn is_empty(&self) -> bool {
        self.buffer.is_empty()
    }

    /// Samples still missing before the first window (0 once ready)
    pub fn needed_samples(&self) -> usize {
        self.config.win_samples.saturating_sub(self.buffer.len())
    }

    /// Buffered samples, oldest first
    pub fn samples(&self) -> &[f32] {
        &self.buffer
    }

    /// Drop all buffered audio, keeping the configuration
    pub fn reset(&mut self) {
        log::debug!("Resetting stream accumulator ({} samples dropped)", self.buffer.len());
        self.buffer.clear();
    }

    /// Append a chunk and report whether a window is available
    ///
    /// # Arguments
    ///
    /// * `chunk` - Mono samples at the configured rate (may be empty)
    ///
    /// # Returns
    ///
    /// `Ready` with a copy of the last `win_samples` samples, or `NotReady`
    /// with the exact sample deficit.
    pub fn push(&mut self, chunk: &[f32]) -> PushOutcome {
        self.buffer.extend_from_slice(chunk);

        if self.buffer.len() > self.config.max_samples {
            let excess = self.buffer.len() - self.config.max_samples;
            self.buffer.drain(..excess);
        }

        log::debug!(
            "Pushed {} samples, buffer at {}/{} (window {})",
            chunk.len(),
            self.buffer.len(),
            self.config.max_samples,
            self.config.win_samples
        );

        if self.buffer.len() >= self.config.win_samples {
            let start = self.buffer.len() - self.config.win_samples;
            PushOutcome::Ready(self.buffer[start..].to_vec())
        } else {
            PushOutcome::NotReady {
                needed_samples: self.needed_samples(),
            }
        }
    }
}
