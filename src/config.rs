//! Configuration parameters for the genre feature pipeline
//!
//! The numeric constants below are part of the external contract with the
//! trained classifier: changing any of them produces feature windows the
//! model was never trained on.

use std::time::Duration;

use serde::{Deserialize, Serialize};

use crate::error::GenreError;

/// Target sample rate in Hz
pub const SAMPLE_RATE: u32 = 22050;

/// FFT length (and analysis frame length) in samples
pub const N_FFT: usize = 2048;

/// Hop between consecutive STFT frames in samples
pub const HOP_LENGTH: usize = 512;

/// Number of mel bands
pub const N_MELS: usize = 128;

/// Number of time frames in a feature window
pub const FRAMES: usize = 256;

/// Streaming window length in samples (`FRAMES * HOP_LENGTH`)
pub const WIN_SAMPLES: usize = FRAMES * HOP_LENGTH;

/// Maximum samples retained by a stream accumulator (3 windows)
pub const MAX_SAMPLES: usize = WIN_SAMPLES * 3;

/// Spectral feature parameters
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectrogramParams {
    /// Sample rate in Hz (default: 22050)
    pub sample_rate: u32,

    /// FFT length in samples (default: 2048)
    pub n_fft: usize,

    /// Hop length in samples (default: 512)
    pub hop_length: usize,

    /// Number of mel bands (default: 128)
    pub n_mels: usize,

    /// Output frame count (default: 256)
    pub frames: usize,

    /// Lower filterbank edge in Hz (default: 0.0)
    pub lower_edge_hz: f32,

    /// Upper filterbank edge in Hz (default: sample_rate / 2)
    pub upper_edge_hz: f32,
}

impl Default for SpectrogramParams {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            n_fft: N_FFT,
            hop_length: HOP_LENGTH,
            n_mels: N_MELS,
            frames: FRAMES,
            lower_edge_hz: 0.0,
            upper_edge_hz: SAMPLE_RATE as f32 / 2.0,
        }
    }
}

impl SpectrogramParams {
    /// Number of one-sided spectrogram bins (`n_fft / 2 + 1`)
    pub fn num_spectrogram_bins(&self) -> usize {
        self.n_fft / 2 + 1
    }

    /// Number of samples that yields exactly `frames` STFT frames
    pub fn window_samples(&self) -> usize {
        self.frames * self.hop_length
    }

    /// Check that the parameters describe a computable transform
    pub fn validate(&self) -> Result<(), GenreError> {
        if self.sample_rate == 0 {
            return Err(GenreError::InvalidInput(
                "Sample rate must be > 0".to_string(),
            ));
        }
        if self.n_fft < 2 || self.hop_length == 0 {
            return Err(GenreError::InvalidInput(format!(
                "FFT length must be >= 2 and hop > 0 (n_fft={}, hop={})",
                self.n_fft, self.hop_length
            )));
        }
        if self.n_mels == 0 || self.frames == 0 {
            return Err(GenreError::InvalidInput(format!(
                "Mel bands and frame count must be > 0 (n_mels={}, frames={})",
                self.n_mels, self.frames
            )));
        }
        let nyquist = self.sample_rate as f32 / 2.0;
        if self.lower_edge_hz < 0.0
            || self.lower_edge_hz >= self.upper_edge_hz
            || self.upper_edge_hz > nyquist
        {
            return Err(GenreError::InvalidInput(format!(
                "Invalid filterbank edges: lower={}, upper={}, nyquist={}",
                self.lower_edge_hz, self.upper_edge_hz, nyquist
            )));
        }
        Ok(())
    }
}

/// Stream accumulator configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct StreamConfig {
    /// Sample rate of pushed chunks in Hz (default: 22050)
    pub sample_rate: u32,

    /// Samples per feature window (default: 131072)
    pub win_samples: usize,

    /// Maximum retained samples, oldest dropped first (default: 393216)
    pub max_samples: usize,
}

impl Default for StreamConfig {
    fn default() -> Self {
        Self {
            sample_rate: SAMPLE_RATE,
            win_samples: WIN_SAMPLES,
            max_samples: MAX_SAMPLES,
        }
    }
}

impl StreamConfig {
    /// Check that a window can ever be produced
    pub fn validate(&self) -> Result<(), GenreError> {
        if self.sample_rate == 0 {
            return Err(GenreError::InvalidInput(
                "Sample rate must be > 0".to_string(),
            ));
        }
        if self.win_samples == 0 {
            return Err(GenreError::InvalidInput(
                "Window size must be > 0".to_string(),
            ));
        }
        if self.max_samples < self.win_samples {
            return Err(GenreError::InvalidInput(format!(
                "max_samples ({}) must be >= win_samples ({})",
                self.max_samples, self.win_samples
            )));
        }
        Ok(())
    }
}

/// Session registry configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct SessionConfig {
    /// Seconds of inactivity after which a session may be evicted (default: 300)
    pub idle_timeout_secs: u64,

    /// Upper bound on live sessions; `None` means unbounded (default: None)
    pub max_sessions: Option<usize>,
}

impl Default for SessionConfig {
    fn default() -> Self {
        Self {
            idle_timeout_secs: 300,
            max_sessions: None,
        }
    }
}

impl SessionConfig {
    /// Idle timeout as a `Duration`
    pub fn idle_timeout(&self) -> Duration {
        Duration::from_secs(self.idle_timeout_secs)
    }

    /// Check the session limits
    pub fn validate(&self) -> Result<(), GenreError> {
        if self.max_sessions == Some(0) {
            return Err(GenreError::InvalidInput(
                "max_sessions must be > 0 when set".to_string(),
            ));
        }
        Ok(())
    }
}

/// Smoothing of successive stream predictions
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SmoothingConfig {
    /// Weight of the newest prediction in the moving average (default: 0.25)
    pub alpha: f32,

    /// Probability lead a challenger needs over the shown genre (default: 0.08)
    pub margin: f32,

    /// Consecutive leading updates before the shown genre switches (default: 3)
    pub hold_frames: u32,
}

impl Default for SmoothingConfig {
    fn default() -> Self {
        Self {
            alpha: 0.25,
            margin: 0.08,
            hold_frames: 3,
        }
    }
}

impl SmoothingConfig {
    /// Check the smoothing factors
    pub fn validate(&self) -> Result<(), GenreError> {
        if self.alpha.is_nan() || self.alpha <= 0.0 || self.alpha > 1.0 {
            return Err(GenreError::InvalidInput(format!(
                "alpha must be in (0, 1], got {}",
                self.alpha
            )));
        }
        if self.margin.is_nan() || self.margin < 0.0 {
            return Err(GenreError::InvalidInput(format!(
                "margin must be >= 0, got {}",
                self.margin
            )));
        }
        if self.hold_frames == 0 {
            return Err(GenreError::InvalidInput(
                "hold_frames must be > 0".to_string(),
            ));
        }
        Ok(())
    }
}

/// Top-level pipeline configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct PipelineConfig {
    /// Feature extraction parameters
    pub spectrogram: SpectrogramParams,

    /// Per-session stream buffer parameters
    pub stream: StreamConfig,

    /// Session lifecycle parameters
    pub session: SessionConfig,

    /// Stream prediction smoothing
    pub smoothing: SmoothingConfig,
}

impl PipelineConfig {
    /// Parse a JSON configuration document and validate it
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json(json: &str) -> Result<Self, GenreError> {
        let config: PipelineConfig = serde_json::from_str(json)
            .map_err(|e| GenreError::InvalidInput(format!("Invalid config: {}", e)))?;
        config.validate()?;
        Ok(config)
    }

    /// Validate every section plus cross-section consistency
    pub fn validate(&self) -> Result<(), GenreError> {
        self.spectrogram.validate()?;
        self.stream.validate()?;
        self.session.validate()?;
        self.smoothing.validate()?;

        if self.stream.sample_rate != self.spectrogram.sample_rate {
            return Err(GenreError::InvalidInput(format!(
                "Stream sample rate ({}) differs from feature sample rate ({})",
                self.stream.sample_rate, self.spectrogram.sample_rate
            )));
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_contract_constants() {
        assert_eq!(WIN_SAMPLES, 131072);
        assert_eq!(MAX_SAMPLES, 393216);
        assert_eq!(SpectrogramParams::default().num_spectrogram_bins(), 1025);
        assert_eq!(SpectrogramParams::default().window_samples(), WIN_SAMPLES);
    }

    #[test]
    fn test_defaults_validate() {
        assert!(PipelineConfig::default().validate().is_ok());
    }

    #[test]
    fn test_stream_config_rejects_small_cap() {
        let config = StreamConfig {
            sample_rate: SAMPLE_RATE,
            win_samples: 1000,
            max_samples: 999,
        };
        assert!(config.validate().is_err());

        let config = StreamConfig {
            win_samples: 0,
            ..StreamConfig::default()
        };
        assert!(config.validate().is_err());
    }

    #[test]
    fn test_spectrogram_params_rejects_bad_edges() {
        let params = SpectrogramParams {
            upper_edge_hz: 20000.0,
            ..SpectrogramParams::default()
        };
        assert!(params.validate().is_err());

        let params = SpectrogramParams {
            hop_length: 0,
            ..SpectrogramParams::default()
        };
        assert!(params.validate().is_err());
    }

    #[test]
    fn test_from_json_partial() {
        let config =
            PipelineConfig::from_json(r#"{"session": {"idle_timeout_secs": 30, "max_sessions": 8}}"#)
                .unwrap();
        assert_eq!(config.session.idle_timeout(), Duration::from_secs(30));
        assert_eq!(config.session.max_sessions, Some(8));
        assert_eq!(config.stream, StreamConfig::default());
    }

    #[test]
    fn test_smoothing_config() {
        let config = PipelineConfig::from_json(r#"{"smoothing": {"hold_frames": 5}}"#).unwrap();
        assert_eq!(config.smoothing.hold_frames, 5);
        assert_eq!(config.smoothing.alpha, 0.25);

        assert!(PipelineConfig::from_json(r#"{"smoothing": {"alpha": 0.0}}"#).is_err());
        assert!(PipelineConfig::from_json(r#"{"smoothing": {"hold_frames": 0}}"#).is_err());
    }

    #[test]
    fn test_from_json_mismatched_rates() {
        let result = PipelineConfig::from_json(r#"{"stream": {"sample_rate": 16000}}"#);
        assert!(result.is_err());
    }
}
