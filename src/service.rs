//! Clip and chunk prediction service
//!
//! Ties together the feature pipeline, the per-session stream registry and
//! a classifier. Transport (HTTP, WebSocket, ...) is left to the caller:
//! every entry point takes raw container bytes and returns a serializable
//! response.
//!
//! # Example
//!
//! ```no_run
//! use std::sync::Arc;
//! use genre_dsp::{GenreError, GenreService, FeatureWindow, PipelineConfig};
//!
//! let classifier = Arc::new(|_: &FeatureWindow| -> Result<Vec<f32>, GenreError> {
//!     Ok(vec![0.1; 10])
//! });
//! let service = GenreService::new(PipelineConfig::default(), classifier)?;
//!
//! let bytes = std::fs::read("clip.wav").unwrap();
//! let prediction = service.predict_clip(&bytes, Some("wav"))?;
//! println!("{}", prediction.top);
//! # Ok::<(), genre_dsp::GenreError>(())
//! ```

use std::sync::Arc;
use std::time::Instant;

use crate::analysis::classifier::{classify, GenreClassifier};
use crate::analysis::result::{ChunkResponse, Prediction};
use crate::config::PipelineConfig;
use crate::error::GenreError;
use crate::features::extractor::FeatureExtractor;
use crate::io::decoder::{decode_audio_bytes, DecodedAudio};
use crate::pipeline::{FeaturePipeline, StreamFeatures};
use crate::stream::session::SessionRegistry;

/// Genre prediction for whole clips and live streams
pub struct GenreService {
    pipeline: FeaturePipeline,
    sessions: SessionRegistry,
    classifier: Arc<dyn GenreClassifier>,
}

impl GenreService {
    /// Build a service; the mel filterbank is computed here, once
    ///
    /// # Errors
    ///
    /// Returns `GenreError::InvalidInput` if the configuration is invalid.
    pub fn new(
        config: PipelineConfig,
        classifier: Arc<dyn GenreClassifier>,
    ) -> Result<Self, GenreError> {
        config.validate()?;

        let extractor = Arc::new(FeatureExtractor::new(config.spectrogram)?);
        let sessions = SessionRegistry::new(config.stream, config.session)?;

        log::info!(
            "Genre service ready: {} Hz, {} mel bands x {} frames, window {} samples",
            config.spectrogram.sample_rate,
            config.spectrogram.n_mels,
            config.spectrogram.frames,
            config.stream.win_samples
        );

        Ok(Self {
            pipeline: FeaturePipeline::new(extractor),
            sessions,
            classifier,
        })
    }

    /// Feature pipeline shared by all requests
    pub fn pipeline(&self) -> &FeaturePipeline {
        &self.pipeline
    }

    /// Stream session registry
    pub fn sessions(&self) -> &SessionRegistry {
        &self.sessions
    }

    /// Classify a complete clip
    ///
    /// # Errors
    ///
    /// Decoding, resampling and inference errors are passed through.
    pub fn predict_clip(
        &self,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<Prediction, GenreError> {
        let started = Instant::now();
        let window = self.pipeline.decode_clip(bytes, extension)?;
        classify(self.classifier.as_ref(), &window, started)
    }

    /// Classify an already-normalized mono waveform at the model rate
    pub fn predict_waveform(&self, waveform: &[f32]) -> Result<Prediction, GenreError> {
        let started = Instant::now();
        let window = self.pipeline.clip_to_features(waveform);
        classify(self.classifier.as_ref(), &window, started)
    }

    /// Feed one encoded chunk into `session_id` and classify when ready
    ///
    /// # Errors
    ///
    /// Decoding, resampling, session-limit and inference errors are passed
    /// through. A decoding failure leaves the session untouched.
    pub fn predict_chunk(
        &self,
        session_id: &str,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<ChunkResponse, GenreError> {
        let started = Instant::now();
        let chunk = decode_audio_bytes(bytes, extension)?;
        self.predict_chunk_audio_since(session_id, &chunk, started)
    }

    /// Feed one decoded chunk into `session_id` and classify when ready
    pub fn predict_chunk_audio(
        &self,
        session_id: &str,
        chunk: &DecodedAudio,
    ) -> Result<ChunkResponse, GenreError> {
        self.predict_chunk_audio_since(session_id, chunk, Instant::now())
    }

    fn predict_chunk_audio_since(
        &self,
        session_id: &str,
        chunk: &DecodedAudio,
        started: Instant,
    ) -> Result<ChunkResponse, GenreError> {
        let handle = self.sessions.get_or_create(session_id)?;

        // Held for the whole push + extract so one session is never interleaved
        let features = {
            let mut session = handle.lock();
            self.pipeline.chunk_to_features(&mut session, chunk)?
        };

        match features {
            StreamFeatures::Ready(window) => {
                let prediction = classify(self.classifier.as_ref(), &window, started)?;
                Ok(ChunkResponse::ready(prediction))
            }
            StreamFeatures::NotReady { needed_samples } => {
                Ok(ChunkResponse::not_ready(needed_samples))
            }
        }
    }

    /// Clear a session's buffered audio; `false` if unknown
    pub fn reset_session(&self, session_id: &str) -> bool {
        self.sessions.reset(session_id)
    }

    /// Drop a session entirely; `false` if unknown
    pub fn end_session(&self, session_id: &str) -> bool {
        self.sessions.remove(session_id)
    }

    /// Evict idle sessions, returning how many were dropped
    pub fn evict_idle_sessions(&self) -> usize {
        self.sessions.evict_idle()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::analysis::result::Genre;
    use crate::config::{SpectrogramParams, StreamConfig, SAMPLE_RATE};
    use crate::features::extractor::FeatureWindow;

    fn small_config() -> PipelineConfig {
        let spectrogram = SpectrogramParams {
            n_fft: 64,
            hop_length: 16,
            n_mels: 8,
            frames: 10,
            ..SpectrogramParams::default()
        };
        PipelineConfig {
            spectrogram,
            stream: StreamConfig {
                sample_rate: SAMPLE_RATE,
                win_samples: 160,
                max_samples: 480,
            },
            ..PipelineConfig::default()
        }
    }

    fn always(genre: Genre) -> Arc<dyn GenreClassifier> {
        Arc::new(move |_: &FeatureWindow| -> Result<Vec<f32>, GenreError> {
            let mut probs = vec![0.0f32; 10];
            probs[genre.index()] = 1.0;
            Ok(probs)
        })
    }

    #[test]
    fn test_chunks_until_ready() {
        let service = GenreService::new(small_config(), always(Genre::Reggae)).unwrap();
        let chunk = DecodedAudio::mono(vec![0.1; 100], SAMPLE_RATE);

        let first = service.predict_chunk_audio("mic-1", &chunk).unwrap();
        assert_eq!(first, ChunkResponse::not_ready(60));

        let second = service.predict_chunk_audio("mic-1", &chunk).unwrap();
        assert!(second.ready);
        assert_eq!(second.prediction.unwrap().top, Genre::Reggae);

        // Another client starts from an empty buffer
        let other = service.predict_chunk_audio("mic-2", &chunk).unwrap();
        assert!(!other.ready);
    }

    #[test]
    fn test_predict_waveform() {
        let service = GenreService::new(small_config(), always(Genre::Blues)).unwrap();
        let prediction = service.predict_waveform(&[0.0; 10]).unwrap();
        assert_eq!(prediction.top, Genre::Blues);
    }

    #[test]
    fn test_bad_chunk_leaves_session_untouched() {
        let service = GenreService::new(small_config(), always(Genre::Pop)).unwrap();
        let chunk = DecodedAudio::mono(vec![0.1; 100], SAMPLE_RATE);
        service.predict_chunk_audio("mic", &chunk).unwrap();

        assert!(service.predict_chunk("mic", b"garbage", Some("wav")).is_err());
        let handle = service.sessions().get_or_create("mic").unwrap();
        assert_eq!(handle.lock().len(), 100);
    }

    #[test]
    fn test_session_lifecycle() {
        let service = GenreService::new(small_config(), always(Genre::Pop)).unwrap();
        let chunk = DecodedAudio::mono(vec![0.1; 100], SAMPLE_RATE);
        service.predict_chunk_audio("mic", &chunk).unwrap();

        assert!(service.reset_session("mic"));
        assert_eq!(
            service.predict_chunk_audio("mic", &chunk).unwrap(),
            ChunkResponse::not_ready(60)
        );
        assert!(service.end_session("mic"));
        assert!(!service.end_session("mic"));
        assert_eq!(service.evict_idle_sessions(), 0);
    }
}
