//! Clip and stream feature pipelines
//!
//! Both paths share one [`WaveformNormalizer`] and one [`FeatureExtractor`],
//! so a stream window and a clip with the same samples produce identical
//! feature windows:
//!
//! ```text
//! Clip:   decoded audio → normalize → extract
//! Stream: decoded chunk → normalize → accumulator.push → (ready) extract
//! ```

use std::sync::Arc;

use crate::error::GenreError;
use crate::features::extractor::{FeatureExtractor, FeatureWindow};
use crate::io::decoder::{decode_audio_bytes, DecodedAudio};
use crate::preprocessing::waveform::WaveformNormalizer;
use crate::stream::accumulator::StreamAccumulator;

/// Result of feeding one chunk into a stream
#[derive(Debug, Clone, PartialEq)]
pub enum StreamFeatures {
    /// A full window was available and has been extracted
    Ready(FeatureWindow),
    /// The session needs more audio first
    NotReady {
        /// Additional samples required to fill one window
        needed_samples: usize,
    },
}

/// Shared clip/stream feature pipeline
#[derive(Debug, Clone)]
pub struct FeaturePipeline {
    extractor: Arc<FeatureExtractor>,
    normalizer: WaveformNormalizer,
}

impl Default for FeaturePipeline {
    fn default() -> Self {
        Self::new(Arc::new(FeatureExtractor::default()))
    }
}

impl FeaturePipeline {
    /// Build a pipeline around a shared extractor
    ///
    /// Waveforms are normalized to the extractor's sample rate.
    pub fn new(extractor: Arc<FeatureExtractor>) -> Self {
        let normalizer = WaveformNormalizer::new(extractor.params().sample_rate);
        Self {
            extractor,
            normalizer,
        }
    }

    /// Shared extractor
    pub fn extractor(&self) -> &Arc<FeatureExtractor> {
        &self.extractor
    }

    /// Downmix and resample decoded audio to the model rate
    pub fn normalize(&self, audio: &DecodedAudio) -> Result<Vec<f32>, GenreError> {
        self.normalizer.normalize(audio)
    }

    /// Features for a whole, already-normalized clip
    ///
    /// Stateless; short clips are padded and long clips truncated by the
    /// extractor itself.
    pub fn clip_to_features(&self, waveform: &[f32]) -> FeatureWindow {
        log::debug!("Clip pipeline: {} samples", waveform.len());
        self.extractor.extract(waveform)
    }

    /// Decode, normalize and extract a whole clip
    ///
    /// # Errors
    ///
    /// Returns `GenreError::DecodingError` or `GenreError::ResamplingError`
    /// from the collaborators; extraction itself cannot fail.
    pub fn decode_clip(
        &self,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<FeatureWindow, GenreError> {
        let decoded = decode_audio_bytes(bytes, extension)?;
        let waveform = self.normalize(&decoded)?;
        Ok(self.clip_to_features(&waveform))
    }

    /// Push an already-normalized waveform chunk into `session`
    ///
    /// The chunk must be mono at the session's sample rate.
    pub fn push_waveform(&self, session: &mut StreamAccumulator, waveform: &[f32]) -> StreamFeatures {
        let features = crate::chunk_to_features(&self.extractor, session, waveform);
        if let StreamFeatures::NotReady { needed_samples } = &features {
            log::debug!("Stream pipeline: {} samples still needed", needed_samples);
        }
        features
    }

    /// Normalize a decoded chunk and feed it into `session`
    ///
    /// # Errors
    ///
    /// Returns `GenreError::InvalidInput` if the session runs at a different
    /// sample rate than this pipeline, or a normalization error.
    pub fn chunk_to_features(
        &self,
        session: &mut StreamAccumulator,
        chunk: &DecodedAudio,
    ) -> Result<StreamFeatures, GenreError> {
        let session_rate = session.config().sample_rate;
        if session_rate != self.normalizer.target_rate() {
            return Err(GenreError::InvalidInput(format!(
                "Session sample rate {} Hz does not match pipeline rate {} Hz",
                session_rate,
                self.normalizer.target_rate()
            )));
        }

        let waveform = self.normalize(chunk)?;
        Ok(self.push_waveform(session, &waveform))
    }

    /// Decode a chunk payload and feed it into `session`
    pub fn decode_chunk(
        &self,
        session: &mut StreamAccumulator,
        bytes: &[u8],
        extension: Option<&str>,
    ) -> Result<StreamFeatures, GenreError> {
        let decoded = decode_audio_bytes(bytes, extension)?;
        self.chunk_to_features(session, &decoded)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::{SpectrogramParams, StreamConfig, SAMPLE_RATE};

    fn tone(len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (i as f32 * 0.031).sin() * 0.5 + (i as f32 * 0.17).cos() * 0.1)
            .collect()
    }

    fn small_pipeline() -> (FeaturePipeline, StreamAccumulator) {
        let params = SpectrogramParams {
            sample_rate: SAMPLE_RATE,
            n_fft: 64,
            hop_length: 16,
            n_mels: 8,
            frames: 10,
            lower_edge_hz: 0.0,
            upper_edge_hz: SAMPLE_RATE as f32 / 2.0,
        };
        let extractor = Arc::new(FeatureExtractor::new(params).unwrap());
        let accumulator = StreamAccumulator::new(StreamConfig {
            sample_rate: SAMPLE_RATE,
            win_samples: params.window_samples(),
            max_samples: params.window_samples() * 3,
        })
        .unwrap();
        (FeaturePipeline::new(extractor), accumulator)
    }

    #[test]
    fn test_stream_matches_clip() {
        let (pipeline, mut session) = small_pipeline();
        let clip = tone(160);

        let mut result = None;
        for chunk in clip.chunks(30) {
            let audio = DecodedAudio::mono(chunk.to_vec(), SAMPLE_RATE);
            result = Some(pipeline.chunk_to_features(&mut session, &audio).unwrap());
        }

        match result {
            Some(StreamFeatures::Ready(window)) => {
                assert_eq!(window, pipeline.clip_to_features(&clip));
            }
            other => panic!("Expected a window, got {:?}", other),
        }
    }

    #[test]
    fn test_not_ready_reports_deficit() {
        let (pipeline, mut session) = small_pipeline();
        let audio = DecodedAudio::mono(tone(100), SAMPLE_RATE);
        assert_eq!(
            pipeline.chunk_to_features(&mut session, &audio).unwrap(),
            StreamFeatures::NotReady { needed_samples: 60 }
        );
    }

    #[test]
    fn test_stereo_chunk_is_downmixed() {
        let (pipeline, mut session) = small_pipeline();
        let mono = tone(160);
        let stereo: Vec<f32> = mono.iter().flat_map(|&x| [x, x]).collect();
        let audio = DecodedAudio {
            samples: stereo,
            channels: 2,
            sample_rate: SAMPLE_RATE,
        };

        match pipeline.chunk_to_features(&mut session, &audio).unwrap() {
            StreamFeatures::Ready(window) => assert_eq!(window, pipeline.clip_to_features(&mono)),
            other => panic!("Expected a window, got {:?}", other),
        }
    }

    #[test]
    fn test_rate_mismatch_rejected() {
        let (pipeline, _) = small_pipeline();
        let mut session = StreamAccumulator::new(StreamConfig {
            sample_rate: 16000,
            win_samples: 160,
            max_samples: 480,
        })
        .unwrap();
        let audio = DecodedAudio::mono(tone(10), SAMPLE_RATE);
        assert!(pipeline.chunk_to_features(&mut session, &audio).is_err());
    }

    #[test]
    fn test_trimmed_stream_matches_clip_of_latest_window() {
        let (pipeline, mut session) = small_pipeline();
        let win = session.config().win_samples;
        let max = session.config().max_samples;
        let audio = tone(max + 3 * win + 7);

        let mut last = None;
        for chunk in audio.chunks(70) {
            last = Some(pipeline.push_waveform(&mut session, chunk));
        }
        assert_eq!(session.len(), max);

        match last {
            Some(StreamFeatures::Ready(window)) => {
                let latest = &audio[audio.len() - win..];
                assert_eq!(window, pipeline.clip_to_features(latest));
            }
            other => panic!("Expected a window, got {:?}", other),
        }
    }

    #[test]
    fn test_resampled_chunks_fill_window_like_whole_clip() {
        let (pipeline, mut session) = small_pipeline();
        // 320 samples at twice the model rate -> 160 samples, one window
        let source: Vec<f32> = tone(320);
        let whole = pipeline
            .normalize(&DecodedAudio::mono(source.clone(), SAMPLE_RATE * 2))
            .unwrap();
        assert_eq!(whole.len(), 160);

        let mut last = None;
        for chunk in source.chunks(80) {
            let audio = DecodedAudio::mono(chunk.to_vec(), SAMPLE_RATE * 2);
            last = Some(pipeline.chunk_to_features(&mut session, &audio).unwrap());
        }
        assert_eq!(session.len(), whole.len());
        assert!(matches!(last, Some(StreamFeatures::Ready(_))));
    }

    #[test]
    fn test_clip_of_any_length() {
        let (pipeline, _) = small_pipeline();
        assert_eq!(pipeline.clip_to_features(&[]).shape(), (8, 10));
        assert_eq!(pipeline.clip_to_features(&tone(5000)).shape(), (8, 10));
    }
}
