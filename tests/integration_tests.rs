//! Integration tests for the genre feature pipeline

use std::io::Cursor;
use std::sync::Arc;

use genre_dsp::{
    chunk_to_features, clip_to_features, decode_audio_bytes, ChunkResponse, FeatureExtractor,
    FeaturePipeline, FeatureWindow, Genre, GenreError, GenreService, PipelineConfig,
    PushOutcome, StreamAccumulator, StreamConfig, StreamFeatures,
};

/// Encode interleaved f32 samples as a 16-bit PCM WAV in memory
fn wav_bytes(samples: &[f32], channels: u16, sample_rate: u32) -> Vec<u8> {
    let spec = hound::WavSpec {
        channels,
        sample_rate,
        bits_per_sample: 16,
        sample_format: hound::SampleFormat::Int,
    };
    let mut cursor = Cursor::new(Vec::new());
    {
        let mut writer = hound::WavWriter::new(&mut cursor, spec).unwrap();
        for &s in samples {
            writer.write_sample((s * i16::MAX as f32) as i16).unwrap();
        }
        writer.finalize().unwrap();
    }
    cursor.into_inner()
}

fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
    (0..len)
        .map(|i| (2.0 * std::f32::consts::PI * freq * i as f32 / sample_rate as f32).sin() * 0.5)
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_clip_shape_for_any_length() {
        let extractor = FeatureExtractor::default();
        for len in [0usize, 1, 2047, 22050, 131072, 22050 * 30] {
            let window = clip_to_features(&extractor, &sine(440.0, 22050, len));
            assert_eq!(window.shape(), (128, 256), "length {}", len);
            assert!(window.is_finite());
        }
    }

    #[test]
    fn test_silence_is_all_zero() {
        let extractor = FeatureExtractor::default();
        let window = clip_to_features(&extractor, &vec![0.0; 131072]);
        assert!(window.as_slice().iter().all(|&v| v == 0.0));
    }

    #[test]
    fn test_normalized_statistics() {
        let extractor = FeatureExtractor::default();
        let window = clip_to_features(&extractor, &sine(1000.0, 22050, 131072));
        assert!(window.mean().abs() < 1e-3);
        assert!((window.std() - 1.0).abs() < 1e-3);
    }

    #[test]
    fn test_accumulator_fills_over_three_chunks() {
        let mut acc = StreamAccumulator::new(StreamConfig::default()).unwrap();

        assert_eq!(
            acc.push(&vec![0.1; 50000]),
            PushOutcome::NotReady {
                needed_samples: 81072
            }
        );
        assert_eq!(
            acc.push(&vec![0.2; 50000]),
            PushOutcome::NotReady {
                needed_samples: 31072
            }
        );

        match acc.push(&vec![0.3; 31072]) {
            PushOutcome::Ready(window) => {
                assert_eq!(window.len(), 131072);
                assert_eq!(window[0], 0.1);
                assert_eq!(window[131071], 0.3);
            }
            other => panic!("Expected a full window, got {:?}", other),
        }
    }

    #[test]
    fn test_accumulator_drops_oldest_samples() {
        let mut acc = StreamAccumulator::new(StreamConfig::default()).unwrap();
        let ramp: Vec<f32> = (0..400_000).map(|i| i as f32).collect();

        match acc.push(&ramp) {
            PushOutcome::Ready(window) => {
                assert_eq!(window.len(), 131072);
                assert_eq!(window[131071], 399_999.0);
            }
            other => panic!("Expected a full window, got {:?}", other),
        }
        assert_eq!(acc.len(), 393216);
        assert_eq!(acc.samples()[0], (400_000 - 393216) as f32);
    }

    #[test]
    fn test_stream_matches_clip_with_default_params() {
        let extractor = FeatureExtractor::default();
        let mut acc = StreamAccumulator::new(StreamConfig::default()).unwrap();
        let audio = sine(220.0, 22050, 131072);

        let mut last = None;
        for chunk in audio.chunks(22050) {
            last = Some(chunk_to_features(&extractor, &mut acc, chunk));
        }

        match last {
            Some(StreamFeatures::Ready(window)) => {
                assert_eq!(window, clip_to_features(&extractor, &audio));
            }
            other => panic!("Expected a window, got {:?}", other),
        }
    }

    #[test]
    fn test_stereo_wav_clip_end_to_end() {
        let mono = sine(440.0, 44100, 44100 * 2);
        let stereo: Vec<f32> = mono.iter().flat_map(|&s| [s, s * 0.5]).collect();
        let bytes = wav_bytes(&stereo, 2, 44100);

        let decoded = decode_audio_bytes(&bytes, Some("wav")).unwrap();
        assert_eq!(decoded.channels, 2);
        assert_eq!(decoded.sample_rate, 44100);

        let pipeline = FeaturePipeline::default();
        let waveform = pipeline.normalize(&decoded).unwrap();
        assert_eq!(waveform.len(), 44100);

        let window = pipeline.clip_to_features(&waveform);
        assert_eq!(window.shape(), (128, 256));
        assert!(window.is_finite());
    }

    #[test]
    fn test_service_streams_wav_chunks() {
        let classifier = Arc::new(|window: &FeatureWindow| -> Result<Vec<f32>, GenreError> {
            assert_eq!(window.shape(), (128, 256));
            let mut probs = vec![0.01f32; 10];
            probs[Genre::Classical.index()] = 0.91;
            Ok(probs)
        });
        let service = GenreService::new(PipelineConfig::default(), classifier).unwrap();

        // Three seconds per chunk at the model rate; the second chunk fills the window
        let chunk = wav_bytes(&sine(330.0, 22050, 22050 * 3), 1, 22050);
        let first = service.predict_chunk("client", &chunk, Some("wav")).unwrap();
        assert_eq!(first, ChunkResponse::not_ready(131072 - 66150));

        let second = service.predict_chunk("client", &chunk, Some("wav")).unwrap();
        assert!(second.ready);
        assert_eq!(second.prediction.unwrap().top, Genre::Classical);
        assert_eq!(service.sessions().len(), 1);

        let clip = wav_bytes(&sine(330.0, 22050, 22050 * 5), 1, 22050);
        let prediction = service.predict_clip(&clip, Some("wav")).unwrap();
        assert_eq!(prediction.top, Genre::Classical);
    }

    #[test]
    fn test_config_from_json() {
        let config = PipelineConfig::from_json(r#"{"session": {"idle_timeout_secs": 60}}"#).unwrap();
        assert_eq!(config.session.idle_timeout_secs, 60);
        assert_eq!(config.spectrogram.n_mels, 128);
        assert_eq!(config.stream.win_samples, 131072);

        assert!(PipelineConfig::from_json(r#"{"spectrogram": {"hop_length": 0}}"#).is_err());
    }
}
