//! Audio decoding using Symphonia
//!
//! Turns raw container bytes (WAV, FLAC, OGG/Vorbis, MP3, ...) into
//! interleaved `f32` PCM plus the source sample rate. No channel mixing or
//! resampling happens here; see [`crate::preprocessing::waveform`].

use std::io::Cursor;

use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::errors::Error as SymphoniaError;
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;

use crate::error::GenreError;

/// Decoded PCM audio at its source sample rate
#[derive(Debug, Clone, PartialEq)]
pub struct DecodedAudio {
    /// Interleaved samples (`frame * channels + channel`)
    pub samples: Vec<f32>,

    /// Channel count (>= 1)
    pub channels: usize,

    /// Source sample rate in Hz
    pub sample_rate: u32,
}

impl DecodedAudio {
    /// Wrap mono samples
    pub fn mono(samples: Vec<f32>, sample_rate: u32) -> Self {
        Self {
            samples,
            channels: 1,
            sample_rate,
        }
    }

    /// Number of sample frames (samples per channel)
    pub fn frames(&self) -> usize {
        if self.channels == 0 {
            0
        } else {
            self.samples.len() / self.channels
        }
    }

    /// Duration in seconds
    pub fn duration_seconds(&self) -> f32 {
        if self.sample_rate == 0 {
            0.0
        } else {
            self.frames() as f32 / self.sample_rate as f32
        }
    }
}

/// Decode an in-memory audio container
///
/// # Arguments
///
/// * `bytes` - Raw container bytes
/// * `extension` - Optional file extension used as a probe hint (e.g. `"wav"`)
///
/// # Returns
///
/// Interleaved PCM with channel count and source sample rate
///
/// # Errors
///
/// Returns `GenreError::DecodingError` if the container is not recognised,
/// has no audio track, or a packet fails to decode for a reason other than
/// recoverable corruption.
pub fn decode_audio_bytes(
    bytes: &[u8],
    extension: Option<&str>,
) -> Result<DecodedAudio, GenreError> {
    log::debug!("Decoding {} bytes (hint: {:?})", bytes.len(), extension);

    if bytes.is_empty() {
        return Err(GenreError::DecodingError("Empty audio payload".to_string()));
    }

    let mss = MediaSourceStream::new(Box::new(Cursor::new(bytes.to_vec())), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = extension {
        hint.with_extension(ext);
    }

    let meta_opts: MetadataOptions = Default::default();
    let fmt_opts: FormatOptions = Default::default();

    let probed = symphonia::default::get_probe()
        .format(&hint, mss, &fmt_opts, &meta_opts)
        .map_err(|e| GenreError::DecodingError(format!("Unsupported container: {}", e)))?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or_else(|| GenreError::DecodingError("No supported audio tracks found".to_string()))?;

    let track_id = track.id;
    let mut sample_rate = track.codec_params.sample_rate;
    let mut channels = track.codec_params.channels.map(|c| c.count());

    let mut decoder = symphonia::default::get_codecs()
        .make(&track.codec_params, &DecoderOptions::default())
        .map_err(|e| GenreError::DecodingError(format!("Unsupported codec: {}", e)))?;

    let mut samples: Vec<f32> = Vec::new();
    let mut skipped_packets = 0usize;

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(SymphoniaError::IoError(e)) if e.kind() == std::io::ErrorKind::UnexpectedEof => {
                break;
            }
            Err(SymphoniaError::ResetRequired) => break,
            Err(e) => return Err(GenreError::DecodingError(e.to_string())),
        };

        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate.get_or_insert(spec.rate);
                channels.get_or_insert(spec.channels.count());

                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                samples.extend_from_slice(buffer.samples());
            }
            Err(SymphoniaError::DecodeError(e)) => {
                // Corrupted packet; keep going with the rest of the stream
                skipped_packets += 1;
                log::warn!("Skipping undecodable packet: {}", e);
            }
            Err(e) => return Err(GenreError::DecodingError(e.to_string())),
        }
    }

    let sample_rate = sample_rate
        .filter(|&sr| sr > 0)
        .ok_or_else(|| GenreError::DecodingError("Unknown sample rate".to_string()))?;
    let channels = channels
        .filter(|&ch| ch > 0)
        .ok_or_else(|| GenreError::DecodingError("Unknown channel layout".to_string()))?;

    log::debug!(
        "Decoded {} frames x {} channels at {} Hz ({} packets skipped)",
        samples.len() / channels,
        channels,
        sample_rate,
        skipped_packets
    );

    Ok(DecodedAudio {
        samples,
        channels,
        sample_rate,
    })
}
