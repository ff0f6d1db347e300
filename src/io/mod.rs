//! Audio I/O modules
//!
//! Container decoding using Symphonia.

pub mod decoder;

pub use decoder::{decode_audio_bytes, DecodedAudio};
