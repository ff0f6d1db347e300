//! Example: Replay an audio file as a live stream of short chunks
//!
//! Usage:
//!   cargo run --release --example simulate_stream -- <file> [--chunk-ms 1000]
//!
//! The file is decoded once, normalized to the model rate, then pushed into a
//! session chunk by chunk. Each response is printed as one JSON line, the
//! same shape a WebSocket endpoint would send, followed by the smoothed
//! genre a live display would show.

use std::env;
use std::sync::Arc;

use genre_dsp::config::SAMPLE_RATE;
use genre_dsp::{
    DecodedAudio, FeatureWindow, GenreError, GenreService, PipelineConfig, PredictionSmoother,
};

fn uniform(_: &FeatureWindow) -> Result<Vec<f32>, GenreError> {
    Ok(vec![0.1; 10])
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut chunk_ms: u32 = 1000;
    let mut path: Option<String> = None;

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--chunk-ms" => {
                chunk_ms = args
                    .first()
                    .ok_or("--chunk-ms requires a value")?
                    .parse::<u32>()?
                    .max(1);
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!("Usage: simulate_stream <file> [--chunk-ms N]");
                return Ok(());
            }
            _ => path = Some(a),
        }
    }

    let path = path.ok_or("Provide an audio file path. Use --help for usage.")?;
    let extension = std::path::Path::new(&path)
        .extension()
        .and_then(|e| e.to_str())
        .map(str::to_string);
    let bytes = std::fs::read(&path)?;

    let config = PipelineConfig::default();
    let mut smoother = PredictionSmoother::new(&config.smoothing);
    let service = GenreService::new(config, Arc::new(uniform))?;

    let decoded = genre_dsp::decode_audio_bytes(&bytes, extension.as_deref())?;
    let waveform = service.pipeline().normalize(&decoded)?;
    let chunk_len = (SAMPLE_RATE as usize * chunk_ms as usize / 1000).max(1);

    eprintln!(
        "Streaming {:.1} s in {} ms chunks ({} samples each)",
        waveform.len() as f32 / SAMPLE_RATE as f32,
        chunk_ms,
        chunk_len
    );

    for chunk in waveform.chunks(chunk_len) {
        let audio = DecodedAudio::mono(chunk.to_vec(), SAMPLE_RATE);
        let response = service.predict_chunk_audio("replay", &audio)?;
        println!("{}", serde_json::to_string(&response)?);
        if let Some(smoothed) = response.prediction.as_ref().and_then(|p| smoother.update(p)) {
            println!("{}", serde_json::to_string(&smoothed)?);
        }
    }

    service.end_session("replay");
    Ok(())
}
