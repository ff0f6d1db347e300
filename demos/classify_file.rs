//! Example: Extract features from a single audio file and classify it
//!
//! Usage:
//!   cargo run --release --example classify_file -- <file> [--model model.onnx] [--json]
//!
//! Without `--model` (or without the `ml` feature) a spectral-centroid
//! heuristic stands in for the trained classifier, so the pipeline can be
//! exercised end to end without model weights.

use std::env;
use std::sync::Arc;
use std::time::Instant;

use genre_dsp::{classify, FeaturePipeline, FeatureWindow, GenreClassifier, GenreError};

/// Stand-in classifier: brighter spectra lean towards metal/rock,
/// darker ones towards classical/jazz
fn centroid_heuristic(window: &FeatureWindow) -> Result<Vec<f32>, GenreError> {
    let (n_mels, _) = window.shape();
    let mut weighted = 0.0f32;
    let mut total = 0.0f32;
    for mel in 0..n_mels {
        let energy: f32 = window.row(mel).iter().map(|v| v.max(0.0)).sum();
        weighted += energy * mel as f32;
        total += energy;
    }
    let brightness = if total > 0.0 {
        weighted / (total * n_mels as f32)
    } else {
        0.0
    };

    // Order: blues classical country disco hiphop jazz metal pop reggae rock
    let centres = [0.30, 0.15, 0.30, 0.45, 0.40, 0.20, 0.60, 0.45, 0.35, 0.55];
    let scores: Vec<f32> = centres
        .iter()
        .map(|c: &f32| (-(brightness - c).powi(2) / 0.01).exp())
        .collect();
    let sum: f32 = scores.iter().sum::<f32>().max(f32::EPSILON);
    Ok(scores.iter().map(|s| s / sum).collect())
}

fn load_classifier(model: Option<&str>) -> Result<Arc<dyn GenreClassifier>, Box<dyn std::error::Error>> {
    match model {
        #[cfg(feature = "ml")]
        Some(path) => Ok(Arc::new(genre_dsp::ml::OnnxGenreModel::load(path, None)?)),
        #[cfg(not(feature = "ml"))]
        Some(_) => Err("--model requires the `ml` feature".into()),
        None => Ok(Arc::new(centroid_heuristic)),
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    // Initialize logger
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut json = false;
    let mut model: Option<String> = None;
    let mut path: Option<String> = None;

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--model" => {
                model = Some(args.first().ok_or("--model requires a path")?.clone());
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!("Usage: classify_file <file> [--model model.onnx] [--json]");
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

    let classifier = load_classifier(model.as_deref())?;
    let pipeline = FeaturePipeline::default();

    let started = Instant::now();
    let window = pipeline.decode_clip(&bytes, extension.as_deref())?;
    let prediction = classify(classifier.as_ref(), &window, started)?;

    if json {
        println!("{}", serde_json::to_string(&prediction)?);
        return Ok(());
    }

    println!("File: {}", path);
    println!(
        "  Features: {} mel x {} frames (mean {:.4}, std {:.4})",
        window.n_mels(),
        window.frames(),
        window.mean(),
        window.std()
    );
    println!("  Top genre: {}", prediction.top);
    for (genre, p) in prediction.ranked().iter().take(3) {
        println!("    {:<10} {:.3}", genre, p);
    }
    println!("  Latency: {:.2} ms", prediction.latency_ms);

    Ok(())
}
