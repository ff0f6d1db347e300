//! Example: Extract feature windows for many files in parallel
//!
//! Usage:
//!   cargo run --release --example batch_features -- [--jobs N] [--json] <file1> <file2> ...
//!
//! Notes:
//! - Parallelism is across files. The extractor (and its filterbank) is built
//!   once and shared by every worker.
//! - Default workers: (available CPU threads - 1), keeping one core free for the system.

use std::env;
use std::time::Instant;

use genre_dsp::FeaturePipeline;
use rayon::prelude::*;
use serde::Serialize;

#[derive(Debug, Serialize)]
struct ItemOut {
    file: String,
    ok: bool,
    #[serde(skip_serializing_if = "Option::is_none")]
    duration_seconds: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    mean: Option<f32>,
    #[serde(skip_serializing_if = "Option::is_none")]
    std: Option<f32>,
    processing_ms: f32,
    #[serde(skip_serializing_if = "Option::is_none")]
    error: Option<String>,
}

fn default_jobs() -> usize {
    let n = std::thread::available_parallelism().map(|v| v.get()).unwrap_or(1);
    std::cmp::max(1, n.saturating_sub(1))
}

fn process(pipeline: &FeaturePipeline, path: &str) -> ItemOut {
    let t0 = Instant::now();
    let extension = std::path::Path::new(path)
        .extension()
        .and_then(|e| e.to_str());

    let result = std::fs::read(path)
        .map_err(|e| format!("read failed: {e}"))
        .and_then(|bytes| {
            let decoded = genre_dsp::decode_audio_bytes(&bytes, extension)
                .map_err(|e| format!("decode failed: {e}"))?;
            let waveform = pipeline
                .normalize(&decoded)
                .map_err(|e| format!("normalize failed: {e}"))?;
            Ok((decoded.duration_seconds(), pipeline.clip_to_features(&waveform)))
        });

    let processing_ms = t0.elapsed().as_secs_f32() * 1000.0;
    match result {
        Ok((duration, window)) => ItemOut {
            file: path.to_string(),
            ok: true,
            duration_seconds: Some(duration),
            mean: Some(window.mean()),
            std: Some(window.std()),
            processing_ms,
            error: None,
        },
        Err(e) => ItemOut {
            file: path.to_string(),
            ok: false,
            duration_seconds: None,
            mean: None,
            std: None,
            processing_ms,
            error: Some(e),
        },
    }
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();

    let mut json = false;
    let mut jobs: Option<usize> = None;
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--jobs" => {
                let v = args
                    .first()
                    .ok_or("--jobs requires a value")?
                    .parse::<usize>()?;
                args.remove(0);
                jobs = Some(std::cmp::max(1, v));
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: batch_features [--jobs N] [--json] <file1> <file2> ...\n\
                     \n\
                     --jobs N   Parallel workers (default: CPU-1)\n\
                     --json     Emit one JSON object per line (JSONL)\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.is_empty() {
        eprintln!("ERROR: Provide at least one audio file path. Use --help for usage.");
        std::process::exit(2);
    }

    let jobs = jobs.unwrap_or_else(default_jobs);
    eprintln!("Batch: {} files, jobs={}", paths.len(), jobs);

    let pipeline = FeaturePipeline::default();

    let t0 = Instant::now();
    let pool = rayon::ThreadPoolBuilder::new().num_threads(jobs).build()?;
    let outs: Vec<ItemOut> =
        pool.install(|| paths.par_iter().map(|p| process(&pipeline, p)).collect());

    if json {
        for o in &outs {
            println!("{}", serde_json::to_string(o)?);
        }
    } else {
        for o in &outs {
            match (&o.error, o.mean, o.std) {
                (None, Some(mean), Some(std)) => println!(
                    "{}: {:.1} s, mean {:.4}, std {:.4} ({:.1} ms)",
                    o.file,
                    o.duration_seconds.unwrap_or(0.0),
                    mean,
                    std,
                    o.processing_ms
                ),
                (Some(e), _, _) => println!("{}: ERROR {}", o.file, e),
                _ => println!("{}: no features", o.file),
            }
        }
    }

    let ok = outs.iter().filter(|o| o.ok).count();
    eprintln!(
        "Done: {}/{} ok in {:.2} s",
        ok,
        outs.len(),
        t0.elapsed().as_secs_f32()
    );

    Ok(())
}
