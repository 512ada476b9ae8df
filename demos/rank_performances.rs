//! Example: rank recorded performances against a reference
//!
//! Usage:
//!   cargo run --release --example rank_performances -- [--metrics LIST] [--sequential] [--json] <reference> <candidate1> <candidate2> ...
//!
//! Notes:
//! - `LIST` is a comma-separated subset of chroma,dynamics,onset_offset,tempo_variation,timbre
//!   (default: all five).
//! - Every file is decoded and analyzed once, even if it is named several times.

use perfprint::{
    AnalysisConfig, ChromaMetric, DynamicsMetric, Metric, OnsetOffsetMetric, Signal, SignalCache,
    SimilarityEngine, TempoVariationMetric, TimbreMetric,
};
use std::env;
use std::fs::File;
use std::time::Instant;
use symphonia::core::audio::SampleBuffer;
use symphonia::core::codecs::{DecoderOptions, CODEC_TYPE_NULL};
use symphonia::core::formats::FormatOptions;
use symphonia::core::io::MediaSourceStream;
use symphonia::core::meta::MetadataOptions;
use symphonia::core::probe::Hint;
use symphonia::default::get_probe;

/// Decode any symphonia-supported file to a mono signal
fn decode_audio_file(path: &str) -> Result<Signal, Box<dyn std::error::Error>> {
    let src = File::open(path)?;
    let mss = MediaSourceStream::new(Box::new(src), Default::default());

    let mut hint = Hint::new();
    if let Some(ext) = std::path::Path::new(path).extension().and_then(|e| e.to_str()) {
        hint.with_extension(ext);
    }

    let probed = get_probe().format(
        &hint,
        mss,
        &FormatOptions::default(),
        &MetadataOptions::default(),
    )?;
    let mut format = probed.format;

    let track = format
        .tracks()
        .iter()
        .find(|t| t.codec_params.codec != CODEC_TYPE_NULL)
        .ok_or("No supported audio tracks found")?;

    let track_id = track.id;
    let mut decoder =
        symphonia::default::get_codecs().make(&track.codec_params, &DecoderOptions::default())?;

    let mut sample_rate = track.codec_params.sample_rate.unwrap_or(44100);
    let mut channels = track.codec_params.channels.map(|c| c.count()).unwrap_or(1);
    let mut interleaved: Vec<f32> = Vec::new();

    loop {
        let packet = match format.next_packet() {
            Ok(packet) => packet,
            Err(_) => break,
        };
        if packet.track_id() != track_id {
            continue;
        }

        match decoder.decode(&packet) {
            Ok(decoded) => {
                let spec = *decoded.spec();
                sample_rate = spec.rate;
                channels = spec.channels.count();
                let mut buffer = SampleBuffer::<f32>::new(decoded.capacity() as u64, spec);
                buffer.copy_interleaved_ref(decoded);
                interleaved.extend_from_slice(buffer.samples());
            }
            Err(symphonia::core::errors::Error::DecodeError(_)) => continue,
            Err(e) => return Err(Box::new(e)),
        }
    }

    Ok(Signal::from_interleaved(&interleaved, channels, sample_rate)?.with_name(path))
}

fn parse_metrics(list: &str) -> Result<Vec<Metric>, Box<dyn std::error::Error>> {
    list.split(',')
        .map(|name| match name.trim() {
            "chroma" => Ok(Metric::Chroma(ChromaMetric::default())),
            "dynamics" => Ok(Metric::Dynamics(DynamicsMetric::default())),
            "onset_offset" => Ok(Metric::OnsetOffset(OnsetOffsetMetric::default())),
            "tempo_variation" => Ok(Metric::TempoVariation(TempoVariationMetric::default())),
            "timbre" => Ok(Metric::Timbre(TimbreMetric::default())),
            other => Err(format!("Unknown metric '{}'", other).into()),
        })
        .collect()
}

fn main() -> Result<(), Box<dyn std::error::Error>> {
    env_logger::init();

    let mut args: Vec<String> = env::args().skip(1).collect();
    let mut json = false;
    let mut config = AnalysisConfig::default();
    let mut metrics = Metric::all();
    let mut paths: Vec<String> = Vec::new();

    while let Some(a) = args.first().cloned() {
        args.remove(0);
        match a.as_str() {
            "--json" => json = true,
            "--sequential" => config.parallel = false,
            "--metrics" => {
                let list = args.first().ok_or("--metrics requires a value")?;
                metrics = parse_metrics(list)?;
                args.remove(0);
            }
            "--help" | "-h" => {
                eprintln!(
                    "Usage: rank_performances [--metrics LIST] [--sequential] [--json] <reference> <candidate> ...\n\
                     \n\
                     --metrics LIST  Comma-separated metrics (default: all)\n\
                     --sequential    Compute features on the calling thread only\n\
                     --json          Emit the ranking as JSON\n"
                );
                return Ok(());
            }
            _ => paths.push(a),
        }
    }

    if paths.len() < 2 {
        eprintln!("ERROR: Provide a reference and at least one candidate. Use --help for usage.");
        std::process::exit(2);
    }

    let t0 = Instant::now();
    let cache = SignalCache::new(config.tempo.clone())?;
    let engine = SimilarityEngine::new(config)?;

    let reference = cache.get_or_insert_with(&paths[0], || {
        decode_audio_file(&paths[0]).map_err(|e| perfprint::AnalysisError::InvalidInput(e.to_string()))
    })?;
    let candidates = paths[1..]
        .iter()
        .map(|path| {
            cache.get_or_insert_with(path, || {
                decode_audio_file(path)
                    .map_err(|e| perfprint::AnalysisError::InvalidInput(e.to_string()))
            })
        })
        .collect::<Result<Vec<_>, _>>()?;
    eprintln!(
        "Decoded {} recordings in {:.1} ms",
        cache.len(),
        t0.elapsed().as_secs_f64() * 1000.0
    );

    let mut ranking = engine.rank_candidates(&reference, &candidates, &metrics)?;
    ranking.sort_by(|a, b| b.score.partial_cmp(&a.score).unwrap_or(std::cmp::Ordering::Equal));

    if json {
        println!("{}", serde_json::to_string_pretty(&ranking)?);
    } else {
        println!("Reference: {}", reference.name());
        if let Ok(tempo) = reference.global_tempo() {
            println!("  Global tempo: {:.1} BPM", tempo.bpm);
        }
        for (rank, candidate) in ranking.iter().enumerate() {
            println!(
                "{:>3}. {:.4}  {}",
                rank + 1,
                candidate.score,
                candidate.name.as_deref().unwrap_or("<unnamed>")
            );
            for metric in &candidate.metric_scores {
                println!("       {:<16} {:.4}", metric.metric.kind.to_string(), metric.score);
            }
        }
    }
    eprintln!("Total: {:.1} ms", t0.elapsed().as_secs_f64() * 1000.0);

    Ok(())
}
