//! # perfprint
//!
//! Performance fingerprinting: decide which of several recordings of a piece
//! most resembles a reference recording.
//!
//! ## Features
//!
//! - **Rhythm analysis**: log mel-band onset strength, global tempo by
//!   prior-weighted autocorrelation, dynamic-programming beat tracking
//! - **Metrics**: tempo variation, onset offsets, chroma, dynamics and timbre,
//!   each scored in `[0, 1]` with `exp(-MSE)`
//! - **Similarity engine**: at-most-once feature caching per signal, parallel
//!   candidate analysis, per-metric breakdown and best-match selection
//!
//! ## Quick Start
//!
//! ```no_run
//! use perfprint::{find_most_similar, AnalysisConfig, Metric, Signal};
//!
//! // Decoded mono recordings
//! let reference = Signal::new(vec![0.0f32; 44100 * 10], 44100)?.with_name("reference");
//! let candidates = vec![
//!     Signal::new(vec![0.0f32; 44100 * 10], 44100)?.with_name("take-1"),
//!     Signal::new(vec![0.0f32; 44100 * 10], 44100)?.with_name("take-2"),
//! ];
//!
//! let best = find_most_similar(&reference, &candidates, &Metric::all(), AnalysisConfig::default())?;
//! println!("Most similar: #{} (score {:.3})", best.index, best.score);
//! # Ok::<(), perfprint::AnalysisError>(())
//! ```
//!
//! ## Architecture
//!
//! ```text
//! Signal → AnalyzedSignal ─┬→ Rhythm (onset function → global tempo → beats)
//!                          └→ Feature per Metric (cached by MetricKey)
//!                                  ↓
//!                  SimilarityEngine → CandidateScore → BestMatch
//! ```

#![warn(missing_docs)]
#![warn(clippy::all)]

pub mod analysis;
pub mod config;
pub mod error;
pub mod features;
pub mod io;
pub mod metrics;
pub mod preprocessing;

// Re-export main types
pub use analysis::{
    metric_combinations, AnalyzedSignal, BestMatch, CandidateScore, MetricScore, Rhythm,
    SignalCache, SimilarityEngine,
};
pub use config::{AnalysisConfig, TempoConfig};
pub use error::AnalysisError;
pub use io::{Signal, TimeIndex};
pub use metrics::{
    ChromaMetric, DynamicsMetric, Feature, Metric, MetricKey, MetricKind, OffsetComparison,
    OnsetOffsetMetric, TempoVariationMetric, TimbreMetric,
};

/// Find the candidate recording most similar to `reference`
///
/// Binds every signal to `config.tempo`, computes the requested features
/// (on the rayon pool when `config.parallel` is set) and returns the
/// candidate with the highest mean similarity. The first candidate wins ties.
///
/// # Arguments
///
/// * `reference` - Recording to match against
/// * `candidates` - Recordings to rank, in a fixed order
/// * `metrics` - Metrics to average; see [`Metric::all`]
/// * `config` - Analysis configuration
///
/// # Returns
///
/// Index, name and mean score of the best candidate
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for an empty candidate or metric list
/// or a signal too short to analyse, naming the failing signal and metric
pub fn find_most_similar(
    reference: &Signal,
    candidates: &[Signal],
    metrics: &[Metric],
    config: AnalysisConfig,
) -> Result<BestMatch, AnalysisError> {
    log::debug!(
        "Finding most similar of {} candidates to '{}'",
        candidates.len(),
        reference.display_name()
    );

    let engine = SimilarityEngine::new(config)?;
    let reference = engine.analyze(reference.clone())?;
    let candidates = candidates
        .iter()
        .map(|signal| engine.analyze(signal.clone()))
        .collect::<Result<Vec<_>, _>>()?;
    engine.find_most_similar(&reference, &candidates, metrics)
}
