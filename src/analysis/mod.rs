//! Per-signal caching and similarity evaluation
//!
//! - [`AnalyzedSignal`]: a signal with its rhythm and feature caches
//! - [`SignalCache`]: run-scoped registry of analyzed signals
//! - [`SimilarityEngine`]: per-candidate aggregation and best-match selection
//! - Result types

pub mod analyzed;
pub mod cache;
pub mod engine;
pub mod result;

pub use analyzed::{AnalyzedSignal, Rhythm};
pub use cache::SignalCache;
pub use engine::{metric_combinations, SimilarityEngine};
pub use result::{BestMatch, CandidateScore, MetricScore};
