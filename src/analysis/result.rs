//! Similarity result types

use serde::{Deserialize, Serialize};

use crate::metrics::MetricKey;

/// Similarity of one candidate under one metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct MetricScore {
    /// Metric that produced the score (kind plus configuration)
    pub metric: MetricKey,

    /// Similarity in `[0, 1]`
    pub score: f32,
}

/// Aggregate similarity of one candidate to the reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct CandidateScore {
    /// Position in the candidate list
    pub index: usize,

    /// Candidate name, if the signal carries one
    pub name: Option<String>,

    /// Arithmetic mean of the per-metric scores
    pub score: f32,

    /// Per-metric scores, in the order the metrics were requested
    pub metric_scores: Vec<MetricScore>,
}

/// Candidate most similar to the reference
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct BestMatch {
    /// Position in the candidate list
    pub index: usize,

    /// Candidate name, if the signal carries one
    pub name: Option<String>,

    /// Mean similarity across the requested metrics
    pub score: f32,
}

impl From<&CandidateScore> for BestMatch {
    fn from(candidate: &CandidateScore) -> Self {
        Self {
            index: candidate.index,
            name: candidate.name.clone(),
            score: candidate.score,
        }
    }
}
