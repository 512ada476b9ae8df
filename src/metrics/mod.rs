//! Performance metrics
//!
//! Five feature extractors, each paired with a similarity score in `[0, 1]`:
//!
//! | Metric | Feature |
//! |---|---|
//! | [`ChromaMetric`] | per-window pitch class profile |
//! | [`DynamicsMetric`] | per-window weighted loudness in dB |
//! | [`OnsetOffsetMetric`] | note-onset distance from the expected beat |
//! | [`TempoVariationMetric`] | smoothed inter-beat intervals |
//! | [`TimbreMetric`] | pitch-normalised MFCCs at every beat |
//!
//! Every score is `exp(-MSE)` of the aligned features, so identical features
//! score exactly 1.0. Sequences of different length are truncated to the
//! shorter one; an empty comparison scores 0.0.

pub mod chroma;
pub mod dynamics;
pub mod onset_offset;
pub mod tempo_variation;
pub mod timbre;

pub use chroma::ChromaMetric;
pub use dynamics::DynamicsMetric;
pub use onset_offset::{OffsetComparison, OnsetOffset, OnsetOffsetMetric};
pub use tempo_variation::TempoVariationMetric;
pub use timbre::TimbreMetric;

use std::fmt;

use serde::{Deserialize, Serialize};

use crate::analysis::AnalyzedSignal;
use crate::error::AnalysisError;

/// Feature extractor plus pairwise similarity
pub trait MetricCalculator {
    /// Per-signal feature value
    type Feature;

    /// Metric family
    const KIND: MetricKind;

    /// Configuration as bit patterns, part of the feature cache key
    fn key_params(&self) -> Vec<u32>;

    /// Extract the feature of `signal`
    fn compute(&self, signal: &AnalyzedSignal) -> Result<Self::Feature, AnalysisError>;

    /// Similarity of two features in `[0, 1]`; symmetric in its arguments
    fn similarity(
        &self,
        a: &AnalyzedSignal,
        b: &AnalyzedSignal,
        feature_a: &Self::Feature,
        feature_b: &Self::Feature,
    ) -> Result<f32, AnalysisError>;
}

/// Metric family, without configuration
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
pub enum MetricKind {
    /// Pitch class profile at the beats
    Chroma,
    /// Weighted loudness over time
    Dynamics,
    /// Note onsets against expected beats
    OnsetOffset,
    /// Inter-beat interval curve
    TempoVariation,
    /// MFCCs at the beats
    Timbre,
}

impl fmt::Display for MetricKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            MetricKind::Chroma => "Chroma",
            MetricKind::Dynamics => "Dynamics",
            MetricKind::OnsetOffset => "OnsetOffset",
            MetricKind::TempoVariation => "TempoVariation",
            MetricKind::Timbre => "Timbre",
        };
        f.write_str(name)
    }
}

/// Feature cache key: metric family plus its full configuration
///
/// Two differently configured metrics of the same kind never share a key.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct MetricKey {
    /// Metric family
    pub kind: MetricKind,

    /// Configuration fields (`f32::to_bits` for floats)
    pub params: Vec<u32>,
}

/// Feature value of any metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Feature {
    /// Normalised pitch class profile per window
    Chroma(Vec<[f32; 12]>),
    /// Weighted loudness (dB) per window
    Dynamics(Vec<f32>),
    /// Offset entry per expected beat
    OnsetOffset(Vec<OnsetOffset>),
    /// Smoothed inter-beat intervals (seconds)
    TempoVariation(Vec<f32>),
    /// MFCC vector per beat
    Timbre(Vec<Vec<f32>>),
}

impl Feature {
    /// Metric family that produced this feature
    pub fn kind(&self) -> MetricKind {
        match self {
            Feature::Chroma(_) => MetricKind::Chroma,
            Feature::Dynamics(_) => MetricKind::Dynamics,
            Feature::OnsetOffset(_) => MetricKind::OnsetOffset,
            Feature::TempoVariation(_) => MetricKind::TempoVariation,
            Feature::Timbre(_) => MetricKind::Timbre,
        }
    }

    /// Number of entries (windows or beats)
    pub fn len(&self) -> usize {
        match self {
            Feature::Chroma(v) => v.len(),
            Feature::Dynamics(v) => v.len(),
            Feature::OnsetOffset(v) => v.len(),
            Feature::TempoVariation(v) => v.len(),
            Feature::Timbre(v) => v.len(),
        }
    }

    /// True if the feature has no entries
    pub fn is_empty(&self) -> bool {
        self.len() == 0
    }
}

/// A configured metric
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub enum Metric {
    /// See [`ChromaMetric`]
    Chroma(ChromaMetric),
    /// See [`DynamicsMetric`]
    Dynamics(DynamicsMetric),
    /// See [`OnsetOffsetMetric`]
    OnsetOffset(OnsetOffsetMetric),
    /// See [`TempoVariationMetric`]
    TempoVariation(TempoVariationMetric),
    /// See [`TimbreMetric`]
    Timbre(TimbreMetric),
}

impl Metric {
    /// All five metrics with default configuration
    pub fn all() -> Vec<Metric> {
        vec![
            Metric::Chroma(ChromaMetric::default()),
            Metric::Dynamics(DynamicsMetric::default()),
            Metric::OnsetOffset(OnsetOffsetMetric::default()),
            Metric::TempoVariation(TempoVariationMetric::default()),
            Metric::Timbre(TimbreMetric::default()),
        ]
    }

    /// Metric family
    pub fn kind(&self) -> MetricKind {
        match self {
            Metric::Chroma(_) => ChromaMetric::KIND,
            Metric::Dynamics(_) => DynamicsMetric::KIND,
            Metric::OnsetOffset(_) => OnsetOffsetMetric::KIND,
            Metric::TempoVariation(_) => TempoVariationMetric::KIND,
            Metric::Timbre(_) => TimbreMetric::KIND,
        }
    }

    /// Cache key covering the full configuration
    pub fn key(&self) -> MetricKey {
        let params = match self {
            Metric::Chroma(m) => m.key_params(),
            Metric::Dynamics(m) => m.key_params(),
            Metric::OnsetOffset(m) => m.key_params(),
            Metric::TempoVariation(m) => m.key_params(),
            Metric::Timbre(m) => m.key_params(),
        };
        MetricKey {
            kind: self.kind(),
            params,
        }
    }

    /// Extract this metric's feature of `signal`
    pub fn compute(&self, signal: &AnalyzedSignal) -> Result<Feature, AnalysisError> {
        log::debug!("Computing {} for '{}'", self.kind(), signal.name());
        Ok(match self {
            Metric::Chroma(m) => Feature::Chroma(m.compute(signal)?),
            Metric::Dynamics(m) => Feature::Dynamics(m.compute(signal)?),
            Metric::OnsetOffset(m) => Feature::OnsetOffset(m.compute(signal)?),
            Metric::TempoVariation(m) => Feature::TempoVariation(m.compute(signal)?),
            Metric::Timbre(m) => Feature::Timbre(m.compute(signal)?),
        })
    }

    /// Similarity of two features produced by this metric
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if either feature belongs to a
    /// different metric
    pub fn similarity(
        &self,
        a: &AnalyzedSignal,
        b: &AnalyzedSignal,
        feature_a: &Feature,
        feature_b: &Feature,
    ) -> Result<f32, AnalysisError> {
        match (self, feature_a, feature_b) {
            (Metric::Chroma(m), Feature::Chroma(fa), Feature::Chroma(fb)) => {
                m.similarity(a, b, fa, fb)
            }
            (Metric::Dynamics(m), Feature::Dynamics(fa), Feature::Dynamics(fb)) => {
                m.similarity(a, b, fa, fb)
            }
            (Metric::OnsetOffset(m), Feature::OnsetOffset(fa), Feature::OnsetOffset(fb)) => {
                m.similarity(a, b, fa, fb)
            }
            (
                Metric::TempoVariation(m),
                Feature::TempoVariation(fa),
                Feature::TempoVariation(fb),
            ) => m.similarity(a, b, fa, fb),
            (Metric::Timbre(m), Feature::Timbre(fa), Feature::Timbre(fb)) => {
                m.similarity(a, b, fa, fb)
            }
            _ => Err(AnalysisError::InvalidInput(format!(
                "{} cannot compare {} and {} features",
                self.kind(),
                feature_a.kind(),
                feature_b.kind()
            ))),
        }
    }
}

impl fmt::Display for Metric {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}", self.kind())
    }
}

/// Mean squared error over the first `min(a.len(), b.len())` elements
///
/// `None` when either sequence is empty.
pub(crate) fn truncated_mse(a: &[f32], b: &[f32]) -> Option<f32> {
    let n = a.len().min(b.len());
    if n == 0 {
        return None;
    }
    let sum: f32 = a[..n]
        .iter()
        .zip(&b[..n])
        .map(|(x, y)| {
            let d = x - y;
            d * d
        })
        .sum();
    Some(sum / n as f32)
}

/// Map a mean squared error to a similarity score, `exp(-mse)`
pub(crate) fn score_from_mse(kind: MetricKind, mse: f32) -> Result<f32, AnalysisError> {
    if mse.is_nan() {
        return Err(AnalysisError::NumericalError(format!(
            "{} similarity produced NaN",
            kind
        )));
    }
    Ok((-mse).exp())
}

/// Score for a comparison with nothing to compare
///
/// Two empty features are identical and score 1.0; otherwise 0.0.
pub(crate) fn degenerate_similarity(
    kind: MetricKind,
    a: &AnalyzedSignal,
    b: &AnalyzedSignal,
    both_empty: bool,
) -> f32 {
    if both_empty {
        log::debug!(
            "{} features of '{}' and '{}' are both empty, scoring 1",
            kind,
            a.name(),
            b.name()
        );
        return 1.0;
    }
    log::warn!(
        "{} similarity of '{}' and '{}' has no aligned entries, scoring 0",
        kind,
        a.name(),
        b.name()
    );
    0.0
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_truncated_mse() {
        assert_eq!(truncated_mse(&[1.0, 2.0, 3.0], &[1.0, 4.0]), Some(2.0));
        assert_eq!(truncated_mse(&[], &[1.0]), None);
        assert_eq!(truncated_mse(&[0.5, 0.25], &[0.5, 0.25]), Some(0.0));
    }

    #[test]
    fn test_score_from_mse() {
        assert_eq!(score_from_mse(MetricKind::Dynamics, 0.0).unwrap(), 1.0);
        assert!((score_from_mse(MetricKind::Dynamics, 1.0).unwrap() - (-1.0f32).exp()).abs() < 1e-7);
        assert_eq!(score_from_mse(MetricKind::Dynamics, f32::INFINITY).unwrap(), 0.0);
        assert!(score_from_mse(MetricKind::Dynamics, f32::NAN).is_err());
    }

    #[test]
    fn test_metric_keys_are_distinct() {
        let keys: Vec<MetricKey> = Metric::all().iter().map(Metric::key).collect();
        for (i, a) in keys.iter().enumerate() {
            for b in &keys[i + 1..] {
                assert_ne!(a, b);
            }
        }

        let default_chroma = Metric::Chroma(ChromaMetric::default());
        let wide_chroma = Metric::Chroma(ChromaMetric {
            window_size: 0.2,
            ..ChromaMetric::default()
        });
        assert_eq!(default_chroma.key(), Metric::Chroma(ChromaMetric::default()).key());
        assert_ne!(default_chroma.key(), wide_chroma.key());
    }

    #[test]
    fn test_metric_display() {
        let names: Vec<String> = Metric::all().iter().map(|m| m.to_string()).collect();
        assert_eq!(
            names,
            vec!["Chroma", "Dynamics", "OnsetOffset", "TempoVariation", "Timbre"]
        );
    }

    #[test]
    fn test_metric_serde_round_trip() {
        let metric = Metric::OnsetOffset(OnsetOffsetMetric {
            comparison: OffsetComparison::Distribution,
            ..OnsetOffsetMetric::default()
        });
        let json = serde_json::to_string(&metric).unwrap();
        let back: Metric = serde_json::from_str(&json).unwrap();
        assert_eq!(back, metric);
        assert_eq!(back.key(), metric.key());
    }
}
