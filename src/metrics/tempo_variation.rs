//! Tempo variation: how the beat period drifts over a performance

use serde::{Deserialize, Serialize};

use super::{degenerate_similarity, score_from_mse, truncated_mse, MetricCalculator, MetricKind};
use crate::analysis::AnalyzedSignal;
use crate::error::AnalysisError;
use crate::preprocessing::series::{first_difference, moving_average};

/// Smoothed inter-beat interval curve
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoVariationMetric {
    /// Moving-average length in beats (default: 4)
    pub smoothing_window: usize,
}

impl Default for TempoVariationMetric {
    fn default() -> Self {
        Self { smoothing_window: 4 }
    }
}

/// Inter-beat intervals of `beat_times`, smoothed by a trailing moving average
pub fn tempo_curve(beat_times: &[f32], smoothing_window: usize) -> Vec<f32> {
    moving_average(&first_difference(beat_times), smoothing_window)
}

impl MetricCalculator for TempoVariationMetric {
    type Feature = Vec<f32>;
    const KIND: MetricKind = MetricKind::TempoVariation;

    fn key_params(&self) -> Vec<u32> {
        vec![self.smoothing_window as u32]
    }

    fn compute(&self, signal: &AnalyzedSignal) -> Result<Vec<f32>, AnalysisError> {
        let rhythm = signal.rhythm()?;
        Ok(tempo_curve(&rhythm.beat_times, self.smoothing_window))
    }

    fn similarity(
        &self,
        a: &AnalyzedSignal,
        b: &AnalyzedSignal,
        feature_a: &Vec<f32>,
        feature_b: &Vec<f32>,
    ) -> Result<f32, AnalysisError> {
        match truncated_mse(feature_a, feature_b) {
            Some(mse) => score_from_mse(Self::KIND, mse),
            None => Ok(degenerate_similarity(
                Self::KIND,
                a,
                b,
                feature_a.is_empty() && feature_b.is_empty(),
            )),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TempoConfig;
    use crate::io::Signal;

    fn placeholder(name: &str) -> AnalyzedSignal {
        let signal = Signal::new(vec![0.0; 8000], 8000).unwrap().with_name(name);
        AnalyzedSignal::new(signal, TempoConfig::default()).unwrap()
    }

    #[test]
    fn test_tempo_curve() {
        let beats = [0.0, 0.5, 1.0, 1.6, 2.2];
        let curve = tempo_curve(&beats, 2);
        assert_eq!(curve.len(), 4);
        assert!((curve[0] - 0.5).abs() < 1e-6);
        assert!((curve[1] - 0.5).abs() < 1e-6);
        assert!((curve[2] - 0.55).abs() < 1e-6);
        assert!((curve[3] - 0.6).abs() < 1e-6);
    }

    #[test]
    fn test_similarity_identical_and_symmetric() {
        let metric = TempoVariationMetric::default();
        let (a, b) = (placeholder("a"), placeholder("b"));
        let fa = vec![0.5, 0.52, 0.49, 0.5];
        let fb = vec![0.6, 0.58, 0.61];

        assert_eq!(metric.similarity(&a, &a, &fa, &fa).unwrap(), 1.0);
        let ab = metric.similarity(&a, &b, &fa, &fb).unwrap();
        let ba = metric.similarity(&b, &a, &fb, &fa).unwrap();
        assert_eq!(ab, ba);
        assert!(ab > 0.0 && ab < 1.0);
    }

    #[test]
    fn test_empty_features() {
        let metric = TempoVariationMetric::default();
        let a = placeholder("a");
        assert_eq!(metric.similarity(&a, &a, &vec![], &vec![0.5]).unwrap(), 0.0);
        assert_eq!(metric.similarity(&a, &a, &vec![], &vec![]).unwrap(), 1.0);
    }
}
