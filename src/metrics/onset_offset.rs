//! Onset offset: how far played notes land from the expected beat
//!
//! Expected beat times are accumulated from the smoothed inter-beat
//! intervals. For each one, the strongest onset within `±search_window`
//! seconds is located; its signed distance from the expected time (negative
//! = early) and its strength form the feature entry.

use serde::{Deserialize, Serialize};

use super::tempo_variation::tempo_curve;
use super::{degenerate_similarity, score_from_mse, MetricCalculator, MetricKind};
use crate::analysis::AnalyzedSignal;
use crate::error::AnalysisError;
use crate::features::onset::OnsetFunction;
use crate::preprocessing::series::mean_and_std;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Strongest onset near one expected beat
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct OnsetOffset {
    /// Onset time minus expected beat time, in seconds
    pub offset: f32,

    /// Onset strength at the located onset
    pub strength: f32,

    /// Expected beat time in seconds
    pub expected_time: f32,
}

/// How two offset sequences are aligned for comparison
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum OffsetComparison {
    /// Pair entries by index, truncated to the shorter sequence
    #[default]
    Truncated,
    /// Pair every expected beat with the other recording's nearest expected
    /// beat, averaged over both directions
    NearestBeat,
    /// Compare the offset distributions as Gaussians by symmetrised
    /// Kullback-Leibler divergence
    Distribution,
}

impl OffsetComparison {
    fn code(self) -> u32 {
        match self {
            OffsetComparison::Truncated => 0,
            OffsetComparison::NearestBeat => 1,
            OffsetComparison::Distribution => 2,
        }
    }
}

/// Onset offsets relative to expected beats
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnsetOffsetMetric {
    /// Half-width of the onset search around each expected beat, seconds (default: 0.1)
    pub search_window: f32,

    /// Moving-average length applied to inter-beat intervals (default: 4)
    pub smoothing_window: usize,

    /// Alignment policy (default: truncated)
    #[serde(default)]
    pub comparison: OffsetComparison,
}

impl Default for OnsetOffsetMetric {
    fn default() -> Self {
        Self {
            search_window: 0.1,
            smoothing_window: 4,
            comparison: OffsetComparison::default(),
        }
    }
}

/// Strongest onset within `±search_window` seconds of `expected_time`
///
/// # Returns
///
/// `(onset_time, strength)`; the earliest window wins ties
pub fn best_nearest_onset(onset: &OnsetFunction, expected_time: f32, search_window: f32) -> (f32, f32) {
    let half = onset.time_to_windows(search_window);
    let centre = onset.time_to_windows(expected_time);

    let mut best_window = centre.saturating_sub(half);
    let mut best_strength = f32::NEG_INFINITY;
    for window in centre.saturating_sub(half)..=centre + half {
        let strength = onset.index_window(window);
        if strength > best_strength {
            best_strength = strength;
            best_window = window;
        }
    }
    (onset.windows_to_time(best_window), best_strength)
}

/// Symmetric error between two entries
fn entry_error(a: &OnsetOffset, b: &OnsetOffset) -> f32 {
    let d_offset = a.offset - b.offset;
    let d_strength = a.strength - b.strength;
    d_offset * d_offset + d_strength * d_strength
}

/// Mean error of every entry in `from` against the nearest expected beat in `to`
fn nearest_beat_error(from: &[OnsetOffset], to: &[OnsetOffset]) -> f32 {
    let total: f32 = from
        .iter()
        .map(|entry| {
            let mut nearest = &to[0];
            for candidate in &to[1..] {
                if (candidate.expected_time - entry.expected_time).abs()
                    < (nearest.expected_time - entry.expected_time).abs()
                {
                    nearest = candidate;
                }
            }
            entry_error(entry, nearest)
        })
        .sum();
    total / from.len() as f32
}

/// KL divergence `KL(p || q)` of two normal distributions
pub fn gaussian_divergence(mean_p: f32, std_p: f32, mean_q: f32, std_q: f32) -> f32 {
    let log_ratio = (std_q / std_p).ln();
    let d_mean = mean_p - mean_q;
    log_ratio + (std_p * std_p + d_mean * d_mean) / (2.0 * std_q * std_q) - 0.5
}

impl MetricCalculator for OnsetOffsetMetric {
    type Feature = Vec<OnsetOffset>;
    const KIND: MetricKind = MetricKind::OnsetOffset;

    fn key_params(&self) -> Vec<u32> {
        vec![
            self.search_window.to_bits(),
            self.smoothing_window as u32,
            self.comparison.code(),
        ]
    }

    fn compute(&self, signal: &AnalyzedSignal) -> Result<Vec<OnsetOffset>, AnalysisError> {
        if !(self.search_window >= 0.0) {
            return Err(AnalysisError::InvalidInput(format!(
                "Onset search window must be >= 0, got {}",
                self.search_window
            )));
        }
        let rhythm = signal.rhythm()?;
        let intervals = tempo_curve(&rhythm.beat_times, self.smoothing_window);

        let mut expected_time = 0.0f32;
        let offsets = intervals
            .iter()
            .map(|&interval| {
                expected_time += interval;
                let (onset_time, strength) =
                    best_nearest_onset(&rhythm.onset_function, expected_time, self.search_window);
                OnsetOffset {
                    offset: onset_time - expected_time,
                    strength,
                    expected_time,
                }
            })
            .collect();
        Ok(offsets)
    }

    fn similarity(
        &self,
        a: &AnalyzedSignal,
        b: &AnalyzedSignal,
        feature_a: &Vec<OnsetOffset>,
        feature_b: &Vec<OnsetOffset>,
    ) -> Result<f32, AnalysisError> {
        if feature_a.is_empty() || feature_b.is_empty() {
            let both_empty = feature_a.is_empty() && feature_b.is_empty();
            return Ok(degenerate_similarity(Self::KIND, a, b, both_empty));
        }

        match self.comparison {
            OffsetComparison::Truncated => {
                let n = feature_a.len().min(feature_b.len());
                let total: f32 = feature_a[..n]
                    .iter()
                    .zip(&feature_b[..n])
                    .map(|(x, y)| entry_error(x, y))
                    .sum();
                score_from_mse(Self::KIND, total / n as f32)
            }
            OffsetComparison::NearestBeat => {
                let forward = nearest_beat_error(feature_a, feature_b);
                let backward = nearest_beat_error(feature_b, feature_a);
                score_from_mse(Self::KIND, 0.5 * (forward + backward))
            }
            OffsetComparison::Distribution => {
                let offsets_a: Vec<f32> = feature_a.iter().map(|e| e.offset).collect();
                let offsets_b: Vec<f32> = feature_b.iter().map(|e| e.offset).collect();
                let (mean_a, std_a) = mean_and_std(&offsets_a);
                let (mean_b, std_b) = mean_and_std(&offsets_b);
                let (std_a, std_b) = (std_a.max(EPSILON), std_b.max(EPSILON));
                let divergence = gaussian_divergence(mean_a, std_a, mean_b, std_b)
                    + gaussian_divergence(mean_b, std_b, mean_a, std_a);
                score_from_mse(Self::KIND, 0.5 * divergence)
            }
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

    fn entries(values: &[(f32, f32, f32)]) -> Vec<OnsetOffset> {
        values
            .iter()
            .map(|&(offset, strength, expected_time)| OnsetOffset {
                offset,
                strength,
                expected_time,
            })
            .collect()
    }

    #[test]
    fn test_best_nearest_onset() {
        let mut data = vec![0.0f32; 500];
        data[130] = 2.0; // 0.52 s
        data[110] = 1.0;
        let onset = OnsetFunction::new(data, 0.004, 44100).unwrap();

        let (time, strength) = best_nearest_onset(&onset, 0.5, 0.1);
        assert!((time - 0.52).abs() < 1e-5);
        assert_eq!(strength, 2.0);

        // Search window clipped at the start of the series
        let (time, strength) = best_nearest_onset(&onset, 0.02, 0.1);
        assert_eq!(time, 0.0);
        assert_eq!(strength, 0.0);
    }

    #[test]
    fn test_best_nearest_onset_past_end_clamps() {
        let onset = OnsetFunction::new(vec![0.0, 1.0, 3.0], 0.004, 44100).unwrap();
        let (time, strength) = best_nearest_onset(&onset, 10.0, 0.1);
        assert_eq!(strength, 3.0);
        assert!(time >= 10.0 - 0.1 - 1e-3);
    }

    #[test]
    fn test_gaussian_divergence_reference_value() {
        let divergence = gaussian_divergence(2.0, 3.0, 3.0, 1.1);
        assert!((divergence - 2.6289).abs() < 1e-3);
        assert_eq!(gaussian_divergence(0.01, 0.02, 0.01, 0.02), 0.0);
    }

    #[test]
    fn test_comparisons_identical_and_symmetric() {
        let (a, b) = (placeholder("a"), placeholder("b"));
        let fa = entries(&[(0.01, 1.0, 0.5), (-0.02, 0.8, 1.0), (0.0, 1.2, 1.5)]);
        let fb = entries(&[(0.03, 0.9, 0.55), (0.01, 1.1, 1.05)]);

        for comparison in [
            OffsetComparison::Truncated,
            OffsetComparison::NearestBeat,
            OffsetComparison::Distribution,
        ] {
            let metric = OnsetOffsetMetric {
                comparison,
                ..OnsetOffsetMetric::default()
            };
            assert_eq!(metric.similarity(&a, &a, &fa, &fa).unwrap(), 1.0, "{:?}", comparison);
            let ab = metric.similarity(&a, &b, &fa, &fb).unwrap();
            let ba = metric.similarity(&b, &a, &fb, &fa).unwrap();
            assert_eq!(ab, ba, "{:?}", comparison);
            assert!(ab >= 0.0 && ab < 1.0, "{:?}: {}", comparison, ab);
        }
    }

    #[test]
    fn test_truncated_score_value() {
        let (a, b) = (placeholder("a"), placeholder("b"));
        let fa = entries(&[(0.0, 1.0, 0.5), (0.0, 1.0, 1.0)]);
        let fb = entries(&[(0.0, 2.0, 0.5)]);
        let score = OnsetOffsetMetric::default().similarity(&a, &b, &fa, &fb).unwrap();
        assert!((score - (-1.0f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_empty_offsets() {
        let a = placeholder("a");
        let fa = entries(&[(0.0, 1.0, 0.5)]);
        for comparison in [
            OffsetComparison::Truncated,
            OffsetComparison::NearestBeat,
            OffsetComparison::Distribution,
        ] {
            let metric = OnsetOffsetMetric {
                comparison,
                ..OnsetOffsetMetric::default()
            };
            assert_eq!(metric.similarity(&a, &a, &fa, &vec![]).unwrap(), 0.0);
            assert_eq!(metric.similarity(&a, &a, &vec![], &fa).unwrap(), 0.0);
            assert_eq!(metric.similarity(&a, &a, &vec![], &vec![]).unwrap(), 1.0);
        }
    }
}
