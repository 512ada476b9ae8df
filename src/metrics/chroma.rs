//! Chroma: harmonic content sampled at the beats

use serde::{Deserialize, Serialize};

use super::{degenerate_similarity, score_from_mse, MetricCalculator, MetricKind};
use crate::analysis::AnalyzedSignal;
use crate::error::AnalysisError;
use crate::features::chroma::extract_chroma;

/// Per-window pitch class profile, compared at the windows nearest each beat
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ChromaMetric {
    /// Analysis window length in seconds (default: 0.1)
    pub window_size: f32,

    /// Window advance in seconds (default: 0.025)
    pub window_advance: f32,
}

impl Default for ChromaMetric {
    fn default() -> Self {
        Self {
            window_size: 0.1,
            window_advance: 0.025,
        }
    }
}

impl ChromaMetric {
    /// Chroma window closest to `time`
    fn nearest_window(&self, time: f32) -> usize {
        (time / self.window_advance).round().max(0.0) as usize
    }
}

impl MetricCalculator for ChromaMetric {
    type Feature = Vec<[f32; 12]>;
    const KIND: MetricKind = MetricKind::Chroma;

    fn key_params(&self) -> Vec<u32> {
        vec![self.window_size.to_bits(), self.window_advance.to_bits()]
    }

    fn compute(&self, signal: &AnalyzedSignal) -> Result<Vec<[f32; 12]>, AnalysisError> {
        extract_chroma(signal.signal(), self.window_size, self.window_advance)
    }

    /// Mean over beats of the summed squared class differences
    ///
    /// Beats are paired by index up to the shorter beat sequence; the
    /// comparison stops at the first beat whose window lies past the end of
    /// either chroma series.
    fn similarity(
        &self,
        a: &AnalyzedSignal,
        b: &AnalyzedSignal,
        feature_a: &Vec<[f32; 12]>,
        feature_b: &Vec<[f32; 12]>,
    ) -> Result<f32, AnalysisError> {
        let rhythm_a = a.rhythm()?;
        let rhythm_b = b.rhythm()?;

        let mut total = 0.0f32;
        let mut compared = 0usize;
        for (&beat_a, &beat_b) in rhythm_a.beat_times.iter().zip(&rhythm_b.beat_times) {
            let (wa, wb) = (self.nearest_window(beat_a), self.nearest_window(beat_b));
            let (Some(profile_a), Some(profile_b)) = (feature_a.get(wa), feature_b.get(wb)) else {
                break;
            };
            total += profile_a
                .iter()
                .zip(profile_b)
                .map(|(x, y)| {
                    let d = x - y;
                    d * d
                })
                .sum::<f32>();
            compared += 1;
        }

        if compared == 0 {
            let both_empty = feature_a.is_empty() && feature_b.is_empty();
            return Ok(degenerate_similarity(Self::KIND, a, b, both_empty));
        }
        score_from_mse(Self::KIND, total / compared as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TempoConfig;
    use crate::io::Signal;

    fn tone_with_clicks(freq: f32, name: &str) -> AnalyzedSignal {
        let sample_rate = 8000u32;
        let n = sample_rate as usize * 3;
        let samples: Vec<f32> = (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let phase = t % 0.5;
                (2.0 * std::f32::consts::PI * freq * t).sin() * (-phase * 8.0).exp()
            })
            .collect();
        let signal = Signal::new(samples, sample_rate).unwrap().with_name(name);
        AnalyzedSignal::new(signal, TempoConfig::default()).unwrap()
    }

    #[test]
    fn test_nearest_window() {
        let metric = ChromaMetric::default();
        assert_eq!(metric.nearest_window(0.0), 0);
        assert_eq!(metric.nearest_window(0.51), 20);
        assert_eq!(metric.nearest_window(0.52), 21);
    }

    #[test]
    fn test_identical_and_symmetric() {
        let metric = ChromaMetric::default();
        let a = tone_with_clicks(440.0, "a4");
        let b = tone_with_clicks(523.25, "c5");
        let fa = metric.compute(&a).unwrap();
        let fb = metric.compute(&b).unwrap();

        assert_eq!(metric.similarity(&a, &a, &fa, &fa).unwrap(), 1.0);
        let ab = metric.similarity(&a, &b, &fa, &fb).unwrap();
        let ba = metric.similarity(&b, &a, &fb, &fa).unwrap();
        assert_eq!(ab, ba);
        assert!(ab < 1.0);
    }

    #[test]
    fn test_empty_chroma_scores_zero() {
        let metric = ChromaMetric::default();
        let a = tone_with_clicks(440.0, "a4");
        let fa = metric.compute(&a).unwrap();
        assert_eq!(metric.similarity(&a, &a, &fa, &vec![]).unwrap(), 0.0);
    }
}
