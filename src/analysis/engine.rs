//! Similarity engine: feature caching, per-candidate aggregation, best match
//!
//! # Example
//!
//! ```no_run
//! use perfprint::analysis::SimilarityEngine;
//! use perfprint::{AnalysisConfig, Metric, Signal};
//!
//! # fn load(_: &str) -> Signal { unimplemented!() }
//! let engine = SimilarityEngine::new(AnalysisConfig::default())?;
//! let reference = engine.analyze(load("reference.wav"))?;
//! let candidates = vec![engine.analyze(load("take-1.wav"))?, engine.analyze(load("take-2.wav"))?];
//!
//! let best = engine.find_most_similar(&reference, &candidates, &Metric::all())?;
//! println!("Best match: #{} ({:.3})", best.index, best.score);
//! # Ok::<(), perfprint::AnalysisError>(())
//! ```

use std::collections::HashMap;
use std::sync::Arc;

use rayon::prelude::*;

use super::result::{BestMatch, CandidateScore, MetricScore};
use super::AnalyzedSignal;
use crate::config::AnalysisConfig;
use crate::error::AnalysisError;
use crate::io::Signal;
use crate::metrics::{Feature, Metric, MetricKey};

/// Compares recordings against a reference under a set of metrics
#[derive(Debug, Clone)]
pub struct SimilarityEngine {
    config: AnalysisConfig,
}

impl SimilarityEngine {
    /// Create an engine
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if the tempo configuration is invalid
    pub fn new(config: AnalysisConfig) -> Result<Self, AnalysisError> {
        config.tempo.validate()?;
        Ok(Self { config })
    }

    /// Engine configuration
    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Bind a signal to this engine's tempo configuration
    pub fn analyze(&self, signal: Signal) -> Result<Arc<AnalyzedSignal>, AnalysisError> {
        Ok(Arc::new(AnalyzedSignal::new(signal, self.config.tempo.clone())?))
    }

    /// Features of `signal` for every metric, from cache or freshly computed
    ///
    /// # Errors
    ///
    /// Returns the first failing metric's error, naming the metric and signal
    pub fn compute_features(
        &self,
        signal: &AnalyzedSignal,
        metrics: &[Metric],
    ) -> Result<HashMap<MetricKey, Arc<Feature>>, AnalysisError> {
        metrics
            .iter()
            .map(|metric| {
                let feature = signal
                    .feature(metric)
                    .map_err(|e| e.with_context(&describe(metric, signal)))?;
                Ok((metric.key(), feature))
            })
            .collect()
    }

    /// Similarity of `a` and `b` under a single metric
    pub fn similarity(
        &self,
        a: &AnalyzedSignal,
        b: &AnalyzedSignal,
        metric: &Metric,
    ) -> Result<f32, AnalysisError> {
        let feature_a = a
            .feature(metric)
            .map_err(|e| e.with_context(&describe(metric, a)))?;
        let feature_b = b
            .feature(metric)
            .map_err(|e| e.with_context(&describe(metric, b)))?;
        metric
            .similarity(a, b, &feature_a, &feature_b)
            .map_err(|e| e.with_context(&describe(metric, b)))
    }

    /// Score every candidate against the reference
    ///
    /// # Returns
    ///
    /// One entry per candidate, in input order, holding the mean score and
    /// the per-metric breakdown
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for an empty candidate or metric
    /// list, or the first feature/similarity error
    pub fn rank_candidates(
        &self,
        reference: &AnalyzedSignal,
        candidates: &[Arc<AnalyzedSignal>],
        metrics: &[Metric],
    ) -> Result<Vec<CandidateScore>, AnalysisError> {
        if candidates.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "No candidate signals to compare".to_string(),
            ));
        }
        if metrics.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "No metrics requested".to_string(),
            ));
        }

        log::debug!(
            "Ranking {} candidates against '{}' with {} metrics (parallel: {})",
            candidates.len(),
            reference.name(),
            metrics.len(),
            self.config.parallel
        );

        let signals: Vec<&AnalyzedSignal> = std::iter::once(reference)
            .chain(candidates.iter().map(|c| c.as_ref()))
            .collect();
        if self.config.parallel {
            signals
                .par_iter()
                .try_for_each(|signal| self.compute_features(signal, metrics).map(|_| ()))?;
        } else {
            for signal in &signals {
                self.compute_features(signal, metrics)?;
            }
        }

        let scores: Result<Vec<CandidateScore>, AnalysisError> = if self.config.parallel {
            candidates
                .par_iter()
                .enumerate()
                .map(|(index, candidate)| self.score_candidate(reference, index, candidate, metrics))
                .collect()
        } else {
            candidates
                .iter()
                .enumerate()
                .map(|(index, candidate)| self.score_candidate(reference, index, candidate, metrics))
                .collect()
        };
        let scores = scores?;

        for candidate in &scores {
            log::debug!(
                "Candidate #{} '{}': {:.4}",
                candidate.index,
                candidate.name.as_deref().unwrap_or("<unnamed>"),
                candidate.score
            );
        }
        Ok(scores)
    }

    fn score_candidate(
        &self,
        reference: &AnalyzedSignal,
        index: usize,
        candidate: &AnalyzedSignal,
        metrics: &[Metric],
    ) -> Result<CandidateScore, AnalysisError> {
        let metric_scores = metrics
            .iter()
            .map(|metric| {
                Ok(MetricScore {
                    metric: metric.key(),
                    score: self.similarity(reference, candidate, metric)?,
                })
            })
            .collect::<Result<Vec<_>, AnalysisError>>()?;
        let score = metric_scores.iter().map(|m| m.score).sum::<f32>() / metric_scores.len() as f32;
        Ok(CandidateScore {
            index,
            name: candidate.signal().name().map(str::to_string),
            score,
            metric_scores,
        })
    }

    /// Candidate with the highest mean similarity; the first one wins ties
    ///
    /// # Errors
    ///
    /// Same as [`SimilarityEngine::rank_candidates`]
    pub fn find_most_similar(
        &self,
        reference: &AnalyzedSignal,
        candidates: &[Arc<AnalyzedSignal>],
        metrics: &[Metric],
    ) -> Result<BestMatch, AnalysisError> {
        let scores = self.rank_candidates(reference, candidates, metrics)?;
        let mut best = &scores[0];
        for candidate in &scores[1..] {
            if candidate.score > best.score {
                best = candidate;
            }
        }
        log::debug!(
            "Most similar to '{}': #{} ({:.4})",
            reference.name(),
            best.index,
            best.score
        );
        Ok(BestMatch::from(best))
    }
}

fn describe(metric: &Metric, signal: &AnalyzedSignal) -> String {
    format!("{} on '{}'", metric, signal.name())
}

/// Every non-empty subset of `metrics`
///
/// Subsets are ordered by size, then lexicographically by input position.
pub fn metric_combinations(metrics: &[Metric]) -> Vec<Vec<Metric>> {
    let mut combinations = Vec::new();
    for size in 1..=metrics.len() {
        let mut indices: Vec<usize> = (0..size).collect();
        loop {
            combinations.push(indices.iter().map(|&i| metrics[i].clone()).collect());

            // Advance to the next index combination
            let mut pos = size;
            while pos > 0 && indices[pos - 1] == metrics.len() - size + pos - 1 {
                pos -= 1;
            }
            if pos == 0 {
                break;
            }
            indices[pos - 1] += 1;
            for j in pos..size {
                indices[j] = indices[j - 1] + 1;
            }
        }
    }
    combinations
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::metrics::{MetricKind, TempoVariationMetric};

    fn pulse_signal(period: f32, name: &str) -> Signal {
        let sample_rate = 8000u32;
        let n = sample_rate as usize * 4;
        let samples = (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let phase = t % period;
                (2.0 * std::f32::consts::PI * 660.0 * t).sin() * (-phase * 40.0).exp()
            })
            .collect();
        Signal::new(samples, sample_rate).unwrap().with_name(name)
    }

    #[test]
    fn test_metric_combinations_order() {
        let metrics = Metric::all();
        let combinations = metric_combinations(&metrics);
        assert_eq!(combinations.len(), 31);
        assert_eq!(combinations[0], vec![metrics[0].clone()]);
        assert_eq!(combinations[4], vec![metrics[4].clone()]);
        assert_eq!(combinations[5], vec![metrics[0].clone(), metrics[1].clone()]);
        assert_eq!(combinations[14], vec![metrics[3].clone(), metrics[4].clone()]);
        assert_eq!(combinations[30], metrics);
        assert!(metric_combinations(&[]).is_empty());
    }

    #[test]
    fn test_empty_inputs_rejected() {
        let engine = SimilarityEngine::new(AnalysisConfig::sequential()).unwrap();
        let reference = engine.analyze(pulse_signal(0.5, "ref")).unwrap();
        assert!(matches!(
            engine.rank_candidates(&reference, &[], &Metric::all()),
            Err(AnalysisError::InvalidInput(_))
        ));
        let candidate = engine.analyze(pulse_signal(0.5, "cand")).unwrap();
        assert!(matches!(
            engine.find_most_similar(&reference, &[candidate], &[]),
            Err(AnalysisError::InvalidInput(_))
        ));
    }

    #[test]
    fn test_identical_candidate_wins() {
        let engine = SimilarityEngine::new(AnalysisConfig::default()).unwrap();
        let reference = engine.analyze(pulse_signal(0.5, "ref")).unwrap();
        let candidates = vec![
            engine.analyze(pulse_signal(0.4, "fast")).unwrap(),
            engine.analyze(pulse_signal(0.5, "copy")).unwrap(),
            engine.analyze(pulse_signal(0.65, "slow")).unwrap(),
        ];
        let metrics = [Metric::TempoVariation(TempoVariationMetric::default())];

        let scores = engine.rank_candidates(&reference, &candidates, &metrics).unwrap();
        assert_eq!(scores.len(), 3);
        assert_eq!(scores.iter().map(|s| s.index).collect::<Vec<_>>(), vec![0, 1, 2]);
        assert_eq!(scores[1].score, 1.0);
        assert_eq!(scores[1].metric_scores[0].metric.kind, MetricKind::TempoVariation);

        let best = engine.find_most_similar(&reference, &candidates, &metrics).unwrap();
        assert_eq!(best.index, 1);
        assert_eq!(best.name.as_deref(), Some("copy"));
        assert_eq!(best.score, 1.0);
    }

    #[test]
    fn test_ties_go_to_first_candidate() {
        let engine = SimilarityEngine::new(AnalysisConfig::sequential()).unwrap();
        let reference = engine.analyze(pulse_signal(0.5, "ref")).unwrap();
        let candidates = vec![
            engine.analyze(pulse_signal(0.5, "first")).unwrap(),
            engine.analyze(pulse_signal(0.5, "second")).unwrap(),
        ];
        let best = engine
            .find_most_similar(&reference, &candidates, &Metric::all())
            .unwrap();
        assert_eq!(best.index, 0);
    }

    #[test]
    fn test_compute_features_uses_cache() {
        let engine = SimilarityEngine::new(AnalysisConfig::sequential()).unwrap();
        let signal = engine.analyze(pulse_signal(0.5, "ref")).unwrap();
        let metrics = Metric::all();
        let first = engine.compute_features(&signal, &metrics).unwrap();
        let second = engine.compute_features(&signal, &metrics).unwrap();
        assert_eq!(first.len(), 5);
        for metric in &metrics {
            assert!(Arc::ptr_eq(&first[&metric.key()], &second[&metric.key()]));
        }
    }

    #[test]
    fn test_errors_name_metric_and_signal() {
        let engine = SimilarityEngine::new(AnalysisConfig::sequential()).unwrap();
        let short = engine
            .analyze(Signal::new(vec![0.0; 100], 8000).unwrap().with_name("blip"))
            .unwrap();
        let err = engine
            .compute_features(&short, &[Metric::TempoVariation(TempoVariationMetric::default())])
            .unwrap_err();
        assert!(err.to_string().contains("TempoVariation on 'blip'"));
    }
}
