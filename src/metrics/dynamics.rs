//! Dynamics: perceptually weighted loudness over time
//!
//! Each window's power spectrum is projected onto mel bands, converted to dB
//! against a fixed reference power, weighted per band by the ITU-R 468 noise
//! weighting curve at the band's centre frequency, then summed back in the
//! power domain.

use serde::{Deserialize, Serialize};

use super::{degenerate_similarity, score_from_mse, truncated_mse, MetricCalculator, MetricKind};
use crate::analysis::AnalyzedSignal;
use crate::error::AnalysisError;
use crate::features::spectral::{MelFilterbank, SpectrumAnalyzer};

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Weighted loudness per window, in dB
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DynamicsMetric {
    /// Analysis window length in seconds (default: 0.16)
    pub window_size: f32,

    /// Window advance in seconds (default: 0.04)
    pub window_advance: f32,

    /// Power treated as 0 dB (default: 1e7)
    pub reference_power: f32,

    /// Number of mel bands (default: 40)
    pub mel_bands: usize,
}

impl Default for DynamicsMetric {
    fn default() -> Self {
        Self {
            window_size: 0.16,
            window_advance: 0.04,
            reference_power: 1e7,
            mel_bands: 40,
        }
    }
}

/// ITU-R 468 weighting in dB at `hz` (0 dB at 1 kHz, +12.2 dB peak near 6.3 kHz)
pub fn itu_r_468_weighting(hz: f32) -> f32 {
    let f = hz as f64;
    let h1 = -4.737_338_981_378_384e-24 * f.powi(6) + 2.043_828_333_606_125e-15 * f.powi(4)
        - 1.363_894_795_463_638e-7 * f.powi(2)
        + 1.0;
    let h2 = 1.306_612_257_412_824e-19 * f.powi(5) - 2.118_150_887_518_656e-11 * f.powi(3)
        + 5.559_488_023_498_642e-4 * f;
    let response = 1.246_332_637_532_143e-4 * f / (h1 * h1 + h2 * h2).sqrt();
    (18.2 + 20.0 * response.max(1e-30).log10()) as f32
}

impl MetricCalculator for DynamicsMetric {
    type Feature = Vec<f32>;
    const KIND: MetricKind = MetricKind::Dynamics;

    fn key_params(&self) -> Vec<u32> {
        vec![
            self.window_size.to_bits(),
            self.window_advance.to_bits(),
            self.reference_power.to_bits(),
            self.mel_bands as u32,
        ]
    }

    fn compute(&self, signal: &AnalyzedSignal) -> Result<Vec<f32>, AnalysisError> {
        if !(self.window_size > 0.0) || !(self.window_advance > 0.0) || !(self.reference_power > 0.0) {
            return Err(AnalysisError::InvalidInput(format!(
                "Dynamics window ({}), advance ({}) and reference ({}) must be > 0",
                self.window_size, self.window_advance, self.reference_power
            )));
        }
        let audio = signal.signal();
        let time = audio.time_index();
        let num_windows = time.num_windows(self.window_size, self.window_advance);
        let frame_len = time.to_samples(self.window_size);
        if num_windows == 0 || frame_len < 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "Signal '{}' ({:.3}s) is shorter than one {:.3}s dynamics window",
                signal.name(),
                audio.duration(),
                self.window_size
            )));
        }

        let mut analyzer = SpectrumAnalyzer::new(frame_len, false)?;
        let filterbank =
            MelFilterbank::new(self.mel_bands, analyzer.spectrum_len(), audio.sample_rate())?;
        let weights: Vec<f32> = filterbank
            .band_centres_hz()
            .into_iter()
            .map(itu_r_468_weighting)
            .collect();

        let levels = (0..num_windows)
            .map(|w| {
                let frame = audio.window(w, self.window_size, self.window_advance);
                let bands = filterbank.apply(&analyzer.power_spectrum(frame))?;
                let total_power: f32 = bands
                    .iter()
                    .zip(&weights)
                    .map(|(&power, &weight)| {
                        let db = 10.0 * (power.max(EPSILON) / self.reference_power).log10();
                        10.0f32.powf((db + weight) / 10.0)
                    })
                    .sum();
                Ok(10.0 * total_power.max(f32::MIN_POSITIVE).log10())
            })
            .collect::<Result<Vec<f32>, AnalysisError>>()?;
        Ok(levels)
    }

    /// Truncate, normalise both by their joint maximum, then `exp(-MSE)`
    fn similarity(
        &self,
        a: &AnalyzedSignal,
        b: &AnalyzedSignal,
        feature_a: &Vec<f32>,
        feature_b: &Vec<f32>,
    ) -> Result<f32, AnalysisError> {
        let n = feature_a.len().min(feature_b.len());
        if n == 0 {
            let both_empty = feature_a.is_empty() && feature_b.is_empty();
            return Ok(degenerate_similarity(Self::KIND, a, b, both_empty));
        }
        let (fa, fb) = (&feature_a[..n], &feature_b[..n]);
        let joint_max = fa
            .iter()
            .chain(fb)
            .copied()
            .fold(f32::NEG_INFINITY, f32::max);

        let mse = if joint_max.abs() < EPSILON {
            log::warn!(
                "Dynamics of '{}' and '{}' peak at 0 dB, comparing unnormalised",
                a.name(),
                b.name()
            );
            truncated_mse(fa, fb)
        } else {
            let na: Vec<f32> = fa.iter().map(|v| v / joint_max).collect();
            let nb: Vec<f32> = fb.iter().map(|v| v / joint_max).collect();
            truncated_mse(&na, &nb)
        };
        match mse {
            Some(mse) => score_from_mse(Self::KIND, mse),
            None => Ok(degenerate_similarity(Self::KIND, a, b, false)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TempoConfig;
    use crate::io::Signal;

    fn swell(seconds: f32, name: &str) -> AnalyzedSignal {
        let sample_rate = 8000u32;
        let n = (seconds * sample_rate as f32) as usize;
        let samples = (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let envelope = 0.1 + 0.9 * (t / seconds);
                envelope * (2.0 * std::f32::consts::PI * 1000.0 * t).sin() * 1000.0
            })
            .collect();
        let signal = Signal::new(samples, sample_rate).unwrap().with_name(name);
        AnalyzedSignal::new(signal, TempoConfig::default()).unwrap()
    }

    #[test]
    fn test_itu_r_468_reference_points() {
        assert!((itu_r_468_weighting(1000.0)).abs() < 0.1);
        assert!((itu_r_468_weighting(100.0) + 19.8).abs() < 0.2);
        assert!((itu_r_468_weighting(5000.0) - 11.7).abs() < 0.2);
        assert!((itu_r_468_weighting(12500.0)).abs() < 0.2);
    }

    #[test]
    fn test_louder_windows_score_higher() {
        let metric = DynamicsMetric::default();
        let signal = swell(2.0, "swell");
        let levels = metric.compute(&signal).unwrap();
        assert_eq!(levels.len(), 46);
        assert!(levels.last().unwrap() > levels.first().unwrap());
        assert!(levels.iter().all(|v| v.is_finite()));
    }

    #[test]
    fn test_identical_and_symmetric() {
        let metric = DynamicsMetric::default();
        let (a, b) = (swell(2.0, "a"), swell(1.5, "b"));
        let fa = metric.compute(&a).unwrap();
        let fb = metric.compute(&b).unwrap();

        assert_eq!(metric.similarity(&a, &a, &fa, &fa).unwrap(), 1.0);
        let ab = metric.similarity(&a, &b, &fa, &fb).unwrap();
        let ba = metric.similarity(&b, &a, &fb, &fa).unwrap();
        assert_eq!(ab, ba);
        assert!(ab < 1.0);
    }

    #[test]
    fn test_zero_joint_max_is_finite() {
        let metric = DynamicsMetric::default();
        let a = swell(1.0, "a");
        let score = metric
            .similarity(&a, &a, &vec![0.0, -3.0], &vec![-1.0, 0.0])
            .unwrap();
        assert!((score - (-5.0f32).exp()).abs() < 1e-6);
    }

    #[test]
    fn test_too_short_signal_rejected() {
        let metric = DynamicsMetric::default();
        let signal = Signal::new(vec![0.0; 400], 8000).unwrap();
        let analyzed = AnalyzedSignal::new(signal, TempoConfig::default()).unwrap();
        assert!(metric.compute(&analyzed).is_err());
    }
}
