//! Timbre: pitch-normalised MFCCs at every beat

use serde::{Deserialize, Serialize};

use super::{degenerate_similarity, score_from_mse, MetricCalculator, MetricKind};
use crate::analysis::AnalyzedSignal;
use crate::error::AnalysisError;
use crate::features::spectral::{dct2_orthonormal, MelFilterbank, SpectrumAnalyzer};

/// Absolute floor applied to mel energies before the logarithm
const LOG_FLOOR: f32 = 1e-10;

/// Energies are also floored this far below the frame's strongest band (60 dB)
const RELATIVE_FLOOR: f32 = 1e-6;

/// MFCCs of a short window starting at each beat
///
/// Before the mel projection the spectrum is shifted so its strongest bin
/// lands on `target_pitch`, which makes the descriptor insensitive to the
/// note being played.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TimbreMetric {
    /// Window length in seconds (default: 0.3)
    pub window_size: f32,

    /// Frequency the dominant bin is moved to, Hz (default: 440)
    pub target_pitch: f32,

    /// Number of mel bands, and so of coefficients (default: 40)
    pub mel_bands: usize,
}

impl Default for TimbreMetric {
    fn default() -> Self {
        Self {
            window_size: 0.3,
            target_pitch: 440.0,
            mel_bands: 40,
        }
    }
}

/// Move the largest bin of `spectrum` to the bin of `target_hz`
///
/// Bins rotated in from the other end are zeroed.
fn shift_to_target(spectrum: &[f32], target_hz: f32, bin_spacing_hz: f32) -> Vec<f32> {
    let len = spectrum.len();
    if len == 0 || !(bin_spacing_hz > 0.0) {
        return spectrum.to_vec();
    }
    let mut peak = 0usize;
    for (i, &v) in spectrum.iter().enumerate() {
        if v > spectrum[peak] {
            peak = i;
        }
    }
    let dominant_hz = peak as f32 * bin_spacing_hz;
    let shift = ((target_hz - dominant_hz) / bin_spacing_hz) as isize;

    let mut shifted = vec![0.0f32; len];
    for (i, &v) in spectrum.iter().enumerate() {
        let target = i as isize + shift;
        if target >= 0 && (target as usize) < len {
            shifted[target as usize] = v;
        }
    }
    shifted
}

impl TimbreMetric {
    /// MFCCs of one frame
    ///
    /// Mel energies are floored 60 dB below the frame's strongest band, so
    /// empty bands all sit at the same level instead of tracking the noise.
    fn frame_mfccs(
        &self,
        frame: &[f32],
        analyzer: &mut SpectrumAnalyzer,
        filterbank: &MelFilterbank,
        bin_spacing_hz: f32,
    ) -> Result<Vec<f32>, AnalysisError> {
        let power = analyzer.power_spectrum(frame);
        let shifted = shift_to_target(&power, self.target_pitch, bin_spacing_hz);
        let energies = filterbank.apply(&shifted)?;
        let peak = energies.iter().copied().fold(0.0f32, f32::max);
        let floor = (peak * RELATIVE_FLOOR).max(LOG_FLOOR);
        let log_energies: Vec<f32> = energies.into_iter().map(|e| e.max(floor).ln()).collect();
        Ok(dct2_orthonormal(&log_energies))
    }
}

impl MetricCalculator for TimbreMetric {
    type Feature = Vec<Vec<f32>>;
    const KIND: MetricKind = MetricKind::Timbre;

    fn key_params(&self) -> Vec<u32> {
        vec![
            self.window_size.to_bits(),
            self.target_pitch.to_bits(),
            self.mel_bands as u32,
        ]
    }

    fn compute(&self, signal: &AnalyzedSignal) -> Result<Vec<Vec<f32>>, AnalysisError> {
        if !(self.window_size > 0.0) || !(self.target_pitch > 0.0) {
            return Err(AnalysisError::InvalidInput(format!(
                "Timbre window ({}) and target pitch ({}) must be > 0",
                self.window_size, self.target_pitch
            )));
        }
        let audio = signal.signal();
        let frame_len = audio.to_samples(self.window_size);
        if frame_len < 2 {
            return Err(AnalysisError::InvalidInput(format!(
                "Timbre window of {:.3}s is under two samples at {} Hz",
                self.window_size,
                audio.sample_rate()
            )));
        }

        let rhythm = signal.rhythm()?;
        let mut analyzer = SpectrumAnalyzer::new(frame_len, false)?;
        let filterbank =
            MelFilterbank::new(self.mel_bands, analyzer.spectrum_len(), audio.sample_rate())?;
        let spacing = analyzer.bin_spacing_hz(audio.sample_rate());

        rhythm
            .beat_times
            .iter()
            .map(|&beat| {
                let start = audio.to_samples(beat).min(audio.len());
                let end = audio.to_samples(beat + self.window_size).min(audio.len());
                let frame = &audio.samples()[start..end.max(start)];
                self.frame_mfccs(frame, &mut analyzer, &filterbank, spacing)
            })
            .collect()
    }

    /// Per-beat summed squared coefficient error, averaged over beats
    fn similarity(
        &self,
        a: &AnalyzedSignal,
        b: &AnalyzedSignal,
        feature_a: &Vec<Vec<f32>>,
        feature_b: &Vec<Vec<f32>>,
    ) -> Result<f32, AnalysisError> {
        let n = feature_a.len().min(feature_b.len());
        if n == 0 {
            let both_empty = feature_a.is_empty() && feature_b.is_empty();
            return Ok(degenerate_similarity(Self::KIND, a, b, both_empty));
        }
        let total: f32 = feature_a[..n]
            .iter()
            .zip(&feature_b[..n])
            .map(|(ma, mb)| {
                ma.iter()
                    .zip(mb)
                    .map(|(x, y)| {
                        let d = x - y;
                        d * d
                    })
                    .sum::<f32>()
            })
            .sum();
        score_from_mse(Self::KIND, total / n as f32)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::TempoConfig;
    use crate::io::Signal;

    fn plucked(freq: f32, harmonics: &[f32], name: &str) -> AnalyzedSignal {
        let sample_rate = 8000u32;
        let n = sample_rate as usize * 3;
        let samples = (0..n)
            .map(|i| {
                let t = i as f32 / sample_rate as f32;
                let envelope = (-(t % 0.5) * 6.0).exp();
                harmonics
                    .iter()
                    .enumerate()
                    .map(|(k, &amp)| {
                        amp * (2.0 * std::f32::consts::PI * freq * (k + 1) as f32 * t).sin()
                    })
                    .sum::<f32>()
                    * envelope
            })
            .collect();
        let signal = Signal::new(samples, sample_rate).unwrap().with_name(name);
        AnalyzedSignal::new(signal, TempoConfig::default()).unwrap()
    }

    #[test]
    fn test_shift_to_target() {
        let spectrum = [0.0, 0.0, 5.0, 1.0, 0.5, 0.0];
        // Peak at bin 2 (20 Hz), target 40 Hz => shift by 2 bins
        let shifted = shift_to_target(&spectrum, 40.0, 10.0);
        assert_eq!(shifted, vec![0.0, 0.0, 0.0, 0.0, 5.0, 1.0]);
        // Shift down by one bin; the wrapped top bin is zeroed
        let shifted = shift_to_target(&spectrum, 10.0, 10.0);
        assert_eq!(shifted, vec![0.0, 5.0, 1.0, 0.5, 0.0, 0.0]);
    }

    #[test]
    fn test_mfcc_count_matches_bands() {
        let metric = TimbreMetric::default();
        let signal = plucked(330.0, &[1.0, 0.5, 0.25], "pluck");
        let feature = metric.compute(&signal).unwrap();
        let beats = signal.rhythm().unwrap().beat_times.len();
        assert_eq!(feature.len(), beats);
        assert!(feature.iter().all(|m| m.len() == 40));
        assert!(feature.iter().flatten().all(|c| c.is_finite()));
    }

    fn with_noise(signal: &AnalyzedSignal, amplitude: f32, name: &str) -> AnalyzedSignal {
        let mut state = 12_345u32;
        let samples = signal
            .signal()
            .samples()
            .iter()
            .map(|&x| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                x + amplitude * ((state >> 8) as f32 / (1u32 << 24) as f32 * 2.0 - 1.0)
            })
            .collect();
        let noisy = Signal::new(samples, signal.signal().sample_rate())
            .unwrap()
            .with_name(name);
        AnalyzedSignal::new(noisy, TempoConfig::default()).unwrap()
    }

    #[test]
    fn test_faint_noise_keeps_timbre_close() {
        let metric = TimbreMetric::default();
        let clean = plucked(330.0, &[1.0, 0.5, 0.25], "clean");
        let noisy = with_noise(&clean, 0.001, "noisy");
        let dull = plucked(330.0, &[1.0, 0.05, 0.01], "dull");

        let f_clean = metric.compute(&clean).unwrap();
        let f_noisy = metric.compute(&noisy).unwrap();
        let f_dull = metric.compute(&dull).unwrap();

        let close = metric.similarity(&clean, &noisy, &f_clean, &f_noisy).unwrap();
        let far = metric.similarity(&clean, &dull, &f_clean, &f_dull).unwrap();
        assert!(close > 0.1, "noisy copy scored {}", close);
        assert!(close > far, "noisy copy {} vs different timbre {}", close, far);
    }

    #[test]
    fn test_silent_frame_is_finite() {
        let metric = TimbreMetric::default();
        let mut analyzer = SpectrumAnalyzer::new(2400, false).unwrap();
        let filterbank = MelFilterbank::new(40, analyzer.spectrum_len(), 8000).unwrap();
        let spacing = analyzer.bin_spacing_hz(8000);
        let mfccs = metric
            .frame_mfccs(&vec![0.0; 2400], &mut analyzer, &filterbank, spacing)
            .unwrap();
        assert_eq!(mfccs.len(), 40);
        assert!(mfccs.iter().all(|c| c.is_finite()));
    }

    #[test]
    fn test_identical_and_symmetric() {
        let metric = TimbreMetric::default();
        let a = plucked(330.0, &[1.0, 0.5, 0.25], "bright");
        let b = plucked(330.0, &[1.0, 0.05, 0.01], "dull");
        let fa = metric.compute(&a).unwrap();
        let fb = metric.compute(&b).unwrap();

        assert_eq!(metric.similarity(&a, &a, &fa, &fa).unwrap(), 1.0);
        let ab = metric.similarity(&a, &b, &fa, &fb).unwrap();
        let ba = metric.similarity(&b, &a, &fb, &fa).unwrap();
        assert_eq!(ab, ba);
        assert!(ab < 1.0);
    }
}
