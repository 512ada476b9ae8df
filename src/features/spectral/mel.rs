//! Mel scale conversion and triangular mel filterbank

use crate::error::AnalysisError;

/// Convert a frequency in Hz to mels (`2595 log10(1 + f / 700)`)
pub fn hertz_to_mel(hz: f32) -> f32 {
    2595.0 * (1.0 + hz / 700.0).log10()
}

/// Convert mels back to Hz
pub fn mel_to_hertz(mel: f32) -> f32 {
    700.0 * (10.0f32.powf(mel / 2595.0) - 1.0)
}

/// Triangular filters spaced evenly on the mel scale between 0 Hz and Nyquist
///
/// Band edges are snapped to FFT bins; each band rises linearly from the
/// previous band's centre bin to its own and falls to the next band's centre.
#[derive(Debug, Clone)]
pub struct MelFilterbank {
    filters: Vec<MelBand>,
    spectrum_len: usize,
}

#[derive(Debug, Clone)]
struct MelBand {
    start_bin: usize,
    weights: Vec<f32>,
    centre_hz: f32,
}

impl MelFilterbank {
    /// Build a filterbank for spectra with `spectrum_len` non-negative bins
    ///
    /// # Arguments
    ///
    /// * `num_bands` - Number of mel bands
    /// * `spectrum_len` - Bins per spectrum (`fft_len / 2 + 1`)
    /// * `sample_rate` - Sample rate of the analysed signal in Hz
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for zero bands, fewer than two
    /// bins, or a zero sample rate
    pub fn new(
        num_bands: usize,
        spectrum_len: usize,
        sample_rate: u32,
    ) -> Result<Self, AnalysisError> {
        if num_bands == 0 || spectrum_len < 2 || sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(format!(
                "Invalid mel filterbank: {} bands, {} bins, {} Hz",
                num_bands, spectrum_len, sample_rate
            )));
        }

        let fft_len = 2 * (spectrum_len - 1);
        let max_mel = hertz_to_mel(sample_rate as f32 / 2.0);
        let edges_hz: Vec<f32> = (0..num_bands + 2)
            .map(|i| {
                let mel = max_mel * i as f32 / (num_bands + 1) as f32;
                mel_to_hertz(mel).trunc()
            })
            .collect();
        let edge_bins: Vec<usize> = edges_hz
            .iter()
            .map(|&hz| {
                let bin = ((fft_len + 1) as f32 * hz / sample_rate as f32).floor() as usize;
                bin.min(spectrum_len - 1)
            })
            .collect();

        let filters = (1..=num_bands)
            .map(|m| {
                let (prev, centre, next) = (edge_bins[m - 1], edge_bins[m], edge_bins[m + 1]);
                let mut weights = Vec::with_capacity(next.saturating_sub(prev));
                for j in prev..centre {
                    weights.push((j - prev) as f32 / (centre - prev) as f32);
                }
                for j in centre..next {
                    weights.push((next - j) as f32 / (next - centre) as f32);
                }
                MelBand {
                    start_bin: prev,
                    weights,
                    centre_hz: edges_hz[m],
                }
            })
            .collect();

        log::debug!(
            "Built mel filterbank: {} bands over {} bins at {} Hz",
            num_bands,
            spectrum_len,
            sample_rate
        );

        Ok(Self {
            filters,
            spectrum_len,
        })
    }

    /// Number of bands
    pub fn num_bands(&self) -> usize {
        self.filters.len()
    }

    /// Spectrum length the bank was built for
    pub fn spectrum_len(&self) -> usize {
        self.spectrum_len
    }

    /// Peak frequency of every band in Hz
    pub fn band_centres_hz(&self) -> Vec<f32> {
        self.filters.iter().map(|band| band.centre_hz).collect()
    }

    /// Project a spectrum onto the mel bands
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::ProcessingError` if `spectrum` does not have
    /// the length the bank was built for
    pub fn apply(&self, spectrum: &[f32]) -> Result<Vec<f32>, AnalysisError> {
        if spectrum.len() != self.spectrum_len {
            return Err(AnalysisError::ProcessingError(format!(
                "Mel filterbank expects {} bins, got a spectrum of {}",
                self.spectrum_len,
                spectrum.len()
            )));
        }
        Ok(self
            .filters
            .iter()
            .map(|band| {
                band.weights
                    .iter()
                    .zip(&spectrum[band.start_bin..])
                    .map(|(&w, &x)| w * x)
                    .sum()
            })
            .collect())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_hertz_to_mel_reference_value() {
        assert!((hertz_to_mel(440.0) - 549.638_67).abs() < 1e-3);
        assert_eq!(hertz_to_mel(0.0), 0.0);
    }

    #[test]
    fn test_mel_round_trip() {
        for &hz in &[1.0f32, 20.0, 440.0, 1000.0, 4000.0, 11025.0, 20000.0] {
            let back = mel_to_hertz(hertz_to_mel(hz));
            assert!(
                (back - hz).abs() / hz < 1e-4,
                "round trip of {} Hz gave {}",
                hz,
                back
            );
        }
    }

    #[test]
    fn test_filterbank_shape() {
        let bank = MelFilterbank::new(40, 257, 8000).unwrap();
        assert_eq!(bank.num_bands(), 40);
        let centres = bank.band_centres_hz();
        assert!(centres.windows(2).all(|w| w[1] >= w[0]));
        assert!(*centres.last().unwrap() < 4000.0);

        // A flat spectrum excites every band that spans at least one bin
        let bands = bank.apply(&vec![1.0; 257]).unwrap();
        assert_eq!(bands.len(), 40);
        assert!(bands.iter().all(|&b| b >= 0.0));
        assert!(bands[39] > 0.0);
    }

    #[test]
    fn test_spectrum_length_mismatch_is_processing_error() {
        let bank = MelFilterbank::new(40, 257, 8000).unwrap();
        assert!(matches!(
            bank.apply(&vec![1.0; 129]),
            Err(AnalysisError::ProcessingError(_))
        ));
        assert!(matches!(
            bank.apply(&[]),
            Err(AnalysisError::ProcessingError(_))
        ));
    }

    #[test]
    fn test_filterbank_invalid() {
        assert!(MelFilterbank::new(0, 257, 8000).is_err());
        assert!(MelFilterbank::new(40, 1, 8000).is_err());
        assert!(MelFilterbank::new(40, 257, 0).is_err());
    }
}
