//! Window functions and real-input spectra

use std::sync::Arc;

use rustfft::num_complex::Complex;
use rustfft::{Fft, FftPlanner};

use crate::error::AnalysisError;

/// Symmetric Hann window of `len` points
///
/// `w[n] = 0.5 - 0.5 cos(2πn / (len - 1))`; a single-point window is `[1.0]`.
pub fn hann_window(len: usize) -> Vec<f32> {
    match len {
        0 => Vec::new(),
        1 => vec![1.0],
        _ => {
            let denom = (len - 1) as f32;
            (0..len)
                .map(|n| 0.5 - 0.5 * (2.0 * std::f32::consts::PI * n as f32 / denom).cos())
                .collect()
        }
    }
}

/// Fixed-length real spectrum calculator
///
/// Plans the FFT once and reuses it for every frame of a series. Frames shorter
/// than the FFT length are zero-padded; the output holds the `len / 2 + 1`
/// non-negative frequency bins.
pub struct SpectrumAnalyzer {
    fft: Arc<dyn Fft<f32>>,
    taper: Option<Vec<f32>>,
    buffer: Vec<Complex<f32>>,
    scratch: Vec<Complex<f32>>,
}

impl SpectrumAnalyzer {
    /// Create an analyzer for frames of `frame_len` samples
    ///
    /// # Arguments
    ///
    /// * `frame_len` - FFT length in samples
    /// * `hann` - Apply a Hann taper before the transform
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if `frame_len` is 0
    pub fn new(frame_len: usize, hann: bool) -> Result<Self, AnalysisError> {
        if frame_len == 0 {
            return Err(AnalysisError::InvalidInput(
                "Spectrum frame length must be > 0".to_string(),
            ));
        }
        let mut planner = FftPlanner::<f32>::new();
        let fft = planner.plan_fft_forward(frame_len);
        let scratch = vec![Complex::new(0.0, 0.0); fft.get_inplace_scratch_len()];
        Ok(Self {
            fft,
            taper: hann.then(|| hann_window(frame_len)),
            buffer: vec![Complex::new(0.0, 0.0); frame_len],
            scratch,
        })
    }

    /// FFT length in samples
    pub fn frame_len(&self) -> usize {
        self.buffer.len()
    }

    /// Number of non-negative frequency bins produced per frame
    pub fn spectrum_len(&self) -> usize {
        self.buffer.len() / 2 + 1
    }

    /// Frequency spacing between adjacent bins
    pub fn bin_spacing_hz(&self, sample_rate: u32) -> f32 {
        sample_rate as f32 / self.buffer.len() as f32
    }

    fn transform(&mut self, frame: &[f32]) {
        for (i, slot) in self.buffer.iter_mut().enumerate() {
            let x = frame.get(i).copied().unwrap_or(0.0);
            let w = self.taper.as_ref().map_or(1.0, |t| t[i]);
            *slot = Complex::new(x * w, 0.0);
        }
        self.fft
            .process_with_scratch(&mut self.buffer, &mut self.scratch);
    }

    /// Complex spectrum of `frame` (non-negative bins only)
    pub fn complex_spectrum(&mut self, frame: &[f32]) -> Vec<Complex<f32>> {
        self.transform(frame);
        self.buffer[..self.spectrum_len()].to_vec()
    }

    /// Magnitude spectrum `|X[k]|`
    pub fn magnitude_spectrum(&mut self, frame: &[f32]) -> Vec<f32> {
        self.transform(frame);
        let bins = self.spectrum_len();
        self.buffer[..bins].iter().map(|c| c.norm()).collect()
    }

    /// Power spectrum `|X[k]|² / N`
    pub fn power_spectrum(&mut self, frame: &[f32]) -> Vec<f32> {
        self.transform(frame);
        let bins = self.spectrum_len();
        let n = self.buffer.len() as f32;
        self.buffer[..bins].iter().map(|c| c.norm_sqr() / n).collect()
    }
}
