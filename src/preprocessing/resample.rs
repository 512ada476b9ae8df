//! FFT-based sample-rate conversion
//!
//! The signal spectrum is truncated (downsampling) or zero-padded (upsampling)
//! and transformed back, which treats the signal as periodic. Good enough for
//! onset analysis where only the band-limited envelope matters.

use rustfft::num_complex::Complex;
use rustfft::FftPlanner;

use crate::error::AnalysisError;

/// Resample `samples` from `from_rate` to `to_rate` Hz
///
/// The output length is `floor(len * to_rate / from_rate)`.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` for zero rates, empty input, or an
/// output that would contain no samples.
pub fn resample(samples: &[f32], from_rate: u32, to_rate: u32) -> Result<Vec<f32>, AnalysisError> {
    if from_rate == 0 || to_rate == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Invalid resampling rates: {} -> {}",
            from_rate, to_rate
        )));
    }
    if samples.is_empty() {
        return Err(AnalysisError::InvalidInput(
            "Cannot resample empty signal".to_string(),
        ));
    }
    if from_rate == to_rate {
        return Ok(samples.to_vec());
    }

    let n = samples.len();
    let m = (n as u64 * to_rate as u64 / from_rate as u64) as usize;
    if m == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Signal of {} samples is too short to resample from {} Hz to {} Hz",
            n, from_rate, to_rate
        )));
    }

    log::debug!(
        "Resampling {} samples from {} Hz to {} Hz ({} samples)",
        n,
        from_rate,
        to_rate,
        m
    );

    let mut planner = FftPlanner::<f32>::new();

    let mut spectrum: Vec<Complex<f32>> = samples.iter().map(|&x| Complex::new(x, 0.0)).collect();
    planner.plan_fft_forward(n).process(&mut spectrum);

    // Keep the lowest min(n, m) frequencies: DC and positive bins at the start,
    // negative bins at the end.
    let k = n.min(m);
    let positive = k / 2 + 1;
    let negative = k.saturating_sub(positive);

    let mut resized = vec![Complex::new(0.0f32, 0.0); m];
    resized[..positive].copy_from_slice(&spectrum[..positive]);
    if negative > 0 {
        resized[m - negative..].copy_from_slice(&spectrum[n - negative..]);
    }

    // Split or join the Nyquist bin when the kept band has even length
    if k % 2 == 0 {
        let nyquist = k / 2;
        if m < n {
            resized[nyquist] += spectrum[n - nyquist];
        } else {
            resized[nyquist] *= 0.5;
            resized[m - nyquist] = resized[nyquist];
        }
    }

    planner.plan_fft_inverse(m).process(&mut resized);

    let scale = 1.0 / n as f32;
    Ok(resized.iter().map(|c| c.re * scale).collect())
}
