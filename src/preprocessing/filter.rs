//! Onset-strength conditioning filters
//!
//! - Butterworth high-pass (cascade of [`biquad`] sections) to strip slow level trends
//! - Gaussian smoothing by centred convolution

use biquad::{Biquad, Coefficients, DirectForm2Transposed, ToHertz, Type};

use crate::error::AnalysisError;

/// Apply a causal Butterworth high-pass filter of `order` to `signal`
///
/// The filter is built as `order / 2` second-order sections with Butterworth
/// pole Q values, plus one first-order section for odd orders. Sections run in
/// f64: at onset frame rates the cutoff sits very close to DC and f32
/// coefficients lose the pole positions.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if `order` is 0 or the cutoff is not
/// strictly between 0 and Nyquist.
pub fn highpass_butterworth(
    signal: &[f32],
    order: usize,
    cutoff_hz: f32,
    sample_rate_hz: f32,
) -> Result<Vec<f32>, AnalysisError> {
    if order == 0 {
        return Err(AnalysisError::InvalidInput(
            "Filter order must be > 0".to_string(),
        ));
    }
    if !(cutoff_hz > 0.0) || cutoff_hz >= sample_rate_hz / 2.0 {
        return Err(AnalysisError::InvalidInput(format!(
            "High-pass cutoff {:.3} Hz must be within (0, {:.3}) Hz",
            cutoff_hz,
            sample_rate_hz / 2.0
        )));
    }

    let fs = (sample_rate_hz as f64).hz();
    let f0 = (cutoff_hz as f64).hz();

    let mut sections: Vec<DirectForm2Transposed<f64>> = Vec::with_capacity(order / 2 + 1);
    for k in 1..=order / 2 {
        let angle = (2 * k - 1) as f64 * std::f64::consts::PI / (2 * order) as f64;
        let q = 1.0 / (2.0 * angle.sin());
        let coefficients = Coefficients::<f64>::from_params(Type::HighPass, fs, f0, q)
            .map_err(|e| {
                AnalysisError::InvalidInput(format!("Invalid high-pass section: {:?}", e))
            })?;
        sections.push(DirectForm2Transposed::<f64>::new(coefficients));
    }
    if order % 2 == 1 {
        sections.push(DirectForm2Transposed::<f64>::new(first_order_highpass(
            cutoff_hz as f64,
            sample_rate_hz as f64,
        )));
    }

    Ok(signal
        .iter()
        .map(|&x| {
            sections
                .iter_mut()
                .fold(x as f64, |acc, section| section.run(acc)) as f32
        })
        .collect())
}

/// Bilinear-transform first-order high-pass, expressed as a degenerate biquad
fn first_order_highpass(cutoff_hz: f64, sample_rate_hz: f64) -> Coefficients<f64> {
    let k = (std::f64::consts::PI * cutoff_hz / sample_rate_hz).tan();
    let norm = 1.0 / (1.0 + k);
    Coefficients {
        a1: (k - 1.0) * norm,
        a2: 0.0,
        b0: norm,
        b1: -norm,
        b2: 0.0,
    }
}

/// Symmetric Gaussian window of `len` points with standard deviation `std` (in points)
pub fn gaussian_window(len: usize, std: f32) -> Vec<f32> {
    if len == 0 {
        return Vec::new();
    }
    let centre = (len as f32 - 1.0) / 2.0;
    let denom = 2.0 * std * std;
    (0..len)
        .map(|i| {
            let n = i as f32 - centre;
            if denom > 0.0 {
                (-(n * n) / denom).exp()
            } else if n == 0.0 {
                1.0
            } else {
                0.0
            }
        })
        .collect()
}

/// Convolve `signal` with `kernel`, keeping the centred part of the full
/// convolution so the output has the length of `signal` and no added delay
pub fn convolve_same(signal: &[f32], kernel: &[f32]) -> Vec<f32> {
    if signal.is_empty() || kernel.is_empty() {
        return signal.to_vec();
    }
    let offset = (kernel.len() - 1) / 2;
    (0..signal.len())
        .map(|i| {
            // full[i + offset] = sum_j signal[i + offset - j] * kernel[j]
            let full_index = i + offset;
            let j_start = full_index.saturating_sub(signal.len() - 1);
            let j_end = full_index.min(kernel.len() - 1);
            (j_start..=j_end)
                .map(|j| signal[full_index - j] * kernel[j])
                .sum()
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_highpass_removes_dc() {
        let signal = vec![1.0f32; 5000];
        let filtered = highpass_butterworth(&signal, 5, 0.3, 250.0).unwrap();
        assert_eq!(filtered.len(), signal.len());
        // After several time constants the step response has decayed
        let tail = &filtered[4000..];
        assert!(
            tail.iter().all(|x| x.abs() < 0.05),
            "DC should be removed, tail max {}",
            tail.iter().fold(0.0f32, |m, x| m.max(x.abs()))
        );
    }

    #[test]
    fn test_highpass_passes_fast_changes() {
        // 20 Hz tone at 250 Hz frame rate is far above the 0.3 Hz cutoff
        let signal: Vec<f32> = (0..2500)
            .map(|i| (2.0 * std::f32::consts::PI * 20.0 * i as f32 / 250.0).sin())
            .collect();
        let filtered = highpass_butterworth(&signal, 5, 0.3, 250.0).unwrap();
        let peak = filtered[1000..].iter().fold(0.0f32, |m, x| m.max(x.abs()));
        assert!(peak > 0.9 && peak < 1.1, "passband gain should be ~1, got {}", peak);
    }

    #[test]
    fn test_highpass_invalid_params() {
        assert!(highpass_butterworth(&[0.0], 0, 0.3, 250.0).is_err());
        assert!(highpass_butterworth(&[0.0], 5, 0.0, 250.0).is_err());
        assert!(highpass_butterworth(&[0.0], 5, 125.0, 250.0).is_err());
    }

    #[test]
    fn test_gaussian_window_shape() {
        let window = gaussian_window(20, 5.0);
        assert_eq!(window.len(), 20);
        // Symmetric around the centre, peak in the middle
        for i in 0..10 {
            assert!((window[i] - window[19 - i]).abs() < 1e-6);
        }
        assert!(window[9] > window[0]);
        assert!(window[9] <= 1.0);
    }

    #[test]
    fn test_convolve_same_impulse_stays_centred() {
        let mut signal = vec![0.0f32; 11];
        signal[5] = 1.0;
        let kernel = [0.25, 0.5, 0.25];
        let out = convolve_same(&signal, &kernel);
        assert_eq!(out.len(), 11);
        assert_eq!(out[4], 0.25);
        assert_eq!(out[5], 0.5);
        assert_eq!(out[6], 0.25);
    }
}
