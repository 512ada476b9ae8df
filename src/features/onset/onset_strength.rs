//! Onset strength from log mel-band flux
//!
//! Algorithm:
//! 1. Resample to `resample_rate` (8 kHz by default)
//! 2. Hann-windowed power spectrum per window, projected onto mel bands
//! 3. dB relative to the loudest band/window in the recording
//! 4. Rectified first difference across windows, summed over bands
//! 5. Butterworth high-pass (removes slow level trends), Gaussian smoothing
//! 6. Divide by the standard deviation and pad the start so window `w`
//!    lines up with time `w * advance`

use crate::config::TempoConfig;
use crate::error::AnalysisError;
use crate::features::spectral::{MelFilterbank, SpectrumAnalyzer};
use crate::io::signal::WINDOW_TOLERANCE;
use crate::io::Signal;
use crate::preprocessing::filter::{convolve_same, gaussian_window, highpass_butterworth};
use crate::preprocessing::resample::resample;
use crate::preprocessing::series::mean_and_std;

use super::OnsetFunction;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Compute the onset-strength function of `signal`
///
/// # Arguments
///
/// * `signal` - Mono recording at any sample rate
/// * `config` - Window, filter and smoothing parameters
///
/// # Returns
///
/// One strength value per `config.onset_window_advance`, normalised to unit
/// standard deviation
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the configuration is invalid or
/// the signal is not longer than one analysis window
pub fn calculate_onset_function(
    signal: &Signal,
    config: &TempoConfig,
) -> Result<OnsetFunction, AnalysisError> {
    config.validate()?;

    let window_size = config.onset_window_size;
    let advance = config.onset_window_advance;
    let num_windows = signal.time_index().num_windows(window_size, advance);
    if num_windows == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Signal of {:.3}s is shorter than one {:.3}s onset window",
            signal.duration(),
            window_size
        )));
    }

    log::debug!(
        "Computing onset strength: {} samples at {} Hz, {} windows of {:.3}s every {:.3}s",
        signal.len(),
        signal.sample_rate(),
        num_windows,
        window_size,
        advance
    );

    let rate = config.resample_rate;
    let resampled = resample(signal.samples(), signal.sample_rate(), rate)?;
    let window_len = ((window_size * rate as f32) + WINDOW_TOLERANCE).round() as usize;
    let hop = ((advance * rate as f32) + WINDOW_TOLERANCE).round() as usize;
    if window_len == 0 || hop == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Onset windows are empty at {} Hz",
            rate
        )));
    }

    let mut analyzer = SpectrumAnalyzer::new(window_len, true)?;
    let filterbank = MelFilterbank::new(config.mel_bands, analyzer.spectrum_len(), rate)?;

    // Mel-band power per window
    let band_power = (0..num_windows)
        .map(|w| {
            let start = (w * hop).min(resampled.len());
            let end = (start + window_len).min(resampled.len());
            filterbank.apply(&analyzer.power_spectrum(&resampled[start..end]))
        })
        .collect::<Result<Vec<Vec<f32>>, AnalysisError>>()?;

    let max_power = band_power
        .iter()
        .flat_map(|bands| bands.iter().copied())
        .fold(0.0f32, f32::max)
        .max(EPSILON);
    if max_power <= EPSILON {
        log::warn!(
            "Signal '{}' is silent, onset strength will be flat",
            signal.display_name()
        );
    }

    let band_db: Vec<Vec<f32>> = band_power
        .iter()
        .map(|bands| {
            bands
                .iter()
                .map(|&p| 10.0 * (p.max(EPSILON) / max_power).log10())
                .collect()
        })
        .collect();

    // Rectified flux; the leading zero keeps one value per window
    let mut strength = Vec::with_capacity(num_windows);
    strength.push(0.0f32);
    for pair in band_db.windows(2) {
        let flux: f32 = pair[1]
            .iter()
            .zip(pair[0].iter())
            .map(|(cur, prev)| (cur - prev).max(0.0))
            .sum();
        strength.push(flux);
    }

    let frame_rate = 1.0 / advance;
    let filtered = highpass_butterworth(
        &strength,
        config.highpass_order,
        config.highpass_cutoff_hz,
        frame_rate,
    )?;

    let kernel_len = (config.envelope_length / advance + WINDOW_TOLERANCE) as usize;
    let kernel = gaussian_window(kernel_len.max(1), config.envelope_sigma / advance);
    let mut smoothed = convolve_same(&filtered, &kernel);

    let (_, std) = mean_and_std(&smoothed);
    if std > EPSILON {
        for value in &mut smoothed {
            *value /= std;
        }
    } else {
        log::warn!(
            "Onset strength of '{}' has no variation, skipping normalisation",
            signal.display_name()
        );
    }

    let padding = (window_size / advance + WINDOW_TOLERANCE) as usize;
    let mut data = vec![0.0f32; padding];
    data.extend_from_slice(&smoothed);

    if data.iter().any(|v| !v.is_finite()) {
        return Err(AnalysisError::NumericalError(format!(
            "Non-finite onset strength for '{}'",
            signal.display_name()
        )));
    }

    log::debug!(
        "Onset strength: {} windows ({} padding)",
        data.len(),
        padding
    );

    OnsetFunction::new(data, advance, signal.sample_rate())
}
