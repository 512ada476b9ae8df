//! Pitch class profile extraction
//!
//! Folds the magnitude spectrum of each analysis window onto the 12 semitone
//! classes (C = 0 … B = 11) by summing the bins of every piano pitch
//! (MIDI 21–108) into `pitch % 12`.

use crate::error::AnalysisError;
use crate::features::spectral::SpectrumAnalyzer;
use crate::io::Signal;

/// Numerical stability epsilon
const EPSILON: f32 = 1e-10;

/// Lowest pitch folded into the profile (A0)
const LOWEST_PITCH: u8 = 21;

/// Highest pitch folded into the profile (C8)
const HIGHEST_PITCH: u8 = 108;

/// Frequency of a (possibly fractional) MIDI pitch, A4 = 440 Hz
fn pitch_to_hertz(pitch: f32) -> f32 {
    2.0f32.powf((pitch - 69.0) / 12.0) * 440.0
}

/// Pitch class profile of a single magnitude spectrum
///
/// # Arguments
///
/// * `magnitudes` - Non-negative magnitude bins `0..=Nyquist`
/// * `bin_spacing_hz` - Frequency step between bins
///
/// # Returns
///
/// Summed magnitude per pitch class (unnormalised)
pub fn pitch_class_profile(magnitudes: &[f32], bin_spacing_hz: f32) -> [f32; 12] {
    let mut profile = [0.0f32; 12];
    if magnitudes.is_empty() || !(bin_spacing_hz > 0.0) {
        return profile;
    }
    let to_bin = |hz: f32| ((hz.trunc() / bin_spacing_hz) as usize).min(magnitudes.len());

    for pitch in LOWEST_PITCH..=HIGHEST_PITCH {
        let lower = to_bin(pitch_to_hertz(pitch as f32 - 0.5));
        let upper = to_bin(pitch_to_hertz(pitch as f32 + 0.5));
        let energy: f32 = magnitudes[lower..upper.max(lower)].iter().sum();
        profile[(pitch % 12) as usize] += energy;
    }
    profile
}

/// Extract one pitch class profile per analysis window
///
/// Profiles are normalised by the largest class value over the whole
/// recording, so the loudest window/class is 1.0.
///
/// # Arguments
///
/// * `signal` - Mono recording
/// * `window_size` - Window length in seconds (default: 0.1)
/// * `window_advance` - Window advance in seconds (default: 0.025)
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the window parameters are not
/// positive or the signal is shorter than one window
pub fn extract_chroma(
    signal: &Signal,
    window_size: f32,
    window_advance: f32,
) -> Result<Vec<[f32; 12]>, AnalysisError> {
    if !(window_size > 0.0) || !(window_advance > 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "Chroma window size ({}) and advance ({}) must be > 0",
            window_size, window_advance
        )));
    }
    let time = signal.time_index();
    let num_windows = time.num_windows(window_size, window_advance);
    let frame_len = time.to_samples(window_size);
    if num_windows == 0 || frame_len == 0 {
        return Err(AnalysisError::InvalidInput(format!(
            "Signal '{}' ({:.3}s) is shorter than one {:.3}s chroma window",
            signal.display_name(),
            signal.duration(),
            window_size
        )));
    }

    log::debug!(
        "Extracting chroma: {} windows of {} samples at {} Hz",
        num_windows,
        frame_len,
        signal.sample_rate()
    );

    let mut analyzer = SpectrumAnalyzer::new(frame_len, false)?;
    let spacing = analyzer.bin_spacing_hz(signal.sample_rate());
    let mut chroma: Vec<[f32; 12]> = (0..num_windows)
        .map(|w| {
            let magnitudes = analyzer.magnitude_spectrum(signal.window(w, window_size, window_advance));
            pitch_class_profile(&magnitudes, spacing)
        })
        .collect();

    let max = chroma
        .iter()
        .flat_map(|profile| profile.iter().copied())
        .fold(0.0f32, f32::max);
    if max > EPSILON {
        for profile in &mut chroma {
            for value in profile.iter_mut() {
                *value /= max;
            }
        }
    } else {
        log::warn!(
            "Chroma of '{}' is all zero, skipping normalisation",
            signal.display_name()
        );
    }

    Ok(chroma)
}
