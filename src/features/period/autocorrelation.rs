//! Global tempo from prior-weighted onset autocorrelation
//!
//! # Algorithm
//!
//! 1. For every lag τ (in onset windows) between one window and the slowest
//!    allowed beat period, correlate the onset function with itself shifted
//!    by τ: `r(τ) = Σ o[n + τ] · o[n]`
//! 2. Weight each lag with a log-Gaussian tempo prior centred on `tempo_bias`
//!    seconds per beat: `w(τ) = exp(-0.5 · (log2(τ / tempo_bias) / width)²)`
//! 3. The lag with the highest weighted correlation is the beat period;
//!    tempo = 60 / τ BPM
//!
//! The prior keeps the estimate away from the harmonics and sub-harmonics of
//! the true period, which correlate almost as well as the period itself.
//!
//! # Example
//!
//! ```
//! use perfprint::config::TempoConfig;
//! use perfprint::features::onset::OnsetFunction;
//! use perfprint::features::period::autocorrelation::calculate_global_tempo;
//!
//! // One pulse every 0.5 s on a 4 ms grid
//! let data: Vec<f32> = (0..2000).map(|i| if i % 125 == 0 { 1.0 } else { 0.0 }).collect();
//! let onset = OnsetFunction::new(data, 0.004, 44100)?;
//! let tempo = calculate_global_tempo(&onset, &TempoConfig::default())?;
//! assert_eq!(tempo.lag_windows, 125);
//! # Ok::<(), perfprint::AnalysisError>(())
//! ```

use super::GlobalTempo;
use crate::config::TempoConfig;
use crate::error::AnalysisError;
use crate::features::onset::OnsetFunction;

/// Estimate the global tempo of an onset function
///
/// # Arguments
///
/// * `onset` - Onset-strength series
/// * `config` - Tempo prior (`tempo_bias`, `envelope_width`) and slowest tempo
///
/// # Returns
///
/// The beat period maximising the weighted autocorrelation, in windows,
/// seconds and BPM. When no lag correlates positively the period closest to
/// `tempo_bias` is returned instead.
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the onset function has fewer
/// than two windows or the prior parameters are not positive
pub fn calculate_global_tempo(
    onset: &OnsetFunction,
    config: &TempoConfig,
) -> Result<GlobalTempo, AnalysisError> {
    if onset.len() < 2 {
        return Err(AnalysisError::InvalidInput(format!(
            "Need at least 2 onset windows for tempo estimation, got {}",
            onset.len()
        )));
    }
    if !(config.min_tempo_bpm > 0.0) || !(config.tempo_bias > 0.0) || !(config.envelope_width > 0.0)
    {
        return Err(AnalysisError::InvalidInput(
            "Tempo prior parameters must be > 0".to_string(),
        ));
    }

    let advance = onset.window_advance();
    let slowest_lag = (60.0 / config.min_tempo_bpm / advance) as usize;
    let max_lag = slowest_lag.min(onset.len() - 1).max(1);

    log::debug!(
        "Estimating global tempo: {} windows, lags 1..={}, bias={:.3}s, width={:.2} oct",
        onset.len(),
        max_lag,
        config.tempo_bias,
        config.envelope_width
    );

    let mut best_lag = 1usize;
    let mut best_score = f32::NEG_INFINITY;
    for lag in 1..=max_lag {
        let shift = lag as isize;
        let correlation = onset.shifted(shift).dot(&onset.shifted(-shift));
        let score = tempo_prior(lag as f32 * advance, config) * correlation;
        if score > best_score {
            best_score = score;
            best_lag = lag;
        }
    }

    if !(best_score > 0.0) {
        // No positive periodicity (silence or flat input): use the prior centre
        best_lag = ((config.tempo_bias / advance).round() as usize).clamp(1, max_lag);
        log::warn!(
            "Onset function has no periodicity (best weighted correlation {}), \
             falling back to the tempo prior centre of {:.3}s",
            best_score,
            best_lag as f32 * advance
        );
    }

    let period = best_lag as f32 * advance;
    let tempo = GlobalTempo {
        bpm: 60.0 / period,
        period_seconds: period,
        lag_windows: best_lag,
    };

    log::debug!(
        "Global tempo: {:.2} BPM (lag {} windows, weighted correlation {:.4})",
        tempo.bpm,
        best_lag,
        best_score
    );

    Ok(tempo)
}

/// Log-Gaussian weight of a beat period of `period` seconds
fn tempo_prior(period: f32, config: &TempoConfig) -> f32 {
    let octaves = (period / config.tempo_bias).log2() / config.envelope_width;
    (-0.5 * octaves * octaves).exp()
}
