//! Dynamic-programming beat tracker
//!
//! Finds the beat sequence maximising total onset strength at the beats minus
//! a penalty for inter-beat intervals that stray from the global beat period.
//!
//! # Algorithm
//!
//! Over a fixed time grid, `score[w]` is the best cumulative score of a beat
//! sequence ending with a beat at grid index `w`, and `backtrace[w]` is the
//! grid index of the previous beat in that sequence:
//!
//! ```text
//! score[w] = max_p { weighting · -(ln((t_w - t_p) / period))² + score[p] } + onset(t_w)
//! ```
//!
//! with `p` restricted to `[w - 2·period, w - period/2)`. The sequence is read
//! back from `argmax(score)` by following `backtrace` down to index 0, which
//! every chain ends at.

use crate::config::TempoConfig;
use crate::error::AnalysisError;
use crate::features::onset::OnsetFunction;
use crate::features::period::GlobalTempo;
use crate::io::signal::WINDOW_TOLERANCE;

/// Track beats through an onset function
///
/// # Arguments
///
/// * `onset` - Onset-strength series
/// * `tempo` - Global tempo giving the ideal beat period
/// * `config` - Grid step (`beat_grid_advance`) and consistency weighting
///
/// # Returns
///
/// Beat times in seconds, non-decreasing, starting at 0.0
///
/// # Errors
///
/// Returns `AnalysisError::InvalidInput` if the grid step or beat period is
/// not positive
pub fn calculate_beats(
    onset: &OnsetFunction,
    tempo: &GlobalTempo,
    config: &TempoConfig,
) -> Result<Vec<f32>, AnalysisError> {
    let grid_advance = config.beat_grid_advance;
    let period = tempo.period_seconds;
    if !(grid_advance > 0.0) || !(period > 0.0) {
        return Err(AnalysisError::InvalidInput(format!(
            "Beat grid advance ({}) and beat period ({}) must be > 0",
            grid_advance, period
        )));
    }

    let grid_len = ((onset.duration() / grid_advance + WINDOW_TOLERANCE) as usize).max(1);
    let ideal_spacing = period / grid_advance;

    log::debug!(
        "Tracking beats: {} grid steps of {:.3}s, period {:.3}s ({:.1} steps), weighting {}",
        grid_len,
        grid_advance,
        period,
        ideal_spacing,
        config.beat_weighting
    );

    let mut score = vec![f32::NEG_INFINITY; grid_len];
    let mut backtrace = vec![0usize; grid_len];
    score[0] = 0.0;

    for w in 1..grid_len {
        let t = w as f32 * grid_advance;
        let earliest = (w as f32 - 2.0 * ideal_spacing).max(0.0) as usize;
        let latest = (w as f32 - ideal_spacing / 2.0).max(0.0) as usize;

        let mut best_score = f32::NEG_INFINITY;
        let mut best_prev = 0usize;
        for prev in earliest..latest.min(w) {
            let interval = t - prev as f32 * grid_advance;
            let candidate =
                config.beat_weighting * beat_consistency(interval, period) + score[prev];
            if candidate > best_score {
                best_score = candidate;
                best_prev = prev;
            }
        }

        if best_score > f32::NEG_INFINITY {
            score[w] = best_score + onset.index_time(t);
            backtrace[w] = best_prev;
        }
    }

    let mut last = 0usize;
    for (w, &s) in score.iter().enumerate() {
        if s > score[last] {
            last = w;
        }
    }

    let mut path = vec![last];
    let mut w = last;
    while w != 0 {
        w = backtrace[w];
        path.push(w);
    }
    path.reverse();

    let beats: Vec<f32> = path.iter().map(|&w| w as f32 * grid_advance).collect();

    log::debug!(
        "Tracked {} beats, last at {:.3}s (score {:.3})",
        beats.len(),
        beats.last().copied().unwrap_or(0.0),
        score[last]
    );

    Ok(beats)
}

/// Penalty for an inter-beat interval: 0 at the ideal period, falling with
/// the squared log-ratio otherwise
fn beat_consistency(interval: f32, ideal: f32) -> f32 {
    let ratio = (interval / ideal).ln();
    -(ratio * ratio)
}
