//! Windowed onset-strength series

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;
use crate::io::signal::WINDOW_TOLERANCE;

/// Onset strength sampled once per analysis window
///
/// `data[w]` scores how much window `w` (starting at `w * window_advance`
/// seconds) looks like a note onset. All lookups clamp to the last window, so
/// indexing past the end never panics.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct OnsetFunction {
    data: Vec<f32>,
    window_advance: f32,
    sample_rate: u32,
}

impl OnsetFunction {
    /// Wrap an onset-strength series
    ///
    /// # Arguments
    ///
    /// * `data` - One strength value per window
    /// * `window_advance` - Seconds between consecutive windows
    /// * `sample_rate` - Sample rate of the source signal in Hz
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` for empty data, a non-positive
    /// advance or a zero sample rate
    pub fn new(data: Vec<f32>, window_advance: f32, sample_rate: u32) -> Result<Self, AnalysisError> {
        if data.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Onset function needs at least one window".to_string(),
            ));
        }
        if !(window_advance > 0.0) || !window_advance.is_finite() {
            return Err(AnalysisError::InvalidInput(format!(
                "Onset window advance must be > 0, got {}",
                window_advance
            )));
        }
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }
        Ok(Self {
            data,
            window_advance,
            sample_rate,
        })
    }

    /// Raw strength values
    pub fn data(&self) -> &[f32] {
        &self.data
    }

    /// Number of windows
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// Always false: construction rejects empty series
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Seconds between windows
    pub fn window_advance(&self) -> f32 {
        self.window_advance
    }

    /// Sample rate of the signal the series was derived from
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Time covered by the series in seconds
    pub fn duration(&self) -> f32 {
        self.windows_to_time(self.data.len())
    }

    /// Window containing time `seconds` (negative times map to window 0)
    pub fn time_to_windows(&self, seconds: f32) -> usize {
        if seconds <= 0.0 {
            return 0;
        }
        (seconds / self.window_advance + WINDOW_TOLERANCE).floor() as usize
    }

    /// Window containing source-signal sample `sample`
    pub fn samples_to_windows(&self, sample: usize) -> usize {
        self.time_to_windows(sample as f32 / self.sample_rate as f32)
    }

    /// Start time of window `window`
    pub fn windows_to_time(&self, window: usize) -> f32 {
        window as f32 * self.window_advance
    }

    /// Strength at window `window`, clamped to the last window
    pub fn index_window(&self, window: usize) -> f32 {
        self.data[window.min(self.data.len() - 1)]
    }

    /// Strength at time `seconds`, clamped to the last window
    pub fn index_time(&self, seconds: f32) -> f32 {
        self.index_window(self.time_to_windows(seconds))
    }

    /// Strength at source-signal sample `sample`, clamped to the last window
    pub fn index_samples(&self, sample: usize) -> f32 {
        self.index_window(self.samples_to_windows(sample))
    }

    /// Full series as a view
    pub fn view(&self) -> OnsetView<'_> {
        OnsetView {
            data: &self.data,
            window_advance: self.window_advance,
        }
    }

    /// Series shifted by `shift` windows
    ///
    /// A positive shift drops the first `shift` windows (the view starts
    /// later); a negative shift drops the last `|shift|` windows. Shifts
    /// beyond the length give an empty view.
    pub fn shifted(&self, shift: isize) -> OnsetView<'_> {
        let k = shift.unsigned_abs().min(self.data.len());
        let data = if shift >= 0 {
            &self.data[k..]
        } else {
            &self.data[..self.data.len() - k]
        };
        OnsetView {
            data,
            window_advance: self.window_advance,
        }
    }

    /// Inner product with a view, over the shorter length
    pub fn dot(&self, other: &OnsetView<'_>) -> f32 {
        self.view().dot(other)
    }
}

/// Read-only window range of an [`OnsetFunction`]
#[derive(Debug, Clone, Copy)]
pub struct OnsetView<'a> {
    data: &'a [f32],
    window_advance: f32,
}

impl<'a> OnsetView<'a> {
    /// Strength values in the view
    pub fn data(&self) -> &'a [f32] {
        self.data
    }

    /// Number of windows in the view
    pub fn len(&self) -> usize {
        self.data.len()
    }

    /// True if the shift consumed every window
    pub fn is_empty(&self) -> bool {
        self.data.is_empty()
    }

    /// Seconds between windows
    pub fn window_advance(&self) -> f32 {
        self.window_advance
    }

    /// Inner product over the shorter of the two views
    pub fn dot(&self, other: &OnsetView<'_>) -> f32 {
        self.data
            .iter()
            .zip(other.data.iter())
            .map(|(a, b)| a * b)
            .sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn ramp(n: usize) -> OnsetFunction {
        OnsetFunction::new((0..n).map(|i| i as f32).collect(), 0.004, 44100).unwrap()
    }

    #[test]
    fn test_index_window_clamps() {
        let onset = ramp(10);
        assert_eq!(onset.index_window(3), 3.0);
        assert_eq!(onset.index_window(9), 9.0);
        assert_eq!(onset.index_window(10), 9.0);
        assert_eq!(onset.index_window(usize::MAX), 9.0);
        assert_eq!(onset.index_time(100.0), 9.0);
        assert_eq!(onset.index_samples(44100 * 60), 9.0);
    }

    #[test]
    fn test_time_window_conversion() {
        let onset = ramp(100);
        assert_eq!(onset.time_to_windows(3.0 * 0.004), 3);
        assert_eq!(onset.time_to_windows(0.0041), 1);
        assert_eq!(onset.time_to_windows(-1.0), 0);
        assert_eq!(onset.samples_to_windows(4410), 25);
        assert!((onset.windows_to_time(25) - 0.1).abs() < 1e-6);
        assert_eq!(onset.index_time(0.02), 5.0);
    }

    #[test]
    fn test_shifted_views_do_not_touch_source() {
        let onset = ramp(5);
        let later = onset.shifted(2);
        let earlier = onset.shifted(-2);
        assert_eq!(later.data(), &[2.0, 3.0, 4.0]);
        assert_eq!(earlier.data(), &[0.0, 1.0, 2.0]);
        assert_eq!(later.dot(&earlier), 0.0 * 2.0 + 1.0 * 3.0 + 2.0 * 4.0);
        assert!(onset.shifted(7).is_empty());
        assert!(onset.shifted(-7).is_empty());
        assert_eq!(onset.data(), &[0.0, 1.0, 2.0, 3.0, 4.0]);
    }

    #[test]
    fn test_dot_uses_shorter_length() {
        let onset = ramp(4);
        assert_eq!(onset.dot(&onset.shifted(1)), 0.0 * 1.0 + 1.0 * 2.0 + 2.0 * 3.0);
    }

    #[test]
    fn test_invalid_onset_function() {
        assert!(OnsetFunction::new(vec![], 0.004, 44100).is_err());
        assert!(OnsetFunction::new(vec![1.0], 0.0, 44100).is_err());
        assert!(OnsetFunction::new(vec![1.0], 0.004, 0).is_err());
    }
}
