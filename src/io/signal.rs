//! Mono signal container and sample/second/window conversions

use crate::error::AnalysisError;

/// Tolerance (in windows) absorbed when flooring a time to a window index, so
/// that `3 * 0.004 / 0.004` lands on window 3 despite f32 rounding.
pub const WINDOW_TOLERANCE: f32 = 1e-4;

/// Converts between sample counts, seconds and analysis windows for a signal
/// of `len` samples at `sample_rate` Hz.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct TimeIndex {
    sample_rate: u32,
    len: usize,
}

impl TimeIndex {
    /// Create a time index; `sample_rate` must be non-zero
    pub fn new(sample_rate: u32, len: usize) -> Result<Self, AnalysisError> {
        if sample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Invalid sample rate: 0".to_string(),
            ));
        }
        Ok(Self { sample_rate, len })
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    /// Duration of the whole signal in seconds
    pub fn duration(&self) -> f32 {
        self.to_seconds(self.len)
    }

    /// Convert a sample count to seconds
    pub fn to_seconds(&self, num_samples: usize) -> f32 {
        num_samples as f32 / self.sample_rate as f32
    }

    /// Convert seconds to a sample count (truncating, negative times give 0)
    pub fn to_samples(&self, seconds: f32) -> usize {
        (seconds * self.sample_rate as f32).max(0.0) as usize
    }

    /// Number of complete analysis windows of `window_size` seconds advancing by
    /// `window_advance` seconds that fit in the signal
    pub fn num_windows(&self, window_size: f32, window_advance: f32) -> usize {
        if window_advance <= 0.0 {
            return 0;
        }
        ((self.duration() - window_size) / window_advance + WINDOW_TOLERANCE).max(0.0) as usize
    }

    /// Sample range `[start, end)` of analysis window `window`, clamped to the signal
    pub fn window_bounds(
        &self,
        window: usize,
        window_size: f32,
        window_advance: f32,
    ) -> (usize, usize) {
        let start_time = window as f32 * window_advance;
        let start = self.to_samples(start_time).min(self.len);
        let end = self.to_samples(start_time + window_size).min(self.len);
        (start, end.max(start))
    }
}

/// A decoded mono recording
///
/// Immutable once created: every derived artifact (onset function, beats,
/// features) is cached alongside it by [`crate::analysis::AnalyzedSignal`].
#[derive(Debug, Clone, PartialEq)]
pub struct Signal {
    samples: Vec<f32>,
    time: TimeIndex,
    name: Option<String>,
}

impl Signal {
    /// Create a signal from mono samples
    ///
    /// # Errors
    ///
    /// Returns `AnalysisError::InvalidInput` if `samples` is empty or `sample_rate` is 0.
    pub fn new(samples: Vec<f32>, sample_rate: u32) -> Result<Self, AnalysisError> {
        if samples.is_empty() {
            return Err(AnalysisError::InvalidInput(
                "Empty audio samples".to_string(),
            ));
        }
        let time = TimeIndex::new(sample_rate, samples.len())?;
        Ok(Self {
            samples,
            time,
            name: None,
        })
    }

    /// Create a mono signal from interleaved multi-channel samples by averaging channels
    ///
    /// A trailing partial frame is dropped.
    pub fn from_interleaved(
        interleaved: &[f32],
        channels: usize,
        sample_rate: u32,
    ) -> Result<Self, AnalysisError> {
        if channels == 0 {
            return Err(AnalysisError::InvalidInput(
                "Channel count must be > 0".to_string(),
            ));
        }
        let mono: Vec<f32> = interleaved
            .chunks_exact(channels)
            .map(|frame| frame.iter().sum::<f32>() / channels as f32)
            .collect();
        Self::new(mono, sample_rate)
    }

    /// Attach a name used in diagnostics and results
    pub fn with_name(mut self, name: impl Into<String>) -> Self {
        self.name = Some(name.into());
        self
    }

    /// Samples of the signal
    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    /// Sample rate in Hz
    pub fn sample_rate(&self) -> u32 {
        self.time.sample_rate()
    }

    /// Optional name
    pub fn name(&self) -> Option<&str> {
        self.name.as_deref()
    }

    /// Name for log and error messages
    pub fn display_name(&self) -> &str {
        self.name.as_deref().unwrap_or("<unnamed>")
    }

    /// Number of samples
    pub fn len(&self) -> usize {
        self.samples.len()
    }

    /// Always false: a signal holds at least one sample
    pub fn is_empty(&self) -> bool {
        self.samples.is_empty()
    }

    /// Time conversions for this signal
    pub fn time_index(&self) -> TimeIndex {
        self.time
    }

    /// Duration in seconds
    pub fn duration(&self) -> f32 {
        self.time.duration()
    }

    /// Convert a sample count to seconds
    pub fn to_seconds(&self, num_samples: usize) -> f32 {
        self.time.to_seconds(num_samples)
    }

    /// Convert seconds to a sample count
    pub fn to_samples(&self, seconds: f32) -> usize {
        self.time.to_samples(seconds)
    }

    /// Samples of analysis window `window`
    pub fn window(&self, window: usize, window_size: f32, window_advance: f32) -> &[f32] {
        let (start, end) = self.time.window_bounds(window, window_size, window_advance);
        &self.samples[start..end]
    }
}
