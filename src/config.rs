//! Configuration parameters for rhythm analysis and similarity evaluation

use serde::{Deserialize, Serialize};

use crate::error::AnalysisError;

/// Onset-strength, global-tempo and beat-tracking parameters
///
/// One `TempoConfig` is bound to every analyzed signal, so the onset function,
/// global tempo and beat times cached on a signal always agree with each other.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct TempoConfig {
    // Onset strength
    /// Rate the signal is resampled to before onset analysis (default: 8000 Hz)
    pub resample_rate: u32,

    /// Onset analysis window length in seconds (default: 0.064)
    pub onset_window_size: f32,

    /// Onset analysis window advance in seconds (default: 0.004)
    pub onset_window_advance: f32,

    /// Number of mel bands the onset spectrum is projected onto (default: 40)
    pub mel_bands: usize,

    /// Butterworth high-pass order applied to the raw onset strength (default: 5)
    pub highpass_order: usize,

    /// High-pass cutoff in Hz, relative to the onset frame rate (default: 0.3)
    /// Removes slow dynamics-level trends from the onset strength
    pub highpass_cutoff_hz: f32,

    /// Gaussian smoothing envelope length in seconds (default: 0.080)
    pub envelope_length: f32,

    /// Gaussian smoothing standard deviation in seconds (default: 0.020)
    pub envelope_sigma: f32,

    // Global tempo
    /// Slowest tempo considered by the autocorrelation search (default: 20 BPM)
    pub min_tempo_bpm: f32,

    /// Centre of the log-Gaussian tempo prior, in seconds per beat (default: 0.5 = 120 BPM)
    pub tempo_bias: f32,

    /// Width of the tempo prior in octaves (default: 0.9)
    pub envelope_width: f32,

    // Beat tracking
    /// Beat-tracking grid step in seconds (default: 0.004)
    pub beat_grid_advance: f32,

    /// Weight of the tempo-consistency penalty against onset strength (default: 200)
    ///
    /// Calibrated empirically; values between 10 and 200 have all been used.
    pub beat_weighting: f32,
}

impl Default for TempoConfig {
    fn default() -> Self {
        Self {
            resample_rate: 8000,
            onset_window_size: 0.064,
            onset_window_advance: 0.004,
            mel_bands: 40,
            highpass_order: 5,
            highpass_cutoff_hz: 0.3,
            envelope_length: 0.080,
            envelope_sigma: 0.020,
            min_tempo_bpm: 20.0,
            tempo_bias: 0.5,
            envelope_width: 0.9,
            beat_grid_advance: 0.004,
            beat_weighting: 200.0,
        }
    }
}

impl TempoConfig {
    /// Reject parameter sets that would make the analysis undefined
    pub fn validate(&self) -> Result<(), AnalysisError> {
        if self.resample_rate == 0 {
            return Err(AnalysisError::InvalidInput(
                "Resample rate must be > 0".to_string(),
            ));
        }
        if self.mel_bands == 0 {
            return Err(AnalysisError::InvalidInput(
                "Mel band count must be > 0".to_string(),
            ));
        }
        let positive = [
            ("onset_window_size", self.onset_window_size),
            ("onset_window_advance", self.onset_window_advance),
            ("highpass_cutoff_hz", self.highpass_cutoff_hz),
            ("envelope_length", self.envelope_length),
            ("envelope_sigma", self.envelope_sigma),
            ("min_tempo_bpm", self.min_tempo_bpm),
            ("tempo_bias", self.tempo_bias),
            ("envelope_width", self.envelope_width),
            ("beat_grid_advance", self.beat_grid_advance),
        ];
        for (name, value) in positive {
            if !(value > 0.0) || !value.is_finite() {
                return Err(AnalysisError::InvalidInput(format!(
                    "{} must be a positive finite number, got {}",
                    name, value
                )));
            }
        }
        if self.highpass_cutoff_hz >= 0.5 / self.onset_window_advance {
            return Err(AnalysisError::InvalidInput(format!(
                "High-pass cutoff {:.3} Hz is above the onset Nyquist frequency {:.3} Hz",
                self.highpass_cutoff_hz,
                0.5 / self.onset_window_advance
            )));
        }
        Ok(())
    }
}

/// Top-level analysis configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct AnalysisConfig {
    /// Rhythm analysis parameters shared by every signal in a run
    pub tempo: TempoConfig,

    /// Compute candidate features on the rayon pool (default: true)
    #[serde(default = "default_parallel")]
    pub parallel: bool,
}

fn default_parallel() -> bool {
    true
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            tempo: TempoConfig::default(),
            parallel: default_parallel(),
        }
    }
}

impl AnalysisConfig {
    /// Default configuration with parallel feature computation switched off
    pub fn sequential() -> Self {
        Self {
            parallel: false,
            ..Self::default()
        }
    }
}
