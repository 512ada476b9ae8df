//! Period estimation
//!
//! Global tempo of a recording from the autocorrelation of its onset
//! strength, weighted by a log-Gaussian tempo prior.

pub mod autocorrelation;

pub use autocorrelation::calculate_global_tempo;

use serde::{Deserialize, Serialize};

/// Single representative tempo of a recording
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct GlobalTempo {
    /// Tempo in beats per minute
    pub bpm: f32,

    /// Beat period in seconds
    pub period_seconds: f32,

    /// Beat period in onset-function windows
    pub lag_windows: usize,
}
