//! Signal preprocessing utilities
//!
//! - FFT resampling (onset analysis runs at a fixed low rate)
//! - High-pass and Gaussian smoothing filters for onset strength
//! - Series helpers (difference, moving average, moments)

pub mod filter;
pub mod resample;
pub mod series;
