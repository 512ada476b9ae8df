//! Onset strength analysis
//!
//! - [`OnsetFunction`]: windowed onset-strength series with time/window lookup
//!   and shifted read-only views
//! - [`calculate_onset_function`]: log mel-band flux, high-passed, smoothed and
//!   normalised

pub mod onset_function;
pub mod onset_strength;

pub use onset_function::{OnsetFunction, OnsetView};
pub use onset_strength::calculate_onset_function;
