//! Chroma extraction
//!
//! Per-window distribution of spectral energy across the 12 pitch classes.

pub mod extractor;

pub use extractor::{extract_chroma, pitch_class_profile};
