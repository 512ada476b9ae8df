//! Short-time spectral analysis shared by onset strength and the metrics
//!
//! - Windowing and real-input spectra (`window`)
//! - Mel scale and triangular mel filterbank (`mel`)
//! - Orthonormal DCT-II for cepstral coefficients (`dct`)

pub mod dct;
pub mod mel;
pub mod window;

pub use dct::dct2_orthonormal;
pub use mel::{hertz_to_mel, mel_to_hertz, MelFilterbank};
pub use window::{hann_window, SpectrumAnalyzer};
