//! Feature extraction modules
//!
//! - Short-time spectra, mel filterbank and DCT helpers
//! - Onset strength
//! - Global tempo (period estimation)
//! - Beat tracking
//! - Chroma extraction

pub mod beat_tracking;
pub mod chroma;
pub mod onset;
pub mod period;
pub mod spectral;
