//! Signal input types
//!
//! Decoded audio enters the engine as a [`signal::Signal`]: mono samples plus a
//! sample rate. Decoding itself happens outside the library.

pub mod signal;

pub use signal::{Signal, TimeIndex};
