//! Beat tracking
//!
//! Beat times from onset strength and the global tempo by dynamic programming
//! over a fixed time grid with integer back-pointers.

pub mod dynamic_programming;

pub use dynamic_programming::calculate_beats;
