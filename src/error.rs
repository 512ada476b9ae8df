//! Error types for the fingerprinting engine

use std::fmt;

/// Errors that can occur while fingerprinting or comparing recordings
#[derive(Debug, Clone, PartialEq)]
pub enum AnalysisError {
    /// Invalid input parameters (empty signal, signal shorter than a window, empty candidate list, ...)
    InvalidInput(String),

    /// Processing error during analysis
    ProcessingError(String),

    /// Numerical error (NaN where a finite value is required)
    NumericalError(String),
}

impl AnalysisError {
    /// Prefix the message with `context`, keeping the variant.
    ///
    /// Used by the similarity engine to name the signal and metric that failed.
    pub fn with_context(self, context: &str) -> Self {
        match self {
            AnalysisError::InvalidInput(msg) => {
                AnalysisError::InvalidInput(format!("{}: {}", context, msg))
            }
            AnalysisError::ProcessingError(msg) => {
                AnalysisError::ProcessingError(format!("{}: {}", context, msg))
            }
            AnalysisError::NumericalError(msg) => {
                AnalysisError::NumericalError(format!("{}: {}", context, msg))
            }
        }
    }
}

impl fmt::Display for AnalysisError {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AnalysisError::InvalidInput(msg) => write!(f, "Invalid input: {}", msg),
            AnalysisError::ProcessingError(msg) => write!(f, "Processing error: {}", msg),
            AnalysisError::NumericalError(msg) => write!(f, "Numerical error: {}", msg),
        }
    }
}

impl std::error::Error for AnalysisError {}
