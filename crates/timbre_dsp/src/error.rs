//! DSP Error Types

use thiserror::Error;

use crate::design::{FilterResponse, FilterType};

/// Errors that can occur during filter design and signal processing
#[derive(Error, Debug, Clone, PartialEq)]
pub enum DspError {
    #[error("Invalid filter specification: {0}")]
    InvalidSpecification(String),

    #[error("Unsupported filter type: {filter_type} {response}")]
    UnsupportedFilterType {
        filter_type: FilterType,
        response: FilterResponse,
    },

    #[error("Filter unstable: max pole magnitude {max_pole_magnitude:.6} >= margin {margin}")]
    FilterInstability { max_pole_magnitude: f64, margin: f64 },

    #[error("Filter processing failed: {0}")]
    FilterProcessing(String),

    #[error("Unsupported sample array shape {0:?} (expected 1-D or 2-D)")]
    UnsupportedShape(Vec<usize>),

    #[error("Invalid filter coefficients: {0}")]
    InvalidCoefficients(String),

    #[error("Invalid audio buffer: {0}")]
    InvalidBuffer(String),

    #[error("Invalid frequency band: {0}")]
    InvalidBand(String),

    #[error("Band not found: {0}")]
    BandNotFound(u32),

    #[error("Invalid spectral configuration: {0}")]
    InvalidSpectralConfig(String),

    #[error("Invalid noise profile: {0}")]
    InvalidNoiseProfile(String),
}

impl DspError {
    /// Whether retrying with a different request (a lower order) may succeed
    pub fn is_retryable(&self) -> bool {
        matches!(self, DspError::FilterInstability { .. })
    }

    /// Whether this error was raised while running samples through a filter
    pub fn is_processing_error(&self) -> bool {
        matches!(
            self,
            DspError::FilterProcessing(_) | DspError::UnsupportedShape(_)
        )
    }
}

/// Result type alias for DSP operations
pub type DspResult<T> = Result<T, DspError>;
