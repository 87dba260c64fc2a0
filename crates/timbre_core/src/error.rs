//! Core Error Types

use thiserror::Error;

/// Errors that can occur in the service and stream layers
#[derive(Error, Debug)]
pub enum CoreError {
    #[error("DSP error: {0}")]
    Dsp(#[from] timbre_dsp::DspError),

    #[error("Configuration error: {0}")]
    Config(String),

    #[error("Unknown EQ preset: {0}")]
    UnknownPreset(String),

    #[error("Logging setup failed: {0}")]
    Logging(String),

    #[error("I/O error: {0}")]
    Io(#[from] std::io::Error),

    #[error("Serialization error: {0}")]
    Serialization(#[from] serde_json::Error),
}

/// Result type alias for core operations
pub type CoreResult<T> = Result<T, CoreError>;
