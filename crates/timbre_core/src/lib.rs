//! Timbre Core - Design Service and Stream Processing
//!
//! This crate wires the DSP primitives of `timbre_dsp` into the layer
//! applications talk to, including:
//! - A thread-safe, memoizing filter design service with cache statistics
//! - Per-stream processors (noise reduction + parametric EQ) that never
//!   drop audio on error
//! - Quality levels chosen from system load
//! - JSON configuration and `tracing` setup
//!
//! # Architecture
//!
//! ```text
//! ┌────────────────────────────────────────────────────────────┐
//! │                    Application layer                       │
//! │   FilterSpecification ──▶ FilterDesignService (cached)     │
//! │   AudioBuffer ──▶ StreamProcessor ──▶ AudioBuffer          │
//! └────────────────────────────────────────────────────────────┘
//!                              │
//!                              ▼
//! ┌────────────────────────────────────────────────────────────┐
//! │                        timbre_dsp                          │
//! │   NoiseReducer ──▶ ParametricEqualizer ──▶ FilterBank      │
//! │          (typed errors, no logging, no shared state)       │
//! └────────────────────────────────────────────────────────────┘
//! ```

mod config;
mod error;
mod pipeline;
mod quality;
mod service;

use tracing_subscriber::EnvFilter;

pub use config::{CoreConfig, SpectralConfig};
pub use error::{CoreError, CoreResult};
pub use pipeline::{SpectrumSummary, StreamProcessor, StreamStats};
pub use quality::{ProcessingQuality, QualityManager, QualityProfile, QualityThresholds};
pub use service::{CacheStats, FilterDesignService};

// Re-export DSP types for convenience
pub use timbre_dsp::{
    AudioBuffer, DesignerConfig, DigitalFilter, DspError, FilterCoefficients, FilterResponse,
    FilterSpecification, FilterType, FrequencyBand, ParametricEqualizer, WindowType,
};

/// Log filter used when none is given
pub const DEFAULT_LOG_FILTER: &str = "timbre=info";

/// Install a `tracing` fmt subscriber filtered by `filter`
/// (e.g. `"timbre=debug"`), falling back to [`DEFAULT_LOG_FILTER`]
///
/// Fails instead of panicking if the filter does not parse or a global
/// subscriber is already installed.
pub fn init_logging(filter: Option<&str>) -> CoreResult<()> {
    let env_filter = EnvFilter::try_new(filter.unwrap_or(DEFAULT_LOG_FILTER))
        .map_err(|e| CoreError::Logging(e.to_string()))?;

    tracing_subscriber::fmt()
        .with_env_filter(env_filter)
        .try_init()
        .map_err(|e| CoreError::Logging(e.to_string()))
}
