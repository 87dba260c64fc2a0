//! Timbre DSP - Filter Design and Signal Processing
//!
//! This crate provides the numerical core of Timbre, including:
//! - IIR filter design (Butterworth, Chebyshev I/II, elliptic, Bessel) and
//!   windowed-sinc FIR design
//! - Stateful transposed direct form II filtering with per-channel history
//! - Filter banks and a parametric equalizer built from peaking bands
//! - FFT spectrum analysis, STFT resynthesis and spectral subtraction
//! - Chainable processors over 1-D and 2-D sample arrays
//!
//! # Architecture
//!
//! Designs are immutable values: a [`FilterSpecification`] goes in, shared
//! [`FilterCoefficients`] come out. Processing state lives only in the
//! filters that run those coefficients, so one design can feed many streams.

mod bank;
mod buffer;
mod design;
mod eq;
mod error;
mod filter;
mod presets;
mod processor;
mod spectral;
mod stats;
mod window;

pub use bank::{BankMode, FilterBank};
pub use buffer::{AudioBuffer, SUPPORTED_BIT_DEPTHS};
pub use design::{
    firwin, roots, DesignFilter, DesignerConfig, FilterCoefficients, FilterDesigner,
    FilterResponse, FilterSpecification, FilterType, DEFAULT_ATTENUATION_DB, DEFAULT_RIPPLE_DB,
    DEFAULT_STABILITY_MARGIN, MAX_FILTER_ORDER, MAX_NORMALIZED_CUTOFF, MIN_NORMALIZED_CUTOFF,
    STRICT_STABILITY_MARGIN,
};
pub use eq::{FrequencyBand, ParametricEqualizer, MAX_BAND_GAIN_DB, MIN_AUDIBLE_GAIN_DB};
pub use error::{DspError, DspResult};
pub use filter::{frequencies_hz, DigitalFilter, FrequencyResponse};
pub use presets::{find_preset, preset_bands, preset_names, Preset, PresetBand, FLAT_PRESET, PRESETS};
pub use processor::{AudioProcessor, ProcessorChain};
pub use spectral::{
    NoiseReducer, SpectralPeak, SpectralProcessor, SpectrumAnalysis, Stft, DEFAULT_OVERLAP,
    DEFAULT_ROLLOFF, DEFAULT_WINDOW_SIZE, MAX_OVERLAP, SPECTRAL_FLOOR,
};
pub use stats::ProcessingStats;
pub use window::{WindowType, KAISER_BETA};

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_crate_exports() {
        // Verify all public types are accessible
        let _config = DesignerConfig::default();
        let _designer = FilterDesigner::new();
        let _eq = ParametricEqualizer::new(48000.0).unwrap();
        let _spectral =
            SpectralProcessor::new(DEFAULT_WINDOW_SIZE, DEFAULT_OVERLAP, WindowType::default())
                .unwrap();
        let _chain = ProcessorChain::new();
    }
}
