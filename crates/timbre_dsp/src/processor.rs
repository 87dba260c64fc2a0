//! Audio Processor Trait
//!
//! Defines the interface for chainable audio processors.
//! Allows building modular DSP pipelines (EQ -> filter bank -> noise reduction).

use ndarray::ArrayD;

use crate::bank::{BankMode, FilterBank};
use crate::buffer::AudioBuffer;
use crate::eq::ParametricEqualizer;
use crate::error::DspResult;
use crate::filter::DigitalFilter;
use crate::spectral::NoiseReducer;

/// Trait for audio processors in the DSP chain
///
/// Sample arrays are 1-D (mono) or 2-D (frames x channels). Processors
/// that keep history (delay lines) carry it across calls until
/// `reset_state` is called.
pub trait AudioProcessor: Send {
    /// Process a sample array, returning a new array of the same shape
    fn process(&mut self, samples: &ArrayD<f64>) -> DspResult<ArrayD<f64>>;

    /// Process an audio buffer, keeping its metadata
    fn process_buffer(&mut self, buffer: &AudioBuffer) -> DspResult<AudioBuffer> {
        let processed = self.process(buffer.data())?;
        buffer.with_data(processed)
    }

    /// Reset internal state (delay lines)
    fn reset_state(&mut self);

    /// Human-readable name for debugging/logging
    fn name(&self) -> &'static str;

    /// Whether this processor is currently enabled
    fn is_enabled(&self) -> bool {
        true
    }
}

/// A chain of processors applied sequentially
#[derive(Default)]
pub struct ProcessorChain {
    processors: Vec<Box<dyn AudioProcessor>>,
}

impl ProcessorChain {
    pub fn new() -> Self {
        Self::default()
    }

    /// Add a processor to the end of the chain
    pub fn add<P: AudioProcessor + 'static>(&mut self, processor: P) {
        self.processors.push(Box::new(processor));
    }

    /// Names of the processors, in processing order
    pub fn names(&self) -> Vec<&'static str> {
        self.processors.iter().map(|p| p.name()).collect()
    }

    /// Process samples through all enabled processors
    ///
    /// Stops at the first processor that fails.
    pub fn process(&mut self, samples: &ArrayD<f64>) -> DspResult<ArrayD<f64>> {
        let mut current = samples.clone();
        for processor in &mut self.processors {
            if processor.is_enabled() {
                current = processor.process(&current)?;
            }
        }
        Ok(current)
    }

    pub fn process_buffer(&mut self, buffer: &AudioBuffer) -> DspResult<AudioBuffer> {
        let processed = self.process(buffer.data())?;
        buffer.with_data(processed)
    }

    /// Reset all processors
    pub fn reset_state(&mut self) {
        for processor in &mut self.processors {
            processor.reset_state();
        }
    }

    /// Get number of processors in chain
    pub fn len(&self) -> usize {
        self.processors.len()
    }

    /// Check if chain is empty
    pub fn is_empty(&self) -> bool {
        self.processors.is_empty()
    }
}

impl AudioProcessor for DigitalFilter {
    fn process(&mut self, samples: &ArrayD<f64>) -> DspResult<ArrayD<f64>> {
        DigitalFilter::process(self, samples)
    }

    fn reset_state(&mut self) {
        DigitalFilter::reset_state(self);
    }

    fn name(&self) -> &'static str {
        "Digital Filter"
    }
}

impl AudioProcessor for FilterBank {
    fn process(&mut self, samples: &ArrayD<f64>) -> DspResult<ArrayD<f64>> {
        FilterBank::process(self, samples, BankMode::Series)
    }

    fn reset_state(&mut self) {
        self.reset_all();
    }

    fn name(&self) -> &'static str {
        "Filter Bank"
    }

    fn is_enabled(&self) -> bool {
        !self.is_empty()
    }
}

impl AudioProcessor for ParametricEqualizer {
    fn process(&mut self, samples: &ArrayD<f64>) -> DspResult<ArrayD<f64>> {
        ParametricEqualizer::process(self, samples)
    }

    fn reset_state(&mut self) {
        ParametricEqualizer::reset_state(self);
    }

    fn name(&self) -> &'static str {
        "Parametric Equalizer"
    }

    fn is_enabled(&self) -> bool {
        self.band_count() > 0
    }
}

impl AudioProcessor for NoiseReducer {
    fn process(&mut self, samples: &ArrayD<f64>) -> DspResult<ArrayD<f64>> {
        NoiseReducer::process(self, samples)
    }

    // Frames are independent; nothing carries over between calls
    fn reset_state(&mut self) {}

    fn name(&self) -> &'static str {
        "Noise Reducer"
    }

    fn is_enabled(&self) -> bool {
        self.alpha() > 0.0
    }
}
