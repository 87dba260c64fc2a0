//! Stateful digital filter
//!
//! Runs designed coefficients over sample arrays in transposed direct
//! form II. Recursive filters keep one delay line per channel so that
//! consecutive chunks of a stream join without discontinuities; FIR
//! filters are stateless per call.

use std::sync::Arc;
use std::time::Instant;

use ndarray::{ArrayD, Axis};
use rustfft::num_complex::Complex64;

use crate::buffer::AudioBuffer;
use crate::design::FilterCoefficients;
use crate::error::{DspError, DspResult};
use crate::stats::ProcessingStats;

/// Magnitude and phase sampled at evenly spaced frequencies in [0, Nyquist)
#[derive(Debug, Clone, PartialEq)]
pub struct FrequencyResponse {
    pub magnitude: Vec<f64>,
    pub phase: Vec<f64>,
}

impl FrequencyResponse {
    /// Unity magnitude, zero phase
    pub fn flat(n_points: usize) -> Self {
        Self {
            magnitude: vec![1.0; n_points],
            phase: vec![0.0; n_points],
        }
    }

    pub fn from_complex(values: &[Complex64]) -> Self {
        Self {
            magnitude: values.iter().map(|h| h.norm()).collect(),
            phase: values.iter().map(|h| h.arg()).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.magnitude.len()
    }

    pub fn is_empty(&self) -> bool {
        self.magnitude.is_empty()
    }

    pub fn magnitude_db(&self) -> Vec<f64> {
        self.magnitude
            .iter()
            .map(|m| 20.0 * m.max(1e-10).log10())
            .collect()
    }
}

/// Frequencies in Hz matching the points of a [`FrequencyResponse`]
pub fn frequencies_hz(n_points: usize, sample_rate: f64) -> Vec<f64> {
    (0..n_points)
        .map(|k| k as f64 * sample_rate / (2.0 * n_points as f64))
        .collect()
}

/// A filter instance bound to one audio stream
pub struct DigitalFilter {
    coefficients: Arc<FilterCoefficients>,
    // Padded to a common length; a[0] == 1
    b: Vec<f64>,
    a: Vec<f64>,
    initial_state: Vec<f64>,
    channel_states: Vec<Vec<f64>>,
    stats: ProcessingStats,
}

impl DigitalFilter {
    pub fn new(coefficients: impl Into<Arc<FilterCoefficients>>) -> Self {
        let coefficients = coefficients.into();
        let taps = coefficients.order() + 1;

        let mut b = coefficients.numerator().to_vec();
        let mut a = coefficients.denominator().to_vec();
        b.resize(taps, 0.0);
        a.resize(taps, 0.0);

        let initial_state = coefficients.initial_conditions(&[], &[]);

        Self {
            coefficients,
            b,
            a,
            initial_state,
            channel_states: Vec::new(),
            stats: ProcessingStats::default(),
        }
    }

    /// Identity filter
    pub fn all_pass() -> Self {
        Self::new(FilterCoefficients::all_pass())
    }

    pub fn coefficients(&self) -> &Arc<FilterCoefficients> {
        &self.coefficients
    }

    pub fn is_fir(&self) -> bool {
        self.coefficients.is_fir()
    }

    pub fn order(&self) -> usize {
        self.coefficients.order()
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Filter a 1-D (mono) or 2-D (frames x channels) array
    ///
    /// Empty input is returned unchanged. Columns of a 2-D array are
    /// filtered independently, each with its own delay line.
    pub fn process(&mut self, samples: &ArrayD<f64>) -> DspResult<ArrayD<f64>> {
        if samples.is_empty() {
            return Ok(samples.clone());
        }
        let started = Instant::now();

        let mut output = samples.clone();
        match output.ndim() {
            1 => self.filter_channel(0, output.iter_mut()),
            2 => {
                for (channel, mut column) in output.axis_iter_mut(Axis(1)).enumerate() {
                    self.filter_channel(channel, column.iter_mut());
                }
            }
            _ => return Err(DspError::UnsupportedShape(samples.shape().to_vec())),
        }

        if output.iter().any(|y| !y.is_finite()) {
            self.reset_state();
            return Err(DspError::FilterProcessing(
                "filter produced non-finite output".into(),
            ));
        }

        self.stats.record(started, samples.len());
        Ok(output)
    }

    /// Filter the samples of a buffer, keeping its metadata
    pub fn process_buffer(&mut self, buffer: &AudioBuffer) -> DspResult<AudioBuffer> {
        let filtered = self.process(buffer.data())?;
        buffer.with_data(filtered)
    }

    fn filter_channel<'a>(&mut self, channel: usize, samples: impl Iterator<Item = &'a mut f64>) {
        let gain = self.coefficients.gain();
        if self.is_fir() {
            let mut scratch = self.initial_state.clone();
            run_df2t(&self.b, &self.a, gain, &mut scratch, samples);
            return;
        }

        while self.channel_states.len() <= channel {
            self.channel_states.push(self.initial_state.clone());
        }
        run_df2t(&self.b, &self.a, gain, &mut self.channel_states[channel], samples);
    }

    /// Return every channel's delay line to the zero-history state
    pub fn reset_state(&mut self) {
        self.channel_states.clear();
    }

    /// Response at `n_points` frequencies (see [`frequencies_hz`])
    ///
    /// Falls back to a flat response if evaluation is not finite.
    pub fn frequency_response(&self, n_points: usize) -> FrequencyResponse {
        let values = self.coefficients.frequency_response(n_points);
        if values.iter().all(|h| h.is_finite()) {
            FrequencyResponse::from_complex(&values)
        } else {
            FrequencyResponse::flat(n_points)
        }
    }
}

fn run_df2t<'a>(
    b: &[f64],
    a: &[f64],
    gain: f64,
    state: &mut [f64],
    samples: impl Iterator<Item = &'a mut f64>,
) {
    let order = state.len();
    for sample in samples {
        let x = *sample;
        let y = if order == 0 {
            b[0] * x
        } else {
            let y = b[0] * x + state[0];
            for i in 0..order - 1 {
                state[i] = b[i + 1] * x + state[i + 1] - a[i + 1] * y;
            }
            state[order - 1] = b[order] * x - a[order] * y;
            y
        };
        *sample = y * gain;
    }
}
