//! Audio buffer with stream metadata

use ndarray::{ArrayD, IxDyn};

use crate::error::{DspError, DspResult};

pub const SUPPORTED_BIT_DEPTHS: [u16; 4] = [8, 16, 24, 32];

/// Samples plus the metadata needed to interpret them
///
/// Mono audio is 1-D `[frames]`; multichannel audio is 2-D
/// `[frames, channels]`. Every constructor enforces that the channel axis
/// matches `channels`.
#[derive(Debug, Clone, PartialEq)]
pub struct AudioBuffer {
    data: ArrayD<f64>,
    sample_rate: f64,
    channels: usize,
    bit_depth: u16,
    timestamp: f64,
    buffer_id: Option<String>,
}

impl AudioBuffer {
    pub fn new(
        data: ArrayD<f64>,
        sample_rate: f64,
        channels: usize,
        bit_depth: u16,
        timestamp: f64,
    ) -> DspResult<Self> {
        Self::validate(&data, sample_rate, channels, bit_depth)?;
        Ok(Self {
            data,
            sample_rate,
            channels,
            bit_depth,
            timestamp,
            buffer_id: None,
        })
    }

    /// Single-channel 32-bit buffer at timestamp zero
    pub fn mono(samples: Vec<f64>, sample_rate: f64) -> DspResult<Self> {
        let frames = samples.len();
        let data = ArrayD::from_shape_vec(IxDyn(&[frames]), samples)
            .map_err(|e| DspError::InvalidBuffer(e.to_string()))?;
        Self::new(data, sample_rate, 1, 32, 0.0)
    }

    pub fn with_id(mut self, buffer_id: impl Into<String>) -> Self {
        self.buffer_id = Some(buffer_id.into());
        self
    }

    /// Same metadata around new samples
    pub fn with_data(&self, data: ArrayD<f64>) -> DspResult<Self> {
        Self::validate(&data, self.sample_rate, self.channels, self.bit_depth)?;
        Ok(Self {
            data,
            sample_rate: self.sample_rate,
            channels: self.channels,
            bit_depth: self.bit_depth,
            timestamp: self.timestamp,
            buffer_id: self.buffer_id.clone(),
        })
    }

    fn validate(data: &ArrayD<f64>, sample_rate: f64, channels: usize, bit_depth: u16) -> DspResult<()> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidBuffer(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        if channels == 0 {
            return Err(DspError::InvalidBuffer("channel count must be positive".into()));
        }
        if !SUPPORTED_BIT_DEPTHS.contains(&bit_depth) {
            return Err(DspError::InvalidBuffer(format!(
                "unsupported bit depth {bit_depth}"
            )));
        }
        match data.ndim() {
            1 => Ok(()),
            2 if data.shape()[1] == channels => Ok(()),
            2 => Err(DspError::InvalidBuffer(format!(
                "channel axis has {} columns but buffer declares {channels} channels",
                data.shape()[1]
            ))),
            n => Err(DspError::InvalidBuffer(format!(
                "samples must be 1-D or 2-D, got {n} dimensions"
            ))),
        }
    }

    pub fn data(&self) -> &ArrayD<f64> {
        &self.data
    }

    pub fn into_data(self) -> ArrayD<f64> {
        self.data
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn channels(&self) -> usize {
        self.channels
    }

    pub fn bit_depth(&self) -> u16 {
        self.bit_depth
    }

    pub fn timestamp(&self) -> f64 {
        self.timestamp
    }

    pub fn buffer_id(&self) -> Option<&str> {
        self.buffer_id.as_deref()
    }

    /// Samples per channel
    pub fn frames(&self) -> usize {
        self.data.shape().first().copied().unwrap_or(0)
    }

    pub fn duration_seconds(&self) -> f64 {
        self.frames() as f64 / self.sample_rate
    }

    pub fn is_mono(&self) -> bool {
        self.channels == 1
    }

    pub fn is_stereo(&self) -> bool {
        self.channels == 2
    }
}
