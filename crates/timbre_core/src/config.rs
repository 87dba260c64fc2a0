//! Core Configuration
//!
//! JSON-backed settings for the design service and stream processors.
//! Missing fields fall back to their defaults so older files keep loading.

use std::fs;
use std::path::Path;

use serde::{Deserialize, Serialize};
use timbre_dsp::{DesignerConfig, WindowType, DEFAULT_OVERLAP, DEFAULT_WINDOW_SIZE, MAX_OVERLAP};
use tracing::info;

use crate::error::{CoreError, CoreResult};
use crate::quality::ProcessingQuality;

/// Spectrum analysis window settings
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SpectralConfig {
    /// FFT window length in samples
    pub window_size: usize,

    /// Fraction of each window shared with the next (0.0 - 0.95)
    pub overlap: f64,

    pub window: WindowType,
}

impl Default for SpectralConfig {
    fn default() -> Self {
        Self {
            window_size: DEFAULT_WINDOW_SIZE,
            overlap: DEFAULT_OVERLAP,
            window: WindowType::Hann,
        }
    }
}

impl SpectralConfig {
    /// Validate configuration
    pub fn validate(&self) -> Result<(), String> {
        if self.window_size < 64 || self.window_size > 65536 {
            return Err(format!("Invalid window size: {}", self.window_size));
        }
        if !(0.0..=MAX_OVERLAP).contains(&self.overlap) {
            return Err(format!("Invalid overlap: {}", self.overlap));
        }
        Ok(())
    }
}

/// Overall core configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct CoreConfig {
    /// Sample rate in Hz of the streams being processed
    pub sample_rate: f64,

    pub designer: DesignerConfig,

    pub spectral: SpectralConfig,

    /// Initial quality level for new stream processors
    pub quality: ProcessingQuality,
}

impl Default for CoreConfig {
    fn default() -> Self {
        Self {
            sample_rate: 48000.0,
            designer: DesignerConfig::default(),
            spectral: SpectralConfig::default(),
            quality: ProcessingQuality::High,
        }
    }
}

impl CoreConfig {
    /// Create config optimized for low latency
    pub fn low_latency() -> Self {
        Self {
            spectral: SpectralConfig {
                window_size: 512, // ~10.7ms at 48kHz
                overlap: 0.5,
                window: WindowType::Hann,
            },
            quality: ProcessingQuality::Low,
            ..Self::default()
        }
    }

    /// Create config optimized for analysis resolution
    pub fn high_fidelity() -> Self {
        Self {
            spectral: SpectralConfig {
                window_size: 8192,
                overlap: 0.75,
                window: WindowType::Blackman,
            },
            quality: ProcessingQuality::Ultra,
            ..Self::default()
        }
    }

    /// Validate configuration
    pub fn validate(&self) -> CoreResult<()> {
        if !(self.sample_rate >= 8000.0 && self.sample_rate <= 192000.0) {
            return Err(CoreError::Config(format!(
                "Invalid sample rate: {}",
                self.sample_rate
            )));
        }
        self.designer.validate().map_err(CoreError::Config)?;
        self.spectral.validate().map_err(CoreError::Config)?;
        Ok(())
    }

    /// Parse and validate a JSON document
    pub fn from_json_str(json: &str) -> CoreResult<Self> {
        let config: Self = serde_json::from_str(json)?;
        config.validate()?;
        Ok(config)
    }

    /// Load configuration from a JSON file
    pub fn load(path: impl AsRef<Path>) -> CoreResult<Self> {
        let path = path.as_ref();
        let json = fs::read_to_string(path)?;
        let config = Self::from_json_str(&json)?;
        info!("Configuration loaded from {:?}", path);
        Ok(config)
    }

    /// Save configuration to a JSON file, creating parent directories
    pub fn save(&self, path: impl AsRef<Path>) -> CoreResult<()> {
        let path = path.as_ref();
        if let Some(parent) = path.parent() {
            fs::create_dir_all(parent)?;
        }

        let file = fs::File::create(path)?;
        serde_json::to_writer_pretty(file, self)?;

        info!("Configuration saved to {:?}", path);
        Ok(())
    }
}
