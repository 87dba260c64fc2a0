//! Stream Processor
//!
//! Per-stream processing pipeline: optional noise reduction followed by
//! the parametric EQ. A stream processor never fails a buffer; when a
//! stage errors the failure is logged and the unprocessed buffer is
//! returned so audio keeps flowing.

use std::time::Instant;

use ndarray::{ArrayD, Axis};
use serde::Serialize;
use timbre_dsp::{
    find_preset, AudioBuffer, AudioProcessor, DspResult, NoiseReducer, ParametricEqualizer,
    ProcessingStats, SpectralProcessor, WindowType, DEFAULT_ROLLOFF,
};
use tracing::{debug, error, info, warn};

use crate::config::CoreConfig;
use crate::error::{CoreError, CoreResult};
use crate::quality::ProcessingQuality;

/// Peaks at least this fraction of the strongest bin
const PEAK_HEIGHT_THRESHOLD: f64 = 0.1;

/// Minimum bin spacing between reported peaks
const PEAK_MIN_DISTANCE: usize = 10;

/// Summary features of one analysis window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumSummary {
    pub sample_rate: f64,
    pub window_size: usize,
    pub frequency_resolution: f64,
    pub spectral_centroid_hz: f64,
    pub spectral_rolloff_hz: f64,
    pub spectral_bandwidth_hz: f64,
    pub peak_frequencies: Vec<f64>,
    pub peak_magnitudes: Vec<f64>,
    pub magnitude_db_min: f64,
    pub magnitude_db_max: f64,
    pub magnitude_db_mean: f64,
}

/// Counters for one stream
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct StreamStats {
    pub processing: ProcessingStats,
    /// Buffers returned unprocessed after a stage failed
    pub failed_buffers: u64,
    pub quality: ProcessingQuality,
    pub eq_bands: usize,
    pub noise_reduction: bool,
}

/// Noise reduction + EQ for a single audio stream
pub struct StreamProcessor {
    sample_rate: f64,
    quality: ProcessingQuality,
    equalizer: ParametricEqualizer,
    noise_reducer: Option<NoiseReducer>,
    analyzer: SpectralProcessor,
    stats: ProcessingStats,
    failed_buffers: u64,
}

impl StreamProcessor {
    pub fn new(config: &CoreConfig) -> CoreResult<Self> {
        config.validate()?;
        let spectral = &config.spectral;
        Ok(Self {
            sample_rate: config.sample_rate,
            quality: config.quality,
            equalizer: ParametricEqualizer::new(config.sample_rate)?,
            noise_reducer: None,
            analyzer: SpectralProcessor::new(spectral.window_size, spectral.overlap, spectral.window)?,
            stats: ProcessingStats::default(),
            failed_buffers: 0,
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn quality(&self) -> ProcessingQuality {
        self.quality
    }

    pub fn equalizer(&self) -> &ParametricEqualizer {
        &self.equalizer
    }

    pub fn equalizer_mut(&mut self) -> &mut ParametricEqualizer {
        &mut self.equalizer
    }

    pub fn noise_profile(&self) -> Option<&[f64]> {
        self.noise_reducer.as_ref().map(|r| r.noise_profile())
    }

    fn build_reducer(quality: ProcessingQuality, noise_profile: Vec<f64>) -> DspResult<NoiseReducer> {
        let profile = quality.profile();
        let processor =
            SpectralProcessor::new(profile.window_size, profile.overlap, WindowType::Hann)?;
        NoiseReducer::new(processor, noise_profile, profile.noise_reduction_alpha)
    }

    /// Enable spectral subtraction with a magnitude profile of the noise
    pub fn set_noise_profile(&mut self, noise_profile: Vec<f64>) -> CoreResult<()> {
        let bins = noise_profile.len();
        self.noise_reducer = Some(Self::build_reducer(self.quality, noise_profile)?);
        info!("Noise profile set ({} bins)", bins);
        Ok(())
    }

    pub fn clear_noise_profile(&mut self) {
        if self.noise_reducer.take().is_some() {
            info!("Noise profile cleared");
        }
    }

    /// Switch quality level; an active noise reducer is rebuilt to match
    pub fn set_quality(&mut self, quality: ProcessingQuality) -> CoreResult<()> {
        if let Some(reducer) = &self.noise_reducer {
            let rebuilt = Self::build_reducer(quality, reducer.noise_profile().to_vec())?;
            self.noise_reducer = Some(rebuilt);
        }
        info!("Processing quality changed: {} -> {}", self.quality, quality);
        self.quality = quality;
        Ok(())
    }

    /// Replace the EQ bands with a named preset, keeping at most the
    /// current quality level's band limit
    pub fn apply_preset(&mut self, name: &str) -> CoreResult<Vec<u32>> {
        let mut bands =
            find_preset(name).ok_or_else(|| CoreError::UnknownPreset(name.to_string()))?;
        let limit = self.quality.profile().max_eq_bands;
        if bands.len() > limit {
            warn!(
                "EQ preset '{}' has {} bands, keeping {} at {} quality",
                name,
                bands.len(),
                limit,
                self.quality
            );
            bands.truncate(limit);
        }
        let ids = self.equalizer.apply_preset(&bands);
        info!("Applied EQ preset '{}' ({} bands)", name, ids.len());
        Ok(ids)
    }

    /// Run a buffer through the pipeline
    ///
    /// Returns the input unchanged (and counts a failure) if any stage
    /// errors or the buffer's sample rate does not match the stream.
    pub fn process_buffer(&mut self, buffer: &AudioBuffer) -> AudioBuffer {
        let started = Instant::now();
        match self.run_stages(buffer) {
            Ok(processed) => {
                self.stats.record(started, buffer.data().len());
                processed
            }
            Err((stage, err)) => {
                self.failed_buffers += 1;
                error!(
                    "Audio processing failed for buffer {} at {}: {}",
                    buffer.buffer_id().unwrap_or("<unnamed>"),
                    stage,
                    err
                );
                buffer.clone()
            }
        }
    }

    fn run_stages(&mut self, buffer: &AudioBuffer) -> Result<AudioBuffer, (&'static str, CoreError)> {
        if buffer.sample_rate() != self.sample_rate {
            return Err((
                "input",
                CoreError::Config(format!(
                    "buffer sample rate {} does not match stream rate {}",
                    buffer.sample_rate(),
                    self.sample_rate
                )),
            ));
        }

        let mut current = buffer.clone();
        if let Some(reducer) = self.noise_reducer.as_mut() {
            current = reducer
                .process_buffer(&current)
                .map_err(|e| (reducer.name(), CoreError::from(e)))?;
        }
        if self.equalizer.band_count() > 0 {
            current = self
                .equalizer
                .process_buffer(&current)
                .map_err(|e| ("Parametric Equalizer", CoreError::from(e)))?;
        }
        Ok(current)
    }

    /// Spectral features of the first analysis window
    ///
    /// Multichannel input is averaged to mono first.
    pub fn analyze_spectrum(&self, samples: &ArrayD<f64>) -> CoreResult<SpectrumSummary> {
        let mono: Vec<f64> = match samples.ndim() {
            1 => samples.iter().copied().collect(),
            2 => samples
                .mean_axis(Axis(1))
                .map(|m| m.iter().copied().collect())
                .unwrap_or_default(),
            _ => {
                return Err(timbre_dsp::DspError::UnsupportedShape(samples.shape().to_vec()).into())
            }
        };

        let spectrum = self.analyzer.analyze(&mono, self.sample_rate)?;
        let db = spectrum.magnitude_db();
        let peaks = spectrum.find_peaks(PEAK_HEIGHT_THRESHOLD, PEAK_MIN_DISTANCE);
        debug!("Spectrum analysed: {} samples, {} peaks", mono.len(), peaks.len());

        Ok(SpectrumSummary {
            sample_rate: spectrum.sample_rate,
            window_size: spectrum.window_size,
            frequency_resolution: spectrum.frequency_resolution(),
            spectral_centroid_hz: spectrum.spectral_centroid(),
            spectral_rolloff_hz: spectrum.spectral_rolloff(DEFAULT_ROLLOFF),
            spectral_bandwidth_hz: spectrum.spectral_bandwidth(),
            peak_frequencies: peaks.iter().map(|p| p.frequency).collect(),
            peak_magnitudes: peaks.iter().map(|p| p.magnitude).collect(),
            magnitude_db_min: db.iter().copied().fold(f64::INFINITY, f64::min),
            magnitude_db_max: db.iter().copied().fold(f64::NEG_INFINITY, f64::max),
            magnitude_db_mean: db.iter().sum::<f64>() / db.len().max(1) as f64,
        })
    }

    pub fn stats(&self) -> StreamStats {
        StreamStats {
            processing: self.stats,
            failed_buffers: self.failed_buffers,
            quality: self.quality,
            eq_bands: self.equalizer.band_count(),
            noise_reduction: self.noise_reducer.is_some(),
        }
    }

    /// Clear filter history (e.g. after a seek or stream restart)
    pub fn reset_state(&mut self) {
        self.equalizer.reset_state();
        if let Some(reducer) = self.noise_reducer.as_mut() {
            reducer.reset_state();
        }
        debug!("Stream state reset");
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_abs_diff_eq;
    use ndarray::{Array1, Array2};
    use timbre_dsp::FrequencyBand;

    const FS: f64 = 48000.0;

    fn tone(freq: f64, len: usize) -> Vec<f64> {
        (0..len)
            .map(|n| (2.0 * std::f64::consts::PI * freq * n as f64 / FS).sin())
            .collect()
    }

    fn processor() -> StreamProcessor {
        StreamProcessor::new(&CoreConfig::default()).unwrap()
    }

    #[test]
    fn test_empty_pipeline_passes_through() {
        let mut stream = processor();
        let buffer = AudioBuffer::mono(tone(440.0, 512), FS).unwrap();
        let out = stream.process_buffer(&buffer);
        assert_eq!(out.data(), buffer.data());
        assert_eq!(stream.stats().processing.processing_count, 1);
        assert_eq!(stream.stats().failed_buffers, 0);
    }

    #[test]
    fn test_preset_changes_output() {
        let mut stream = processor();
        let ids = stream.apply_preset("bass_boost").unwrap();
        assert!(!ids.is_empty());
        assert_eq!(stream.stats().eq_bands, ids.len());

        let buffer = AudioBuffer::mono(tone(100.0, 4800), FS).unwrap();
        let out = stream.process_buffer(&buffer);
        assert_ne!(out.data(), buffer.data());
        assert_eq!(out.frames(), buffer.frames());

        assert!(matches!(
            stream.apply_preset("lofi"),
            Err(CoreError::UnknownPreset(_))
        ));
    }

    #[test]
    fn test_preset_truncated_to_quality_band_limit() {
        let mut stream = processor();
        let full = find_preset("electronic").unwrap();
        assert_eq!(stream.apply_preset("electronic").unwrap().len(), full.len());

        stream.set_quality(ProcessingQuality::Low).unwrap();
        let ids = stream.apply_preset("electronic").unwrap();
        assert_eq!(ids, vec![1, 2, 3]);
        assert_eq!(stream.stats().eq_bands, 3);
        for (id, expected) in ids.iter().zip(&full) {
            assert_eq!(stream.equalizer().band(*id), Some(expected));
        }
    }

    #[test]
    fn test_failure_returns_input() {
        let mut stream = processor();
        stream
            .equalizer_mut()
            .add_band(FrequencyBand::new(1000.0, 6.0, 1.0).unwrap());

        let buffer = AudioBuffer::mono(vec![0.5; 16], 44100.0).unwrap();
        let out = stream.process_buffer(&buffer);
        assert_eq!(out.data(), buffer.data());
        assert_eq!(stream.stats().failed_buffers, 1);

        let cube = ndarray::ArrayD::<f64>::zeros(ndarray::IxDyn(&[4, 2, 2]));
        assert!(stream.analyze_spectrum(&cube).is_err());
    }

    #[test]
    fn test_zero_noise_profile_is_identity() {
        let mut stream = processor();
        stream.set_noise_profile(vec![0.0; 32]).unwrap();
        assert!(stream.stats().noise_reduction);

        let buffer = AudioBuffer::mono(tone(440.0, 6000), FS).unwrap();
        let out = stream.process_buffer(&buffer);
        assert_eq!(out.data(), buffer.data());

        stream.clear_noise_profile();
        assert!(stream.noise_profile().is_none());
    }

    #[test]
    fn test_invalid_noise_profile_rejected() {
        let mut stream = processor();
        assert!(matches!(
            stream.set_noise_profile(Vec::new()),
            Err(CoreError::Dsp(_))
        ));
        assert!(stream.noise_profile().is_none());
    }

    #[test]
    fn test_set_quality_rebuilds_reducer() {
        let mut stream = processor();
        stream.set_noise_profile(vec![0.01; 64]).unwrap();
        stream.set_quality(ProcessingQuality::Low).unwrap();

        assert_eq!(stream.quality(), ProcessingQuality::Low);
        assert_eq!(stream.noise_profile().map(|p| p.len()), Some(64));
        assert_eq!(stream.stats().quality, ProcessingQuality::Low);
    }

    #[test]
    fn test_analyze_spectrum() {
        let stream = processor();
        let samples = Array1::from(tone(3000.0, 4096)).into_dyn();
        let summary = stream.analyze_spectrum(&samples).unwrap();

        assert_eq!(summary.window_size, 2048);
        assert_abs_diff_eq!(summary.frequency_resolution, FS / 2048.0);
        assert!((summary.spectral_centroid_hz - 3000.0).abs() < 200.0);
        assert_eq!(summary.peak_frequencies.len(), 1);
        assert!((summary.peak_frequencies[0] - 3000.0).abs() <= summary.frequency_resolution);
        assert!(summary.magnitude_db_max > summary.magnitude_db_mean);
    }

    #[test]
    fn test_analyze_spectrum_averages_channels() {
        let stream = processor();
        let left = tone(1000.0, 2048);
        let mut stereo = Array2::<f64>::zeros((2048, 2));
        stereo.column_mut(0).assign(&Array1::from(left.clone()));
        stereo.column_mut(1).assign(&Array1::from(left.clone()));

        let mono = Array1::from(left).into_dyn();
        let a = stream.analyze_spectrum(&stereo.into_dyn()).unwrap();
        let b = stream.analyze_spectrum(&mono).unwrap();
        assert_eq!(a, b);
    }
}
