//! Spectral Processor
//!
//! Windowed FFT analysis, short-time transforms with weighted overlap-add
//! resynthesis, and magnitude-domain noise reduction (spectral
//! subtraction).
//!
//! # Framing
//!
//! Frames of `window_size` samples start every `hop_size` samples, where
//! `hop_size = window_size * (1 - overlap)`. Input is zero-padded at the end
//! so the last frame covers the final sample. Resynthesis applies the
//! analysis window again and divides by the summed squared window.

use std::sync::Arc;
use std::time::Instant;

use ndarray::{ArrayD, Axis};
use rustfft::{num_complex::Complex64, Fft, FftPlanner};
use serde::Serialize;

use crate::error::{DspError, DspResult};
use crate::stats::ProcessingStats;
use crate::window::WindowType;

pub const DEFAULT_WINDOW_SIZE: usize = 2048;
pub const DEFAULT_OVERLAP: f64 = 0.5;
pub const MAX_OVERLAP: f64 = 0.95;

/// Fraction of the original magnitude kept after subtraction
pub const SPECTRAL_FLOOR: f64 = 0.1;

/// Fraction of total energy below the rolloff frequency
pub const DEFAULT_ROLLOFF: f64 = 0.85;

// Inverse-transform positions whose window weight is below this come back as zero
const MIN_WINDOW_WEIGHT: f64 = 1e-8;

/// Below this fraction of the peak window weight, subtraction output fades
/// back to the input instead of being divided by a vanishing weight
pub const MIN_RELATIVE_WEIGHT: f64 = 0.1;

/// One-sided spectrum of a single analysis window
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct SpectrumAnalysis {
    pub frequencies: Vec<f64>,
    pub magnitudes: Vec<f64>,
    pub phases: Vec<f64>,
    pub sample_rate: f64,
    pub window_size: usize,
    pub window_type: WindowType,
}

/// A local maximum of the magnitude spectrum
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct SpectralPeak {
    pub frequency: f64,
    pub magnitude: f64,
}

impl SpectrumAnalysis {
    /// Bin spacing in Hz
    pub fn frequency_resolution(&self) -> f64 {
        self.sample_rate / self.window_size as f64
    }

    pub fn magnitude_db(&self) -> Vec<f64> {
        self.magnitudes
            .iter()
            .map(|m| 20.0 * m.max(1e-10).log10())
            .collect()
    }

    fn total_magnitude(&self) -> f64 {
        self.magnitudes.iter().sum()
    }

    /// Magnitude-weighted mean frequency
    pub fn spectral_centroid(&self) -> f64 {
        let total = self.total_magnitude();
        if total == 0.0 {
            return 0.0;
        }
        self.frequencies
            .iter()
            .zip(&self.magnitudes)
            .map(|(f, m)| f * m)
            .sum::<f64>()
            / total
    }

    /// Lowest frequency below which `fraction` of the energy lies
    pub fn spectral_rolloff(&self, fraction: f64) -> f64 {
        let total: f64 = self.magnitudes.iter().map(|m| m * m).sum();
        if total == 0.0 {
            return 0.0;
        }
        let target = fraction * total;
        let mut cumulative = 0.0;
        for (f, m) in self.frequencies.iter().zip(&self.magnitudes) {
            cumulative += m * m;
            if cumulative >= target {
                return *f;
            }
        }
        self.frequencies.last().copied().unwrap_or(0.0)
    }

    /// Magnitude-weighted spread around the centroid
    pub fn spectral_bandwidth(&self) -> f64 {
        let total = self.total_magnitude();
        if total == 0.0 {
            return 0.0;
        }
        let centroid = self.spectral_centroid();
        let variance = self
            .frequencies
            .iter()
            .zip(&self.magnitudes)
            .map(|(f, m)| (f - centroid).powi(2) * m)
            .sum::<f64>()
            / total;
        variance.sqrt()
    }

    /// Local maxima at least `height_threshold` (relative to the largest
    /// magnitude) tall and `min_distance` bins apart; taller peaks win
    pub fn find_peaks(&self, height_threshold: f64, min_distance: usize) -> Vec<SpectralPeak> {
        let mags = &self.magnitudes;
        let max = mags.iter().copied().fold(0.0, f64::max);
        if max == 0.0 || mags.len() < 3 {
            return Vec::new();
        }

        let mut candidates: Vec<usize> = (1..mags.len() - 1)
            .filter(|&i| mags[i] > mags[i - 1] && mags[i] >= mags[i + 1])
            .filter(|&i| mags[i] / max >= height_threshold)
            .collect();

        candidates.sort_by(|&a, &b| mags[b].total_cmp(&mags[a]));
        let mut kept: Vec<usize> = Vec::new();
        for index in candidates {
            if kept.iter().all(|&k| k.abs_diff(index) >= min_distance) {
                kept.push(index);
            }
        }
        kept.sort_unstable();

        kept.into_iter()
            .map(|i| SpectralPeak {
                frequency: self.frequencies[i],
                magnitude: mags[i],
            })
            .collect()
    }
}

/// Short-time Fourier transform: one-sided bins per frame
#[derive(Debug, Clone, PartialEq)]
pub struct Stft {
    pub frames: Vec<Vec<Complex64>>,
    /// Bin centre frequencies (Hz)
    pub frequencies: Vec<f64>,
    /// Frame start times (s)
    pub times: Vec<f64>,
    /// Length of the signal that was analysed
    pub length: usize,
}

/// Spectral processor bound to one window configuration
pub struct SpectralProcessor {
    window_size: usize,
    overlap: f64,
    hop_size: usize,
    window_type: WindowType,
    window: Vec<f64>,
    forward: Arc<dyn Fft<f64>>,
    inverse: Arc<dyn Fft<f64>>,
    stats: ProcessingStats,
}

impl std::fmt::Debug for SpectralProcessor {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("SpectralProcessor")
            .field("window_size", &self.window_size)
            .field("overlap", &self.overlap)
            .field("hop_size", &self.hop_size)
            .field("window_type", &self.window_type)
            .finish()
    }
}

impl SpectralProcessor {
    /// `overlap` is clamped to [0, 0.95]
    pub fn new(window_size: usize, overlap: f64, window_type: WindowType) -> DspResult<Self> {
        if window_size < 2 {
            return Err(DspError::InvalidSpectralConfig(format!(
                "window size must be at least 2, got {window_size}"
            )));
        }
        if !overlap.is_finite() {
            return Err(DspError::InvalidSpectralConfig(format!(
                "overlap must be finite, got {overlap}"
            )));
        }
        let overlap = overlap.clamp(0.0, MAX_OVERLAP);
        let hop_size = ((window_size as f64 * (1.0 - overlap)) as usize).max(1);

        let mut planner = FftPlanner::<f64>::new();
        Ok(Self {
            window_size,
            overlap,
            hop_size,
            window_type,
            window: window_type.coefficients(window_size),
            forward: planner.plan_fft_forward(window_size),
            inverse: planner.plan_fft_inverse(window_size),
            stats: ProcessingStats::default(),
        })
    }

    pub fn window_size(&self) -> usize {
        self.window_size
    }

    pub fn overlap(&self) -> f64 {
        self.overlap
    }

    pub fn hop_size(&self) -> usize {
        self.hop_size
    }

    pub fn window_type(&self) -> WindowType {
        self.window_type
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Number of one-sided bins kept by the short-time transforms
    pub fn bin_count(&self) -> usize {
        self.window_size / 2 + 1
    }

    /// Spectrum of the first window of `samples` (zero-padded if short)
    ///
    /// Returns the positive-frequency half, `window_size / 2` bins.
    pub fn analyze(&self, samples: &[f64], sample_rate: f64) -> DspResult<SpectrumAnalysis> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSpectralConfig(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }

        let spectrum = self.transform_frame(samples, 0, true);
        let half = self.window_size / 2;
        let bin_hz = sample_rate / self.window_size as f64;

        Ok(SpectrumAnalysis {
            frequencies: (0..half).map(|k| k as f64 * bin_hz).collect(),
            magnitudes: spectrum[..half].iter().map(|x| x.norm()).collect(),
            phases: spectrum[..half].iter().map(|x| x.arg()).collect(),
            sample_rate,
            window_size: self.window_size,
            window_type: self.window_type,
        })
    }

    /// Full-length FFT of the frame starting at `start`, optionally windowed
    fn transform_frame(&self, samples: &[f64], start: usize, windowed: bool) -> Vec<Complex64> {
        let mut buffer: Vec<Complex64> = (0..self.window_size)
            .map(|i| {
                let x = samples.get(start + i).copied().unwrap_or(0.0);
                let w = if windowed { self.window[i] } else { 1.0 };
                Complex64::new(x * w, 0.0)
            })
            .collect();
        self.forward.process(&mut buffer);
        buffer
    }

    /// Real signal from one-sided bins (Hermitian completion + inverse FFT)
    fn synthesize(&self, bins: &[Complex64]) -> Vec<f64> {
        let n = self.window_size;
        let mut buffer = vec![Complex64::new(0.0, 0.0); n];
        buffer[..bins.len()].copy_from_slice(bins);
        for k in 1..=(n - 1) / 2 {
            buffer[n - k] = buffer[k].conj();
        }
        self.inverse.process(&mut buffer);
        buffer.iter().map(|x| x.re / n as f64).collect()
    }

    fn frame_starts(&self, length: usize) -> Vec<usize> {
        if length <= self.window_size {
            return vec![0];
        }
        let frames = (length - self.window_size + self.hop_size - 1) / self.hop_size + 1;
        (0..frames).map(|i| i * self.hop_size).collect()
    }

    pub fn stft(&self, samples: &[f64], sample_rate: f64) -> Stft {
        let bins = self.bin_count();
        let starts = self.frame_starts(samples.len());
        let frames = starts
            .iter()
            .map(|&start| {
                let mut spectrum = self.transform_frame(samples, start, true);
                spectrum.truncate(bins);
                spectrum
            })
            .collect();

        Stft {
            frames,
            frequencies: (0..bins)
                .map(|k| k as f64 * sample_rate / self.window_size as f64)
                .collect(),
            times: starts.iter().map(|&s| s as f64 / sample_rate).collect(),
            length: samples.len(),
        }
    }

    /// Weighted overlap-add; returns (summed output, summed squared window)
    fn overlap_add(&self, frames: &[Vec<Complex64>], length: usize) -> (Vec<f64>, Vec<f64>) {
        let padded = match frames.len() {
            0 => 0,
            n => (n - 1) * self.hop_size + self.window_size,
        };
        let mut output = vec![0.0; padded.max(length)];
        let mut weight = vec![0.0; padded.max(length)];

        for (index, bins) in frames.iter().enumerate() {
            let start = index * self.hop_size;
            for (i, y) in self.synthesize(bins).into_iter().enumerate() {
                output[start + i] += y * self.window[i];
                weight[start + i] += self.window[i] * self.window[i];
            }
        }
        output.truncate(length);
        weight.truncate(length);
        (output, weight)
    }

    /// Inverse of [`SpectralProcessor::stft`]
    ///
    /// Samples no window covers with non-zero weight come back as zero.
    pub fn istft(&self, stft: &Stft) -> Vec<f64> {
        let (output, weight) = self.overlap_add(&stft.frames, stft.length);
        output
            .into_iter()
            .zip(weight)
            .map(|(y, w)| if w > MIN_WINDOW_WEIGHT { y / w } else { 0.0 })
            .collect()
    }

    /// Apply `f` to a spectrum, recording processing time
    pub fn process_spectrum<F>(&mut self, spectrum: &[Complex64], f: F) -> Vec<Complex64>
    where
        F: FnOnce(&[Complex64]) -> Vec<Complex64>,
    {
        let started = Instant::now();
        let processed = f(spectrum);
        self.stats.record(started, spectrum.len());
        processed
    }

    /// Attenuate stationary noise described by a magnitude profile
    ///
    /// The profile is linearly resampled to the one-sided bin count. Each
    /// bin's magnitude becomes `max(|X| - alpha * noise, 0.1 * |X|)` with
    /// its phase kept. Input shorter than one window is processed as a
    /// single zero-padded frame; longer input is framed and resynthesized
    /// with overlap-add. Near the buffer edges, where the summed window
    /// weight drops below [`MIN_RELATIVE_WEIGHT`] of its peak, the output
    /// crossfades linearly to the input. An all-zero profile or zero alpha
    /// returns the input unchanged.
    pub fn spectral_subtraction(
        &mut self,
        samples: &[f64],
        noise_profile: &[f64],
        alpha: f64,
    ) -> DspResult<Vec<f64>> {
        validate_noise(noise_profile, alpha)?;
        if samples.is_empty() || alpha == 0.0 || noise_profile.iter().all(|&n| n == 0.0) {
            return Ok(samples.to_vec());
        }
        let started = Instant::now();

        let profile = resample_profile(noise_profile, self.bin_count());
        let output = if samples.len() < self.window_size {
            let mut bins = self.transform_frame(samples, 0, false);
            bins.truncate(self.bin_count());
            subtract(&mut bins, &profile, alpha);
            let mut frame = self.synthesize(&bins);
            frame.truncate(samples.len());
            frame
        } else {
            let mut stft = self.stft(samples, 1.0);
            for bins in &mut stft.frames {
                subtract(bins, &profile, alpha);
            }
            let (output, weight) = self.overlap_add(&stft.frames, samples.len());
            normalize_with_fallback(output, weight, samples)
        };

        self.stats.record(started, samples.len());
        Ok(output)
    }
}

fn validate_noise(noise_profile: &[f64], alpha: f64) -> DspResult<()> {
    if noise_profile.is_empty() {
        return Err(DspError::InvalidNoiseProfile("profile is empty".into()));
    }
    if noise_profile.iter().any(|n| !n.is_finite() || *n < 0.0) {
        return Err(DspError::InvalidNoiseProfile(
            "profile magnitudes must be finite and non-negative".into(),
        ));
    }
    if !(alpha.is_finite() && alpha >= 0.0) {
        return Err(DspError::InvalidNoiseProfile(format!(
            "over-subtraction factor must be non-negative, got {alpha}"
        )));
    }
    Ok(())
}

/// Divide overlap-add output by its window weight where that weight is
/// substantial; elsewhere blend towards the unprocessed input
fn normalize_with_fallback(output: Vec<f64>, weight: Vec<f64>, input: &[f64]) -> Vec<f64> {
    let floor = MIN_RELATIVE_WEIGHT * weight.iter().copied().fold(0.0, f64::max);
    if floor <= MIN_WINDOW_WEIGHT {
        return input.to_vec();
    }
    output
        .into_iter()
        .zip(weight)
        .zip(input)
        .map(|((y, w), &x)| {
            if w >= floor {
                y / w
            } else {
                // y / w weighted by w / floor, plus the input for the rest
                x * (1.0 - w / floor) + y / floor
            }
        })
        .collect()
}

fn subtract(bins: &mut [Complex64], profile: &[f64], alpha: f64) {
    for (bin, &noise) in bins.iter_mut().zip(profile) {
        let magnitude = bin.norm();
        let reduced = (magnitude - alpha * noise).max(SPECTRAL_FLOOR * magnitude);
        *bin = Complex64::from_polar(reduced, bin.arg());
    }
}

/// Linear interpolation of `profile` onto `bins` evenly spaced points
fn resample_profile(profile: &[f64], bins: usize) -> Vec<f64> {
    if profile.len() == bins {
        return profile.to_vec();
    }
    if profile.len() == 1 || bins < 2 {
        return vec![profile[0]; bins];
    }
    let last = (profile.len() - 1) as f64;
    (0..bins)
        .map(|k| {
            let position = k as f64 * last / (bins - 1) as f64;
            let lower = position.floor() as usize;
            let upper = (lower + 1).min(profile.len() - 1);
            let t = position - lower as f64;
            profile[lower] * (1.0 - t) + profile[upper] * t
        })
        .collect()
}

/// Spectral subtraction bound to a fixed noise profile, applied per channel
#[derive(Debug)]
pub struct NoiseReducer {
    processor: SpectralProcessor,
    noise_profile: Vec<f64>,
    alpha: f64,
}

impl NoiseReducer {
    pub fn new(processor: SpectralProcessor, noise_profile: Vec<f64>, alpha: f64) -> DspResult<Self> {
        validate_noise(&noise_profile, alpha)?;
        Ok(Self {
            processor,
            noise_profile,
            alpha,
        })
    }

    pub fn noise_profile(&self) -> &[f64] {
        &self.noise_profile
    }

    pub fn alpha(&self) -> f64 {
        self.alpha
    }

    pub fn set_alpha(&mut self, alpha: f64) -> DspResult<()> {
        validate_noise(&self.noise_profile, alpha)?;
        self.alpha = alpha;
        Ok(())
    }

    pub fn processor(&self) -> &SpectralProcessor {
        &self.processor
    }

    /// Reduce noise in a 1-D or 2-D (frames x channels) array
    pub fn process(&mut self, samples: &ArrayD<f64>) -> DspResult<ArrayD<f64>> {
        let mut output = samples.clone();
        match output.ndim() {
            1 | 2 => {
                for mut lane in output.lanes_mut(Axis(0)) {
                    let channel: Vec<f64> = lane.iter().copied().collect();
                    let cleaned = self.processor.spectral_subtraction(
                        &channel,
                        &self.noise_profile,
                        self.alpha,
                    )?;
                    for (dst, src) in lane.iter_mut().zip(cleaned) {
                        *dst = src;
                    }
                }
                Ok(output)
            }
            _ => Err(DspError::UnsupportedShape(samples.shape().to_vec())),
        }
    }
}
