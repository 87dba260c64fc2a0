//! Parametric Equalizer
//!
//! A dynamic set of peaking bands, each synthesized as a second-order
//! resonator and run in series through a [`FilterBank`]. Band ids start at
//! 1 and are not reused after removal; a full reset starts them over.

use std::collections::BTreeMap;
use std::f64::consts::PI;
use std::time::Instant;

use biquad::{Coefficients, ToHertz, Type};
use ndarray::ArrayD;
use rustfft::num_complex::Complex64;
use serde::{Deserialize, Serialize};

use crate::bank::{BankMode, FilterBank};
use crate::buffer::AudioBuffer;
use crate::design::{FilterCoefficients, MAX_NORMALIZED_CUTOFF, MIN_NORMALIZED_CUTOFF};
use crate::error::{DspError, DspResult};
use crate::filter::{DigitalFilter, FrequencyResponse};
use crate::stats::ProcessingStats;

/// Largest boost or cut a band may request
pub const MAX_BAND_GAIN_DB: f64 = 24.0;

/// Bands quieter than this are synthesized as all-pass
pub const MIN_AUDIBLE_GAIN_DB: f64 = 0.1;

#[derive(Deserialize)]
struct RawBand {
    center_frequency: f64,
    gain_db: f64,
    q_factor: f64,
    #[serde(default)]
    bandwidth: Option<f64>,
}

/// Q handed to the RBJ band-pass so that its sin(w0)/(2Q) bandwidth term
/// equals the prewarped tan(w0/(2Q)) of a standard peak resonator
fn resonator_q(w0: f64, q: f64) -> f64 {
    let beta = (w0 / (2.0 * q)).tan();
    let warped = w0.sin() / (2.0 * beta);
    if warped.is_finite() && warped > 0.0 {
        warped
    } else {
        q
    }
}

/// One peaking EQ band
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(try_from = "RawBand")]
pub struct FrequencyBand {
    center_frequency: f64,
    gain_db: f64,
    q_factor: f64,
    bandwidth: Option<f64>,
}

impl TryFrom<RawBand> for FrequencyBand {
    type Error = DspError;

    fn try_from(raw: RawBand) -> DspResult<Self> {
        let band = Self::new(raw.center_frequency, raw.gain_db, raw.q_factor)?;
        match raw.bandwidth {
            Some(bandwidth) => band.with_bandwidth(bandwidth),
            None => Ok(band),
        }
    }
}

impl FrequencyBand {
    pub fn new(center_frequency: f64, gain_db: f64, q_factor: f64) -> DspResult<Self> {
        if !(center_frequency.is_finite() && center_frequency > 0.0) {
            return Err(DspError::InvalidBand(format!(
                "center frequency must be positive, got {center_frequency}"
            )));
        }
        if !(q_factor.is_finite() && q_factor > 0.0) {
            return Err(DspError::InvalidBand(format!(
                "Q factor must be positive, got {q_factor}"
            )));
        }
        if !(gain_db.is_finite() && gain_db.abs() <= MAX_BAND_GAIN_DB) {
            return Err(DspError::InvalidBand(format!(
                "gain must be within +/-{MAX_BAND_GAIN_DB} dB, got {gain_db}"
            )));
        }
        Ok(Self {
            center_frequency,
            gain_db,
            q_factor,
            bandwidth: None,
        })
    }

    /// Explicit bandwidth in Hz (overrides Q for the band edges)
    pub fn with_bandwidth(mut self, bandwidth: f64) -> DspResult<Self> {
        if !(bandwidth.is_finite() && bandwidth > 0.0) {
            return Err(DspError::InvalidBand(format!(
                "bandwidth must be positive, got {bandwidth}"
            )));
        }
        self.bandwidth = Some(bandwidth);
        Ok(self)
    }

    pub fn center_frequency(&self) -> f64 {
        self.center_frequency
    }

    pub fn gain_db(&self) -> f64 {
        self.gain_db
    }

    pub fn q_factor(&self) -> f64 {
        self.q_factor
    }

    pub fn bandwidth(&self) -> Option<f64> {
        self.bandwidth
    }

    pub fn low_frequency(&self) -> f64 {
        match self.bandwidth {
            Some(bw) => self.center_frequency - bw / 2.0,
            None => self.center_frequency / (1.0 + 1.0 / (2.0 * self.q_factor)),
        }
    }

    pub fn high_frequency(&self) -> f64 {
        match self.bandwidth {
            Some(bw) => self.center_frequency + bw / 2.0,
            None => self.center_frequency * (1.0 + 1.0 / (2.0 * self.q_factor)),
        }
    }

    /// Convert dB gain to linear amplitude
    fn linear_gain(&self) -> f64 {
        10f64.powf(self.gain_db / 20.0)
    }

    /// Resonator coefficients for this band, or `None` when the band should
    /// be transparent
    fn to_coefficients(self, sample_rate: f64) -> Option<FilterCoefficients> {
        if self.gain_db.abs() < MIN_AUDIBLE_GAIN_DB {
            return None;
        }

        let nyquist = sample_rate / 2.0;
        let normalized = (self.center_frequency / nyquist)
            .clamp(MIN_NORMALIZED_CUTOFF, MAX_NORMALIZED_CUTOFF);
        let centre = normalized * nyquist;

        let section = Coefficients::<f64>::from_params(
            Type::BandPass,
            sample_rate.hz(),
            centre.hz(),
            resonator_q(PI * normalized, self.q_factor),
        )
        .ok()?;
        let resonator = FilterCoefficients::new(
            vec![section.b0, section.b1, section.b2],
            vec![1.0, section.a1, section.a2],
        )
        .ok()?;

        // Unity at the centre, then the band's scaling: boosts multiply,
        // cuts divide by the linear gain.
        let peak = resonator.response_at(PI * normalized).norm();
        if !(peak.is_finite() && peak > 0.0) {
            return None;
        }
        let linear = self.linear_gain();
        let scale = (if linear > 1.0 { linear } else { 1.0 / linear }) / peak;

        let numerator = resonator.numerator().iter().map(|b| b * scale).collect();
        FilterCoefficients::new(numerator, resonator.denominator().to_vec()).ok()
    }

    fn to_filter(self, sample_rate: f64) -> DigitalFilter {
        self.to_coefficients(sample_rate)
            .map(|coefficients| DigitalFilter::new(coefficients))
            .unwrap_or_else(DigitalFilter::all_pass)
    }
}

fn band_key(id: u32) -> String {
    format!("band_{id}")
}

/// The main equalizer processor
pub struct ParametricEqualizer {
    sample_rate: f64,
    bands: BTreeMap<u32, FrequencyBand>,
    // Owns one filter per band, keyed by `band_key`
    bank: FilterBank,
    next_band_id: u32,
    stats: ProcessingStats,
}

impl ParametricEqualizer {
    pub fn new(sample_rate: f64) -> DspResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSpecification(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        Ok(Self {
            sample_rate,
            bands: BTreeMap::new(),
            bank: FilterBank::new(),
            next_band_id: 1,
            stats: ProcessingStats::default(),
        })
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn stats(&self) -> &ProcessingStats {
        &self.stats
    }

    /// Add a band and return its id
    pub fn add_band(&mut self, band: FrequencyBand) -> u32 {
        let id = self.next_band_id;
        self.next_band_id += 1;
        self.bands.insert(id, band);
        self.bank.add(band_key(id), band.to_filter(self.sample_rate));
        id
    }

    /// Replace a band's parameters; the band keeps its processing position
    pub fn update_band(&mut self, id: u32, band: FrequencyBand) -> DspResult<()> {
        let slot = self.bands.get_mut(&id).ok_or(DspError::BandNotFound(id))?;
        *slot = band;
        self.bank.add(band_key(id), band.to_filter(self.sample_rate));
        Ok(())
    }

    pub fn remove_band(&mut self, id: u32) -> DspResult<()> {
        self.bands.remove(&id).ok_or(DspError::BandNotFound(id))?;
        self.bank.remove(&band_key(id));
        Ok(())
    }

    pub fn band(&self, id: u32) -> Option<&FrequencyBand> {
        self.bands.get(&id)
    }

    /// The filter synthesized for a band
    pub fn band_filter(&self, id: u32) -> Option<&DigitalFilter> {
        self.bank.get(&band_key(id))
    }

    pub fn band_ids(&self) -> Vec<u32> {
        self.bands.keys().copied().collect()
    }

    pub fn band_count(&self) -> usize {
        self.bands.len()
    }

    pub fn bands(&self) -> impl Iterator<Item = (u32, &FrequencyBand)> {
        self.bands.iter().map(|(&id, band)| (id, band))
    }

    /// Run samples through every band in series
    pub fn process(&mut self, samples: &ArrayD<f64>) -> DspResult<ArrayD<f64>> {
        if self.bands.is_empty() {
            return Ok(samples.clone());
        }
        let started = Instant::now();
        let output = self.bank.process(samples, BankMode::Series)?;
        self.stats.record(started, samples.len());
        Ok(output)
    }

    pub fn process_buffer(&mut self, buffer: &AudioBuffer) -> DspResult<AudioBuffer> {
        let processed = self.process(buffer.data())?;
        buffer.with_data(processed)
    }

    /// Product of every band's complex response
    pub fn frequency_response(&self, n_points: usize) -> FrequencyResponse {
        let mut combined = vec![Complex64::new(1.0, 0.0); n_points];
        for (_, filter) in self.bank.iter() {
            for (total, h) in combined
                .iter_mut()
                .zip(filter.coefficients().frequency_response(n_points))
            {
                *total *= h;
            }
        }
        if combined.iter().all(|h| h.is_finite()) {
            FrequencyResponse::from_complex(&combined)
        } else {
            FrequencyResponse::flat(n_points)
        }
    }

    /// Clear the delay lines of every band filter
    pub fn reset_state(&mut self) {
        self.bank.reset_all();
    }

    /// Remove every band and restart band ids at 1
    pub fn reset(&mut self) {
        self.bands.clear();
        self.bank = FilterBank::new();
        self.next_band_id = 1;
    }

    /// Replace all bands with the given set, returning their new ids
    pub fn apply_preset(&mut self, bands: &[FrequencyBand]) -> Vec<u32> {
        self.reset();
        bands.iter().map(|&band| self.add_band(band)).collect()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use ndarray::{Array1, Array2};

    const FS: f64 = 48000.0;

    fn band(center: f64, gain: f64, q: f64) -> FrequencyBand {
        FrequencyBand::new(center, gain, q).unwrap()
    }

    fn response_at(eq: &ParametricEqualizer, hz: f64) -> f64 {
        // 4800 points over [0, 24 kHz) puts bin k at 5k Hz
        eq.frequency_response(4800).magnitude[(hz / 5.0) as usize]
    }

    #[test]
    fn test_band_validation() {
        assert!(FrequencyBand::new(0.0, 3.0, 1.0).is_err());
        assert!(FrequencyBand::new(1000.0, 3.0, 0.0).is_err());
        assert!(FrequencyBand::new(1000.0, 30.0, 1.0).is_err());
        assert!(band(1000.0, 3.0, 1.0).with_bandwidth(-1.0).is_err());
        assert!(FrequencyBand::new(1000.0, -24.0, 1.0).is_ok());
    }

    #[test]
    fn test_band_edges() {
        let b = band(1000.0, 3.0, 1.0);
        assert_relative_eq!(b.low_frequency(), 1000.0 / 1.5);
        assert_relative_eq!(b.high_frequency(), 1500.0);

        let b = b.with_bandwidth(200.0).unwrap();
        assert_relative_eq!(b.low_frequency(), 900.0);
        assert_relative_eq!(b.high_frequency(), 1100.0);
    }

    #[test]
    fn test_band_deserialize_validates() {
        let ok: FrequencyBand =
            serde_json::from_str(r#"{"center_frequency":250.0,"gain_db":-3.0,"q_factor":0.7}"#).unwrap();
        assert_eq!(ok.center_frequency(), 250.0);

        let bad = serde_json::from_str::<FrequencyBand>(
            r#"{"center_frequency":250.0,"gain_db":-3.0,"q_factor":-0.7}"#,
        );
        assert!(bad.is_err());
    }

    #[test]
    fn test_ids_restart_after_reset() {
        let mut eq = ParametricEqualizer::new(FS).unwrap();
        let a = eq.add_band(band(100.0, 3.0, 1.0));
        let b = eq.add_band(band(1000.0, 3.0, 1.0));
        assert_eq!((a, b), (1, 2));

        eq.remove_band(a).unwrap();
        assert_eq!(eq.add_band(band(5000.0, 3.0, 1.0)), 3);

        eq.reset();
        assert_eq!(eq.band_count(), 0);
        assert!(eq.band_filter(2).is_none());
        assert_eq!(eq.add_band(band(5000.0, 3.0, 1.0)), 1);
        assert_eq!(eq.add_band(band(8000.0, 3.0, 1.0)), 2);
    }

    #[test]
    fn test_unknown_band_errors() {
        let mut eq = ParametricEqualizer::new(FS).unwrap();
        assert_eq!(eq.remove_band(9), Err(DspError::BandNotFound(9)));
        assert_eq!(
            eq.update_band(9, band(100.0, 1.0, 1.0)),
            Err(DspError::BandNotFound(9))
        );
    }

    #[test]
    fn test_no_bands_is_identity() {
        let mut eq = ParametricEqualizer::new(FS).unwrap();
        let input = Array1::from(vec![0.1, -0.4, 0.9]).into_dyn();
        assert_eq!(eq.process(&input).unwrap(), input);
        assert_eq!(eq.frequency_response(16), FrequencyResponse::flat(16));
    }

    #[test]
    fn test_near_zero_gain_is_all_pass() {
        let mut eq = ParametricEqualizer::new(FS).unwrap();
        let id = eq.add_band(band(1000.0, 0.05, 1.0));
        let filter = eq.band_filter(id).unwrap();
        assert!(filter.is_fir());
        assert_eq!(filter.coefficients().numerator(), &[1.0]);

        let input = Array1::from(vec![0.25, -0.5, 1.0]).into_dyn();
        assert_eq!(eq.process(&input).unwrap(), input);
    }

    #[test]
    fn test_boost_peaks_at_centre() {
        let mut eq = ParametricEqualizer::new(FS).unwrap();
        eq.add_band(band(1000.0, 6.0, 1.0));
        let expected = 10f64.powf(6.0 / 20.0);
        assert_relative_eq!(response_at(&eq, 1000.0), expected, epsilon = 1e-9);
        assert!(response_at(&eq, 100.0) < expected);
        assert!(response_at(&eq, 10000.0) < expected);
    }

    #[test]
    fn test_cut_scales_by_inverse_gain() {
        let mut eq = ParametricEqualizer::new(FS).unwrap();
        eq.add_band(band(2000.0, -6.0, 1.0));
        assert_relative_eq!(response_at(&eq, 2000.0), 10f64.powf(6.0 / 20.0), epsilon = 1e-9);
    }

    #[test]
    fn test_update_keeps_position() {
        let mut eq = ParametricEqualizer::new(FS).unwrap();
        let first = eq.add_band(band(100.0, 3.0, 1.0));
        let second = eq.add_band(band(1000.0, 3.0, 1.0));
        eq.update_band(first, band(200.0, -2.0, 2.0)).unwrap();

        assert_eq!(eq.band_ids(), vec![first, second]);
        assert_eq!(eq.band(first).unwrap().center_frequency(), 200.0);
        assert_eq!(eq.bank.filter_ids(), &["band_1", "band_2"]);
    }

    #[test]
    fn test_response_is_product_of_bands() {
        let mut eq = ParametricEqualizer::new(FS).unwrap();
        eq.add_band(band(1000.0, 6.0, 1.0));
        let single = response_at(&eq, 1000.0);
        eq.add_band(band(1000.0, 6.0, 1.0));
        assert_relative_eq!(response_at(&eq, 1000.0), single * single, epsilon = 1e-9);
    }

    #[test]
    fn test_bandwidth_is_prewarped_at_high_centres() {
        let mut eq = ParametricEqualizer::new(FS).unwrap();
        let q = 2.0;
        let id = eq.add_band(band(15000.0, 6.0, q));
        let w0 = PI * 15000.0 / (FS / 2.0);
        let beta = (w0 / (2.0 * q)).tan();

        let filter = eq.band_filter(id).unwrap();
        let a = filter.coefficients().denominator();
        assert_relative_eq!(a[0], 1.0, epsilon = 1e-12);
        assert_relative_eq!(a[1], -2.0 * w0.cos() / (1.0 + beta), epsilon = 1e-12);
        assert_relative_eq!(a[2], (1.0 - beta) / (1.0 + beta), epsilon = 1e-12);
        assert_relative_eq!(response_at(&eq, 15000.0), 10f64.powf(6.0 / 20.0), epsilon = 1e-9);
    }

    #[test]
    fn test_centre_above_nyquist_is_clamped() {
        let mut eq = ParametricEqualizer::new(FS).unwrap();
        let id = eq.add_band(band(30000.0, 6.0, 1.0));
        assert!(!eq.band_filter(id).unwrap().is_fir());
        let out = eq.process(&Array1::from(vec![1.0; 32]).into_dyn()).unwrap();
        assert!(out.iter().all(|y| y.is_finite()));
    }

    #[test]
    fn test_stereo_processing_and_stats() {
        let mut eq = ParametricEqualizer::new(FS).unwrap();
        eq.add_band(band(1000.0, 3.0, 0.7));
        let stereo = Array2::<f64>::from_elem((128, 2), 0.5).into_dyn();
        let out = eq.process(&stereo).unwrap();
        assert_eq!(out.shape(), &[128, 2]);
        assert_eq!(eq.stats().processing_count, 1);

        eq.reset_state();
        assert_eq!(eq.process(&stereo).unwrap(), out);
    }

    #[test]
    fn test_apply_preset_replaces_bands() {
        let mut eq = ParametricEqualizer::new(FS).unwrap();
        eq.add_band(band(100.0, 3.0, 1.0));
        let ids = eq.apply_preset(&[band(60.0, 6.0, 0.7), band(120.0, 4.0, 0.7)]);
        assert_eq!(ids, vec![1, 2]);
        assert_eq!(eq.band_count(), 2);
        assert_eq!(eq.band(1).map(|b| b.center_frequency()), Some(60.0));
    }
}
