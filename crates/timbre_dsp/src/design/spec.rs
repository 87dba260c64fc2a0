//! Filter specification value types

use std::fmt;
use std::hash::{Hash, Hasher};

use serde::{Deserialize, Serialize};

use crate::error::{DspError, DspResult};

/// Normalized cutoffs are clamped into this range before design
pub const MIN_NORMALIZED_CUTOFF: f64 = 0.001;
pub const MAX_NORMALIZED_CUTOFF: f64 = 0.999;

pub const DEFAULT_RIPPLE_DB: f64 = 0.5;
pub const DEFAULT_ATTENUATION_DB: f64 = 60.0;

/// Filter family
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum FilterType {
    #[serde(rename = "butterworth")]
    Butterworth,
    #[serde(rename = "chebyshev1")]
    ChebyshevI,
    #[serde(rename = "chebyshev2")]
    ChebyshevII,
    #[serde(rename = "elliptic")]
    Elliptic,
    #[serde(rename = "bessel")]
    Bessel,
    #[serde(rename = "fir")]
    Fir,
}

impl FilterType {
    pub const ALL: [FilterType; 6] = [
        FilterType::Butterworth,
        FilterType::ChebyshevI,
        FilterType::ChebyshevII,
        FilterType::Elliptic,
        FilterType::Bessel,
        FilterType::Fir,
    ];

    pub fn as_str(self) -> &'static str {
        match self {
            FilterType::Butterworth => "butterworth",
            FilterType::ChebyshevI => "chebyshev1",
            FilterType::ChebyshevII => "chebyshev2",
            FilterType::Elliptic => "elliptic",
            FilterType::Bessel => "bessel",
            FilterType::Fir => "fir",
        }
    }

    /// Recursive (pole-bearing) families
    pub fn is_iir(self) -> bool {
        !matches!(self, FilterType::Fir)
    }

    /// Families whose design depends on `ripple_db`
    pub fn uses_ripple(self) -> bool {
        matches!(self, FilterType::ChebyshevI | FilterType::Elliptic)
    }

    /// Families whose design depends on `attenuation_db`
    pub fn uses_attenuation(self) -> bool {
        matches!(self, FilterType::ChebyshevII | FilterType::Elliptic)
    }
}

impl fmt::Display for FilterType {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Frequency-response shape
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FilterResponse {
    Lowpass,
    Highpass,
    Bandpass,
    Bandstop,
    Peak,
    Notch,
}

impl FilterResponse {
    pub fn as_str(self) -> &'static str {
        match self {
            FilterResponse::Lowpass => "lowpass",
            FilterResponse::Highpass => "highpass",
            FilterResponse::Bandpass => "bandpass",
            FilterResponse::Bandstop => "bandstop",
            FilterResponse::Peak => "peak",
            FilterResponse::Notch => "notch",
        }
    }

    /// Shapes that take a (low, high) cutoff pair
    pub fn is_band(self) -> bool {
        matches!(self, FilterResponse::Bandpass | FilterResponse::Bandstop)
    }

    /// Number of cutoff frequencies this shape expects
    pub fn cutoff_count(self) -> usize {
        if self.is_band() {
            2
        } else {
            1
        }
    }
}

impl fmt::Display for FilterResponse {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Immutable description of a desired filter
///
/// Construction validates the shape-level invariants (positive rate and
/// order, cutoffs inside (0, Nyquist), cutoff count and ordering). Limits
/// that depend on the designer (order range, ripple/attenuation bounds) are
/// checked by [`crate::FilterDesigner::validate`].
///
/// Equality and hashing are exact over every field, so a specification can
/// key a design cache directly.
#[derive(Debug, Clone, Serialize)]
pub struct FilterSpecification {
    filter_type: FilterType,
    response: FilterResponse,
    cutoffs: Vec<f64>,
    sample_rate: f64,
    order: u32,
    ripple_db: f64,
    attenuation_db: f64,
}

impl FilterSpecification {
    pub fn new(
        filter_type: FilterType,
        response: FilterResponse,
        cutoffs: &[f64],
        sample_rate: f64,
        order: u32,
    ) -> DspResult<Self> {
        if !(sample_rate.is_finite() && sample_rate > 0.0) {
            return Err(DspError::InvalidSpecification(format!(
                "sample rate must be positive, got {sample_rate}"
            )));
        }
        if order == 0 {
            return Err(DspError::InvalidSpecification(
                "filter order must be positive".into(),
            ));
        }

        let expected = response.cutoff_count();
        if cutoffs.len() != expected {
            return Err(DspError::InvalidSpecification(format!(
                "{response} filters require exactly {expected} cutoff frequenc{}, got {}",
                if expected == 1 { "y" } else { "ies" },
                cutoffs.len()
            )));
        }

        let nyquist = sample_rate / 2.0;
        for &freq in cutoffs {
            if !(freq.is_finite() && freq > 0.0 && freq < nyquist) {
                return Err(DspError::InvalidSpecification(format!(
                    "cutoff frequency {freq} Hz must be between 0 and {nyquist} Hz"
                )));
            }
        }
        if expected == 2 && cutoffs[0] >= cutoffs[1] {
            return Err(DspError::InvalidSpecification(format!(
                "lower cutoff {} Hz must be below upper cutoff {} Hz",
                cutoffs[0], cutoffs[1]
            )));
        }

        Ok(Self {
            filter_type,
            response,
            cutoffs: cutoffs.to_vec(),
            sample_rate,
            order,
            ripple_db: DEFAULT_RIPPLE_DB,
            attenuation_db: DEFAULT_ATTENUATION_DB,
        })
    }

    /// Passband ripple in dB (Chebyshev-I, Elliptic)
    pub fn with_ripple_db(mut self, ripple_db: f64) -> Self {
        self.ripple_db = ripple_db;
        self
    }

    /// Stopband attenuation in dB (Chebyshev-II, Elliptic)
    pub fn with_attenuation_db(mut self, attenuation_db: f64) -> Self {
        self.attenuation_db = attenuation_db;
        self
    }

    /// Same specification at a different order
    pub fn with_order(&self, order: u32) -> DspResult<Self> {
        if order == 0 {
            return Err(DspError::InvalidSpecification(
                "filter order must be positive".into(),
            ));
        }
        Ok(Self {
            order,
            ..self.clone()
        })
    }

    pub fn filter_type(&self) -> FilterType {
        self.filter_type
    }

    pub fn response(&self) -> FilterResponse {
        self.response
    }

    pub fn cutoffs(&self) -> &[f64] {
        &self.cutoffs
    }

    pub fn sample_rate(&self) -> f64 {
        self.sample_rate
    }

    pub fn order(&self) -> u32 {
        self.order
    }

    pub fn ripple_db(&self) -> f64 {
        self.ripple_db
    }

    pub fn attenuation_db(&self) -> f64 {
        self.attenuation_db
    }

    pub fn nyquist(&self) -> f64 {
        self.sample_rate / 2.0
    }

    /// Cutoffs as a fraction of Nyquist, clamped to [0.001, 0.999]
    pub fn normalized_cutoffs(&self) -> Vec<f64> {
        let nyquist = self.nyquist();
        self.cutoffs
            .iter()
            .map(|&f| (f / nyquist).clamp(MIN_NORMALIZED_CUTOFF, MAX_NORMALIZED_CUTOFF))
            .collect()
    }
}

impl PartialEq for FilterSpecification {
    fn eq(&self, other: &Self) -> bool {
        self.filter_type == other.filter_type
            && self.response == other.response
            && self.order == other.order
            && self.sample_rate.to_bits() == other.sample_rate.to_bits()
            && self.ripple_db.to_bits() == other.ripple_db.to_bits()
            && self.attenuation_db.to_bits() == other.attenuation_db.to_bits()
            && self.cutoffs.len() == other.cutoffs.len()
            && self
                .cutoffs
                .iter()
                .zip(&other.cutoffs)
                .all(|(a, b)| a.to_bits() == b.to_bits())
    }
}

impl Eq for FilterSpecification {}

impl Hash for FilterSpecification {
    fn hash<H: Hasher>(&self, state: &mut H) {
        self.filter_type.hash(state);
        self.response.hash(state);
        self.order.hash(state);
        self.sample_rate.to_bits().hash(state);
        self.ripple_db.to_bits().hash(state);
        self.attenuation_db.to_bits().hash(state);
        for cutoff in &self.cutoffs {
            cutoff.to_bits().hash(state);
        }
    }
}
