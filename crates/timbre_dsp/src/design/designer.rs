//! Filter designer: specification in, validated coefficients out

use serde::{Deserialize, Serialize};

use super::coefficients::FilterCoefficients;
use super::fir::firwin;
use super::order::minimum_order;
use super::prototype::{self, Zpk};
use super::spec::{FilterResponse, FilterSpecification, FilterType};
use super::transform::{
    bilinear, lowpass_to_bandpass, lowpass_to_bandstop, lowpass_to_highpass, lowpass_to_lowpass,
    prewarp, zpk_to_tf, BILINEAR_FS,
};
use crate::error::{DspError, DspResult};
use crate::window::WindowType;

pub const MAX_FILTER_ORDER: u32 = 20;
pub const DEFAULT_STABILITY_MARGIN: f64 = 0.999;
pub const STRICT_STABILITY_MARGIN: f64 = 0.95;

const MAX_RIPPLE_DB: f64 = 10.0;
const MAX_ATTENUATION_DB: f64 = 120.0;

/// Limits applied by the designer
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct DesignerConfig {
    pub min_order: u32,
    pub max_order: u32,
    /// IIR designs are rejected when any pole magnitude reaches this value
    pub stability_margin: f64,
}

impl Default for DesignerConfig {
    fn default() -> Self {
        Self {
            min_order: 1,
            max_order: MAX_FILTER_ORDER,
            stability_margin: DEFAULT_STABILITY_MARGIN,
        }
    }
}

impl DesignerConfig {
    /// Conservative pole margin for low-precision or long-running streams
    pub fn strict() -> Self {
        Self {
            stability_margin: STRICT_STABILITY_MARGIN,
            ..Self::default()
        }
    }

    pub fn validate(&self) -> Result<(), String> {
        if self.min_order == 0 || self.min_order > self.max_order {
            return Err(format!(
                "Invalid order range: {}..={}",
                self.min_order, self.max_order
            ));
        }
        if !(self.stability_margin > 0.0 && self.stability_margin <= 1.0) {
            return Err(format!(
                "Invalid stability margin: {}",
                self.stability_margin
            ));
        }
        Ok(())
    }
}

/// Something that turns specifications into coefficients
///
/// Implemented by [`FilterDesigner`]; the design service is generic over it.
pub trait DesignFilter: Send + Sync {
    fn design(&self, spec: &FilterSpecification) -> DspResult<FilterCoefficients>;

    fn validate(&self, spec: &FilterSpecification) -> bool;

    fn estimate_order(&self, spec: &FilterSpecification) -> u32;
}

/// IIR/FIR designer covering Butterworth, Chebyshev I/II, Elliptic, Bessel
/// and windowed-sinc FIR families
#[derive(Debug, Clone, Default)]
pub struct FilterDesigner {
    config: DesignerConfig,
}

impl FilterDesigner {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_config(config: DesignerConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &DesignerConfig {
        &self.config
    }

    /// Check the designer's limits, reporting the first violation
    pub fn check(&self, spec: &FilterSpecification) -> DspResult<()> {
        let order = spec.order();
        if order < self.config.min_order || order > self.config.max_order {
            return Err(DspError::InvalidSpecification(format!(
                "filter order must be between {} and {}, got {order}",
                self.config.min_order, self.config.max_order
            )));
        }

        let filter_type = spec.filter_type();
        if filter_type.uses_ripple() {
            let ripple = spec.ripple_db();
            if !(ripple > 0.0 && ripple <= MAX_RIPPLE_DB) {
                return Err(DspError::InvalidSpecification(format!(
                    "passband ripple must be in (0, {MAX_RIPPLE_DB}] dB, got {ripple}"
                )));
            }
        }
        if filter_type.uses_attenuation() {
            let attenuation = spec.attenuation_db();
            if !(attenuation > 0.0 && attenuation <= MAX_ATTENUATION_DB) {
                return Err(DspError::InvalidSpecification(format!(
                    "stopband attenuation must be in (0, {MAX_ATTENUATION_DB}] dB, got {attenuation}"
                )));
            }
        }
        if filter_type == FilterType::Elliptic && spec.ripple_db() >= spec.attenuation_db() {
            return Err(DspError::InvalidSpecification(
                "elliptic ripple must be smaller than the stopband attenuation".into(),
            ));
        }
        Ok(())
    }

    fn design_iir(
        &self,
        spec: &FilterSpecification,
        prototype: &Zpk,
    ) -> DspResult<FilterCoefficients> {
        let analog = shape(prototype, spec)?;
        let digital = bilinear(&analog, BILINEAR_FS);
        let (numerator, denominator) = zpk_to_tf(&digital);
        let coefficients = FilterCoefficients::new(numerator, denominator)?;

        let max_pole_magnitude = coefficients.max_pole_magnitude();
        if !(max_pole_magnitude < self.config.stability_margin) {
            return Err(DspError::FilterInstability {
                max_pole_magnitude,
                margin: self.config.stability_margin,
            });
        }
        Ok(coefficients)
    }

    fn design_fir(&self, spec: &FilterSpecification) -> DspResult<FilterCoefficients> {
        let pass_zero = match spec.response() {
            FilterResponse::Lowpass | FilterResponse::Bandstop => true,
            FilterResponse::Highpass | FilterResponse::Bandpass => false,
            response @ (FilterResponse::Peak | FilterResponse::Notch) => {
                return Err(DspError::UnsupportedFilterType {
                    filter_type: FilterType::Fir,
                    response,
                })
            }
        };
        let numtaps = spec.order() as usize + 1;
        let taps = firwin(
            numtaps,
            &spec.normalized_cutoffs(),
            pass_zero,
            WindowType::Hamming,
        )?;
        FilterCoefficients::fir(taps)
    }
}

/// Analog lowpass prototype for the recursive families
fn analog_prototype(spec: &FilterSpecification) -> Option<Zpk> {
    let order = spec.order();
    let zpk = match spec.filter_type() {
        FilterType::Butterworth => prototype::butterworth(order),
        FilterType::ChebyshevI => prototype::chebyshev1(order, spec.ripple_db()),
        FilterType::ChebyshevII => prototype::chebyshev2(order, spec.attenuation_db()),
        FilterType::Elliptic => prototype::elliptic(order, spec.ripple_db(), spec.attenuation_db()),
        FilterType::Bessel => prototype::bessel(order),
        FilterType::Fir => return None,
    };
    Some(zpk)
}

/// Move the prototype's 1 rad/s edge to the prewarped cutoff(s)
fn shape(prototype: &Zpk, spec: &FilterSpecification) -> DspResult<Zpk> {
    let warped: Vec<f64> = spec.normalized_cutoffs().into_iter().map(prewarp).collect();
    match spec.response() {
        FilterResponse::Lowpass => Ok(lowpass_to_lowpass(prototype, warped[0])),
        FilterResponse::Highpass => Ok(lowpass_to_highpass(prototype, warped[0])),
        FilterResponse::Bandpass | FilterResponse::Bandstop => {
            let (w0, w1) = (warped[0], warped[1]);
            let bandwidth = w1 - w0;
            let centre = (w0 * w1).sqrt();
            if spec.response() == FilterResponse::Bandpass {
                Ok(lowpass_to_bandpass(prototype, centre, bandwidth))
            } else {
                Ok(lowpass_to_bandstop(prototype, centre, bandwidth))
            }
        }
        response @ (FilterResponse::Peak | FilterResponse::Notch) => {
            Err(DspError::UnsupportedFilterType {
                filter_type: spec.filter_type(),
                response,
            })
        }
    }
}

impl DesignFilter for FilterDesigner {
    fn design(&self, spec: &FilterSpecification) -> DspResult<FilterCoefficients> {
        self.check(spec)?;
        match analog_prototype(spec) {
            Some(prototype) => self.design_iir(spec, &prototype),
            None => self.design_fir(spec),
        }
    }

    fn validate(&self, spec: &FilterSpecification) -> bool {
        self.check(spec).is_ok()
    }

    /// Minimum order for the requested ripple/attenuation, capped at the
    /// configured maximum; the requested order when no estimate exists.
    fn estimate_order(&self, spec: &FilterSpecification) -> u32 {
        match minimum_order(spec) {
            Some(order) => order.clamp(self.config.min_order, self.config.max_order),
            None => spec.order(),
        }
    }
}
