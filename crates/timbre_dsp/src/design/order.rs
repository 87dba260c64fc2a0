//! Minimum-order estimation for Butterworth and Elliptic designs

use std::f64::consts::PI;

use super::elliptic::ellipk_parameter;
use super::spec::{FilterResponse, FilterSpecification, FilterType};

/// Stopband edges assumed relative to the passband edges
const STOPBAND_ABOVE: f64 = 1.2;
const STOPBAND_BELOW: f64 = 0.8;

/// Order needed to meet the specification's ripple/attenuation with the
/// assumed stopband offsets, or `None` when the edges are degenerate or the
/// family has no closed form.
pub fn minimum_order(spec: &FilterSpecification) -> Option<u32> {
    let nat = selectivity(spec)?;
    let gstop = 10f64.powf(0.1 * spec.attenuation_db().abs());
    let gpass = 10f64.powf(0.1 * spec.ripple_db().abs());
    if gpass <= 1.0 || gstop <= 1.0 {
        return None;
    }
    let discrimination = (gstop - 1.0) / (gpass - 1.0);

    let order = match spec.filter_type() {
        FilterType::Butterworth => discrimination.log10() / (2.0 * nat.log10()),
        FilterType::Elliptic => {
            let arg0 = 1.0 / nat;
            let arg1 = discrimination.sqrt();
            let d0 = (ellipk_parameter(arg0 * arg0), ellipk_parameter(1.0 - arg0 * arg0));
            let d1 = (
                ellipk_parameter(1.0 / (arg1 * arg1)),
                ellipk_parameter(1.0 - 1.0 / (arg1 * arg1)),
            );
            d0.0 * d1.1 / (d0.1 * d1.0)
        }
        _ => return None,
    };

    if order.is_finite() && order > 0.0 {
        Some(order.ceil().max(1.0) as u32)
    } else {
        None
    }
}

/// Analog selectivity ratio of the lowpass prototype (> 1 when valid)
fn selectivity(spec: &FilterSpecification) -> Option<f64> {
    let wp = spec.normalized_cutoffs();
    let warp = |w: f64| (PI * w / 2.0).tan();

    let nat = match spec.response() {
        FilterResponse::Lowpass => {
            let ws = checked_edge(wp[0] * STOPBAND_ABOVE)?;
            warp(ws) / warp(wp[0])
        }
        FilterResponse::Highpass => {
            let ws = checked_edge(wp[0] * STOPBAND_BELOW)?;
            warp(wp[0]) / warp(ws)
        }
        FilterResponse::Bandpass => {
            let (p0, p1) = (warp(wp[0]), warp(wp[1]));
            let s0 = warp(checked_edge(wp[0] * STOPBAND_BELOW)?);
            let s1 = warp(checked_edge(wp[1] * STOPBAND_ABOVE)?);
            [s0, s1]
                .iter()
                .map(|&s| ((s * s - p0 * p1) / (s * (p0 - p1))).abs())
                .fold(f64::INFINITY, f64::min)
        }
        FilterResponse::Bandstop => {
            let (p0, p1) = (warp(wp[0]), warp(wp[1]));
            let (e0, e1) = (wp[0] * STOPBAND_ABOVE, wp[1] * STOPBAND_BELOW);
            if e0 >= e1 {
                return None;
            }
            let (s0, s1) = (warp(e0), warp(e1));
            [s0, s1]
                .iter()
                .map(|&s| ((s * (p0 - p1)) / (s * s - p0 * p1)).abs())
                .fold(f64::INFINITY, f64::min)
        }
        FilterResponse::Peak | FilterResponse::Notch => return None,
    };

    (nat.is_finite() && nat > 1.0).then_some(nat)
}

fn checked_edge(w: f64) -> Option<f64> {
    (w > 0.0 && w < 1.0).then_some(w)
}

#[cfg(test)]
mod tests {
    use super::*;

    fn spec(filter_type: FilterType, response: FilterResponse, cutoffs: &[f64]) -> FilterSpecification {
        FilterSpecification::new(filter_type, response, cutoffs, 48000.0, 4).unwrap()
    }

    #[test]
    fn test_butterworth_lowpass_order() {
        // 0.5 dB / 60 dB with a 1.2x transition needs a steep filter
        let order = minimum_order(&spec(FilterType::Butterworth, FilterResponse::Lowpass, &[1000.0])).unwrap();
        assert!(order > 20);
    }

    #[test]
    fn test_elliptic_needs_fewer_poles() {
        let s = spec(FilterType::Elliptic, FilterResponse::Lowpass, &[1000.0]);
        let elliptic = minimum_order(&s).unwrap();
        let butter = minimum_order(&spec(FilterType::Butterworth, FilterResponse::Lowpass, &[1000.0])).unwrap();
        assert!(elliptic >= 1);
        assert!(elliptic < butter);
    }

    #[test]
    fn test_loose_attenuation_lowers_order() {
        let tight = spec(FilterType::Butterworth, FilterResponse::Highpass, &[4000.0]);
        let loose = tight.clone().with_attenuation_db(6.0).with_ripple_db(3.0);
        assert!(minimum_order(&loose).unwrap() < minimum_order(&tight).unwrap());
    }

    #[test]
    fn test_band_shapes() {
        let bp = spec(FilterType::Butterworth, FilterResponse::Bandpass, &[1000.0, 4000.0]);
        assert!(minimum_order(&bp).is_some());

        let bs = spec(FilterType::Elliptic, FilterResponse::Bandstop, &[1000.0, 4000.0]);
        assert!(minimum_order(&bs).is_some());
    }

    #[test]
    fn test_degenerate_edges() {
        // Stopband edge would exceed Nyquist
        let high_lp = spec(FilterType::Butterworth, FilterResponse::Lowpass, &[22000.0]);
        assert_eq!(minimum_order(&high_lp), None);

        // Stopband offsets cross inside a narrow notch
        let narrow = spec(FilterType::Butterworth, FilterResponse::Bandstop, &[1000.0, 1100.0]);
        assert_eq!(minimum_order(&narrow), None);

        // No closed form
        let cheb = spec(FilterType::ChebyshevI, FilterResponse::Lowpass, &[1000.0]);
        assert_eq!(minimum_order(&cheb), None);
    }
}
