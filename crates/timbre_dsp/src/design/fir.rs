//! Windowed-sinc FIR design

use std::f64::consts::PI;

use crate::error::{DspError, DspResult};
use crate::window::WindowType;

fn sinc(x: f64) -> f64 {
    if x == 0.0 {
        1.0
    } else {
        (PI * x).sin() / (PI * x)
    }
}

/// Linear-phase taps from band edges given as fractions of Nyquist
///
/// `pass_zero` selects whether DC is in the first passband. Edges alternate
/// pass/stop starting from DC; a passband that reaches Nyquist needs an odd
/// number of taps. Taps are scaled to unity gain at the centre of the first
/// passband (DC or Nyquist when the band touches either).
pub fn firwin(
    numtaps: usize,
    cutoffs: &[f64],
    pass_zero: bool,
    window: WindowType,
) -> DspResult<Vec<f64>> {
    if numtaps == 0 {
        return Err(DspError::InvalidSpecification(
            "FIR filter needs at least one tap".into(),
        ));
    }
    if cutoffs.is_empty() || cutoffs.iter().any(|&c| c <= 0.0 || c >= 1.0) {
        return Err(DspError::InvalidSpecification(
            "FIR band edges must lie strictly between 0 and Nyquist".into(),
        ));
    }
    if cutoffs.windows(2).any(|pair| pair[0] >= pair[1]) {
        return Err(DspError::InvalidSpecification(
            "FIR band edges must be strictly increasing".into(),
        ));
    }

    let pass_nyquist = (cutoffs.len() % 2 == 1) != pass_zero;
    if pass_nyquist && numtaps % 2 == 0 {
        return Err(DspError::InvalidSpecification(format!(
            "a passband at Nyquist needs an odd number of taps, got {numtaps} (use an even order)"
        )));
    }

    let mut edges = Vec::with_capacity(cutoffs.len() + 2);
    if pass_zero {
        edges.push(0.0);
    }
    edges.extend_from_slice(cutoffs);
    if pass_nyquist {
        edges.push(1.0);
    }

    let alpha = 0.5 * (numtaps - 1) as f64;
    let centred: Vec<f64> = (0..numtaps).map(|n| n as f64 - alpha).collect();

    let taper = window.coefficients(numtaps);
    let mut taps: Vec<f64> = centred
        .iter()
        .zip(&taper)
        .map(|(&m, &w)| {
            let ideal: f64 = edges
                .chunks_exact(2)
                .map(|band| band[1] * sinc(band[1] * m) - band[0] * sinc(band[0] * m))
                .sum();
            ideal * w
        })
        .collect();

    let (left, right) = (edges[0], edges[1]);
    let scale_frequency = if left == 0.0 {
        0.0
    } else if right == 1.0 {
        1.0
    } else {
        0.5 * (left + right)
    };
    let gain: f64 = taps
        .iter()
        .zip(&centred)
        .map(|(&h, &m)| h * (PI * m * scale_frequency).cos())
        .sum();
    if gain == 0.0 || !gain.is_finite() {
        return Err(DspError::InvalidSpecification(
            "FIR passband gain vanished; increase the order".into(),
        ));
    }
    for h in &mut taps {
        *h /= gain;
    }
    Ok(taps)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use rustfft::num_complex::Complex64;

    fn magnitude(taps: &[f64], wn: f64) -> f64 {
        taps.iter()
            .enumerate()
            .map(|(n, &h)| h * Complex64::from_polar(1.0, -PI * wn * n as f64))
            .sum::<Complex64>()
            .norm()
    }

    #[test]
    fn test_lowpass_unity_dc_and_symmetry() {
        let taps = firwin(31, &[0.25], true, WindowType::Hamming).unwrap();
        assert_eq!(taps.len(), 31);
        assert_relative_eq!(taps.iter().sum::<f64>(), 1.0, epsilon = 1e-12);
        for i in 0..31 {
            assert_relative_eq!(taps[i], taps[30 - i], epsilon = 1e-15);
        }
        assert!(magnitude(&taps, 0.8) < 0.01);
    }

    #[test]
    fn test_highpass_needs_odd_taps() {
        assert!(firwin(30, &[0.25], false, WindowType::Hamming).is_err());

        let taps = firwin(31, &[0.25], false, WindowType::Hamming).unwrap();
        assert_relative_eq!(magnitude(&taps, 1.0), 1.0, epsilon = 1e-12);
        assert!(magnitude(&taps, 0.0) < 0.01);
    }

    #[test]
    fn test_bandpass_centre_gain() {
        let taps = firwin(64, &[0.2, 0.4], false, WindowType::Hamming).unwrap();
        assert_relative_eq!(magnitude(&taps, 0.3), 1.0, epsilon = 1e-12);
        assert!(magnitude(&taps, 0.9) < 0.01);
    }

    #[test]
    fn test_bandstop_passes_both_ends() {
        let taps = firwin(65, &[0.2, 0.4], true, WindowType::Hamming).unwrap();
        assert_relative_eq!(magnitude(&taps, 0.0), 1.0, epsilon = 1e-12);
        assert!(magnitude(&taps, 0.995) > 0.9);
        assert!(magnitude(&taps, 0.3) < 0.1);
    }

    #[test]
    fn test_invalid_edges() {
        assert!(firwin(11, &[], true, WindowType::Hamming).is_err());
        assert!(firwin(11, &[1.0], true, WindowType::Hamming).is_err());
        assert!(firwin(11, &[0.4, 0.2], true, WindowType::Hamming).is_err());
        assert!(firwin(0, &[0.2], true, WindowType::Hamming).is_err());
    }
}
