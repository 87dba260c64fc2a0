//! Transfer-function coefficients

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;
use serde::Serialize;

use super::polynomial::roots;
use crate::error::{DspError, DspResult};

/// Numerator/denominator of `H(z) = gain * B(z^-1) / A(z^-1)`
///
/// The denominator is always normalized so that `a[0] == 1.0`; a filter
/// whose denominator is exactly `[1.0]` is FIR.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct FilterCoefficients {
    numerator: Vec<f64>,
    denominator: Vec<f64>,
    gain: f64,
}

impl FilterCoefficients {
    pub fn new(numerator: Vec<f64>, denominator: Vec<f64>) -> DspResult<Self> {
        Self::with_gain(numerator, denominator, 1.0)
    }

    pub fn with_gain(numerator: Vec<f64>, denominator: Vec<f64>, gain: f64) -> DspResult<Self> {
        if numerator.is_empty() || denominator.is_empty() {
            return Err(DspError::InvalidCoefficients(
                "numerator and denominator must be non-empty".into(),
            ));
        }
        if numerator.iter().chain(&denominator).any(|c| !c.is_finite()) || !gain.is_finite() {
            return Err(DspError::InvalidCoefficients(
                "coefficients must be finite".into(),
            ));
        }

        let lead = denominator[0];
        if lead == 0.0 {
            return Err(DspError::InvalidCoefficients(
                "leading denominator coefficient is zero".into(),
            ));
        }

        let (numerator, denominator) = if lead == 1.0 {
            (numerator, denominator)
        } else {
            (
                numerator.iter().map(|b| b / lead).collect(),
                denominator.iter().map(|a| a / lead).collect(),
            )
        };

        Ok(Self {
            numerator,
            denominator,
            gain,
        })
    }

    /// Finite impulse response taps
    pub fn fir(taps: Vec<f64>) -> DspResult<Self> {
        Self::new(taps, vec![1.0])
    }

    /// Identity transfer function
    pub fn all_pass() -> Self {
        Self {
            numerator: vec![1.0],
            denominator: vec![1.0],
            gain: 1.0,
        }
    }

    pub fn numerator(&self) -> &[f64] {
        &self.numerator
    }

    pub fn denominator(&self) -> &[f64] {
        &self.denominator
    }

    pub fn gain(&self) -> f64 {
        self.gain
    }

    pub fn is_fir(&self) -> bool {
        self.denominator.len() == 1 && self.denominator[0] == 1.0
    }

    /// Length of the transposed direct-form delay line
    pub fn order(&self) -> usize {
        self.numerator.len().max(self.denominator.len()) - 1
    }

    /// Roots of the denominator
    pub fn poles(&self) -> Vec<Complex64> {
        roots(&self.denominator)
    }

    pub fn max_pole_magnitude(&self) -> f64 {
        self.poles().iter().map(|p| p.norm()).fold(0.0, f64::max)
    }

    /// Complex response at `omega` radians/sample
    pub fn response_at(&self, omega: f64) -> Complex64 {
        let z_inv = Complex64::from_polar(1.0, -omega);
        let eval = |coeffs: &[f64]| {
            coeffs
                .iter()
                .rev()
                .fold(Complex64::new(0.0, 0.0), |acc, &c| acc * z_inv + c)
        };
        eval(&self.numerator) / eval(&self.denominator) * self.gain
    }

    /// Response at `n_points` evenly spaced frequencies in [0, pi)
    pub fn frequency_response(&self, n_points: usize) -> Vec<Complex64> {
        (0..n_points)
            .map(|k| self.response_at(PI * k as f64 / n_points as f64))
            .collect()
    }

    /// Delay-line state reproducing the given past outputs and inputs
    ///
    /// `past_outputs[0]` / `past_inputs[0]` are the most recent samples;
    /// missing history is taken as zero, so empty slices give the
    /// zero-state initial condition.
    pub fn initial_conditions(&self, past_outputs: &[f64], past_inputs: &[f64]) -> Vec<f64> {
        let b = &self.numerator;
        let a = &self.denominator;
        let m = b.len() - 1;
        let n = a.len() - 1;
        let mut state = vec![0.0; self.order()];

        let x = |i: usize| past_inputs.get(i).copied().unwrap_or(0.0);
        let y = |i: usize| past_outputs.get(i).copied().unwrap_or(0.0);

        for (k, slot) in state.iter_mut().enumerate().take(m) {
            *slot += (k + 1..=m).map(|j| b[j] * x(j - k - 1)).sum::<f64>();
        }
        for (k, slot) in state.iter_mut().enumerate().take(n) {
            *slot -= (k + 1..=n).map(|j| a[j] * y(j - k - 1)).sum::<f64>();
        }
        state
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_denominator_normalized() {
        let c = FilterCoefficients::new(vec![2.0, 4.0], vec![2.0, -1.0]).unwrap();
        assert_eq!(c.numerator(), &[1.0, 2.0]);
        assert_eq!(c.denominator(), &[1.0, -0.5]);
        assert!(!c.is_fir());
        assert_eq!(c.order(), 1);
    }

    #[test]
    fn test_invalid_coefficients() {
        assert!(FilterCoefficients::new(vec![], vec![1.0]).is_err());
        assert!(FilterCoefficients::new(vec![1.0], vec![0.0, 1.0]).is_err());
        assert!(FilterCoefficients::new(vec![f64::NAN], vec![1.0]).is_err());
    }

    #[test]
    fn test_fir_and_all_pass() {
        let fir = FilterCoefficients::fir(vec![0.25, 0.5, 0.25]).unwrap();
        assert!(fir.is_fir());
        assert_eq!(fir.max_pole_magnitude(), 0.0);

        let identity = FilterCoefficients::all_pass();
        for h in identity.frequency_response(16) {
            assert_relative_eq!(h.norm(), 1.0);
        }
    }

    #[test]
    fn test_pole_magnitude() {
        // 1 - 0.9 z^-1
        let c = FilterCoefficients::new(vec![1.0], vec![1.0, -0.9]).unwrap();
        assert_relative_eq!(c.max_pole_magnitude(), 0.9, epsilon = 1e-12);
    }

    #[test]
    fn test_frequency_response_includes_gain() {
        let c = FilterCoefficients::with_gain(vec![0.5, 0.5], vec![1.0], 2.0).unwrap();
        let h = c.frequency_response(4);
        assert_eq!(h.len(), 4);
        assert_relative_eq!(h[0].norm(), 2.0, epsilon = 1e-12);
        // Two-tap average has a null at Nyquist, approached at 3pi/4
        assert!(h[3].norm() < 1.0);
    }

    #[test]
    fn test_initial_conditions() {
        let c = FilterCoefficients::new(vec![1.0, 2.0, 3.0], vec![1.0, -0.5]).unwrap();
        assert_eq!(c.initial_conditions(&[], &[]), vec![0.0, 0.0]);

        // zi[0] = b1*x[-1] + b2*x[-2] - a1*y[-1]; zi[1] = b2*x[-1]
        let zi = c.initial_conditions(&[1.0], &[1.0, 1.0]);
        assert_relative_eq!(zi[0], 2.0 + 3.0 + 0.5);
        assert_relative_eq!(zi[1], 3.0);
    }
}
