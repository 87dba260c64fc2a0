//! Polynomial helpers for zero/pole bookkeeping
//!
//! Coefficient slices are ordered highest power first, so a denominator
//! `[a0, a1, .., aN]` of `A(z^-1)` doubles as the polynomial
//! `a0 z^N + a1 z^(N-1) + .. + aN` whose roots are the filter poles.

use rustfft::num_complex::Complex64;

const MAX_ITERATIONS: usize = 500;
const TOLERANCE: f64 = 4.0 * f64::EPSILON;

/// Monic polynomial with the given roots
pub fn poly(roots: &[Complex64]) -> Vec<Complex64> {
    let mut coeffs = Vec::with_capacity(roots.len() + 1);
    coeffs.push(Complex64::new(1.0, 0.0));
    for &root in roots {
        coeffs.push(Complex64::new(0.0, 0.0));
        for i in (1..coeffs.len()).rev() {
            let prev = coeffs[i - 1];
            coeffs[i] -= root * prev;
        }
    }
    coeffs
}

/// All complex roots of a real polynomial (Aberth-Ehrlich iteration)
///
/// Leading zeros are ignored; trailing zeros contribute roots at the origin.
pub fn roots(coeffs: &[f64]) -> Vec<Complex64> {
    let Some(start) = coeffs.iter().position(|&c| c != 0.0) else {
        return Vec::new();
    };
    let trimmed = &coeffs[start..];
    let end = trimmed.iter().rposition(|&c| c != 0.0).unwrap_or(0);
    let origin_roots = trimmed.len() - 1 - end;
    let trimmed = &trimmed[..=end];

    let mut found = vec![Complex64::new(0.0, 0.0); origin_roots];
    let degree = trimmed.len() - 1;
    if degree == 0 {
        return found;
    }

    let lead = trimmed[0];
    let monic: Vec<Complex64> = trimmed
        .iter()
        .map(|&c| Complex64::new(c / lead, 0.0))
        .collect();

    if degree == 1 {
        found.push(-monic[1]);
        return found;
    }

    found.extend(aberth(&monic));
    found
}

fn aberth(monic: &[Complex64]) -> Vec<Complex64> {
    let degree = monic.len() - 1;

    // Start on a circle whose radius is the geometric mean of the root
    // magnitudes, rotated off the real axis so conjugate pairs can split.
    let radius = monic[degree].norm().powf(1.0 / degree as f64).max(f64::MIN_POSITIVE);
    let mut z: Vec<Complex64> = (0..degree)
        .map(|k| {
            let angle = 2.0 * std::f64::consts::PI * k as f64 / degree as f64 + 0.4;
            Complex64::from_polar(radius, angle)
        })
        .collect();

    for _ in 0..MAX_ITERATIONS {
        let mut max_step = 0.0_f64;

        for k in 0..degree {
            let (p, dp) = eval_with_derivative(monic, z[k]);
            if p.norm() == 0.0 {
                continue;
            }

            let ratio = p / dp;
            let repulsion: Complex64 = (0..degree)
                .filter(|&j| j != k)
                .map(|j| (z[k] - z[j]).inv())
                .sum();
            let step = ratio / (Complex64::new(1.0, 0.0) - ratio * repulsion);

            if !step.is_finite() {
                // Stalled on a critical point or a coincident estimate: nudge
                z[k] += Complex64::new(radius * 1e-6, radius * 1e-6);
                max_step = f64::INFINITY;
                continue;
            }

            z[k] -= step;
            max_step = max_step.max(step.norm() / z[k].norm().max(1.0));
        }

        if max_step < TOLERANCE {
            break;
        }
    }

    z
}

fn eval_with_derivative(coeffs: &[Complex64], z: Complex64) -> (Complex64, Complex64) {
    let mut p = coeffs[0];
    let mut dp = Complex64::new(0.0, 0.0);
    for &c in &coeffs[1..] {
        dp = dp * z + p;
        p = p * z + c;
    }
    (p, dp)
}
