//! Analog lowpass prototypes with a 1 rad/s edge, in zero/pole/gain form

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

use super::elliptic::{asne, cde, ellipdeg, sne};
use super::polynomial::roots;

/// Zeros, poles and gain of a rational transfer function
#[derive(Debug, Clone, PartialEq)]
pub struct Zpk {
    pub zeros: Vec<Complex64>,
    pub poles: Vec<Complex64>,
    pub gain: f64,
}

impl Zpk {
    /// Excess of poles over zeros
    pub fn relative_degree(&self) -> usize {
        self.poles.len().saturating_sub(self.zeros.len())
    }
}

fn product_of_negated(values: &[Complex64]) -> Complex64 {
    values
        .iter()
        .fold(Complex64::new(1.0, 0.0), |acc, &v| acc * -v)
}

/// m = -N+1, -N+3, .., N-1
fn odd_offsets(order: u32) -> impl Iterator<Item = f64> {
    let n = order as i64;
    (0..n).map(move |i| (-n + 1 + 2 * i) as f64)
}

/// Butterworth: poles evenly spaced on the left half of the unit circle
pub fn butterworth(order: u32) -> Zpk {
    let n = order as f64;
    let poles = odd_offsets(order)
        .map(|m| -Complex64::from_polar(1.0, PI * m / (2.0 * n)))
        .collect();
    Zpk {
        zeros: Vec::new(),
        poles,
        gain: 1.0,
    }
}

/// Chebyshev type I with `ripple_db` of passband ripple
pub fn chebyshev1(order: u32, ripple_db: f64) -> Zpk {
    let n = order as f64;
    let eps = (10f64.powf(0.1 * ripple_db) - 1.0).sqrt();
    let mu = (1.0 / eps).asinh() / n;

    let poles: Vec<Complex64> = odd_offsets(order)
        .map(|m| -Complex64::new(mu, PI * m / (2.0 * n)).sinh())
        .collect();

    let mut gain = product_of_negated(&poles).re;
    if order % 2 == 0 {
        gain /= (1.0 + eps * eps).sqrt();
    }
    Zpk {
        zeros: Vec::new(),
        poles,
        gain,
    }
}

/// Chebyshev type II with `attenuation_db` of stopband attenuation
pub fn chebyshev2(order: u32, attenuation_db: f64) -> Zpk {
    let n = order as f64;
    let de = 1.0 / (10f64.powf(0.1 * attenuation_db) - 1.0).sqrt();
    let mu = (1.0 / de).asinh() / n;

    // Odd orders skip m = 0, whose zero sits at infinity
    let zeros: Vec<Complex64> = odd_offsets(order)
        .filter(|&m| m != 0.0)
        .map(|m| Complex64::new(0.0, 1.0 / (m * PI / (2.0 * n)).sin()))
        .collect();

    let poles: Vec<Complex64> = odd_offsets(order)
        .map(|m| {
            let p = -Complex64::from_polar(1.0, PI * m / (2.0 * n));
            Complex64::new(mu.sinh() * p.re, mu.cosh() * p.im).inv()
        })
        .collect();

    let gain = (product_of_negated(&poles) / product_of_negated(&zeros)).re;
    Zpk { zeros, poles, gain }
}

/// Elliptic (Cauer) prototype with passband ripple and stopband attenuation
pub fn elliptic(order: u32, ripple_db: f64, attenuation_db: f64) -> Zpk {
    let n = order as f64;
    let ep = (10f64.powf(ripple_db / 10.0) - 1.0).sqrt();
    let es = (10f64.powf(attenuation_db / 10.0) - 1.0).sqrt();
    let k1 = ep / es;
    let k = ellipdeg(order, k1);

    let j = Complex64::new(0.0, 1.0);
    let half = order / 2;
    let offsets: Vec<f64> = (1..=half).map(|i| (2 * i - 1) as f64 / n).collect();

    let mut zeros = Vec::with_capacity(2 * half as usize);
    for &u in &offsets {
        let z = j / (k * cde(Complex64::new(u, 0.0), k));
        zeros.push(z);
        zeros.push(z.conj());
    }

    let v0 = (-j * asne(j / ep, k1) / n).re;

    let mut poles = Vec::with_capacity(order as usize);
    for &u in &offsets {
        let p = j * cde(Complex64::new(u, -v0), k);
        poles.push(p);
        poles.push(p.conj());
    }
    if order % 2 == 1 {
        let p0 = j * sne(Complex64::new(0.0, v0), k);
        poles.push(Complex64::new(p0.re, 0.0));
    }

    let mut gain = (product_of_negated(&poles) / product_of_negated(&zeros)).re;
    if order % 2 == 0 {
        gain /= (1.0 + ep * ep).sqrt();
    }
    Zpk { zeros, poles, gain }
}

/// Bessel/Thomson prototype, normalized so the phase midpoint is at 1 rad/s
pub fn bessel(order: u32) -> Zpk {
    let n = order as usize;

    // Reverse Bessel polynomial theta_N(s) = sum a_k s^k with a_N = 1,
    // a_(k-1) = a_k * (2N-k+1) k / (2 (N-k+1)); kept in logs.
    let mut ln_a = vec![0.0_f64; n + 1];
    for k in (1..=n).rev() {
        let ratio = ((2 * n - k + 1) * k) as f64 / (2 * (n - k + 1)) as f64;
        ln_a[k - 1] = ln_a[k] + ratio.ln();
    }

    // Substituting s = a_0^(1/N) x and dividing by a_0 gives a polynomial
    // with unit leading and constant terms whose roots are the poles.
    let ln_a0 = ln_a[0];
    let coeffs: Vec<f64> = (0..=n)
        .rev()
        .map(|k| (ln_a[k] + (k as f64 / n as f64 - 1.0) * ln_a0).exp())
        .collect();

    Zpk {
        zeros: Vec::new(),
        poles: roots(&coeffs),
        gain: 1.0,
    }
}
