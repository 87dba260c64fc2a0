//! Jacobi elliptic functions via descending Landen transformations
//!
//! Arguments are in units of the quarter period K (u = 1 is a quarter
//! period), which keeps the pole/zero placement of the elliptic prototype
//! free of explicit K(k) bookkeeping.

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

const LANDEN_LIMIT: usize = 16;
const NOME_TERMS: i32 = 7;

/// Descending Landen sequence of moduli, ending once the modulus vanishes
pub fn landen(k: f64) -> Vec<f64> {
    let mut moduli = Vec::new();
    if k <= 0.0 || k >= 1.0 {
        return moduli;
    }
    let mut k = k;
    for _ in 0..LANDEN_LIMIT {
        let kp = (1.0 - k * k).sqrt();
        k = (k / (1.0 + kp)).powi(2);
        moduli.push(k);
        if k < f64::EPSILON * f64::EPSILON {
            break;
        }
    }
    moduli
}

/// Arithmetic-geometric mean
pub fn agm(a: f64, b: f64) -> f64 {
    let (mut a, mut b) = (a, b);
    if b <= 0.0 || a <= 0.0 {
        return 0.0;
    }
    for _ in 0..64 {
        if (a - b).abs() <= f64::EPSILON * a {
            break;
        }
        let mean = 0.5 * (a + b);
        b = (a * b).sqrt();
        a = mean;
    }
    a
}

/// Complete elliptic integral K for the modulus whose complement is `kp`
///
/// Taking the complement directly keeps K'(k) accurate for tiny k.
pub fn complete_from_complement(kp: f64) -> f64 {
    let mean = agm(1.0, kp);
    if mean == 0.0 {
        f64::INFINITY
    } else {
        PI / (2.0 * mean)
    }
}

/// (K(k), K'(k)) for modulus k
pub fn ellipk(k: f64) -> (f64, f64) {
    let kp = (1.0 - k * k).max(0.0).sqrt();
    (complete_from_complement(kp), complete_from_complement(k))
}

/// Complete elliptic integral K(m) of the parameter m = k^2
pub fn ellipk_parameter(m: f64) -> f64 {
    complete_from_complement((1.0 - m).max(0.0).sqrt())
}

/// Solve the degree equation N K'/K = K1'/K1 for the selectivity modulus k
pub fn ellipdeg(order: u32, k1: f64) -> f64 {
    let (kk1, kk1p) = ellipk(k1);
    let q1 = (-PI * kk1p / kk1).exp();
    let q = q1.powf(1.0 / order as f64);

    let mut num = 0.0;
    let mut den = 0.0;
    for m in 1..=NOME_TERMS {
        num += q.powi(m * (m + 1));
        den += q.powi(m * m);
    }
    4.0 * q.sqrt() * ((1.0 + num) / (1.0 + 2.0 * den)).powi(2)
}

/// cd(uK, k)
pub fn cde(u: Complex64, k: f64) -> Complex64 {
    ascend(landen(k), (u * (PI / 2.0)).cos())
}

/// sn(uK, k)
pub fn sne(u: Complex64, k: f64) -> Complex64 {
    ascend(landen(k), (u * (PI / 2.0)).sin())
}

fn ascend(moduli: Vec<f64>, mut w: Complex64) -> Complex64 {
    for &v in moduli.iter().rev() {
        w = (1.0 + v) * w / (1.0 + v * w * w);
    }
    w
}

/// Inverse of `cde`: u such that cd(uK, k) = w
pub fn acde(w: Complex64, k: f64) -> Complex64 {
    let moduli = landen(k);
    let mut w = w;
    for (n, &v) in moduli.iter().enumerate() {
        let prev = if n == 0 { k } else { moduli[n - 1] };
        w = w / (1.0 + (1.0 - w * w * prev * prev).sqrt()) * 2.0 / (1.0 + v);
    }

    let u = w.acos() * (2.0 / PI);
    let (kk, kkp) = ellipk(k);
    let ratio = kkp / kk;
    Complex64::new(symmetric_rem(u.re, 4.0), symmetric_rem(u.im, 2.0 * ratio))
}

/// Inverse of `sne`
pub fn asne(w: Complex64, k: f64) -> Complex64 {
    1.0 - acde(w, k)
}

fn symmetric_rem(x: f64, y: f64) -> f64 {
    if !y.is_finite() || y == 0.0 {
        return x;
    }
    let r = x % y;
    if r.abs() > y / 2.0 {
        r - y * r.signum()
    } else {
        r
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;

    #[test]
    fn test_complete_integral_known_values() {
        // K(0) = pi/2
        let (k0, _) = ellipk(0.0);
        assert_relative_eq!(k0, PI / 2.0, epsilon = 1e-14);

        // K(1/sqrt 2) = K'(1/sqrt 2) = 1.8540746773013719
        let (k, kp) = ellipk(std::f64::consts::FRAC_1_SQRT_2);
        assert_relative_eq!(k, 1.854_074_677_301_371_9, epsilon = 1e-12);
        assert_relative_eq!(kp, k, epsilon = 1e-12);

        assert_relative_eq!(
            ellipk_parameter(0.5),
            1.854_074_677_301_371_9,
            epsilon = 1e-12
        );
    }

    #[test]
    fn test_cde_quarter_period() {
        // cd(0) = 1 and cd(K) = 0 for any modulus
        let k = 0.6;
        assert_relative_eq!(cde(Complex64::new(0.0, 0.0), k).re, 1.0, epsilon = 1e-12);
        assert!(cde(Complex64::new(1.0, 0.0), k).norm() < 1e-12);
        assert_relative_eq!(sne(Complex64::new(1.0, 0.0), k).re, 1.0, epsilon = 1e-12);
    }

    #[test]
    fn test_acde_inverts_cde() {
        let k = 0.8;
        for u in [0.1, 0.35, 0.7] {
            let w = cde(Complex64::new(u, 0.0), k);
            let back = acde(w, k);
            assert_relative_eq!(back.re, u, epsilon = 1e-10);
            assert!(back.im.abs() < 1e-10);
        }
    }

    #[test]
    fn test_ellipdeg_satisfies_degree_equation() {
        let k1 = 0.01;
        let order = 4;
        let k = ellipdeg(order, k1);
        let (kk, kkp) = ellipk(k);
        let (kk1, kk1p) = ellipk(k1);
        assert_relative_eq!(order as f64 * kkp / kk, kk1p / kk1, epsilon = 1e-9);
    }
}
