//! Frequency transformations and the bilinear transform in zpk form

use std::f64::consts::PI;

use rustfft::num_complex::Complex64;

use super::polynomial::poly;
use super::prototype::Zpk;

/// Sampling rate used for the bilinear mapping of normalized frequencies
pub const BILINEAR_FS: f64 = 2.0;

/// Analog edge that the bilinear transform maps to the normalized digital
/// frequency `wn` (fraction of Nyquist)
pub fn prewarp(wn: f64) -> f64 {
    2.0 * BILINEAR_FS * (PI * wn / BILINEAR_FS).tan()
}

fn product(values: impl Iterator<Item = Complex64>) -> Complex64 {
    values.fold(Complex64::new(1.0, 0.0), |acc, v| acc * v)
}

/// Lowpass prototype to lowpass at `wo`
pub fn lowpass_to_lowpass(zpk: &Zpk, wo: f64) -> Zpk {
    let degree = zpk.relative_degree() as i32;
    Zpk {
        zeros: zpk.zeros.iter().map(|&z| z * wo).collect(),
        poles: zpk.poles.iter().map(|&p| p * wo).collect(),
        gain: zpk.gain * wo.powi(degree),
    }
}

/// Lowpass prototype to highpass at `wo`
pub fn lowpass_to_highpass(zpk: &Zpk, wo: f64) -> Zpk {
    let degree = zpk.relative_degree();
    let mut zeros: Vec<Complex64> = zpk.zeros.iter().map(|&z| wo / z).collect();
    zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));

    let gain_ratio = product(zpk.zeros.iter().map(|&z| -z)) / product(zpk.poles.iter().map(|&p| -p));
    Zpk {
        zeros,
        poles: zpk.poles.iter().map(|&p| wo / p).collect(),
        gain: zpk.gain * gain_ratio.re,
    }
}

fn split_band(values: &[Complex64], wo: f64) -> Vec<Complex64> {
    let upper = values.iter().map(|&v| v + (v * v - wo * wo).sqrt());
    let lower = values.iter().map(|&v| v - (v * v - wo * wo).sqrt());
    upper.chain(lower).collect()
}

/// Lowpass prototype to bandpass centred on `wo` with width `bw`
pub fn lowpass_to_bandpass(zpk: &Zpk, wo: f64, bw: f64) -> Zpk {
    let degree = zpk.relative_degree();
    let half = bw / 2.0;

    let scaled_zeros: Vec<Complex64> = zpk.zeros.iter().map(|&z| z * half).collect();
    let scaled_poles: Vec<Complex64> = zpk.poles.iter().map(|&p| p * half).collect();

    let mut zeros = split_band(&scaled_zeros, wo);
    zeros.extend(std::iter::repeat(Complex64::new(0.0, 0.0)).take(degree));

    Zpk {
        zeros,
        poles: split_band(&scaled_poles, wo),
        gain: zpk.gain * bw.powi(degree as i32),
    }
}

/// Lowpass prototype to bandstop centred on `wo` with width `bw`
pub fn lowpass_to_bandstop(zpk: &Zpk, wo: f64, bw: f64) -> Zpk {
    let degree = zpk.relative_degree();
    let half = bw / 2.0;

    let inverted_zeros: Vec<Complex64> = zpk.zeros.iter().map(|&z| half / z).collect();
    let inverted_poles: Vec<Complex64> = zpk.poles.iter().map(|&p| half / p).collect();

    let mut zeros = split_band(&inverted_zeros, wo);
    zeros.extend(std::iter::repeat(Complex64::new(0.0, wo)).take(degree));
    zeros.extend(std::iter::repeat(Complex64::new(0.0, -wo)).take(degree));

    let gain_ratio = product(zpk.zeros.iter().map(|&z| -z)) / product(zpk.poles.iter().map(|&p| -p));
    Zpk {
        zeros,
        poles: split_band(&inverted_poles, wo),
        gain: zpk.gain * gain_ratio.re,
    }
}

/// Map an analog filter to the z-plane
pub fn bilinear(zpk: &Zpk, fs: f64) -> Zpk {
    let fs2 = 2.0 * fs;
    let degree = zpk.relative_degree();

    let mut zeros: Vec<Complex64> = zpk.zeros.iter().map(|&z| (fs2 + z) / (fs2 - z)).collect();
    // Zeros at infinity land on Nyquist
    zeros.extend(std::iter::repeat(Complex64::new(-1.0, 0.0)).take(degree));

    let gain_ratio = product(zpk.zeros.iter().map(|&z| fs2 - z)) / product(zpk.poles.iter().map(|&p| fs2 - p));
    Zpk {
        zeros,
        poles: zpk.poles.iter().map(|&p| (fs2 + p) / (fs2 - p)).collect(),
        gain: zpk.gain * gain_ratio.re,
    }
}

/// Expand zeros and poles into (numerator, denominator), keeping real parts
pub fn zpk_to_tf(zpk: &Zpk) -> (Vec<f64>, Vec<f64>) {
    let numerator = poly(&zpk.zeros).iter().map(|c| c.re * zpk.gain).collect();
    let denominator = poly(&zpk.poles).iter().map(|c| c.re).collect();
    (numerator, denominator)
}
