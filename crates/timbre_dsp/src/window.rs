//! Window functions shared by FIR design and spectral analysis

use std::f64::consts::PI;

use serde::{Deserialize, Serialize};

/// Shape parameter used for the Kaiser window
pub const KAISER_BETA: f64 = 8.6;

/// Tapering window applied before a transform or to truncate a sinc
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowType {
    #[default]
    Hann,
    Hamming,
    Blackman,
    Bartlett,
    Kaiser,
}

impl WindowType {
    pub fn as_str(self) -> &'static str {
        match self {
            WindowType::Hann => "hann",
            WindowType::Hamming => "hamming",
            WindowType::Blackman => "blackman",
            WindowType::Bartlett => "bartlett",
            WindowType::Kaiser => "kaiser",
        }
    }

    /// Symmetric window of `size` points
    pub fn coefficients(self, size: usize) -> Vec<f64> {
        match size {
            0 => return Vec::new(),
            1 => return vec![1.0],
            _ => {}
        }

        let m = (size - 1) as f64;
        (0..size)
            .map(|n| {
                let n = n as f64;
                match self {
                    WindowType::Hann => 0.5 - 0.5 * (2.0 * PI * n / m).cos(),
                    WindowType::Hamming => 0.54 - 0.46 * (2.0 * PI * n / m).cos(),
                    WindowType::Blackman => {
                        0.42 - 0.5 * (2.0 * PI * n / m).cos() + 0.08 * (4.0 * PI * n / m).cos()
                    }
                    WindowType::Bartlett => 1.0 - (2.0 * n / m - 1.0).abs(),
                    WindowType::Kaiser => {
                        let ratio = 2.0 * n / m - 1.0;
                        bessel_i0(KAISER_BETA * (1.0 - ratio * ratio).max(0.0).sqrt())
                            / bessel_i0(KAISER_BETA)
                    }
                }
            })
            .collect()
    }
}

/// Modified Bessel function of the first kind, order zero (power series)
pub fn bessel_i0(x: f64) -> f64 {
    let half_sq = (x / 2.0) * (x / 2.0);
    let mut term = 1.0;
    let mut sum = 1.0;
    for k in 1..64 {
        term *= half_sq / (k * k) as f64;
        sum += term;
        if term < sum * 1e-17 {
            break;
        }
    }
    sum
}
