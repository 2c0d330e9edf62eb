use serde::{Deserialize, Serialize};
use std::f64::consts::PI;
use std::fmt;
use std::str::FromStr;

/// Taper applied to a frame before it is transformed.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum WindowFunction {
    #[default]
    Hann,
    Hamming,
    Blackman,
    Rectangular,
}

impl WindowFunction {
    /// Precompute the window coefficients for a frame of `size` samples.
    ///
    /// The symmetric form is used throughout: the denominator is `size - 1`.
    pub fn coefficients(self, size: usize) -> Vec<f32> {
        if size <= 1 {
            return vec![1.0; size];
        }
        let denom = (size - 1) as f64;
        (0..size)
            .map(|i| {
                let x = 2.0 * PI * i as f64 / denom;
                let w = match self {
                    WindowFunction::Hann => 0.5 * (1.0 - x.cos()),
                    WindowFunction::Hamming => 0.54 - 0.46 * x.cos(),
                    WindowFunction::Blackman => 0.42 - 0.5 * x.cos() + 0.08 * (2.0 * x).cos(),
                    WindowFunction::Rectangular => 1.0,
                };
                w as f32
            })
            .collect()
    }
}

impl fmt::Display for WindowFunction {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            WindowFunction::Hann => "hann",
            WindowFunction::Hamming => "hamming",
            WindowFunction::Blackman => "blackman",
            WindowFunction::Rectangular => "rectangular",
        };
        f.write_str(name)
    }
}

impl FromStr for WindowFunction {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "hann" | "hanning" => Ok(WindowFunction::Hann),
            "hamming" => Ok(WindowFunction::Hamming),
            "blackman" => Ok(WindowFunction::Blackman),
            "rectangular" | "rect" | "none" => Ok(WindowFunction::Rectangular),
            other => Err(format!("unknown window function '{}'", other)),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn hann_matches_closed_form() {
        let size = 2048;
        let w = WindowFunction::Hann.coefficients(size);
        for i in [0, 1, 100, 1023, 2047] {
            let expected = 0.5
                * (1.0 - (2.0 * std::f32::consts::PI * i as f32 / (size - 1) as f32).cos());
            assert!((w[i] - expected).abs() < 1e-5, "w[{}] = {} vs {}", i, w[i], expected);
        }
    }

    #[test]
    fn hann_is_symmetric_with_zero_ends() {
        let w = WindowFunction::Hann.coefficients(512);
        assert!(w[0].abs() < 1e-7);
        assert!(w[511].abs() < 1e-7);
        for i in 0..256 {
            assert!((w[i] - w[511 - i]).abs() < 1e-6);
        }
    }

    #[test]
    fn rectangular_is_flat() {
        assert!(WindowFunction::Rectangular
            .coefficients(64)
            .iter()
            .all(|&w| w == 1.0));
    }

    #[test]
    fn parses_names() {
        assert_eq!("Hann".parse::<WindowFunction>().unwrap(), WindowFunction::Hann);
        assert_eq!("blackman".parse::<WindowFunction>().unwrap(), WindowFunction::Blackman);
        assert!("triangle".parse::<WindowFunction>().is_err());
    }
}
