//! Direct O(N²) discrete Fourier transform.
//!
//! Slow but obviously correct; used as the reference the fast engines are
//! checked against and as a fallback for sizes the radix-2 engine rejects.

use std::f64::consts::PI;

use super::engine::{check_len, EngineKind, TransformEngine};
use super::Complex32;
use crate::error::{Result, SpectraError};

pub struct DirectEngine {
    size: usize,
    /// `cos(2πkn/N)`, row-major by `k`
    cos_table: Vec<f32>,
    /// `sin(2πkn/N)`, row-major by `k`
    sin_table: Vec<f32>,
}

impl DirectEngine {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(SpectraError::InvalidFrameSize {
                size,
                reason: "must be non-zero",
            });
        }

        let mut cos_table = Vec::with_capacity(size * size);
        let mut sin_table = Vec::with_capacity(size * size);
        for k in 0..size {
            for n in 0..size {
                // Reduce k·n modulo N first so large products keep full precision
                let angle = 2.0 * PI * ((k * n) % size) as f64 / size as f64;
                cos_table.push(angle.cos() as f32);
                sin_table.push(angle.sin() as f32);
            }
        }

        Ok(Self {
            size,
            cos_table,
            sin_table,
        })
    }

    #[inline]
    fn row(&self, k: usize) -> (&[f32], &[f32]) {
        let start = k * self.size;
        let end = start + self.size;
        (&self.cos_table[start..end], &self.sin_table[start..end])
    }
}

impl TransformEngine for DirectEngine {
    fn size(&self) -> usize {
        self.size
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Direct
    }

    fn forward_real_into(&self, input: &[f32], output: &mut [Complex32]) -> Result<()> {
        check_len(self.size, input.len())?;
        check_len(self.size, output.len())?;

        for (k, out) in output.iter_mut().enumerate() {
            let (cos, sin) = self.row(k);
            let mut re = 0.0f64;
            let mut im = 0.0f64;
            for ((&x, &c), &s) in input.iter().zip(cos).zip(sin) {
                re += x as f64 * c as f64;
                im -= x as f64 * s as f64;
            }
            *out = Complex32::new(re as f32, im as f32);
        }
        Ok(())
    }

    fn forward_complex_into(&self, input: &[Complex32], output: &mut [Complex32]) -> Result<()> {
        check_len(self.size, input.len())?;
        check_len(self.size, output.len())?;

        for (k, out) in output.iter_mut().enumerate() {
            let (cos, sin) = self.row(k);
            let mut re = 0.0f64;
            let mut im = 0.0f64;
            // (a + ib)(cos - i·sin)
            for ((x, &c), &s) in input.iter().zip(cos).zip(sin) {
                let (a, b) = (x.re as f64, x.im as f64);
                re += a * c as f64 + b * s as f64;
                im += b * c as f64 - a * s as f64;
            }
            *out = Complex32::new(re as f32, im as f32);
        }
        Ok(())
    }

    fn inverse_into(&self, input: &[Complex32], output: &mut [Complex32]) -> Result<()> {
        check_len(self.size, input.len())?;
        check_len(self.size, output.len())?;

        let scale = 1.0 / self.size as f64;
        // Tables are symmetric in (k, n), so row n holds cos/sin(2πkn/N) over k
        for (n, out) in output.iter_mut().enumerate() {
            let (cos, sin) = self.row(n);
            let mut re = 0.0f64;
            let mut im = 0.0f64;
            // (a + ib)(cos + i·sin)
            for ((x, &c), &s) in input.iter().zip(cos).zip(sin) {
                let (a, b) = (x.re as f64, x.im as f64);
                re += a * c as f64 - b * s as f64;
                im += a * s as f64 + b * c as f64;
            }
            *out = Complex32::new((re * scale) as f32, (im * scale) as f32);
        }
        Ok(())
    }
}
