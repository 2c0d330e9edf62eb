//! Radix-2 decimation-in-time FFT with precomputed tables.

use rayon::prelude::*;
use std::f64::consts::PI;

use super::engine::{check_batch, check_len, EngineKind, TransformEngine};
use super::Complex32;
use crate::error::{Result, SpectraError};

/// Frames per batch below which the parallel path is not worth the hand-off
const PARALLEL_MIN_FRAMES: usize = 2;

pub struct Radix2Engine {
    size: usize,
    /// Bit-reversal permutation: input `i` lands at `bit_rev[i]`
    bit_rev: Vec<usize>,
    /// `e^{-2πik/N}` for `k` in `0..N/2`
    twiddles: Vec<Complex32>,
}

impl Radix2Engine {
    /// Fails with [`SpectraError::InvalidFrameSize`] unless `size` is a power
    /// of two of at least 2.
    pub fn new(size: usize) -> Result<Self> {
        if size < 2 || !size.is_power_of_two() {
            return Err(SpectraError::InvalidFrameSize {
                size,
                reason: "radix-2 transform needs a power of two of at least 2",
            });
        }

        Ok(Self {
            size,
            bit_rev: compute_bit_reversal(size),
            twiddles: compute_twiddles(size),
        })
    }

    /// Butterfly stages over an already bit-reversed buffer.
    fn butterflies(&self, data: &mut [Complex32]) {
        let n = self.size;
        let mut len = 2;
        while len <= n {
            let half = len / 2;
            let step = n / len;

            for block in data.chunks_exact_mut(len) {
                let (lower, upper) = block.split_at_mut(half);
                for (j, (a, b)) in lower.iter_mut().zip(upper.iter_mut()).enumerate() {
                    let t = *b * self.twiddles[j * step];
                    *b = *a - t;
                    *a += t;
                }
            }
            len *= 2;
        }
    }

    fn transform_real(&self, input: &[f32], output: &mut [Complex32]) {
        for (&x, &target) in input.iter().zip(&self.bit_rev) {
            output[target] = Complex32::new(x, 0.0);
        }
        self.butterflies(output);
    }
}

impl TransformEngine for Radix2Engine {
    fn size(&self) -> usize {
        self.size
    }

    fn kind(&self) -> EngineKind {
        EngineKind::Radix2
    }

    fn forward_real_into(&self, input: &[f32], output: &mut [Complex32]) -> Result<()> {
        check_len(self.size, input.len())?;
        check_len(self.size, output.len())?;
        self.transform_real(input, output);
        Ok(())
    }

    fn forward_complex_into(&self, input: &[Complex32], output: &mut [Complex32]) -> Result<()> {
        check_len(self.size, input.len())?;
        check_len(self.size, output.len())?;

        for (&x, &target) in input.iter().zip(&self.bit_rev) {
            output[target] = x;
        }
        self.butterflies(output);
        Ok(())
    }

    fn supports_batch(&self) -> bool {
        true
    }

    fn forward_real_batch(&self, frames: &[f32], output: &mut [Complex32]) -> Result<()> {
        let n = self.size;
        check_batch(n, frames.len(), output.len())?;

        if frames.len() / n < PARALLEL_MIN_FRAMES {
            for (frame, out) in frames.chunks_exact(n).zip(output.chunks_exact_mut(n)) {
                self.transform_real(frame, out);
            }
        } else {
            output
                .par_chunks_exact_mut(n)
                .zip(frames.par_chunks_exact(n))
                .for_each(|(out, frame)| self.transform_real(frame, out));
        }
        Ok(())
    }
}

fn compute_bit_reversal(size: usize) -> Vec<usize> {
    let bits = size.trailing_zeros();
    (0..size)
        .map(|i| {
            let mut rev = 0;
            let mut n = i;
            for _ in 0..bits {
                rev = (rev << 1) | (n & 1);
                n >>= 1;
            }
            rev
        })
        .collect()
}

fn compute_twiddles(size: usize) -> Vec<Complex32> {
    (0..size / 2)
        .map(|k| {
            let angle = -2.0 * PI * k as f64 / size as f64;
            Complex32::new(angle.cos() as f32, angle.sin() as f32)
        })
        .collect()
}
