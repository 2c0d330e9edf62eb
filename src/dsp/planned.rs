//! Transform engine backed by the `rustfft` planner.

use rustfft::{Fft, FftPlanner};
use std::sync::Arc;

use super::engine::{check_batch, check_len, EngineKind, TransformEngine};
use super::Complex32;
use crate::error::{Result, SpectraError};

pub struct PlannedEngine {
    size: usize,
    forward: Arc<dyn Fft<f32>>,
}

impl PlannedEngine {
    pub fn new(size: usize) -> Result<Self> {
        if size == 0 {
            return Err(SpectraError::InvalidFrameSize {
                size,
                reason: "must be non-zero",
            });
        }
        let mut planner = FftPlanner::<f32>::new();
        let forward = planner.plan_fft_forward(size);
        Ok(Self { size, forward })
    }
}

impl TransformEngine for PlannedEngine {
    fn size(&self) -> usize {
        self.size
    }

    fn kind(&self) -> EngineKind {
        EngineKind::RustFft
    }

    fn forward_real_into(&self, input: &[f32], output: &mut [Complex32]) -> Result<()> {
        check_len(self.size, input.len())?;
        check_len(self.size, output.len())?;
        for (out, &x) in output.iter_mut().zip(input) {
            *out = Complex32::new(x, 0.0);
        }
        self.forward.process(output);
        Ok(())
    }

    fn forward_complex_into(&self, input: &[Complex32], output: &mut [Complex32]) -> Result<()> {
        check_len(self.size, input.len())?;
        check_len(self.size, output.len())?;
        output.copy_from_slice(input);
        self.forward.process(output);
        Ok(())
    }

    fn supports_batch(&self) -> bool {
        true
    }

    /// rustfft transforms every `size`-long chunk of the buffer in one call.
    fn forward_real_batch(&self, frames: &[f32], output: &mut [Complex32]) -> Result<()> {
        check_batch(self.size, frames.len(), output.len())?;
        for (out, &x) in output.iter_mut().zip(frames) {
            *out = Complex32::new(x, 0.0);
        }
        self.forward.process(output);
        Ok(())
    }
}
