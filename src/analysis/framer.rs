use crate::audio::signal::Signal;
use crate::dsp::WindowFunction;

/// Cuts windowed frames of a fixed size out of a sample buffer.
#[derive(Clone, Debug)]
pub struct Framer {
    size: usize,
    window: WindowFunction,
    coefficients: Vec<f32>,
}

impl Framer {
    pub fn new(size: usize, window: WindowFunction) -> Self {
        Self {
            size,
            window,
            coefficients: window.coefficients(size),
        }
    }

    pub fn size(&self) -> usize {
        self.size
    }

    pub fn window(&self) -> WindowFunction {
        self.window
    }

    /// Write the windowed frame starting at `offset` into `out`.
    ///
    /// Returns `None` when fewer than `size` samples remain past `offset`.
    pub fn extract_into(&self, samples: &[f32], offset: usize, out: &mut [f32]) -> Option<()> {
        debug_assert_eq!(out.len(), self.size);
        let end = offset.checked_add(self.size)?;
        let source = samples.get(offset..end)?;
        for ((o, &s), &w) in out.iter_mut().zip(source).zip(&self.coefficients) {
            *o = s * w;
        }
        Some(())
    }

    pub fn extract(&self, signal: &Signal, offset: usize) -> Option<Vec<f32>> {
        let mut frame = vec![0.0; self.size];
        self.extract_into(signal.samples(), offset, &mut frame)?;
        Some(frame)
    }
}

pub fn extract_frame(
    signal: &Signal,
    sample_offset: usize,
    frame_size: usize,
    window: WindowFunction,
) -> Option<Vec<f32>> {
    Framer::new(frame_size, window).extract(signal, sample_offset)
}
