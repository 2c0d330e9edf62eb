//! Multi-frame magnitude averaging.
//!
//! Several overlapping frames are transformed and their magnitude spectra are
//! averaged bin by bin, which steadies the output between display ticks.

use super::framer::Framer;
use crate::dsp::{magnitudes_into, Complex32, TransformEngine, WindowFunction};
use crate::error::{Result, SpectraError};

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum MagnitudeSource {
    Batch(usize),
    /// Single frame, either requested or because the batch ran off the signal
    Single { fell_back: bool },
}

pub struct BatchAnalyzer {
    framer: Framer,
    /// Windowed frames laid out back to back
    frames: Vec<f32>,
    spectra: Vec<Complex32>,
    bin_scratch: Vec<f32>,
}

impl BatchAnalyzer {
    pub fn new(frame_size: usize, window: WindowFunction, batch_size: usize) -> Self {
        let slots = batch_size.max(1);
        Self {
            framer: Framer::new(frame_size, window),
            frames: vec![0.0; frame_size * slots],
            spectra: vec![Complex32::new(0.0, 0.0); frame_size * slots],
            bin_scratch: vec![0.0; frame_size / 2],
        }
    }

    pub fn frame_size(&self) -> usize {
        self.framer.size()
    }

    pub fn num_bins(&self) -> usize {
        self.framer.size() / 2
    }

    pub fn window(&self) -> WindowFunction {
        self.framer.window()
    }

    fn ensure_slots(&mut self, batch_size: usize) {
        let needed = self.frame_size() * batch_size;
        if self.frames.len() < needed {
            log::debug!("Growing batch buffers to {} frames", batch_size);
            self.frames.resize(needed, 0.0);
            self.spectra.resize(needed, Complex32::new(0.0, 0.0));
        }
    }

    fn check_engine(&self, engine: &dyn TransformEngine, out: &[f32]) -> Result<()> {
        if engine.size() != self.frame_size() {
            return Err(SpectraError::LengthMismatch {
                expected: self.frame_size(),
                actual: engine.size(),
            });
        }
        if out.len() != self.num_bins() {
            return Err(SpectraError::LengthMismatch {
                expected: self.num_bins(),
                actual: out.len(),
            });
        }
        Ok(())
    }

    pub fn single_magnitude(
        &mut self,
        engine: &dyn TransformEngine,
        samples: &[f32],
        offset: usize,
        out: &mut [f32],
    ) -> Result<Option<()>> {
        self.check_engine(engine, out)?;
        let n = self.frame_size();

        if self
            .framer
            .extract_into(samples, offset, &mut self.frames[..n])
            .is_none()
        {
            return Ok(None);
        }
        engine.forward_real_into(&self.frames[..n], &mut self.spectra[..n])?;
        magnitudes_into(&self.spectra[..n], out);
        Ok(Some(()))
    }

    /// Average magnitude spectrum of `batch_size` frames spaced `hop` apart.
    ///
    /// Returns `None` if any of the frames would run past the signal.
    pub fn batch_magnitude(
        &mut self,
        engine: &dyn TransformEngine,
        samples: &[f32],
        offset: usize,
        batch_size: usize,
        hop: usize,
        out: &mut [f32],
    ) -> Result<Option<()>> {
        self.check_engine(engine, out)?;
        if batch_size == 0 {
            return Ok(None);
        }
        self.ensure_slots(batch_size);
        let n = self.frame_size();
        let used = n * batch_size;

        for (i, frame) in self.frames[..used].chunks_exact_mut(n).enumerate() {
            let start = match i.checked_mul(hop).and_then(|d| offset.checked_add(d)) {
                Some(start) => start,
                None => return Ok(None),
            };
            if self.framer.extract_into(samples, start, frame).is_none() {
                return Ok(None);
            }
        }

        if engine.supports_batch() {
            engine.forward_real_batch(&self.frames[..used], &mut self.spectra[..used])?;
        } else {
            for (frame, spectrum) in self.frames[..used]
                .chunks_exact(n)
                .zip(self.spectra[..used].chunks_exact_mut(n))
            {
                engine.forward_real_into(frame, spectrum)?;
            }
        }

        out.fill(0.0);
        for spectrum in self.spectra[..used].chunks_exact(n) {
            magnitudes_into(spectrum, &mut self.bin_scratch);
            for (acc, &m) in out.iter_mut().zip(&self.bin_scratch) {
                *acc += m;
            }
        }
        let inv = 1.0 / batch_size as f32;
        for acc in out.iter_mut() {
            *acc *= inv;
        }
        Ok(Some(()))
    }

    /// Batched magnitude with the single-frame fallback.
    ///
    /// A `batch_size` of 0 or 1 goes straight to the single-frame path.
    pub fn magnitude(
        &mut self,
        engine: &dyn TransformEngine,
        samples: &[f32],
        offset: usize,
        batch_size: usize,
        hop: usize,
        out: &mut [f32],
    ) -> Result<Option<MagnitudeSource>> {
        if batch_size > 1 {
            if self
                .batch_magnitude(engine, samples, offset, batch_size, hop, out)?
                .is_some()
            {
                return Ok(Some(MagnitudeSource::Batch(batch_size)));
            }
            log::trace!("Batch at offset {} ran past the signal, using a single frame", offset);
            return Ok(self
                .single_magnitude(engine, samples, offset, out)?
                .map(|_| MagnitudeSource::Single { fell_back: true }));
        }
        Ok(self
            .single_magnitude(engine, samples, offset, out)?
            .map(|_| MagnitudeSource::Single { fell_back: false }))
    }
}

pub fn batch_magnitude(
    engine: &dyn TransformEngine,
    samples: &[f32],
    sample_offset: usize,
    batch_size: usize,
    hop_size: usize,
    window: WindowFunction,
) -> Result<Option<Vec<f32>>> {
    let mut analyzer = BatchAnalyzer::new(engine.size(), window, batch_size);
    let mut out = vec![0.0; engine.size() / 2];
    Ok(analyzer
        .batch_magnitude(engine, samples, sample_offset, batch_size, hop_size, &mut out)?
        .map(|_| out))
}
