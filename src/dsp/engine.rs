//! Transform engine contract and construction.
//!
//! Every engine owns its precomputed tables for exactly one frame size. Building
//! an engine is the expensive part; callers keep one per active size (see
//! [`EngineCache`]) instead of rebuilding per call.

use serde::{Deserialize, Serialize};
use std::collections::hash_map::Entry;
use std::collections::HashMap;
use std::fmt;
use std::str::FromStr;

use super::direct::DirectEngine;
use super::planned::PlannedEngine;
use super::radix2::Radix2Engine;
use super::Complex32;
use crate::error::{Result, SpectraError};

/// Selectable transform algorithm.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum EngineKind {
    Direct,
    #[default]
    Radix2,
    RustFft,
}

impl fmt::Display for EngineKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let name = match self {
            EngineKind::Direct => "direct",
            EngineKind::Radix2 => "radix2",
            EngineKind::RustFft => "rustfft",
        };
        f.write_str(name)
    }
}

impl FromStr for EngineKind {
    type Err = String;

    fn from_str(s: &str) -> std::result::Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "direct" | "dft" => Ok(EngineKind::Direct),
            "radix2" | "fast" | "fft" => Ok(EngineKind::Radix2),
            "rustfft" | "planned" => Ok(EngineKind::RustFft),
            other => Err(format!("unknown transform engine '{}'", other)),
        }
    }
}

/// Forward/inverse discrete Fourier transform of a fixed size.
///
/// All buffers must be exactly [`size`](TransformEngine::size) long, except the
/// batch entry point which takes a whole number of frames laid out back to back.
pub trait TransformEngine: Send + Sync {
    fn size(&self) -> usize;

    fn kind(&self) -> EngineKind;

    /// `X[k] = Σ x[n]·e^{-2πikn/N}` for a real frame.
    fn forward_real_into(&self, input: &[f32], output: &mut [Complex32]) -> Result<()>;

    fn forward_complex_into(&self, input: &[Complex32], output: &mut [Complex32]) -> Result<()>;

    /// Inverse transform, scaled by `1/N`.
    ///
    /// Default: conjugate, forward transform, conjugate and scale.
    fn inverse_into(&self, input: &[Complex32], output: &mut [Complex32]) -> Result<()> {
        let n = self.size();
        check_len(n, input.len())?;
        check_len(n, output.len())?;

        let conjugated: Vec<Complex32> = input.iter().map(|c| c.conj()).collect();
        self.forward_complex_into(&conjugated, output)?;

        let scale = 1.0 / n as f32;
        for c in output.iter_mut() {
            *c = c.conj() * scale;
        }
        Ok(())
    }

    /// Whether [`forward_real_batch`](TransformEngine::forward_real_batch) does
    /// better than a per-frame loop.
    fn supports_batch(&self) -> bool {
        false
    }

    /// Transform several consecutive frames in one call.
    fn forward_real_batch(&self, frames: &[f32], output: &mut [Complex32]) -> Result<()> {
        let n = self.size();
        check_batch(n, frames.len(), output.len())?;
        for (frame, out) in frames.chunks_exact(n).zip(output.chunks_exact_mut(n)) {
            self.forward_real_into(frame, out)?;
        }
        Ok(())
    }

    fn forward_real(&self, input: &[f32]) -> Result<Vec<Complex32>> {
        let mut output = vec![Complex32::new(0.0, 0.0); self.size()];
        self.forward_real_into(input, &mut output)?;
        Ok(output)
    }

    fn forward_complex(&self, input: &[Complex32]) -> Result<Vec<Complex32>> {
        let mut output = vec![Complex32::new(0.0, 0.0); self.size()];
        self.forward_complex_into(input, &mut output)?;
        Ok(output)
    }

    fn inverse(&self, input: &[Complex32]) -> Result<Vec<Complex32>> {
        let mut output = vec![Complex32::new(0.0, 0.0); self.size()];
        self.inverse_into(input, &mut output)?;
        Ok(output)
    }
}

pub fn build_engine(kind: EngineKind, size: usize) -> Result<Box<dyn TransformEngine>> {
    let engine: Box<dyn TransformEngine> = match kind {
        EngineKind::Direct => Box::new(DirectEngine::new(size)?),
        EngineKind::Radix2 => Box::new(Radix2Engine::new(size)?),
        EngineKind::RustFft => Box::new(PlannedEngine::new(size)?),
    };
    log::info!("Built {} transform engine for N={}", kind, size);
    Ok(engine)
}

/// One engine per frame size, built on first use.
pub struct EngineCache {
    kind: EngineKind,
    engines: HashMap<usize, Box<dyn TransformEngine>>,
}

impl EngineCache {
    pub fn new(kind: EngineKind) -> Self {
        Self {
            kind,
            engines: HashMap::new(),
        }
    }

    pub fn kind(&self) -> EngineKind {
        self.kind
    }

    /// Switch algorithm; engines of the previous kind are dropped.
    pub fn set_kind(&mut self, kind: EngineKind) {
        if kind != self.kind {
            self.kind = kind;
            self.engines.clear();
        }
    }

    pub fn get(&mut self, size: usize) -> Result<&dyn TransformEngine> {
        let engine = match self.engines.entry(size) {
            Entry::Occupied(slot) => slot.into_mut(),
            Entry::Vacant(slot) => slot.insert(build_engine(self.kind, size)?),
        };
        Ok(&**engine)
    }
}

pub(crate) fn check_len(expected: usize, actual: usize) -> Result<()> {
    if expected != actual {
        return Err(SpectraError::LengthMismatch { expected, actual });
    }
    Ok(())
}

pub(crate) fn check_batch(size: usize, input: usize, output: usize) -> Result<()> {
    if input % size != 0 {
        return Err(SpectraError::LengthMismatch {
            expected: (input / size + 1) * size,
            actual: input,
        });
    }
    check_len(input, output)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_engine_names() {
        assert_eq!("direct".parse::<EngineKind>().unwrap(), EngineKind::Direct);
        assert_eq!("FFT".parse::<EngineKind>().unwrap(), EngineKind::Radix2);
        assert_eq!("rustfft".parse::<EngineKind>().unwrap(), EngineKind::RustFft);
        assert!("wavelet".parse::<EngineKind>().is_err());
    }

    #[test]
    fn cache_builds_once_per_size() {
        let mut cache = EngineCache::new(EngineKind::Radix2);
        assert_eq!(cache.get(256).unwrap().size(), 256);
        assert_eq!(cache.get(512).unwrap().size(), 512);
        assert_eq!(cache.get(256).unwrap().size(), 256);
        assert_eq!(cache.engines.len(), 2);

        cache.set_kind(EngineKind::Direct);
        assert!(cache.engines.is_empty());
        assert_eq!(cache.get(64).unwrap().kind(), EngineKind::Direct);
    }

    #[test]
    fn cache_propagates_construction_errors() {
        let mut cache = EngineCache::new(EngineKind::Radix2);
        assert!(matches!(
            cache.get(1000),
            Err(SpectraError::InvalidFrameSize { size: 1000, .. })
        ));
        assert!(cache.engines.is_empty());
    }

    #[test]
    fn default_batch_runs_per_frame() {
        let engine = build_engine(EngineKind::Direct, 8).unwrap();
        assert!(!engine.supports_batch());

        let frames: Vec<f32> = (0..16).map(|i| (i as f32 * 0.3).sin()).collect();
        let mut batched = vec![Complex32::new(0.0, 0.0); 16];
        engine.forward_real_batch(&frames, &mut batched).unwrap();

        let second = engine.forward_real(&frames[8..]).unwrap();
        for (a, b) in batched[8..].iter().zip(second.iter()) {
            assert!((a - b).norm() < 1e-5);
        }
    }

    #[test]
    fn batch_rejects_partial_frames() {
        let engine = build_engine(EngineKind::Radix2, 8).unwrap();
        let mut out = vec![Complex32::new(0.0, 0.0); 12];
        assert!(matches!(
            engine.forward_real_batch(&[0.0; 12], &mut out),
            Err(SpectraError::LengthMismatch { .. })
        ));
    }
}
