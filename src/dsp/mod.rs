//! Fourier transform engines and window functions.

pub mod direct;
pub mod engine;
pub mod planned;
pub mod radix2;
pub mod window;

pub use direct::DirectEngine;
pub use engine::{build_engine, EngineCache, EngineKind, TransformEngine};
pub use planned::PlannedEngine;
pub use radix2::Radix2Engine;
pub use window::WindowFunction;

pub use rustfft::num_complex::Complex32;

/// Per-bin magnitude `sqrt(re² + im²)` of the first `out.len()` bins.
pub fn magnitudes_into(spectrum: &[Complex32], out: &mut [f32]) {
    for (m, c) in out.iter_mut().zip(spectrum) {
        *m = (c.re * c.re + c.im * c.im).sqrt();
    }
}
