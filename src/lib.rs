//! Audio spectrum analysis: PCM in, log-spaced dB-compressed bars out, one
//! call per display tick.

pub mod analysis;
pub mod audio;
pub mod config;
pub mod dsp;
pub mod error;

pub use analysis::{PipelineStats, SignalHandle, SpectrumPipeline};
pub use audio::Signal;
pub use config::{AnalysisConfig, Config, PlaybackConfig};
pub use error::{Result, SpectraError};
