use std::sync::Arc;

use crate::error::{Result, SpectraError};

/// Immutable mono PCM signal owned by the analysis pipeline.
#[derive(Clone, Debug)]
pub struct Signal {
    samples: Arc<[f32]>,
    sample_rate: u32,
    /// Channel count of the source before down-mixing
    channels: u16,
    duration_secs: f64,
}

impl Signal {
    /// Build a signal from interleaved PCM, down-mixing to mono.
    pub fn from_interleaved(samples: &[f32], sample_rate: u32, channels: u16) -> Result<Self> {
        if sample_rate == 0 {
            return Err(SpectraError::InvalidSignal("sample rate must be non-zero".into()));
        }
        if channels == 0 {
            return Err(SpectraError::InvalidSignal("channel count must be non-zero".into()));
        }
        if samples.is_empty() {
            return Err(SpectraError::InvalidSignal("no samples".into()));
        }
        let ch = channels as usize;
        if samples.len() % ch != 0 {
            return Err(SpectraError::InvalidSignal(format!(
                "{} samples is not a whole number of {}-channel frames",
                samples.len(),
                ch
            )));
        }
        if let Some(pos) = samples.iter().position(|s| !s.is_finite()) {
            return Err(SpectraError::InvalidSignal(format!(
                "non-finite sample at index {}",
                pos
            )));
        }

        // Downmix to mono
        let mono: Arc<[f32]> = if ch == 1 {
            Arc::from(samples)
        } else {
            samples
                .chunks_exact(ch)
                .map(|frame| frame.iter().sum::<f32>() / ch as f32)
                .collect()
        };

        Ok(Self::assemble(mono, sample_rate, channels))
    }

    pub fn from_mono(samples: Vec<f32>, sample_rate: u32) -> Result<Self> {
        Self::from_interleaved(&samples, sample_rate, 1)
    }

    /// Wrap an already down-mixed buffer, keeping the source channel count.
    pub(crate) fn from_downmixed(samples: Vec<f32>, sample_rate: u32, channels: u16) -> Result<Self> {
        if channels == 0 {
            return Err(SpectraError::InvalidSignal("channel count must be non-zero".into()));
        }
        let mut signal = Self::from_interleaved(&samples, sample_rate, 1)?;
        signal.channels = channels;
        Ok(signal)
    }

    fn assemble(samples: Arc<[f32]>, sample_rate: u32, channels: u16) -> Self {
        let duration_secs = samples.len() as f64 / sample_rate as f64;
        Self {
            samples,
            sample_rate,
            channels,
            duration_secs,
        }
    }

    pub fn samples(&self) -> &[f32] {
        &self.samples
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    pub fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    pub fn channels(&self) -> u16 {
        self.channels
    }

    pub fn duration_secs(&self) -> f64 {
        self.duration_secs
    }

    /// Sample offset for a playback time, `None` when the time is unusable.
    pub fn offset_for_time(&self, time_secs: f64) -> Option<usize> {
        if !time_secs.is_finite() || time_secs < 0.0 {
            return None;
        }
        Some((time_secs * self.sample_rate as f64).floor() as usize)
    }
}
