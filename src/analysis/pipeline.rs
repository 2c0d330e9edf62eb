//! Per-tick analysis session: signal in, renderer-ready bars out.

use std::time::{Duration, Instant};

use super::batch::{BatchAnalyzer, MagnitudeSource};
use super::bucket::{BucketMap, BucketParams};
use super::normalize::{Normalizer, SmoothingState};
use super::region::{RegionLayout, SpectrumRegion};
use crate::audio::signal::Signal;
use crate::config::AnalysisConfig;
use crate::dsp::EngineCache;
use crate::error::{Result, SpectraError};

/// Identifies one loaded signal. Loading another signal invalidates it.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct SignalHandle {
    generation: u64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct PipelineStats {
    pub ticks: u64,
    pub no_data_ticks: u64,
    /// Batches that ran past the signal and were computed from one frame
    pub batch_fallbacks: u64,
    pub last_transform: Option<Duration>,
}

pub struct SpectrumPipeline {
    config: AnalysisConfig,
    engines: EngineCache,
    analyzer: BatchAnalyzer,
    normalizer: Normalizer,
    buckets: Option<BucketMap>,
    region: SpectrumRegion,
    signal: Option<Signal>,
    generation: u64,
    stats: PipelineStats,
}

impl SpectrumPipeline {
    pub fn new(config: AnalysisConfig) -> Result<Self> {
        config.validate()?;
        let mut engines = EngineCache::new(config.engine);
        engines.get(config.frame_size)?;

        let num_bins = config.frame_size / 2;
        Ok(Self {
            analyzer: BatchAnalyzer::new(config.frame_size, config.window, config.batch_size),
            normalizer: Normalizer::new(num_bins, config.smoothing_factor),
            region: SpectrumRegion::new(num_bins, config.bar_count),
            buckets: None,
            signal: None,
            generation: 0,
            stats: PipelineStats::default(),
            engines,
            config,
        })
    }

    pub fn config(&self) -> &AnalysisConfig {
        &self.config
    }

    /// Apply a new configuration. Any change resets the smoothing state; frame
    /// size and bar count changes take effect on the next analysis call.
    pub fn set_config(&mut self, config: AnalysisConfig) -> Result<()> {
        config.validate()?;
        if config == self.config {
            return Ok(());
        }
        if config.engine != self.engines.kind() {
            self.engines.set_kind(config.engine);
        }
        self.engines.get(config.frame_size)?;

        if config.window != self.analyzer.window() {
            self.analyzer =
                BatchAnalyzer::new(self.analyzer.frame_size(), config.window, config.batch_size);
        }
        log::debug!("Analysis config changed, resetting smoothing state");
        self.normalizer.set_smoothing_factor(config.smoothing_factor);
        self.normalizer.reset();
        self.config = config;
        Ok(())
    }

    pub fn load_signal(
        &mut self,
        samples: &[f32],
        sample_rate: u32,
        channels: u16,
    ) -> Result<SignalHandle> {
        let signal = Signal::from_interleaved(samples, sample_rate, channels)?;
        Ok(self.load(signal))
    }

    pub fn load(&mut self, signal: Signal) -> SignalHandle {
        log::info!(
            "Loaded signal: {} samples @ {}Hz ({} channel(s), {:.2}s)",
            signal.sample_count(),
            signal.sample_rate(),
            signal.channels(),
            signal.duration_secs()
        );
        self.signal = Some(signal);
        self.generation += 1;
        self.normalizer.reset();
        self.stats = PipelineStats::default();
        SignalHandle {
            generation: self.generation,
        }
    }

    pub fn signal(&self) -> Option<&Signal> {
        self.signal.as_ref()
    }

    pub fn handle(&self) -> Option<SignalHandle> {
        self.signal.as_ref().map(|_| SignalHandle {
            generation: self.generation,
        })
    }

    /// Full chain for the frame at `sample_offset`: magnitudes, normalization,
    /// smoothing, bucketization. `Ok(None)` means not enough signal.
    pub fn analyze_frame(
        &mut self,
        handle: SignalHandle,
        sample_offset: usize,
        frame_size: usize,
        bar_count: usize,
    ) -> Result<Option<&[f32]>> {
        let sample_rate = match &self.signal {
            Some(signal) if handle.generation == self.generation => signal.sample_rate(),
            Some(_) => return Err(SpectraError::StaleHandle),
            None => return Err(SpectraError::NoSignal),
        };

        // Everything that can fail runs before any buffer or state is touched
        self.check_frame_size(frame_size)?;
        let params = BucketParams {
            bar_count,
            min_freq: self.config.min_freq,
            max_freq: self.config.max_freq,
            sample_rate,
            fft_size: frame_size,
        };
        let map = match self.buckets.take() {
            Some(map) if map.matches(&params) => map,
            previous => {
                self.buckets = previous;
                BucketMap::new(params)?
            }
        };

        self.resize_for(frame_size);
        self.region.resize(frame_size / 2, bar_count);
        let buckets: &BucketMap = self.buckets.insert(map);

        self.stats.ticks += 1;
        let samples = match &self.signal {
            Some(signal) => signal.samples(),
            None => return Err(SpectraError::NoSignal),
        };
        let engine = self.engines.get(frame_size)?;
        let hop = self.config.hop_size.unwrap_or(frame_size / 4).max(1);
        let (magnitudes, bins, bars) = self.region.split_mut();

        let started = Instant::now();
        let source = self.analyzer.magnitude(
            engine,
            samples,
            sample_offset,
            self.config.batch_size,
            hop,
            magnitudes,
        )?;
        let Some(source) = source else {
            log::trace!("No data at sample offset {}", sample_offset);
            self.stats.no_data_ticks += 1;
            return Ok(None);
        };
        self.stats.last_transform = Some(started.elapsed());
        if source == (MagnitudeSource::Single { fell_back: true }) {
            self.stats.batch_fallbacks += 1;
        }

        self.normalizer.process(magnitudes, bins);
        buckets.bucketize(bins, self.config.db_range(), bars)?;
        Ok(Some(self.region.bars()))
    }

    /// Analyze the frame under the playback cursor with the configured sizes.
    pub fn step(&mut self, playback_time_secs: f64) -> Result<Option<&[f32]>> {
        let handle = self.handle().ok_or(SpectraError::NoSignal)?;
        let offset = self
            .signal
            .as_ref()
            .and_then(|signal| signal.offset_for_time(playback_time_secs));
        match offset {
            Some(offset) => {
                let (frame_size, bar_count) = (self.config.frame_size, self.config.bar_count);
                self.analyze_frame(handle, offset, frame_size, bar_count)
            }
            None => {
                log::trace!("No data at playback time {}", playback_time_secs);
                self.stats.ticks += 1;
                self.stats.no_data_ticks += 1;
                Ok(None)
            }
        }
    }

    pub fn region(&self) -> &SpectrumRegion {
        &self.region
    }

    pub fn layout(&self) -> &RegionLayout {
        self.region.layout()
    }

    pub fn smoothing_state(&self) -> &SmoothingState {
        self.normalizer.state()
    }

    pub fn stats(&self) -> &PipelineStats {
        &self.stats
    }

    /// Reject frame sizes the pipeline cannot run, building the engine for
    /// accepted ones.
    fn check_frame_size(&mut self, frame_size: usize) -> Result<()> {
        if frame_size < 2 {
            return Err(SpectraError::InvalidFrameSize {
                size: frame_size,
                reason: "must be at least 2",
            });
        }
        self.engines.get(frame_size)?;
        Ok(())
    }

    fn resize_for(&mut self, frame_size: usize) {
        if frame_size == self.analyzer.frame_size() {
            return;
        }
        log::debug!(
            "Frame size {} -> {}, resetting smoothing state",
            self.analyzer.frame_size(),
            frame_size
        );
        self.analyzer = BatchAnalyzer::new(frame_size, self.config.window, self.config.batch_size);
        self.normalizer.resize(frame_size / 2);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::dsp::{EngineKind, WindowFunction};
    use std::f32::consts::PI;

    fn sine(freq: f32, sample_rate: u32, len: usize) -> Vec<f32> {
        (0..len)
            .map(|i| (2.0 * PI * freq * i as f32 / sample_rate as f32).sin())
            .collect()
    }

    fn small_config(engine: EngineKind) -> AnalysisConfig {
        AnalysisConfig {
            frame_size: 256,
            bar_count: 16,
            engine,
            ..AnalysisConfig::default()
        }
    }

    #[test]
    fn requires_a_loaded_signal() {
        let mut pipeline = SpectrumPipeline::new(AnalysisConfig::default()).unwrap();
        assert!(matches!(pipeline.step(0.0), Err(SpectraError::NoSignal)));
    }

    #[test]
    fn replaced_signal_invalidates_handle() {
        let mut pipeline = SpectrumPipeline::new(small_config(EngineKind::Radix2)).unwrap();
        let first = pipeline.load_signal(&[0.0; 4096], 8000, 1).unwrap();
        let second = pipeline.load_signal(&[0.0; 4096], 8000, 1).unwrap();
        assert_ne!(first, second);
        assert!(matches!(
            pipeline.analyze_frame(first, 0, 256, 16),
            Err(SpectraError::StaleHandle)
        ));
        assert!(pipeline.analyze_frame(second, 0, 256, 16).unwrap().is_some());
    }

    #[test]
    fn rejected_signal_keeps_previous() {
        let mut pipeline = SpectrumPipeline::new(small_config(EngineKind::Radix2)).unwrap();
        let handle = pipeline.load_signal(&[0.0; 1024], 8000, 1).unwrap();
        assert!(matches!(
            pipeline.load_signal(&[0.0; 1024], 8000, 0),
            Err(SpectraError::InvalidSignal(_))
        ));
        assert!(matches!(
            pipeline.load_signal(&[0.0; 3], 8000, 2),
            Err(SpectraError::InvalidSignal(_))
        ));
        assert_eq!(pipeline.handle(), Some(handle));
    }

    #[test]
    fn silence_yields_flat_zero_bars() {
        let mut pipeline = SpectrumPipeline::new(AnalysisConfig::default()).unwrap();
        pipeline.load_signal(&vec![0.0; 48000], 48000, 1).unwrap();
        let bars = pipeline.step(0.1).unwrap().unwrap().to_vec();
        assert_eq!(bars, vec![0.0; 64]);
        assert!(pipeline.region().bins().iter().all(|&b| b == 0.0));
    }

    #[test]
    fn end_of_signal_is_no_data_not_error() {
        let mut pipeline = SpectrumPipeline::new(small_config(EngineKind::Radix2)).unwrap();
        let handle = pipeline.load_signal(&sine(440.0, 8000, 1024), 8000, 1).unwrap();

        // Four frames at hop 64 need 448 samples past the offset; one frame fits
        assert!(pipeline.analyze_frame(handle, 700, 256, 16).unwrap().is_some());
        assert_eq!(pipeline.stats().batch_fallbacks, 1);

        assert!(pipeline.analyze_frame(handle, 900, 256, 16).unwrap().is_none());
        assert!(pipeline.step(-1.0).unwrap().is_none());
        assert!(pipeline.step(f64::NAN).unwrap().is_none());
        assert!(pipeline.step(10.0).unwrap().is_none());

        let stats = pipeline.stats();
        assert_eq!(stats.ticks, 5);
        assert_eq!(stats.no_data_ticks, 4);
        assert!(stats.last_transform.is_some());
    }

    #[test]
    fn frame_size_change_resets_smoothing() {
        let mut pipeline = SpectrumPipeline::new(AnalysisConfig::default()).unwrap();
        let handle = pipeline.load_signal(&sine(1000.0, 48000, 48000), 48000, 1).unwrap();
        for i in 0..5 {
            pipeline.analyze_frame(handle, i * 800, 2048, 64).unwrap().unwrap();
        }
        assert_eq!(pipeline.smoothing_state().num_bins(), 1024);
        assert!(pipeline.smoothing_state().smoothed_max() > 1.0);

        let bars = pipeline.analyze_frame(handle, 0, 1024, 32).unwrap().unwrap();
        assert_eq!(bars.len(), 32);
        assert_eq!(pipeline.smoothing_state().num_bins(), 512);
        assert_eq!(pipeline.layout().bins.len, 512);
        assert_eq!(pipeline.layout().bars.len, 32);

        // One update away from the reset value of 1.0
        let max = pipeline.region().magnitudes().iter().copied().fold(0.0f32, f32::max);
        let expected = 0.9 + 0.1 * max;
        assert!((pipeline.smoothing_state().smoothed_max() - expected).abs() < 1e-3 * expected);
    }

    #[test]
    fn invalid_frame_size_leaves_state_intact() {
        let mut pipeline = SpectrumPipeline::new(small_config(EngineKind::Radix2)).unwrap();
        let handle = pipeline.load_signal(&sine(440.0, 8000, 4096), 8000, 1).unwrap();
        pipeline.analyze_frame(handle, 0, 256, 16).unwrap().unwrap();
        let before = pipeline.smoothing_state().clone();

        assert!(matches!(
            pipeline.analyze_frame(handle, 0, 300, 16),
            Err(SpectraError::InvalidFrameSize { .. })
        ));
        assert_eq!(pipeline.smoothing_state(), &before);
        assert_eq!(pipeline.layout().bins.len, 128);
    }

    #[test]
    fn invalid_bar_count_leaves_state_intact() {
        let mut pipeline = SpectrumPipeline::new(small_config(EngineKind::Radix2)).unwrap();
        let handle = pipeline.load_signal(&sine(440.0, 8000, 4096), 8000, 1).unwrap();
        for i in 0..5 {
            pipeline.analyze_frame(handle, i * 200, 256, 16).unwrap().unwrap();
        }
        let before = pipeline.smoothing_state().clone();
        let bars_before = pipeline.region().bars().to_vec();

        assert!(matches!(
            pipeline.analyze_frame(handle, 0, 512, 0),
            Err(SpectraError::InvalidConfig(_))
        ));
        assert_eq!(pipeline.smoothing_state(), &before);
        assert_eq!(pipeline.layout().bins.len, 128);
        assert_eq!(pipeline.layout().bars.len, 16);
        assert_eq!(pipeline.region().bars(), bars_before.as_slice());

        // The previous bucket map is still usable
        let bars = pipeline.analyze_frame(handle, 1000, 256, 16).unwrap().unwrap();
        assert_eq!(bars.len(), 16);
        assert_eq!(pipeline.smoothing_state().num_bins(), 128);
    }

    #[test]
    fn config_change_resets_smoothing() {
        let mut pipeline = SpectrumPipeline::new(small_config(EngineKind::Radix2)).unwrap();
        pipeline.load_signal(&sine(440.0, 8000, 4096), 8000, 1).unwrap();
        for tick in 0..5 {
            pipeline.step(tick as f64 * 0.025).unwrap().unwrap();
        }
        let before = pipeline.smoothing_state().clone();
        assert!(before.smoothed_max() > 1.0);

        pipeline.set_config(small_config(EngineKind::Radix2)).unwrap();
        assert_eq!(pipeline.smoothing_state(), &before);

        let config = AnalysisConfig {
            window: WindowFunction::Hamming,
            ..small_config(EngineKind::Radix2)
        };
        pipeline.set_config(config).unwrap();
        assert_eq!(pipeline.smoothing_state(), &SmoothingState::new(128));
    }

    #[test]
    fn sine_peak_lands_in_its_band() {
        let mut pipeline = SpectrumPipeline::new(AnalysisConfig::default()).unwrap();
        pipeline.load_signal(&sine(1000.0, 48000, 48000), 48000, 1).unwrap();

        let mut bars = Vec::new();
        for tick in 0..30 {
            if let Some(out) = pipeline.step(tick as f64 / 60.0).unwrap() {
                bars = out.to_vec();
            }
        }
        assert_eq!(bars.len(), 64);
        assert!(bars.iter().all(|b| (0.0..=1.0).contains(b)));

        let magnitudes = pipeline.region().magnitudes();
        let peak = magnitudes
            .iter()
            .enumerate()
            .max_by(|a, b| a.1.total_cmp(b.1))
            .map(|(i, _)| i)
            .unwrap();
        assert_eq!(peak, (1000.0f32 * 2048.0 / 48000.0).round() as usize);

        let loudest = bars.iter().copied().fold(0.0f32, f32::max);
        assert!(loudest > 0.5);
        assert_eq!(bars[0], 0.0);
    }

    #[test]
    fn engines_agree_through_pipeline() {
        let samples = sine(700.0, 8000, 4096);
        let mut fast = SpectrumPipeline::new(small_config(EngineKind::Radix2)).unwrap();
        let mut direct = SpectrumPipeline::new(small_config(EngineKind::Direct)).unwrap();
        fast.load_signal(&samples, 8000, 1).unwrap();
        direct.load_signal(&samples, 8000, 1).unwrap();

        fast.step(0.05).unwrap().unwrap();
        direct.step(0.05).unwrap().unwrap();
        for (a, b) in fast.region().magnitudes().iter().zip(direct.region().magnitudes()) {
            assert!((a - b).abs() < 1e-2, "{} vs {}", a, b);
        }
    }

    #[test]
    fn set_config_switches_engine_and_smoothing() {
        let mut pipeline = SpectrumPipeline::new(small_config(EngineKind::Radix2)).unwrap();
        let mut config = small_config(EngineKind::RustFft);
        config.smoothing_factor = 0.0;
        pipeline.set_config(config).unwrap();
        assert_eq!(pipeline.config().engine, EngineKind::RustFft);

        let bad = AnalysisConfig {
            frame_size: 100,
            ..AnalysisConfig::default()
        };
        assert!(pipeline.set_config(bad).is_err());
        assert_eq!(pipeline.config().frame_size, 256);
    }
}
