//! Logarithmic frequency bands with dB compression.

use serde::{Deserialize, Serialize};

use super::normalize::OUTPUT_CEILING;
use crate::error::{Result, SpectraError};

/// Parameters a [`BucketMap`] is built for. Any change means a rebuild.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct BucketParams {
    pub bar_count: usize,
    pub min_freq: f32,
    pub max_freq: f32,
    pub sample_rate: u32,
    pub fft_size: usize,
}

impl BucketParams {
    pub fn num_bins(&self) -> usize {
        self.fft_size / 2
    }

    pub fn resolution(&self) -> f32 {
        self.sample_rate as f32 / self.fft_size as f32
    }

    fn validate(&self) -> Result<()> {
        if self.bar_count == 0 {
            return Err(SpectraError::InvalidConfig("bar count must be non-zero".into()));
        }
        if self.fft_size < 2 {
            return Err(SpectraError::InvalidFrameSize {
                size: self.fft_size,
                reason: "must be at least 2",
            });
        }
        if self.sample_rate == 0 {
            return Err(SpectraError::InvalidConfig("sample rate must be non-zero".into()));
        }
        if !(self.min_freq > 0.0 && self.max_freq > self.min_freq) {
            return Err(SpectraError::InvalidConfig(format!(
                "frequency range {}..{} Hz is empty or not positive",
                self.min_freq, self.max_freq
            )));
        }
        Ok(())
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Serialize, Deserialize)]
pub struct DbRange {
    pub min_db: f32,
    pub max_db: f32,
}

impl Default for DbRange {
    fn default() -> Self {
        Self {
            min_db: -60.0,
            max_db: 0.0,
        }
    }
}

impl DbRange {
    /// Map a 0–255 value to `[0, 1]` on a dB scale; zero sits on the floor.
    pub fn compress(&self, value: f32) -> f32 {
        let normalized = value / OUTPUT_CEILING;
        let db = if normalized > 0.0 {
            20.0 * normalized.log10()
        } else {
            self.min_db
        };
        ((db - self.min_db) / (self.max_db - self.min_db)).clamp(0.0, 1.0)
    }
}

/// One display bar: a frequency band and the bins `[start_bin, end_bin)` it averages.
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct Bucket {
    pub start_freq: f32,
    pub end_freq: f32,
    pub start_bin: usize,
    pub end_bin: usize,
}

#[derive(Clone, Debug)]
pub struct BucketMap {
    params: BucketParams,
    buckets: Vec<Bucket>,
}

impl BucketMap {
    pub fn new(params: BucketParams) -> Result<Self> {
        params.validate()?;

        let num_bins = params.num_bins();
        let resolution = params.resolution();
        let log_min = (params.min_freq as f64).log10();
        let log_span = (params.max_freq as f64).log10() - log_min;
        let edge = |i: usize| 10f64.powf(log_min + log_span * i as f64 / params.bar_count as f64);

        let buckets = (0..params.bar_count)
            .map(|i| {
                let start_freq = edge(i) as f32;
                let end_freq = edge(i + 1) as f32;
                let start_bin = ((start_freq / resolution).floor() as usize).min(num_bins - 1);
                let end_bin = ((end_freq / resolution).ceil() as usize)
                    .min(num_bins)
                    .max(start_bin + 1);
                Bucket {
                    start_freq,
                    end_freq,
                    start_bin,
                    end_bin,
                }
            })
            .collect();

        log::debug!(
            "Built {} buckets over {}-{} Hz ({} bins)",
            params.bar_count,
            params.min_freq,
            params.max_freq,
            num_bins
        );
        Ok(Self { params, buckets })
    }

    pub fn params(&self) -> &BucketParams {
        &self.params
    }

    pub fn matches(&self, params: &BucketParams) -> bool {
        self.params == *params
    }

    pub fn buckets(&self) -> &[Bucket] {
        &self.buckets
    }

    pub fn bar_count(&self) -> usize {
        self.buckets.len()
    }

    /// Average each band of `spectrum` (0–255 values) and compress it to `[0, 1]`.
    pub fn bucketize(&self, spectrum: &[f32], range: DbRange, out: &mut [f32]) -> Result<()> {
        if spectrum.len() != self.params.num_bins() {
            return Err(SpectraError::LengthMismatch {
                expected: self.params.num_bins(),
                actual: spectrum.len(),
            });
        }
        if out.len() != self.buckets.len() {
            return Err(SpectraError::LengthMismatch {
                expected: self.buckets.len(),
                actual: out.len(),
            });
        }

        for (bar, bucket) in out.iter_mut().zip(&self.buckets) {
            let band = &spectrum[bucket.start_bin..bucket.end_bin];
            let avg = band.iter().sum::<f32>() / band.len() as f32;
            *bar = range.compress(avg);
        }
        Ok(())
    }
}

pub fn bucketize(
    spectrum: &[f32],
    bar_count: usize,
    min_freq: f32,
    max_freq: f32,
    sample_rate: u32,
    fft_size: usize,
    range: DbRange,
) -> Result<Vec<f32>> {
    let map = BucketMap::new(BucketParams {
        bar_count,
        min_freq,
        max_freq,
        sample_rate,
        fft_size,
    })?;
    let mut out = vec![0.0; bar_count];
    map.bucketize(spectrum, range, &mut out)?;
    Ok(out)
}
