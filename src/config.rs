use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::analysis::DbRange;
use crate::dsp::{EngineKind, WindowFunction};
use crate::error::{Result, SpectraError};

#[derive(Debug, Default, Clone, PartialEq, Deserialize, Serialize)]
pub struct Config {
    #[serde(default)]
    pub analysis: AnalysisConfig,
    #[serde(default)]
    pub playback: PlaybackConfig,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct AnalysisConfig {
    /// Samples per frame; must be a power of two
    #[serde(default = "default_frame_size")]
    pub frame_size: usize,
    /// Frames averaged per tick; 0 and 1 both mean a single frame
    #[serde(default = "default_batch_size")]
    pub batch_size: usize,
    /// Stride between batched frames, `frame_size / 4` when unset
    #[serde(default)]
    pub hop_size: Option<usize>,
    #[serde(default = "default_smoothing_factor")]
    pub smoothing_factor: f32,
    #[serde(default = "default_min_freq")]
    pub min_freq: f32,
    #[serde(default = "default_max_freq")]
    pub max_freq: f32,
    #[serde(default = "default_min_db")]
    pub min_db: f32,
    #[serde(default = "default_max_db")]
    pub max_db: f32,
    #[serde(default = "default_bar_count")]
    pub bar_count: usize,
    #[serde(default)]
    pub engine: EngineKind,
    #[serde(default)]
    pub window: WindowFunction,
}

#[derive(Debug, Clone, PartialEq, Deserialize, Serialize)]
pub struct PlaybackConfig {
    #[serde(default = "default_fps")]
    pub fps: u32,
}

impl Default for AnalysisConfig {
    fn default() -> Self {
        Self {
            frame_size: default_frame_size(),
            batch_size: default_batch_size(),
            hop_size: None,
            smoothing_factor: default_smoothing_factor(),
            min_freq: default_min_freq(),
            max_freq: default_max_freq(),
            min_db: default_min_db(),
            max_db: default_max_db(),
            bar_count: default_bar_count(),
            engine: EngineKind::default(),
            window: WindowFunction::default(),
        }
    }
}

impl Default for PlaybackConfig {
    fn default() -> Self {
        Self { fps: default_fps() }
    }
}

pub fn default_frame_size() -> usize { 2048 }
pub fn default_batch_size() -> usize { 4 }
pub fn default_smoothing_factor() -> f32 { 0.3 }
pub fn default_min_freq() -> f32 { 20.0 }
pub fn default_max_freq() -> f32 { 20000.0 }
pub fn default_min_db() -> f32 { -60.0 }
pub fn default_max_db() -> f32 { 0.0 }
pub fn default_bar_count() -> usize { 64 }
pub fn default_fps() -> u32 { 60 }

impl AnalysisConfig {
    pub fn validate(&self) -> Result<()> {
        if self.frame_size < 2 || !self.frame_size.is_power_of_two() {
            return Err(SpectraError::InvalidFrameSize {
                size: self.frame_size,
                reason: "must be a power of two and at least 2",
            });
        }
        if !(0.0..=1.0).contains(&self.smoothing_factor) {
            return Err(SpectraError::InvalidConfig(format!(
                "smoothing factor {} is outside [0, 1]",
                self.smoothing_factor
            )));
        }
        if !(self.min_freq > 0.0) {
            return Err(SpectraError::InvalidConfig(format!(
                "min_freq {} must be positive",
                self.min_freq
            )));
        }
        if !(self.max_freq > self.min_freq) {
            return Err(SpectraError::InvalidConfig(format!(
                "max_freq {} must exceed min_freq {}",
                self.max_freq, self.min_freq
            )));
        }
        if !(self.min_db < self.max_db) {
            return Err(SpectraError::InvalidConfig(format!(
                "min_db {} must be below max_db {}",
                self.min_db, self.max_db
            )));
        }
        if self.bar_count == 0 {
            return Err(SpectraError::InvalidConfig("bar_count must be non-zero".into()));
        }
        if self.hop_size == Some(0) {
            return Err(SpectraError::InvalidConfig("hop_size must be non-zero".into()));
        }
        Ok(())
    }

    /// Stride between batched frames.
    pub fn hop(&self) -> usize {
        self.hop_size.unwrap_or(self.frame_size / 4).max(1)
    }

    pub fn db_range(&self) -> DbRange {
        DbRange {
            min_db: self.min_db,
            max_db: self.max_db,
        }
    }
}

impl Config {
    pub fn validate(&self) -> Result<()> {
        self.analysis.validate()?;
        if self.playback.fps == 0 {
            return Err(SpectraError::InvalidConfig("fps must be non-zero".into()));
        }
        Ok(())
    }
}

pub fn parse_config(content: &str) -> Result<Config> {
    let config: Config =
        toml::from_str(content).map_err(|e| SpectraError::InvalidConfig(e.to_string()))?;
    config.validate()?;
    Ok(config)
}

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)?;
    parse_config(&content)
}

/// Explicit path, then `spectra.toml` in the working directory, then
/// `~/.config/spectra/config.toml`, then the platform config directory.
pub fn find_config(explicit: Option<&Path>) -> Option<PathBuf> {
    if let Some(path) = explicit {
        return Some(path.to_path_buf());
    }
    let local = PathBuf::from("spectra.toml");
    if local.exists() {
        return Some(local);
    }
    if let Some(home) = dirs::home_dir() {
        let xdg = home.join(".config").join("spectra").join("config.toml");
        if xdg.exists() {
            return Some(xdg);
        }
    }
    if let Some(config_dir) = dirs::config_dir() {
        let platform = config_dir.join("spectra").join("config.toml");
        if platform.exists() {
            return Some(platform);
        }
    }
    None
}
