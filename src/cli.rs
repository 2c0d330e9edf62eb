use clap::Parser;
use std::path::PathBuf;

use spectra::dsp::{EngineKind, WindowFunction};

#[derive(Parser, Debug)]
#[command(name = "spectra", about = "Audio spectrum analyzer producing per-frame bar levels")]
pub struct Cli {
    /// Input audio file (WAV, MP3, FLAC, OGG, AAC)
    pub input: PathBuf,

    /// Output file, one JSON object per analyzed frame
    #[arg(short, long, default_value = "frames.jsonl")]
    pub output: PathBuf,

    /// Display ticks per second
    #[arg(long, default_value_t = 60)]
    pub fps: u32,

    /// Transform size in samples (power of two)
    #[arg(long, default_value_t = 2048)]
    pub frame_size: usize,

    /// Overlapping frames averaged per tick (0 or 1 disables batching)
    #[arg(long, default_value_t = 4)]
    pub batch_size: usize,

    /// Samples between batched frames [default: frame size / 4]
    #[arg(long)]
    pub hop_size: Option<usize>,

    /// Temporal smoothing factor (0.0-1.0, 0 disables)
    #[arg(long, default_value_t = 0.3)]
    pub smoothing: f32,

    /// Number of output bars
    #[arg(long, default_value_t = 64)]
    pub bars: usize,

    /// Transform engine: direct, radix2, rustfft
    #[arg(long, default_value = "radix2")]
    pub engine: EngineKind,

    /// Window function: hann, hamming, blackman, rectangular
    #[arg(long, default_value = "hann")]
    pub window: WindowFunction,

    /// Lowest frequency of the first bar in Hz
    #[arg(long, default_value_t = 20.0)]
    pub min_freq: f32,

    /// Highest frequency of the last bar in Hz
    #[arg(long, default_value_t = 20000.0)]
    pub max_freq: f32,

    /// Noise floor in dB
    #[arg(long, default_value_t = -60.0, allow_hyphen_values = true)]
    pub min_db: f32,

    /// Level mapped to a full bar in dB
    #[arg(long, default_value_t = 0.0, allow_hyphen_values = true)]
    pub max_db: f32,

    /// Config file [default: spectra.toml, then ~/.config/spectra/config.toml]
    #[arg(long)]
    pub config: Option<PathBuf>,

    /// Compare the direct and radix-2 engines on the first frame and exit
    #[arg(long)]
    pub compare_engines: bool,
}
