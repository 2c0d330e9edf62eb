mod cli;
mod output;

use anyhow::{Context, Result};
use clap::Parser;
use indicatif::{ProgressBar, ProgressStyle};

use cli::Cli;
use output::FrameWriter;
use spectra::analysis::Framer;
use spectra::config::{self, AnalysisConfig};
use spectra::dsp::{build_engine, magnitudes_into, EngineKind, WindowFunction};
use spectra::{Signal, SpectrumPipeline};

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let mut cli = Cli::parse();

    // Load config: explicit --config path, or auto-detect spectra.toml / global config
    if let Some(path) = config::find_config(cli.config.as_deref()) {
        match config::load_config(&path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                merge_config(&mut cli, cfg);
            }
            Err(err) => log::warn!("Failed to load config from {}: {}", path.display(), err),
        }
    }

    if !cli.input.exists() {
        anyhow::bail!("Input file not found: {}", cli.input.display());
    }

    let analysis = analysis_config(&cli);
    analysis.validate().context("Invalid analysis settings")?;

    log::info!("spectra - audio spectrum analyzer");
    log::info!("Input: {}", cli.input.display());
    log::info!(
        "Frame size: {}, batch: {}, hop: {}, engine: {}, window: {}",
        analysis.frame_size,
        analysis.batch_size,
        analysis.hop(),
        analysis.engine,
        analysis.window
    );

    // 1. Decode audio
    log::info!("Decoding audio...");
    let signal = spectra::audio::decode_file(&cli.input)
        .with_context(|| format!("Failed to decode {}", cli.input.display()))?;

    if cli.compare_engines {
        return compare_engines(&signal, analysis.frame_size, analysis.window);
    }

    // 2. Analyze at the display tick rate
    let mut pipeline = SpectrumPipeline::new(analysis)?;
    let duration = signal.duration_secs();
    pipeline.load(signal);

    let total_ticks = (duration * cli.fps as f64).ceil() as u64;
    log::info!("Output: {} ({} ticks @ {}fps)", cli.output.display(), total_ticks, cli.fps);
    let mut writer = FrameWriter::create(&cli.output)?;

    let pb = ProgressBar::new(total_ticks);
    pb.set_style(
        ProgressStyle::default_bar()
            .template("[{elapsed_precise}] {bar:40.cyan/blue} {pos}/{len} frames ({eta} remaining)")?
            .progress_chars("=>-"),
    );

    for tick in 0..total_ticks {
        let time = tick as f64 / cli.fps as f64;
        if let Some(bars) = pipeline.step(time)? {
            writer.write_frame(tick, time, bars)?;
        }
        pb.set_position(tick + 1);
    }
    pb.finish_with_message("Analysis complete");

    let written = writer.written();
    writer.finish()?;

    let stats = pipeline.stats();
    log::info!(
        "Wrote {} frames ({} ticks without data, {} batch fallbacks)",
        written,
        stats.no_data_ticks,
        stats.batch_fallbacks
    );
    if let Some(last) = stats.last_transform {
        log::info!("Last transform took {:.3}ms", last.as_secs_f64() * 1000.0);
    }
    log::info!("Done! Output: {}", cli.output.display());
    Ok(())
}

/// Config values apply only where the CLI is still at its default.
fn merge_config(cli: &mut Cli, cfg: config::Config) {
    let analysis = cfg.analysis;
    if cli.fps == config::default_fps() { cli.fps = cfg.playback.fps; }
    if cli.frame_size == config::default_frame_size() { cli.frame_size = analysis.frame_size; }
    if cli.batch_size == config::default_batch_size() { cli.batch_size = analysis.batch_size; }
    if cli.hop_size.is_none() { cli.hop_size = analysis.hop_size; }
    if cli.smoothing == config::default_smoothing_factor() { cli.smoothing = analysis.smoothing_factor; }
    if cli.bars == config::default_bar_count() { cli.bars = analysis.bar_count; }
    if cli.engine == EngineKind::default() { cli.engine = analysis.engine; }
    if cli.window == WindowFunction::default() { cli.window = analysis.window; }
    if cli.min_freq == config::default_min_freq() { cli.min_freq = analysis.min_freq; }
    if cli.max_freq == config::default_max_freq() { cli.max_freq = analysis.max_freq; }
    if cli.min_db == config::default_min_db() { cli.min_db = analysis.min_db; }
    if cli.max_db == config::default_max_db() { cli.max_db = analysis.max_db; }
}

fn analysis_config(cli: &Cli) -> AnalysisConfig {
    AnalysisConfig {
        frame_size: cli.frame_size,
        batch_size: cli.batch_size,
        hop_size: cli.hop_size,
        smoothing_factor: cli.smoothing,
        min_freq: cli.min_freq,
        max_freq: cli.max_freq,
        min_db: cli.min_db,
        max_db: cli.max_db,
        bar_count: cli.bars,
        engine: cli.engine,
        window: cli.window,
    }
}

/// Report how far the direct and radix-2 magnitude spectra of the first frame
/// drift apart.
fn compare_engines(signal: &Signal, frame_size: usize, window: WindowFunction) -> Result<()> {
    let frame = Framer::new(frame_size, window)
        .extract(signal, 0)
        .with_context(|| format!("Signal is shorter than one {}-sample frame", frame_size))?;

    let mut results = Vec::new();
    for kind in [EngineKind::Direct, EngineKind::Radix2] {
        let engine = build_engine(kind, frame_size)?;
        let started = std::time::Instant::now();
        let spectrum = engine.forward_real(&frame)?;
        let elapsed = started.elapsed();
        let mut magnitudes = vec![0.0f32; frame_size / 2];
        magnitudes_into(&spectrum, &mut magnitudes);
        log::info!("{}: {:.3}ms", kind, elapsed.as_secs_f64() * 1000.0);
        results.push(magnitudes);
    }

    let peak = results[0].iter().copied().fold(0.0f32, f32::max);
    let max_diff = results[0]
        .iter()
        .zip(&results[1])
        .map(|(a, b)| (a - b).abs())
        .fold(0.0f32, f32::max);
    println!(
        "Max magnitude difference direct vs radix2 ({} bins): {:.6e} (peak {:.4})",
        frame_size / 2,
        max_diff,
        peak
    );
    Ok(())
}
