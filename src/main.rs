mod cli;
mod config;
mod audio;
mod render;
mod encode;
mod error;
mod pipeline;
mod report;
mod store;

use anyhow::{Context, Result};
use clap::Parser;

use cli::Cli;
use encode::ffmpeg::{FfmpegEncoder, VideoEncoder};
use pipeline::Pipeline;
use store::DirFrameStore;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // Explicit --config path, or auto-detect notescope.toml / global config
    let mut cfg = match cli.config.clone().or_else(config::discover_config_path) {
        Some(path) => {
            let cfg = config::load_config(&path)?;
            log::info!("Loaded config from {}", path.display());
            cfg
        }
        None => config::VisualizerConfig::default(),
    };
    cli.apply(&mut cfg);
    cfg.validate()?;

    let input = cfg.output.audio_file.clone();
    if !input.exists() {
        anyhow::bail!("Input file not found: {}", input.display());
    }

    log::info!("notescope - note spectrum video generator");
    log::info!("Input: {}", input.display());
    log::info!("Frames dir: {}", cfg.output.frames_dir.display());
    log::info!("Output: {}", cfg.output.video.display());
    let (width, height) = cfg.display.pixel_size();
    log::info!("Resolution: {}x{} @ {}fps", width, height, cfg.analysis.fps);

    log::info!("Decoding audio...");
    let waveform = audio::decode::decode_audio(&input, cfg.analysis.channel_mode)
        .with_context(|| format!("Failed to read waveform {}", input.display()))?;

    let store = DirFrameStore::new(cfg.output.frames_dir.clone());
    let ffmpeg = FfmpegEncoder::new(&cfg.output);
    let encoder: Option<&dyn VideoEncoder> = if cli.skip_video { None } else { Some(&ffmpeg) };

    let report = Pipeline::new(&cfg)?.run(&waveform, &input, &store, encoder)?;

    if let Some(ref path) = cli.notes_json {
        report::write_notes_json(path, &report)?;
    }

    match report.video {
        Some(ref video) => log::info!("Done! Output: {}", video.display()),
        None => log::warn!(
            "Done without a video; {} frames are in {}",
            report.frame_count,
            store.dir().display()
        ),
    }
    Ok(())
}
