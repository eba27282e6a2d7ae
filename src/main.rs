mod audio;
mod cli;
mod config;
mod error;
mod render;
mod scheduler;

use anyhow::{Context, Result};
use clap::Parser;

use audio::source::Microphone;
use audio::spectrum::SpectrumEngine;
use cli::Cli;
use config::Settings;
use render::terminal::TerminalRenderer;
use render::{NullRenderer, Renderer};
use scheduler::UpdateScheduler;

fn main() -> Result<()> {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info"))
        .format_timestamp_millis()
        .init();

    let cli = Cli::parse();

    // List devices mode
    if cli.list_devices {
        let devices = Microphone::list_devices().context("Failed to enumerate input devices")?;
        println!("Available input devices:");
        for device in &devices {
            let marker = if device.is_default { "*" } else { " " };
            let rates: Vec<String> = device
                .supported_sample_rates
                .iter()
                .map(|(lo, hi)| if lo == hi { format!("{}", lo) } else { format!("{}-{}", lo, hi) })
                .collect();
            println!(
                "{} {:<40} {}ch  {} Hz",
                marker,
                device.name,
                device.max_channels,
                rates.join(", ")
            );
        }
        return Ok(());
    }

    // Load config: explicit --config path, or auto-detect micscope.toml / global config
    let config_path = cli.config.clone().or_else(|| {
        let local = std::path::PathBuf::from("micscope.toml");
        if local.exists() {
            return Some(local);
        }
        if let Some(home) = dirs::home_dir() {
            let xdg = home.join(".config").join("micscope").join("config.toml");
            if xdg.exists() {
                return Some(xdg);
            }
        }
        if let Some(config_dir) = dirs::config_dir() {
            let platform = config_dir.join("micscope").join("config.toml");
            if platform.exists() {
                return Some(platform);
            }
        }
        None
    });
    let file_config = match config_path {
        Some(ref path) => match config::load_config(path) {
            Ok(cfg) => {
                log::info!("Loaded config from {}", path.display());
                Some(cfg)
            }
            Err(err) => {
                log::warn!("Failed to load config: {:#}", err);
                None
            }
        },
        None => None,
    };

    let settings = Settings::resolve(&cli, file_config)?;

    log::info!("micscope - live waveform and spectrum analyzer");
    log::info!(
        "Capture: {}Hz mono, frame={} samples ({:.1} ms)",
        settings.capture.sample_rate,
        settings.capture.frame_size,
        settings.capture.frame_size as f64 * 1000.0 / settings.capture.sample_rate as f64
    );
    log::info!(
        "Update period: {} ms, magnitude scale: {:?}",
        settings.scheduler.period.as_millis(),
        settings.magnitude_scale
    );

    if settings.headless {
        run(&settings, NullRenderer)
    } else {
        run(&settings, TerminalRenderer::new(settings.display.clone()))
    }
}

fn run<R: Renderer>(settings: &Settings, renderer: R) -> Result<()> {
    let engine = SpectrumEngine::new(settings.magnitude_scale);
    let mut scheduler = UpdateScheduler::start(
        || Microphone::open(&settings.capture),
        renderer,
        engine,
        settings.scheduler.clone(),
    )
    .context("Cannot start capture")?;

    log::info!("Capturing from '{}'", scheduler.source().device_name());

    let gate = scheduler.gate();
    ctrlc::set_handler(move || gate.stop()).context("Failed to install Ctrl-C handler")?;

    let report = scheduler.run().context("Capture stopped")?;
    log::info!(
        "Done ({:?}): {} updates, {} late timer firings dropped",
        scheduler.state(),
        report.ticks,
        report.dropped
    );
    Ok(())
}
