use anyhow::{Context, Result};
use serde::Deserialize;
use std::path::Path;
use std::time::Duration;

use crate::audio::source::CaptureConfig;
use crate::audio::spectrum::MagnitudeScale;
use crate::cli::Cli;
use crate::render::{default_frequency_ticks, DisplayConfig};
use crate::scheduler::SchedulerConfig;

#[derive(Debug, Default, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub audio: AudioConfig,
    #[serde(default)]
    pub spectrum: SpectrumConfig,
    #[serde(default)]
    pub scheduler: SchedulerSection,
    #[serde(default)]
    pub display: DisplaySection,
}

#[derive(Debug, Deserialize)]
pub struct AudioConfig {
    #[serde(default = "default_sample_rate")]
    pub sample_rate: u32,
    #[serde(default)]
    pub frame_size: Option<usize>,
    #[serde(default = "default_min_frequency")]
    pub min_frequency: u32,
    #[serde(default)]
    pub device: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
pub struct SpectrumConfig {
    #[serde(default)]
    pub magnitude_scale: MagnitudeScale,
}

#[derive(Debug, Deserialize)]
pub struct SchedulerSection {
    #[serde(default = "default_period_ms")]
    pub period_ms: u64,
}

#[derive(Debug, Deserialize)]
pub struct DisplaySection {
    #[serde(default = "default_waveform_y_range")]
    pub waveform_y_range: (f64, f64),
    #[serde(default = "default_spectrum_y_range")]
    pub spectrum_y_range: (f64, f64),
    #[serde(default = "default_frequency_range")]
    pub frequency_range: (f64, f64),
}

impl Default for AudioConfig {
    fn default() -> Self {
        Self {
            sample_rate: default_sample_rate(),
            frame_size: None,
            min_frequency: default_min_frequency(),
            device: None,
        }
    }
}

impl Default for SchedulerSection {
    fn default() -> Self {
        Self {
            period_ms: default_period_ms(),
        }
    }
}

impl Default for DisplaySection {
    fn default() -> Self {
        Self {
            waveform_y_range: default_waveform_y_range(),
            spectrum_y_range: default_spectrum_y_range(),
            frequency_range: default_frequency_range(),
        }
    }
}

fn default_sample_rate() -> u32 { 44100 }
fn default_min_frequency() -> u32 { 20 }
fn default_period_ms() -> u64 { 50 }
fn default_waveform_y_range() -> (f64, f64) { (-5000.0, 5000.0) }
fn default_spectrum_y_range() -> (f64, f64) { (-20.0, 100.0) }
fn default_frequency_range() -> (f64, f64) { (20.0, 22050.0) }

pub fn load_config(path: &Path) -> Result<Config> {
    let content = std::fs::read_to_string(path)
        .with_context(|| format!("Failed to read config file: {}", path.display()))?;
    parse_config(&content).with_context(|| format!("Invalid config file: {}", path.display()))
}

pub fn parse_config(content: &str) -> Result<Config> {
    Ok(toml::from_str(content)?)
}

/// Frame long enough to hold two periods of `min_frequency`.
pub fn derived_frame_size(sample_rate: u32, min_frequency: u32) -> usize {
    (2 * sample_rate / min_frequency) as usize
}

/// Startup settings after merging CLI and config file.
#[derive(Debug, Clone)]
pub struct Settings {
    pub capture: CaptureConfig,
    pub scheduler: SchedulerConfig,
    pub magnitude_scale: MagnitudeScale,
    pub display: DisplayConfig,
    pub headless: bool,
}

impl Settings {
    /// Config values apply only where the CLI was left at its default.
    pub fn resolve(cli: &Cli, config: Option<Config>) -> Result<Self> {
        let cfg = config.unwrap_or_default();

        let sample_rate = if cli.sample_rate == default_sample_rate() {
            cfg.audio.sample_rate
        } else {
            cli.sample_rate
        };
        let min_freq = if cli.min_freq == default_min_frequency() {
            cfg.audio.min_frequency
        } else {
            cli.min_freq
        };
        let period_ms = if cli.period_ms == default_period_ms() {
            cfg.scheduler.period_ms
        } else {
            cli.period_ms
        };
        let magnitude_scale = if cli.magnitude_scale == MagnitudeScale::default() {
            cfg.spectrum.magnitude_scale
        } else {
            cli.magnitude_scale
        };
        let device = cli.device.clone().or(cfg.audio.device);

        if sample_rate == 0 {
            anyhow::bail!("Sample rate must be positive");
        }
        if period_ms == 0 {
            anyhow::bail!("Update period must be positive");
        }

        let frame_size = match cli.frame_size.or(cfg.audio.frame_size) {
            Some(size) => size,
            None => {
                if min_freq == 0 {
                    anyhow::bail!("Minimum frequency must be positive");
                }
                derived_frame_size(sample_rate, min_freq)
            }
        };
        if frame_size == 0 {
            anyhow::bail!("Frame size must be positive");
        }

        let display = DisplayConfig {
            waveform_y_range: cfg.display.waveform_y_range,
            spectrum_y_range: cfg.display.spectrum_y_range,
            frequency_range: cfg.display.frequency_range,
            frequency_ticks: default_frequency_ticks(),
        };

        Ok(Self {
            capture: CaptureConfig {
                sample_rate,
                frame_size,
                device,
            },
            scheduler: SchedulerConfig {
                period: Duration::from_millis(period_ms),
                max_ticks: cli.ticks,
            },
            magnitude_scale,
            display,
            headless: cli.headless,
        })
    }
}
