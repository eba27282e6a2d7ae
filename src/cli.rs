use clap::Parser;
use std::path::PathBuf;

use crate::audio::spectrum::MagnitudeScale;

#[derive(Parser, Debug)]
#[command(name = "micscope", about = "Live microphone waveform and spectrum analyzer")]
pub struct Cli {
    /// Input device name (see --list-devices). Defaults to the system input
    #[arg(short, long)]
    pub device: Option<String>,

    /// Capture sample rate in Hz
    #[arg(long, default_value_t = 44100)]
    pub sample_rate: u32,

    /// Samples per frame. When omitted it is derived from --min-freq
    #[arg(long)]
    pub frame_size: Option<usize>,

    /// Lowest frequency of interest in Hz; frame size = 2 * rate / min_freq
    #[arg(long, default_value_t = 20)]
    pub min_freq: u32,

    /// Update period in milliseconds
    #[arg(long, default_value_t = 50)]
    pub period_ms: u64,

    /// FFT magnitude normalization (|X|/N or 2|X|/N)
    #[arg(long, value_enum, default_value_t = MagnitudeScale::PerSample)]
    pub magnitude_scale: MagnitudeScale,

    /// Stop after this many updates
    #[arg(long)]
    pub ticks: Option<u64>,

    /// Analyze without drawing (metrics still go to the debug log)
    #[arg(long)]
    pub headless: bool,

    /// List available input devices and exit
    #[arg(long)]
    pub list_devices: bool,

    /// Config file (defaults to ./micscope.toml or the user config dir)
    #[arg(short, long)]
    pub config: Option<PathBuf>,
}
