pub mod terminal;

use crate::audio::features::TickOutput;

/// Drawing side of the pipeline. Receives finished numeric series only.
pub trait Renderer {
    fn draw_waveform(&mut self, xs: &[f64], ys: &[f64]);

    fn draw_spectrum(&mut self, xs: &[f64], ys: &[f64]);

    /// Flat reference line over the waveform (RMS level).
    fn overlay_waveform(&mut self, _xs: &[f64], _ys: &[f64]) {}

    /// Flat reference line over the spectrum (peak magnitude).
    fn overlay_spectrum(&mut self, _xs: &[f64], _ys: &[f64]) {}

    fn annotate(&mut self, _label: &str) {}

    /// Called once per tick after every draw call.
    fn present(&mut self) {}

    /// Called once when the scheduler stops.
    fn finish(&mut self) {}
}

/// Hand one tick's output to the renderer in draw order.
pub fn render_tick(renderer: &mut dyn Renderer, tick: &TickOutput) {
    renderer.draw_waveform(&tick.waveform.xs, &tick.waveform.ys);
    renderer.overlay_waveform(&tick.waveform.xs, &tick.rms_line);
    renderer.draw_spectrum(&tick.spectrum.frequencies, &tick.spectrum.magnitudes_db);
    renderer.overlay_spectrum(&tick.spectrum.frequencies, &tick.peak_line);
    renderer.annotate(&tick.rms_label());
    renderer.annotate(&tick.peak_label());
    renderer.present();
}

/// Headless renderer; drops everything.
#[derive(Debug, Default)]
pub struct NullRenderer;

impl Renderer for NullRenderer {
    fn draw_waveform(&mut self, _xs: &[f64], _ys: &[f64]) {}

    fn draw_spectrum(&mut self, _xs: &[f64], _ys: &[f64]) {}
}

/// Axis ranges and labels, fixed for the lifetime of a renderer.
#[derive(Debug, Clone)]
pub struct DisplayConfig {
    pub waveform_y_range: (f64, f64),
    /// Decibel range of the spectrum plot
    pub spectrum_y_range: (f64, f64),
    /// Visible frequency range (Hz), plotted on a log axis
    pub frequency_range: (f64, f64),
    /// Frequency axis ticks (Hz, label)
    pub frequency_ticks: Vec<(f64, String)>,
}

impl DisplayConfig {
    pub fn clamp_waveform(&self, amplitude: f64) -> f64 {
        amplitude.clamp(self.waveform_y_range.0, self.waveform_y_range.1)
    }

    /// Position of `db` within the spectrum range, 0.0..=1.0.
    pub fn spectrum_level(&self, db: f64) -> f64 {
        let (lo, hi) = self.spectrum_y_range;
        if hi <= lo {
            return 0.0;
        }
        ((db - lo) / (hi - lo)).clamp(0.0, 1.0)
    }
}

impl Default for DisplayConfig {
    fn default() -> Self {
        Self {
            waveform_y_range: (-5000.0, 5000.0),
            spectrum_y_range: (-20.0, 100.0),
            frequency_range: (20.0, 22050.0),
            frequency_ticks: default_frequency_ticks(),
        }
    }
}

pub fn default_frequency_ticks() -> Vec<(f64, String)> {
    [
        (15.0, "15"),
        (31.0, "31"),
        (62.0, "62"),
        (125.0, "125"),
        (250.0, "250"),
        (500.0, "500"),
        (1000.0, "1k"),
        (2000.0, "2k"),
        (4000.0, "4k"),
        (8000.0, "8k"),
        (16000.0, "16k"),
    ]
    .into_iter()
    .map(|(hz, label)| (hz, label.to_string()))
    .collect()
}

/// Records every call, for tests.
#[cfg(test)]
#[derive(Debug, Default)]
pub(crate) struct RecordingRenderer {
    pub waveforms: Vec<(Vec<f64>, Vec<f64>)>,
    pub spectra: Vec<(Vec<f64>, Vec<f64>)>,
    pub overlays: usize,
    pub labels: Vec<String>,
    pub presented: usize,
    pub finished: bool,
}

#[cfg(test)]
impl Renderer for RecordingRenderer {
    fn draw_waveform(&mut self, xs: &[f64], ys: &[f64]) {
        self.waveforms.push((xs.to_vec(), ys.to_vec()));
    }

    fn draw_spectrum(&mut self, xs: &[f64], ys: &[f64]) {
        self.spectra.push((xs.to_vec(), ys.to_vec()));
    }

    fn overlay_waveform(&mut self, _xs: &[f64], _ys: &[f64]) {
        self.overlays += 1;
    }

    fn overlay_spectrum(&mut self, _xs: &[f64], _ys: &[f64]) {
        self.overlays += 1;
    }

    fn annotate(&mut self, label: &str) {
        self.labels.push(label.to_string());
    }

    fn present(&mut self) {
        self.presented += 1;
    }

    fn finish(&mut self) {
        self.finished = true;
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::audio::features::{PeakAnnotation, RmsLevel, SpectrumSeries};

    #[test]
    fn render_tick_issues_every_draw_call() {
        let tick = TickOutput::new(
            &[0, 0],
            RmsLevel::default(),
            SpectrumSeries {
                frequencies: vec![-1.0, 0.0],
                magnitudes_db: vec![0.0, 0.0],
            },
            PeakAnnotation {
                index: 0,
                frequency: -1.0,
                magnitude_db: 0.0,
            },
        );
        let mut renderer = RecordingRenderer::default();
        render_tick(&mut renderer, &tick);

        assert_eq!(renderer.waveforms.len(), 1);
        assert_eq!(renderer.spectra.len(), 1);
        assert_eq!(renderer.overlays, 2);
        assert_eq!(renderer.labels, vec!["RMS:0dB", "MAX:0"]);
        assert_eq!(renderer.presented, 1);
    }

    #[test]
    fn null_renderer_accepts_a_tick() {
        let tick = TickOutput::new(
            &[1],
            RmsLevel::default(),
            SpectrumSeries::default(),
            PeakAnnotation {
                index: 0,
                frequency: 0.0,
                magnitude_db: 0.0,
            },
        );
        render_tick(&mut NullRenderer, &tick);
    }

    #[test]
    fn display_ranges_clamp() {
        let display = DisplayConfig::default();
        assert_eq!(display.clamp_waveform(12_000.0), 5000.0);
        assert_eq!(display.clamp_waveform(-12_000.0), -5000.0);
        assert_eq!(display.spectrum_level(-20.0), 0.0);
        assert_eq!(display.spectrum_level(100.0), 1.0);
        assert!((display.spectrum_level(40.0) - 0.5).abs() < 1e-12);
    }
}
