use indicatif::{MultiProgress, ProgressBar, ProgressDrawTarget, ProgressStyle};

use super::{DisplayConfig, Renderer};

const LEVEL_GLYPHS: [char; 9] = [' ', '▁', '▂', '▃', '▄', '▅', '▆', '▇', '█'];

/// Two-line terminal view: waveform level bar and log-spaced spectrum bands.
pub struct TerminalRenderer {
    display: DisplayConfig,
    waveform_bar: ProgressBar,
    spectrum_bar: ProgressBar,
    _multi: MultiProgress,
    labels: Vec<String>,
    rms: f64,
    bands: String,
}

impl TerminalRenderer {
    pub fn new(display: DisplayConfig) -> Self {
        Self::with_target(display, ProgressDrawTarget::stderr())
    }

    fn with_target(display: DisplayConfig, target: ProgressDrawTarget) -> Self {
        let multi = MultiProgress::with_draw_target(target);

        let scale = display.waveform_y_range.1.max(1.0) as u64;
        let waveform_bar = multi.add(ProgressBar::new(scale));
        waveform_bar.set_style(
            ProgressStyle::default_bar()
                .template("{prefix:>9} [{bar:40.yellow/cyan}] {msg}")
                .unwrap_or_else(|_| ProgressStyle::default_bar())
                .progress_chars("█▌ "),
        );
        waveform_bar.set_prefix("waveform");

        let spectrum_bar = multi.add(ProgressBar::new(1));
        spectrum_bar.set_style(
            ProgressStyle::default_spinner()
                .template("{prefix:>9} |{msg}")
                .unwrap_or_else(|_| ProgressStyle::default_spinner()),
        );
        spectrum_bar.set_prefix("spectrum");

        Self {
            display,
            waveform_bar,
            spectrum_bar,
            _multi: multi,
            labels: Vec::new(),
            rms: 0.0,
            bands: String::new(),
        }
    }
}

impl Renderer for TerminalRenderer {
    fn draw_waveform(&mut self, _xs: &[f64], ys: &[f64]) {
        let loudest = ys.iter().fold(0.0f64, |acc, &y| acc.max(y.abs()));
        let shown = self.display.clamp_waveform(loudest).max(0.0);
        self.waveform_bar.set_position(shown as u64);
    }

    fn draw_spectrum(&mut self, xs: &[f64], ys: &[f64]) {
        self.bands = band_summary(xs, ys, &self.display);
    }

    fn overlay_waveform(&mut self, _xs: &[f64], ys: &[f64]) {
        self.rms = ys.first().copied().unwrap_or(0.0);
    }

    fn annotate(&mut self, label: &str) {
        self.labels.push(label.to_string());
    }

    fn present(&mut self) {
        let labels = self.labels.join("  ");
        self.waveform_bar
            .set_message(format!("rms {:>7.1}  {}", self.rms, labels));
        self.spectrum_bar.set_message(format!("{}|", self.bands));
        self.labels.clear();
    }

    fn finish(&mut self) {
        self.waveform_bar.finish_and_clear();
        self.spectrum_bar.finish_and_clear();
    }
}

/// One glyph per band between consecutive axis ticks (the last band runs to
/// the top of the visible range), showing the loudest bin inside it.
/// Negative frequencies are ignored.
pub fn band_summary(xs: &[f64], ys: &[f64], display: &DisplayConfig) -> String {
    let mut edges: Vec<f64> = display.frequency_ticks.iter().map(|(hz, _)| *hz).collect();
    edges.push(display.frequency_range.1);

    edges
        .windows(2)
        .map(|edge| {
            let loudest = xs
                .iter()
                .zip(ys.iter())
                .filter(|(&hz, _)| hz >= edge[0] && hz < edge[1])
                .map(|(_, &db)| db)
                .fold(None, |acc: Option<f64>, db| Some(acc.map_or(db, |a| a.max(db))));
            match loudest {
                Some(db) => {
                    let level = display.spectrum_level(db);
                    LEVEL_GLYPHS[(level * (LEVEL_GLYPHS.len() - 1) as f64).round() as usize]
                }
                None => ' ',
            }
        })
        .collect()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn band_summary_has_one_glyph_per_band() {
        let display = DisplayConfig::default();
        let summary = band_summary(&[], &[], &display);
        assert_eq!(summary.chars().count(), display.frequency_ticks.len());
        assert!(summary.chars().all(|c| c == ' '));
    }

    #[test]
    fn band_summary_marks_loud_band() {
        let display = DisplayConfig::default();
        let xs = [-1000.0, 100.0, 1500.0, 1600.0];
        let ys = [100.0, -20.0, 10.0, 100.0];
        let summary: Vec<char> = band_summary(&xs, &ys, &display).chars().collect();

        // 62..125 Hz holds the quiet bin, 1k..2k the loud one
        assert_eq!(summary[2], ' ');
        assert_eq!(summary[6], '█');
        assert_eq!(summary[0], ' ');
    }

    #[test]
    fn renderer_draws_without_a_terminal() {
        let mut renderer =
            TerminalRenderer::with_target(DisplayConfig::default(), ProgressDrawTarget::hidden());
        renderer.draw_waveform(&[0.0, 1.0], &[9000.0, -100.0]);
        renderer.overlay_waveform(&[0.0, 1.0], &[500.0, 500.0]);
        renderer.draw_spectrum(&[0.0, 1000.0], &[0.0, 50.0]);
        renderer.annotate("RMS:54dB");
        renderer.present();

        assert_eq!(renderer.waveform_bar.position(), 5000);
        assert!(renderer.labels.is_empty());
        renderer.finish();
    }
}
