/// Time-domain view of one frame: x is the sample index, y the raw amplitude.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct WaveformSeries {
    pub xs: Vec<f64>,
    pub ys: Vec<f64>,
}

impl WaveformSeries {
    pub fn from_samples(samples: &[i16]) -> Self {
        Self {
            xs: (0..samples.len()).map(|i| i as f64).collect(),
            ys: samples.iter().map(|&s| s as f64).collect(),
        }
    }

    pub fn len(&self) -> usize {
        self.xs.len()
    }
}

/// Centered spectrum: x in Hz (most negative frequency first), y in dB.
#[derive(Clone, Debug, Default, PartialEq)]
pub struct SpectrumSeries {
    pub frequencies: Vec<f64>,
    pub magnitudes_db: Vec<f64>,
}

impl SpectrumSeries {
    pub fn len(&self) -> usize {
        self.frequencies.len()
    }
}

/// Loudest bin of a [`SpectrumSeries`].
#[derive(Clone, Copy, Debug, PartialEq)]
pub struct PeakAnnotation {
    /// Index into the shifted series
    pub index: usize,
    pub frequency: f64,
    pub magnitude_db: f64,
}

#[derive(Clone, Copy, Debug, Default, PartialEq)]
pub struct RmsLevel {
    /// RMS in raw sample units
    pub linear: f64,
    /// 20*log10(linear), 0 for silence
    pub db: f64,
}

/// Everything a single tick hands to the renderer.
#[derive(Clone, Debug)]
pub struct TickOutput {
    pub waveform: WaveformSeries,
    /// Flat line at the RMS level, same x axis as the waveform
    pub rms_line: Vec<f64>,
    pub spectrum: SpectrumSeries,
    /// Flat line at the peak magnitude, same x axis as the spectrum
    pub peak_line: Vec<f64>,
    pub rms: RmsLevel,
    pub peak: PeakAnnotation,
}

impl TickOutput {
    pub fn new(
        samples: &[i16],
        rms: RmsLevel,
        spectrum: SpectrumSeries,
        peak: PeakAnnotation,
    ) -> Self {
        let waveform = WaveformSeries::from_samples(samples);
        let rms_line = vec![rms.linear; waveform.len()];
        let peak_line = vec![peak.magnitude_db; spectrum.len()];
        Self {
            waveform,
            rms_line,
            spectrum,
            peak_line,
            rms,
            peak,
        }
    }

    /// Axis label for the waveform plot, e.g. `RMS:62dB`.
    pub fn rms_label(&self) -> String {
        format!("RMS:{:.0}dB", self.rms.db)
    }

    /// Axis label for the spectrum plot, e.g. `MAX:74`.
    pub fn peak_label(&self) -> String {
        format!("MAX:{:.0}", self.peak.magnitude_db)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn waveform_indexes_samples() {
        let wave = WaveformSeries::from_samples(&[5, -5, 7]);
        assert_eq!(wave.xs, vec![0.0, 1.0, 2.0]);
        assert_eq!(wave.ys, vec![5.0, -5.0, 7.0]);
    }

    #[test]
    fn tick_output_builds_reference_lines_and_labels() {
        let spectrum = SpectrumSeries {
            frequencies: vec![-2.0, -1.0, 0.0, 1.0],
            magnitudes_db: vec![0.0, 3.0, 74.2, 1.0],
        };
        let peak = PeakAnnotation {
            index: 2,
            frequency: 0.0,
            magnitude_db: 74.2,
        };
        let rms = RmsLevel {
            linear: 1000.0,
            db: 60.0,
        };
        let out = TickOutput::new(&[1000, -1000], rms, spectrum, peak);

        assert_eq!(out.rms_line, vec![1000.0, 1000.0]);
        assert_eq!(out.peak_line.len(), 4);
        assert!(out.peak_line.iter().all(|&v| v == 74.2));
        assert_eq!(out.rms_label(), "RMS:60dB");
        assert_eq!(out.peak_label(), "MAX:74");
    }
}
