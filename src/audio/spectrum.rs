//! Centered magnitude spectrum of a single frame.
//!
//! The transform runs on the raw frame with no window function applied, so
//! the output carries the leakage of a rectangular window. Magnitudes are
//! scaled by a fixed constant, FFT-shifted so 0 Hz sits at index `N / 2`,
//! floored (exact zero becomes 1.0) and converted to decibels.

use std::sync::Arc;

use rustfft::{num_complex::Complex, Fft, FftPlanner, Length};
use serde::Deserialize;

use super::features::{PeakAnnotation, SpectrumSeries};
use crate::error::PipelineError;

/// Normalization applied to raw FFT magnitudes.
#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Deserialize, clap::ValueEnum)]
#[serde(rename_all = "kebab-case")]
pub enum MagnitudeScale {
    /// |X| / N
    #[default]
    PerSample,
    /// 2 |X| / N
    HalfSpectrum,
}

impl MagnitudeScale {
    pub fn factor(self, len: usize) -> f64 {
        match self {
            MagnitudeScale::PerSample => 1.0 / len as f64,
            MagnitudeScale::HalfSpectrum => 2.0 / len as f64,
        }
    }
}

/// Shifted frequency axis for one (length, sample rate) pair.
struct FrequencyAxis {
    len: usize,
    sample_rate: u32,
    shifted: Vec<f64>,
}

pub struct SpectrumEngine {
    scale: MagnitudeScale,
    planner: FftPlanner<f64>,
    plan: Option<Arc<dyn Fft<f64>>>,
    axis: Option<FrequencyAxis>,
}

impl SpectrumEngine {
    pub fn new(scale: MagnitudeScale) -> Self {
        Self {
            scale,
            planner: FftPlanner::new(),
            plan: None,
            axis: None,
        }
    }

    /// Compute the centered decibel spectrum of `samples` and its peak.
    pub fn analyze(
        &mut self,
        samples: &[i16],
        sample_rate: u32,
    ) -> Result<(SpectrumSeries, PeakAnnotation), PipelineError> {
        let magnitudes = self.magnitudes(samples)?;
        let frequencies = self.shifted_axis(samples.len(), sample_rate).to_vec();

        let magnitudes_db: Vec<f64> = fft_shift(&magnitudes)
            .into_iter()
            .map(magnitude_to_db)
            .collect();

        let peak = find_peak(&frequencies, &magnitudes_db);

        Ok((
            SpectrumSeries {
                frequencies,
                magnitudes_db,
            },
            peak,
        ))
    }

    /// Scaled linear magnitudes in natural FFT order (0 Hz first).
    pub fn magnitudes(&mut self, samples: &[i16]) -> Result<Vec<f64>, PipelineError> {
        let len = samples.len();
        if len == 0 {
            return Err(PipelineError::InvalidFrameLength { len });
        }

        let fft = match &self.plan {
            Some(plan) if plan.len() == len => Arc::clone(plan),
            _ => {
                log::debug!("Planning {}-point FFT", len);
                let plan = self.planner.plan_fft_forward(len);
                self.plan = Some(Arc::clone(&plan));
                plan
            }
        };

        let mut buffer: Vec<Complex<f64>> = samples
            .iter()
            .map(|&s| Complex::new(s as f64, 0.0))
            .collect();
        fft.process(&mut buffer);

        let factor = self.scale.factor(len);
        Ok(buffer.iter().map(|c| c.norm() * factor).collect())
    }

    fn shifted_axis(&mut self, len: usize, sample_rate: u32) -> &[f64] {
        let stale = !matches!(
            &self.axis,
            Some(axis) if axis.len == len && axis.sample_rate == sample_rate
        );
        if stale {
            self.axis = Some(FrequencyAxis {
                len,
                sample_rate,
                shifted: fft_shift(&fft_frequencies(len, sample_rate)),
            });
        }
        match &self.axis {
            Some(axis) => axis.shifted.as_slice(),
            None => &[],
        }
    }
}

/// Bin centre frequencies in natural FFT order: `0, 1, .., -2, -1` times
/// `sample_rate / len`, so every value lies in `[-sr/2, sr/2)`.
pub fn fft_frequencies(len: usize, sample_rate: u32) -> Vec<f64> {
    let step = sample_rate as f64 / len as f64;
    let positive = (len + 1) / 2;
    (0..len)
        .map(|k| {
            if k < positive {
                k as f64 * step
            } else {
                (k as f64 - len as f64) * step
            }
        })
        .collect()
}

/// Rotate so index 0 holds the most negative frequency and 0 Hz lands at
/// `len / 2` (floor for odd lengths).
pub fn fft_shift<T: Copy>(values: &[T]) -> Vec<T> {
    let len = values.len();
    let mid = len / 2;
    (0..len).map(|i| values[(i + len - mid) % len]).collect()
}

/// Exact zero is floored to 1.0 (0 dB) before taking the log.
pub fn magnitude_to_db(magnitude: f64) -> f64 {
    let magnitude = if magnitude == 0.0 { 1.0 } else { magnitude };
    20.0 * magnitude.log10()
}

fn find_peak(frequencies: &[f64], magnitudes_db: &[f64]) -> PeakAnnotation {
    let mut peak = PeakAnnotation {
        index: 0,
        frequency: frequencies.first().copied().unwrap_or(0.0),
        magnitude_db: f64::NEG_INFINITY,
    };
    for (index, (&frequency, &magnitude_db)) in
        frequencies.iter().zip(magnitudes_db.iter()).enumerate()
    {
        if magnitude_db > peak.magnitude_db {
            peak = PeakAnnotation {
                index,
                frequency,
                magnitude_db,
            };
        }
    }
    peak
}

#[cfg(test)]
mod tests {
    use super::*;

    const SR: u32 = 44100;

    fn noise(len: usize) -> Vec<i16> {
        let mut state: u32 = 0x1234_5678;
        (0..len)
            .map(|_| {
                state = state.wrapping_mul(1_664_525).wrapping_add(1_013_904_223);
                (state >> 16) as i16
            })
            .collect()
    }

    #[test]
    fn silence_floors_to_zero_db() {
        let mut engine = SpectrumEngine::new(MagnitudeScale::PerSample);
        let (spectrum, peak) = engine.analyze(&[0; 8], SR).unwrap();

        assert_eq!(spectrum.len(), 8);
        assert!(spectrum.magnitudes_db.iter().all(|&db| db == 0.0));
        assert_eq!(peak.magnitude_db, 0.0);
        assert_eq!(peak.index, 0);
    }

    #[test]
    fn nyquist_signal_peaks_at_half_sample_rate() {
        let mut engine = SpectrumEngine::new(MagnitudeScale::PerSample);
        let (spectrum, peak) = engine.analyze(&[1000, -1000, 1000, -1000], SR).unwrap();

        assert_eq!(spectrum.frequencies, vec![-22050.0, -11025.0, 0.0, 11025.0]);
        assert_eq!(peak.frequency.abs(), SR as f64 / 2.0);
        assert!((peak.magnitude_db - 60.0).abs() < 1e-9);
    }

    #[test]
    fn half_spectrum_scale_adds_six_db() {
        let mut per_sample = SpectrumEngine::new(MagnitudeScale::PerSample);
        let mut half = SpectrumEngine::new(MagnitudeScale::HalfSpectrum);
        let frame = [1000, -1000, 1000, -1000];

        let (_, a) = per_sample.analyze(&frame, SR).unwrap();
        let (_, b) = half.analyze(&frame, SR).unwrap();
        assert!((b.magnitude_db - a.magnitude_db - 20.0 * 2f64.log10()).abs() < 1e-9);
    }

    #[test]
    fn even_axis_is_symmetric_around_zero() {
        let len = 16;
        let freqs = fft_shift(&fft_frequencies(len, SR));
        let mid = len / 2;

        assert_eq!(freqs[mid], 0.0);
        assert_eq!(freqs[0], -(SR as f64) / 2.0);
        for k in 1..mid {
            assert_eq!(freqs[mid - k], -freqs[mid + k]);
        }
        assert!(freqs.windows(2).all(|w| w[0] < w[1]));
    }

    #[test]
    fn odd_length_uses_floor_midpoint() {
        let freqs = fft_shift(&fft_frequencies(5, 5));
        assert_eq!(freqs, vec![-2.0, -1.0, 0.0, 1.0, 2.0]);

        let mut engine = SpectrumEngine::new(MagnitudeScale::PerSample);
        let (spectrum, _) = engine.analyze(&[1, 2, 3, 4, 5], 5).unwrap();
        assert_eq!(spectrum.frequencies[2], 0.0);
    }

    #[test]
    fn shifted_values_are_rotation_of_unshifted() {
        let mut engine = SpectrumEngine::new(MagnitudeScale::PerSample);
        let frame = noise(64);
        let raw = engine.magnitudes(&frame).unwrap();
        let (spectrum, _) = engine.analyze(&frame, SR).unwrap();

        for (i, &db) in spectrum.magnitudes_db.iter().enumerate() {
            let source = raw[(i + 32) % 64];
            assert!((db - magnitude_to_db(source)).abs() < 1e-9);
        }
    }

    #[test]
    fn peak_matches_series_maximum() {
        let mut engine = SpectrumEngine::new(MagnitudeScale::PerSample);
        let (spectrum, peak) = engine.analyze(&noise(256), SR).unwrap();

        let max = spectrum
            .magnitudes_db
            .iter()
            .copied()
            .fold(f64::NEG_INFINITY, f64::max);
        assert_eq!(peak.magnitude_db, max);
        assert_eq!(spectrum.magnitudes_db[peak.index], max);
        assert_eq!(spectrum.frequencies[peak.index], peak.frequency);
    }

    #[test]
    fn sine_peaks_at_its_bin() {
        let len = 64;
        let bin = 8;
        let frame: Vec<i16> = (0..len)
            .map(|n| {
                let phase = 2.0 * std::f64::consts::PI * bin as f64 * n as f64 / len as f64;
                (phase.sin() * 10_000.0).round() as i16
            })
            .collect();

        let mut engine = SpectrumEngine::new(MagnitudeScale::PerSample);
        let (_, peak) = engine.analyze(&frame, SR).unwrap();
        assert_eq!(peak.frequency.abs(), bin as f64 * SR as f64 / len as f64);
    }

    #[test]
    fn zero_length_frame_is_rejected() {
        let mut engine = SpectrumEngine::new(MagnitudeScale::PerSample);
        let err = engine.analyze(&[], SR).unwrap_err();
        assert!(matches!(err, PipelineError::InvalidFrameLength { len: 0 }));
    }

    #[test]
    fn engine_replans_when_frame_length_changes() {
        let mut engine = SpectrumEngine::new(MagnitudeScale::PerSample);
        let (a, _) = engine.analyze(&[0; 8], SR).unwrap();
        let (b, _) = engine.analyze(&[0; 4], SR).unwrap();
        assert_eq!(a.len(), 8);
        assert_eq!(b.len(), 4);
        assert_eq!(b.frequencies[0], -22050.0);
    }

    #[test]
    fn zero_magnitude_never_becomes_infinite() {
        assert_eq!(magnitude_to_db(0.0), 0.0);
        assert_eq!(magnitude_to_db(1.0), 0.0);
        assert!((magnitude_to_db(1000.0) - 60.0).abs() < 1e-12);
    }
}
