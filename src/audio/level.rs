use super::decode::decode_frame;
use super::features::RmsLevel;
use crate::error::PipelineError;

/// RMS of a raw 16-bit little-endian frame, in raw sample units.
pub fn rms(raw: &[u8]) -> Result<f64, PipelineError> {
    Ok(rms_samples(&decode_frame(raw)?))
}

pub fn rms_samples(samples: &[i16]) -> f64 {
    if samples.is_empty() {
        return 0.0;
    }
    let sum_sq: f64 = samples.iter().map(|&s| (s as f64) * (s as f64)).sum();
    (sum_sq / samples.len() as f64).sqrt()
}

/// 20*log10(rms), with silence reported as 0 dB rather than -inf.
pub fn rms_db(rms: f64) -> f64 {
    if rms == 0.0 {
        0.0
    } else {
        20.0 * rms.log10()
    }
}

/// RMS of a raw frame together with its decibel form.
pub fn measure(raw: &[u8]) -> Result<RmsLevel, PipelineError> {
    let linear = rms(raw)?;
    Ok(RmsLevel {
        linear,
        db: rms_db(linear),
    })
}
