use thiserror::Error;

/// Everything that can stop the capture/analysis pipeline.
///
/// None of these are retried: a missing or vanished microphone ends the
/// session, and the frame errors only show up when frame size and sample
/// width disagree.
#[derive(Error, Debug)]
pub enum PipelineError {
    /// No input device, or the device cannot deliver the requested format.
    #[error("Audio input device unavailable: {reason}")]
    DeviceUnavailable { reason: String },

    /// The stream was closed (or failed) while a read was pending.
    #[error("Audio stream closed")]
    StreamClosed,

    /// Raw frame with an odd number of bytes.
    #[error("Malformed frame: {len} bytes is not a whole number of 16-bit samples")]
    MalformedFrame { len: usize },

    #[error("Invalid frame length: {len}")]
    InvalidFrameLength { len: usize },
}

impl PipelineError {
    pub fn device_unavailable(reason: impl Into<String>) -> Self {
        Self::DeviceUnavailable {
            reason: reason.into(),
        }
    }
}
