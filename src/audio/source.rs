//! Microphone capture.
//!
//! cpal delivers audio on its own callback thread in whatever block size the
//! backend likes. The callback regroups the first channel into fixed-size
//! 16-bit frames and hands them to the pipeline through a short bounded
//! queue. When the pipeline falls behind, the oldest queued frame is thrown
//! away to make room, so reads always return recent audio.

use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;
use std::time::Duration;

use anyhow::Result;
use cpal::traits::{DeviceTrait, HostTrait, StreamTrait};
use cpal::{Device, SampleFormat, SizedSample, StreamConfig, SupportedStreamConfig};
use crossbeam_channel::{bounded, Receiver, RecvTimeoutError, Sender, TrySendError};

use super::decode::encode_frame;
use crate::error::PipelineError;

/// Frames buffered between the device callback and the pipeline.
const FRAME_QUEUE_DEPTH: usize = 2;

/// How often a blocked read re-checks whether the stream has failed.
const READ_POLL_INTERVAL: Duration = Duration::from_millis(100);

/// Blocking source of fixed-size raw frames.
pub trait AudioSource {
    fn sample_rate(&self) -> u32;

    /// Samples per frame; every successful `read` returns twice this many bytes.
    fn frame_size(&self) -> usize;

    /// Block until one whole frame is available.
    fn read(&mut self) -> Result<Vec<u8>, PipelineError>;

    /// Release the device. Later reads fail with `StreamClosed`.
    fn close(&mut self);
}

#[derive(Debug, Clone)]
pub struct CaptureConfig {
    pub sample_rate: u32,
    pub frame_size: usize,
    /// Input device name; `None` picks the host default
    pub device: Option<String>,
}

/// Information about an available audio input device
#[derive(Debug)]
pub struct AudioDeviceInfo {
    pub name: String,
    pub is_default: bool,
    pub supported_sample_rates: Vec<(u32, u32)>,
    pub max_channels: u16,
}

pub struct Microphone {
    device_name: String,
    sample_rate: u32,
    frame_size: usize,
    stream: Option<cpal::Stream>,
    frames: Receiver<Vec<u8>>,
    failed: Arc<AtomicBool>,
}

impl Microphone {
    /// Open the input device and start capturing.
    pub fn open(config: &CaptureConfig) -> Result<Self, PipelineError> {
        if config.frame_size == 0 {
            return Err(PipelineError::InvalidFrameLength { len: 0 });
        }

        let host = cpal::default_host();
        let device = match &config.device {
            Some(name) => find_device(&host, name)?,
            None => host
                .default_input_device()
                .ok_or_else(|| PipelineError::device_unavailable("no default input device"))?,
        };
        let device_name = device.name().unwrap_or_else(|_| "Unknown Device".to_string());

        let supported = find_config(&device, config.sample_rate)?;
        let sample_format = supported.sample_format();
        let stream_config: StreamConfig = supported.into();

        log::info!(
            "Opening input '{}': {}Hz, {} channel(s), {:?}, frame={} samples",
            device_name,
            stream_config.sample_rate.0,
            stream_config.channels,
            sample_format,
            config.frame_size
        );

        let (tx, rx) = bounded(FRAME_QUEUE_DEPTH);
        let failed = Arc::new(AtomicBool::new(false));
        let sink = FrameSink {
            tx,
            drain: rx.clone(),
        };
        let assembler = FrameAssembler::new(config.frame_size, stream_config.channels as usize);

        let stream = match sample_format {
            SampleFormat::I16 => {
                build_stream::<i16>(&device, &stream_config, assembler, sink, failed.clone())
            }
            SampleFormat::U16 => {
                build_stream::<u16>(&device, &stream_config, assembler, sink, failed.clone())
            }
            SampleFormat::I32 => {
                build_stream::<i32>(&device, &stream_config, assembler, sink, failed.clone())
            }
            SampleFormat::F32 => {
                build_stream::<f32>(&device, &stream_config, assembler, sink, failed.clone())
            }
            other => Err(PipelineError::device_unavailable(format!(
                "unsupported sample format {:?}",
                other
            ))),
        }?;

        stream
            .play()
            .map_err(|e| PipelineError::device_unavailable(e.to_string()))?;

        Ok(Self {
            device_name,
            sample_rate: config.sample_rate,
            frame_size: config.frame_size,
            stream: Some(stream),
            frames: rx,
            failed,
        })
    }

    pub fn device_name(&self) -> &str {
        &self.device_name
    }

    /// List all available audio input devices
    pub fn list_devices() -> Result<Vec<AudioDeviceInfo>> {
        let host = cpal::default_host();
        let devices = host.input_devices()?;
        let default_name = host.default_input_device().and_then(|d| d.name().ok());

        let mut device_infos = Vec::new();

        for device in devices {
            let name = device.name().unwrap_or("Unknown Device".to_string());
            let is_default = default_name.as_deref() == Some(name.as_str());

            let mut supported_sample_rates = Vec::new();
            let mut max_channels = 0;
            for range in device.supported_input_configs()? {
                supported_sample_rates.push((range.min_sample_rate().0, range.max_sample_rate().0));
                max_channels = max_channels.max(range.channels());
            }
            supported_sample_rates.sort_unstable();
            supported_sample_rates.dedup();

            device_infos.push(AudioDeviceInfo {
                name,
                is_default,
                supported_sample_rates,
                max_channels,
            });
        }

        Ok(device_infos)
    }
}

impl AudioSource for Microphone {
    fn sample_rate(&self) -> u32 {
        self.sample_rate
    }

    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn read(&mut self) -> Result<Vec<u8>, PipelineError> {
        loop {
            if self.stream.is_none() || self.failed.load(Ordering::Acquire) {
                return Err(PipelineError::StreamClosed);
            }
            match self.frames.recv_timeout(READ_POLL_INTERVAL) {
                Ok(frame) => return Ok(frame),
                Err(RecvTimeoutError::Timeout) => continue,
                Err(RecvTimeoutError::Disconnected) => return Err(PipelineError::StreamClosed),
            }
        }
    }

    fn close(&mut self) {
        if let Some(stream) = self.stream.take() {
            if let Err(err) = stream.pause() {
                log::debug!("Pausing input stream failed: {}", err);
            }
            drop(stream);
            log::info!("Closed input '{}'", self.device_name);
        }
    }
}

impl Drop for Microphone {
    fn drop(&mut self) {
        self.close();
    }
}

fn find_device(host: &cpal::Host, name: &str) -> Result<Device, PipelineError> {
    let devices = host
        .input_devices()
        .map_err(|e| PipelineError::device_unavailable(e.to_string()))?;
    for device in devices {
        if device.name().map(|n| n == name).unwrap_or(false) {
            return Ok(device);
        }
    }
    Err(PipelineError::device_unavailable(format!(
        "no input device named '{}'",
        name
    )))
}

/// Pick a config that runs at exactly `sample_rate`, preferring mono and
/// native 16-bit samples.
fn find_config(device: &Device, sample_rate: u32) -> Result<SupportedStreamConfig, PipelineError> {
    let rate = cpal::SampleRate(sample_rate);
    let supported = device
        .supported_input_configs()
        .map_err(|e| PipelineError::device_unavailable(e.to_string()))?;

    let mut candidates: Vec<_> = supported
        .filter(|c| c.min_sample_rate() <= rate && rate <= c.max_sample_rate())
        .collect();
    candidates.sort_by_key(|c| {
        (
            c.channels() != 1,
            c.sample_format() != SampleFormat::I16,
            c.channels(),
        )
    });

    candidates
        .into_iter()
        .next()
        .map(|c| c.with_sample_rate(rate))
        .ok_or_else(|| {
            PipelineError::device_unavailable(format!("{}Hz capture not supported", sample_rate))
        })
}

fn build_stream<T>(
    device: &Device,
    config: &StreamConfig,
    mut assembler: FrameAssembler,
    sink: FrameSink,
    failed: Arc<AtomicBool>,
) -> Result<cpal::Stream, PipelineError>
where
    T: SizedSample + Send + 'static,
    i16: cpal::FromSample<T>,
{
    device
        .build_input_stream(
            config,
            move |data: &[T], _: &cpal::InputCallbackInfo| {
                assembler.push(data, |frame| sink.push(frame));
            },
            move |err| {
                log::error!("Audio input stream error: {}", err);
                failed.store(true, Ordering::Release);
            },
            None,
        )
        .map_err(|e| PipelineError::device_unavailable(e.to_string()))
}

/// Regroups interleaved device blocks into fixed-size mono frames.
struct FrameAssembler {
    frame_size: usize,
    channels: usize,
    pending: Vec<i16>,
}

impl FrameAssembler {
    fn new(frame_size: usize, channels: usize) -> Self {
        Self {
            frame_size,
            channels: channels.max(1),
            pending: Vec::with_capacity(frame_size),
        }
    }

    fn push<T>(&mut self, data: &[T], mut emit: impl FnMut(Vec<u8>))
    where
        T: cpal::Sample,
        i16: cpal::FromSample<T>,
    {
        for interleaved in data.chunks(self.channels) {
            self.pending
                .push(<i16 as cpal::Sample>::from_sample(interleaved[0]));
            if self.pending.len() == self.frame_size {
                emit(encode_frame(&self.pending));
                self.pending.clear();
            }
        }
    }
}

/// Producer half of the frame queue. Full queue means drop the oldest.
struct FrameSink {
    tx: Sender<Vec<u8>>,
    drain: Receiver<Vec<u8>>,
}

impl FrameSink {
    fn push(&self, frame: Vec<u8>) {
        let mut frame = frame;
        loop {
            match self.tx.try_send(frame) {
                Ok(()) => return,
                Err(TrySendError::Full(rejected)) => {
                    let _ = self.drain.try_recv();
                    frame = rejected;
                }
                Err(TrySendError::Disconnected(_)) => return,
            }
        }
    }
}

/// In-memory source that replays a fixed list of frames.
#[cfg(test)]
pub(crate) struct ScriptedSource {
    pub frames: std::collections::VecDeque<Vec<i16>>,
    pub frame_size: usize,
    pub closed: bool,
}

#[cfg(test)]
impl ScriptedSource {
    pub fn new(frames: Vec<Vec<i16>>) -> Self {
        let frame_size = frames.first().map(|f| f.len()).unwrap_or(0);
        Self {
            frames: frames.into(),
            frame_size,
            closed: false,
        }
    }
}

#[cfg(test)]
impl AudioSource for ScriptedSource {
    fn sample_rate(&self) -> u32 {
        44100
    }

    fn frame_size(&self) -> usize {
        self.frame_size
    }

    fn read(&mut self) -> Result<Vec<u8>, PipelineError> {
        if self.closed {
            return Err(PipelineError::StreamClosed);
        }
        self.frames
            .pop_front()
            .map(|f| encode_frame(&f))
            .ok_or(PipelineError::StreamClosed)
    }

    fn close(&mut self) {
        self.closed = true;
    }
}
