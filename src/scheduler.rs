//! Fixed-period driver for the read → decode → analyze → render cycle.
//!
//! At most one tick is ever in flight. A timer firing that lands while a tick
//! is active is dropped, never queued, so a slow render or a long blocking
//! read costs frames instead of building a backlog.

use std::sync::atomic::{AtomicU8, Ordering};
use std::sync::Arc;
use std::thread;
use std::time::{Duration, Instant};

use crate::audio::decode::decode_frame;
use crate::audio::features::TickOutput;
use crate::audio::level;
use crate::audio::source::AudioSource;
use crate::audio::spectrum::SpectrumEngine;
use crate::error::PipelineError;
use crate::render::{render_tick, Renderer};

const IDLE: u8 = 0;
const ACTIVE: u8 = 1;
const STOPPED: u8 = 2;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum SchedulerState {
    Idle,
    Active,
    Stopped,
}

/// Shared single-slot gate guarding the active tick. Cloning shares the
/// state, so a clone doubles as the stop handle (e.g. for Ctrl-C).
#[derive(Debug, Clone, Default)]
pub struct TickGate {
    state: Arc<AtomicU8>,
}

impl TickGate {
    pub fn state(&self) -> SchedulerState {
        match self.state.load(Ordering::Acquire) {
            IDLE => SchedulerState::Idle,
            ACTIVE => SchedulerState::Active,
            _ => SchedulerState::Stopped,
        }
    }

    /// Idle → Active. Fails while a tick is active or after stop.
    pub fn try_begin(&self) -> bool {
        self.state
            .compare_exchange(IDLE, ACTIVE, Ordering::AcqRel, Ordering::Acquire)
            .is_ok()
    }

    /// Active → Idle. A stop issued mid-tick wins.
    pub fn end(&self) {
        let _ = self
            .state
            .compare_exchange(ACTIVE, IDLE, Ordering::AcqRel, Ordering::Acquire);
    }

    pub fn stop(&self) {
        self.state.store(STOPPED, Ordering::Release);
    }
}

#[derive(Debug, Clone)]
pub struct SchedulerConfig {
    pub period: Duration,
    /// Stop after this many completed ticks
    pub max_ticks: Option<u64>,
}

#[derive(Debug, Clone, Copy, Default, PartialEq, Eq)]
pub struct SchedulerReport {
    pub ticks: u64,
    /// Timer firings that landed on an active tick
    pub dropped: u64,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum TickOutcome {
    Ran,
    Dropped,
    Stopped,
}

pub struct UpdateScheduler<S: AudioSource, R: Renderer> {
    source: S,
    renderer: R,
    engine: SpectrumEngine,
    config: SchedulerConfig,
    gate: TickGate,
    report: SchedulerReport,
    shut_down: bool,
}

impl<S: AudioSource, R: Renderer> UpdateScheduler<S, R> {
    pub fn new(source: S, renderer: R, engine: SpectrumEngine, config: SchedulerConfig) -> Self {
        Self {
            source,
            renderer,
            engine,
            config,
            gate: TickGate::default(),
            report: SchedulerReport::default(),
            shut_down: false,
        }
    }

    /// Open the source, then build the scheduler. If opening fails nothing
    /// is rendered and no scheduler exists.
    pub fn start<F>(
        open: F,
        renderer: R,
        engine: SpectrumEngine,
        config: SchedulerConfig,
    ) -> Result<Self, PipelineError>
    where
        F: FnOnce() -> Result<S, PipelineError>,
    {
        let source = open()?;
        Ok(Self::new(source, renderer, engine, config))
    }

    pub fn gate(&self) -> TickGate {
        self.gate.clone()
    }

    pub fn state(&self) -> SchedulerState {
        self.gate.state()
    }

    pub fn source(&self) -> &S {
        &self.source
    }

    #[allow(dead_code)]
    pub fn renderer(&self) -> &R {
        &self.renderer
    }

    #[allow(dead_code)]
    pub fn renderer_mut(&mut self) -> &mut R {
        &mut self.renderer
    }

    /// Drive ticks at the configured period until stopped, the tick limit
    /// is reached, or a tick fails. The source is closed on every exit path.
    pub fn run(&mut self) -> Result<SchedulerReport, PipelineError> {
        let period = self.config.period;
        let mut next_fire = Instant::now() + period;

        loop {
            if self.gate.state() == SchedulerState::Stopped {
                break;
            }
            if let Some(max) = self.config.max_ticks {
                if self.report.ticks >= max {
                    log::info!("Tick limit of {} reached", max);
                    break;
                }
            }

            let now = Instant::now();
            if now < next_fire {
                thread::sleep(next_fire - now);
                continue;
            }
            next_fire += period;

            match self.fire() {
                Ok(TickOutcome::Stopped) => break,
                Ok(_) => {}
                Err(err) => {
                    log::error!("Stopping after failed tick: {}", err);
                    self.shutdown();
                    return Err(err);
                }
            }

            // Firings that elapsed during the tick are dropped, not replayed.
            let now = Instant::now();
            while next_fire <= now {
                next_fire += period;
                self.report.dropped += 1;
                log::debug!("Timer fired during active tick, dropped");
            }
        }

        self.shutdown();
        Ok(self.report)
    }

    /// One timer firing: run a tick unless one is already active.
    pub fn fire(&mut self) -> Result<TickOutcome, PipelineError> {
        if !self.gate.try_begin() {
            if self.gate.state() == SchedulerState::Stopped {
                return Ok(TickOutcome::Stopped);
            }
            self.report.dropped += 1;
            return Ok(TickOutcome::Dropped);
        }

        let result = self.tick();
        self.gate.end();
        result?;

        self.report.ticks += 1;
        Ok(TickOutcome::Ran)
    }

    fn tick(&mut self) -> Result<(), PipelineError> {
        let raw = self.source.read()?;
        let samples = decode_frame(&raw)?;
        if samples.len() != self.source.frame_size() {
            return Err(PipelineError::InvalidFrameLength { len: samples.len() });
        }

        let rms = level::measure(&raw)?;
        let (spectrum, peak) = self.engine.analyze(&samples, self.source.sample_rate())?;
        let output = TickOutput::new(&samples, rms, spectrum, peak);

        log::debug!(
            "tick {}: rms={:.1} ({:.1} dB), peak {:.1} dB @ {:.1} Hz",
            self.report.ticks,
            output.rms.linear,
            output.rms.db,
            output.peak.magnitude_db,
            output.peak.frequency
        );

        render_tick(&mut self.renderer, &output);
        Ok(())
    }

    /// Enter Stopped, release the device and let the renderer tear down.
    pub fn shutdown(&mut self) {
        self.gate.stop();
        if self.shut_down {
            return;
        }
        self.shut_down = true;
        self.source.close();
        self.renderer.finish();
        log::info!(
            "Scheduler stopped after {} ticks ({} firings dropped)",
            self.report.ticks,
            self.report.dropped
        );
    }
}
