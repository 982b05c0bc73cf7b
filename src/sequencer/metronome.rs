// Metronome - transport state machine around the lookahead scheduler
//
// Idle --start()--> Running --stop()--> Idle
//
// start() is guarded by acquiring the render context (created lazily, resumed
// if it comes up suspended) and by starting a timing source. The context is
// reused across stop/start cycles and only released by destroy().

use super::clock::ClockPosition;
use super::observer::{BeatCallbacks, BeatObserver, ObserverId};
use super::scheduler::{LookaheadScheduler, ScheduledEvent};
use super::timer::{FrameTimer, ThreadTimer, TickFn, TimingSource};
use super::transport::{EngineState, SettingsUpdate, TransportConfig};
use crate::audio::context::{AudioContext, ContextProvider, ContextState};
use crate::audio::output::CpalProvider;
use crate::config::{EngineConfig, HostProfile, TimingStrategy, Tuning};
use crate::error::{EngineError, EngineResult};
use crate::synth::click::{ClickSynth, TEST_CLICK_VOLUME};
use crate::synth::profile::SoundProfile;
use serde::Serialize;
use std::sync::{Arc, Mutex, MutexGuard};

/// Diagnostics snapshot
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct TimingInfo {
    pub current_time: f64,
    pub next_event_time: f64,
    pub schedule_ahead: f64,
    pub lookahead_ms: f64,
    pub host_profile: HostProfile,
    pub output_latency: Option<f64>,
    pub sample_rate: f32,
    pub context_state: ContextState,
    pub queue_length: usize,
    /// Name of the timing source currently ticking, if any
    pub timing_source: Option<&'static str>,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum ActiveSource {
    Primary,
    Fallback,
}

pub struct Metronome {
    host: HostProfile,
    tuning: Tuning,
    provider: Box<dyn ContextProvider>,
    context: Option<Box<dyn AudioContext>>,
    scheduler: Arc<Mutex<LookaheadScheduler>>,
    primary: Box<dyn TimingSource>,
    fallback: Box<dyn TimingSource>,
    active_source: Option<ActiveSource>,
    state: EngineState,
}

impl Metronome {
    /// CPAL output, timer thread with frame-paced fallback
    pub fn new(config: EngineConfig) -> Self {
        let provider = Box::new(CpalProvider::from_config(&config));
        let primary: Box<dyn TimingSource> = match config.timing {
            TimingStrategy::Worker => Box::new(ThreadTimer::new()),
            TimingStrategy::Frame => Box::new(FrameTimer::new()),
        };
        Self::with_parts(config, provider, primary, Box::new(FrameTimer::new()))
    }

    pub fn with_parts(
        config: EngineConfig,
        provider: Box<dyn ContextProvider>,
        primary: Box<dyn TimingSource>,
        fallback: Box<dyn TimingSource>,
    ) -> Self {
        let tuning = config.tuning();
        Self {
            host: config.host,
            tuning,
            provider,
            context: None,
            scheduler: Arc::new(Mutex::new(LookaheadScheduler::new(tuning, config.transport))),
            primary,
            fallback,
            active_source: None,
            state: EngineState::Idle,
        }
    }

    fn scheduler(&self) -> MutexGuard<'_, LookaheadScheduler> {
        self.scheduler
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    /// Start clicking with `config`. Returns false if the output could not be
    /// acquired or activated; the engine then stays Idle.
    pub fn start(&mut self, config: TransportConfig, callbacks: BeatCallbacks) -> bool {
        if self.state.is_running() {
            log::debug!("start() ignored, metronome already running");
            return true;
        }

        match self.try_start(config, callbacks) {
            Ok(()) => {
                self.state = EngineState::Running;
                let config = self.config();
                log::info!(
                    "Metronome started: {} bpm, {}/{} subdivisions, {} sound",
                    config.tempo_bpm,
                    config.beats_per_measure,
                    config.subdivision_count,
                    config.sound_profile
                );
                true
            }
            Err(e) => {
                log::error!("Failed to start metronome: {}", e);
                self.scheduler().halt();
                false
            }
        }
    }

    fn try_start(&mut self, config: TransportConfig, callbacks: BeatCallbacks) -> EngineResult<()> {
        self.acquire_context()?;
        self.scheduler().set_config(config);

        // Ticks are no-ops until begin(), so nothing sounds if no timer starts
        self.start_timing()?;
        let begun = self.scheduler().begin(callbacks);
        if begun.is_err() {
            self.stop_timing();
        }
        begun
    }

    /// Make sure a running context is attached to the scheduler
    fn acquire_context(&mut self) -> EngineResult<()> {
        let reusable = self
            .context
            .as_ref()
            .is_some_and(|ctx| ctx.state() != ContextState::Closed);

        if !reusable {
            if self.context.take().is_some() {
                log::warn!("Render context was closed, creating a new one");
            }
            let context = self.provider.create()?;
            log::info!(
                "Render context created ({} Hz, {:?})",
                context.sample_rate(),
                context.state()
            );
            self.scheduler().attach(context.render_target()?);
            self.context = Some(context);
        }

        let context = self.context.as_mut().ok_or(EngineError::ContextClosed)?;
        if context.state() == ContextState::Suspended {
            log::debug!("Resuming suspended render context");
            context.resume()?;
        }

        match context.state() {
            ContextState::Running => Ok(()),
            other => Err(EngineError::Activation(format!(
                "render context is {:?}",
                other
            ))),
        }
    }

    fn tick_fn(&self) -> TickFn {
        let scheduler = Arc::clone(&self.scheduler);
        Box::new(move || {
            scheduler
                .lock()
                .unwrap_or_else(|poisoned| poisoned.into_inner())
                .tick();
        })
    }

    fn start_timing(&mut self) -> EngineResult<()> {
        let tick = self.tick_fn();
        match self.primary.start(self.tuning.lookahead, tick) {
            Ok(()) => {
                self.active_source = Some(ActiveSource::Primary);
                return Ok(());
            }
            Err(e) => {
                log::warn!(
                    "{} timing unavailable ({}), falling back to {} timing",
                    self.primary.name(),
                    e,
                    self.fallback.name()
                );
            }
        }

        let tick = self.tick_fn();
        self.fallback.start(self.tuning.frame_interval, tick)?;
        self.active_source = Some(ActiveSource::Fallback);
        Ok(())
    }

    fn stop_timing(&mut self) {
        // Must not hold the scheduler lock here: stopping waits for the tick
        match self.active_source.take() {
            Some(ActiveSource::Primary) => self.primary.stop(),
            Some(ActiveSource::Fallback) => self.fallback.stop(),
            None => {}
        }
    }

    /// Halt scheduling and clear the event queue. Clicks already handed to
    /// the renderer still sound.
    pub fn stop(&mut self) {
        if !self.state.is_running() {
            return;
        }
        self.stop_timing();
        self.scheduler().halt();
        self.state = EngineState::Idle;
        log::info!("Metronome stopped");
    }

    /// Clamped to 30-300 bpm, applies from the next scheduled click
    pub fn update_tempo(&mut self, bpm: f64) {
        self.scheduler().set_tempo(bpm);
    }

    pub fn update_settings(&mut self, update: SettingsUpdate) {
        if update.is_empty() {
            return;
        }
        self.scheduler().apply_settings(&update);
    }

    pub fn add_observer(&mut self, observer: Box<dyn BeatObserver>) -> ObserverId {
        self.scheduler().add_observer(observer)
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.scheduler().remove_observer(id)
    }

    pub fn state(&self) -> EngineState {
        self.state
    }

    pub fn config(&self) -> TransportConfig {
        self.scheduler().config()
    }

    pub fn host_profile(&self) -> HostProfile {
        self.host
    }

    /// Recently scheduled events, oldest first. Emptied by stop().
    pub fn scheduled_events(&self) -> Vec<ScheduledEvent> {
        self.scheduler().queue().iter().copied().collect()
    }

    /// Musical position of the next click
    pub fn position(&self) -> ClockPosition {
        self.scheduler().position()
    }

    /// None until a render context exists
    pub fn timing_info(&self) -> Option<TimingInfo> {
        let context = self.context.as_ref()?;
        let scheduler = self.scheduler();

        let timing_source = match self.active_source {
            Some(ActiveSource::Primary) => Some(self.primary.name()),
            Some(ActiveSource::Fallback) => Some(self.fallback.name()),
            None => None,
        };

        Some(TimingInfo {
            current_time: context.current_time(),
            next_event_time: scheduler.position().next_event_time,
            schedule_ahead: scheduler.schedule_ahead(),
            lookahead_ms: self.tuning.lookahead.as_secs_f64() * 1000.0,
            host_profile: self.host,
            output_latency: context.output_latency(),
            sample_rate: context.sample_rate(),
            context_state: context.state(),
            queue_length: scheduler.queue().len(),
            timing_source,
        })
    }

    /// Play one accented Classic click right away. Returns whether the output
    /// was usable.
    pub fn test_click(&mut self) -> bool {
        match self.try_test_click() {
            Ok(()) => true,
            Err(e) => {
                log::error!("Test click failed: {}", e);
                false
            }
        }
    }

    fn try_test_click(&mut self) -> EngineResult<()> {
        self.acquire_context()?;
        let context = self.context.as_ref().ok_or(EngineError::ContextClosed)?;

        let click = ClickSynth::new(&self.tuning).build(
            SoundProfile::Classic,
            context.current_time(),
            true,
            TEST_CLICK_VOLUME,
        );
        context.render_target()?.submit(click)
    }

    /// Stop, close the output and release the timing sources. Safe to call
    /// more than once; a later start() opens a new context.
    pub fn destroy(&mut self) {
        self.stop();
        self.primary.stop();
        self.fallback.stop();
        self.scheduler().detach();
        if let Some(mut context) = self.context.take() {
            context.close();
            log::info!("Metronome destroyed, render context closed");
        }
    }
}

impl Drop for Metronome {
    fn drop(&mut self) {
        self.destroy();
    }
}
