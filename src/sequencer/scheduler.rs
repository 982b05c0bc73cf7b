// Lookahead scheduler
//
// The timing source wakes us every L (imprecise, may be throttled). Each pass
// commits every click that falls inside [now, now + S) on the audio clock, so
// the renderer always holds enough future clicks to ride out a late wake-up.
// Click placement itself is sample accurate because the renderer, not this
// thread, decides when a voice starts.

use super::clock::ClockPosition;
use super::observer::{BeatCallbacks, BeatObserver, ObserverId, ObserverList};
use super::transport::{SettingsUpdate, TransportConfig};
use crate::audio::context::RenderTarget;
use crate::config::Tuning;
use crate::error::{EngineError, EngineResult};
use crate::synth::click::ClickSynth;
use crate::synth::voice::ClickSpec;
use serde::Serialize;
use std::collections::VecDeque;

/// A click committed to the renderer
#[derive(Debug, Clone, Copy, PartialEq, Serialize)]
pub struct ScheduledEvent {
    pub beat_index: u32,
    pub subdivision_index: u32,
    /// Audio-clock time, seconds
    pub timestamp: f64,
    pub is_accent: bool,
}

impl ScheduledEvent {
    pub fn is_main_beat(&self) -> bool {
        self.subdivision_index == 0
    }
}

pub struct LookaheadScheduler {
    config: TransportConfig,
    clock: ClockPosition,
    tuning: Tuning,
    /// Current S, only ever raised by measured latency
    schedule_ahead: f64,
    target: Option<Box<dyn RenderTarget>>,
    /// Recently scheduled events, oldest first
    queue: VecDeque<ScheduledEvent>,
    synth: ClickSynth,
    callbacks: BeatCallbacks,
    observers: ObserverList,
    running: bool,
}

impl LookaheadScheduler {
    pub fn new(tuning: Tuning, config: TransportConfig) -> Self {
        Self {
            config: config.clamped(),
            clock: ClockPosition::default(),
            tuning,
            schedule_ahead: tuning.schedule_ahead,
            target: None,
            queue: VecDeque::new(),
            synth: ClickSynth::new(&tuning),
            callbacks: BeatCallbacks::none(),
            observers: ObserverList::default(),
            running: false,
        }
    }

    /// Route clicks to a (new) render target and re-derive the window
    pub fn attach(&mut self, target: Box<dyn RenderTarget>) {
        self.target = Some(target);
        self.schedule_ahead = self.tuning.schedule_ahead;
        self.refresh_window();
    }

    pub fn detach(&mut self) {
        self.halt();
        self.target = None;
    }

    pub fn is_attached(&self) -> bool {
        self.target.is_some()
    }

    pub fn is_running(&self) -> bool {
        self.running
    }

    pub fn config(&self) -> TransportConfig {
        self.config
    }

    pub fn set_config(&mut self, config: TransportConfig) {
        self.config = config.clamped();
        self.clock.normalize(&self.config);
    }

    /// Picked up by the next advance, the click already queued keeps its time
    pub fn set_tempo(&mut self, bpm: f64) {
        self.config.tempo_bpm = bpm;
        self.config = self.config.clamped();
    }

    pub fn apply_settings(&mut self, update: &SettingsUpdate) {
        self.config.apply(update);
        self.clock.normalize(&self.config);
    }

    pub fn position(&self) -> ClockPosition {
        self.clock
    }

    pub fn schedule_ahead(&self) -> f64 {
        self.schedule_ahead
    }

    pub fn tuning(&self) -> &Tuning {
        &self.tuning
    }

    pub fn queue(&self) -> &VecDeque<ScheduledEvent> {
        &self.queue
    }

    /// Audio clock of the attached target
    pub fn current_time(&self) -> Option<f64> {
        self.target.as_ref().map(|target| target.current_time())
    }

    pub fn add_observer(&mut self, observer: Box<dyn BeatObserver>) -> ObserverId {
        self.observers.add(observer)
    }

    pub fn remove_observer(&mut self, id: ObserverId) -> bool {
        self.observers.remove(id)
    }

    pub fn observer_count(&self) -> usize {
        self.observers.len()
    }

    /// Reset to the first downbeat just after `now` and schedule it right away
    pub fn begin(&mut self, callbacks: BeatCallbacks) -> EngineResult<()> {
        let now = self
            .current_time()
            .ok_or(EngineError::ContextClosed)?;

        self.callbacks = callbacks;
        self.queue.clear();
        self.clock = ClockPosition::at(now + self.tuning.first_event_offset);
        self.running = true;
        self.refresh_window();

        log::debug!(
            "Scheduler started at {:.4}s (L = {:?}, S = {:.3}s)",
            now,
            self.tuning.lookahead,
            self.schedule_ahead
        );

        self.emit(now);
        Ok(())
    }

    /// Stop scheduling and forget queued events. Clicks already handed to the
    /// renderer still play.
    pub fn halt(&mut self) {
        self.running = false;
        self.queue.clear();
        self.callbacks = BeatCallbacks::none();
    }

    /// One scheduling pass
    pub fn tick(&mut self) {
        if !self.running {
            return;
        }
        let Some(now) = self.current_time() else {
            return;
        };

        self.refresh_window();

        let horizon = now + self.schedule_ahead;
        while self.clock.next_event_time < horizon {
            self.emit(now);
        }

        // Expired events must not count against the burst limit
        self.prune(now);

        if let Some(burst) = self.tuning.burst_fill {
            let horizon = now + self.schedule_ahead * burst.window_factor;
            while self.clock.next_event_time < horizon && self.queue.len() < burst.max_queued {
                self.emit(now);
            }
        }
    }

    fn emit(&mut self, now: f64) {
        if self.clock.next_event_time < now {
            // Stalled longer than the window: never schedule into the past
            log::debug!(
                "Scheduler late by {:.1} ms, moving next click to now",
                (now - self.clock.next_event_time) * 1000.0
            );
            self.clock.next_event_time = now;
        }

        let event = ScheduledEvent {
            beat_index: self.clock.beat_index,
            subdivision_index: self.clock.subdivision_index,
            timestamp: self.clock.next_event_time,
            is_accent: self.config.accent_first_beat
                && self.clock.beat_index == 0
                && self.clock.subdivision_index == 0,
        };

        let click = self.synth.synthesize(&event, &self.config);
        self.submit(click);

        self.queue.push_back(event);
        self.callbacks.notify(&event);
        self.observers.notify(&event);

        self.clock.advance(&self.config);
    }

    fn submit(&mut self, click: ClickSpec) {
        let Some(target) = self.target.as_mut() else {
            return;
        };
        match target.submit(click) {
            Ok(()) => {}
            Err(EngineError::RenderQueueFull(time)) => {
                log::warn!("Render queue full, click at {:.3}s dropped", time);
            }
            Err(e) => {
                log::warn!("Click at {:.3}s not scheduled: {}", click.start_time, e);
            }
        }
    }

    fn refresh_window(&mut self) {
        let Some(latency) = self.target.as_ref().and_then(|t| t.output_latency()) else {
            return;
        };
        let window = self.tuning.effective_schedule_ahead(Some(latency));
        if window > self.schedule_ahead {
            log::info!(
                "Schedule-ahead window raised to {:.0} ms (output latency {:.0} ms)",
                window * 1000.0,
                latency * 1000.0
            );
            self.schedule_ahead = window;
        }
    }

    fn prune(&mut self, now: f64) {
        let cutoff = now - self.tuning.queue_retention;
        while self
            .queue
            .front()
            .is_some_and(|event| event.timestamp < cutoff)
        {
            self.queue.pop_front();
        }
    }
}
