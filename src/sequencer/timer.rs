// Timing sources - periodic wake-ups for the lookahead scheduler
//
// A timing source carries no musical state; it only calls the tick closure.
// Its precision does not matter much, the lookahead window absorbs jitter.

use crate::error::{EngineError, EngineResult};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::mpsc::{self, RecvTimeoutError, Sender};
use std::sync::{Arc, Mutex};
use std::thread::{self, JoinHandle};
use std::time::{Duration, Instant};

pub type TickFn = Box<dyn FnMut() + Send + 'static>;

pub trait TimingSource {
    /// Begin calling `tick` roughly every `period`. Replaces a running tick.
    fn start(&mut self, period: Duration, tick: TickFn) -> EngineResult<()>;

    /// Stop ticking. Returns once no tick is in flight.
    fn stop(&mut self);

    fn is_active(&self) -> bool;

    fn name(&self) -> &'static str;
}

/// Background loop that can be stopped by dropping its sender
struct TimerThread {
    stop_tx: Sender<()>,
    handle: JoinHandle<()>,
}

impl TimerThread {
    /// Call `on_wake` every `wake` until stopped. Deadlines are absolute so a
    /// slow tick does not push every later tick back.
    fn spawn(
        name: &str,
        wake: Duration,
        mut on_wake: impl FnMut() + Send + 'static,
    ) -> EngineResult<Self> {
        let (stop_tx, stop_rx) = mpsc::channel::<()>();

        let handle = thread::Builder::new()
            .name(name.to_string())
            .spawn(move || {
                let mut deadline = Instant::now() + wake;
                loop {
                    let wait = deadline.saturating_duration_since(Instant::now());
                    match stop_rx.recv_timeout(wait) {
                        Err(RecvTimeoutError::Timeout) => {
                            on_wake();
                            deadline += wake;
                            let now = Instant::now();
                            if deadline < now {
                                // Skip missed wake-ups rather than bursting
                                deadline = now + wake;
                            }
                        }
                        _ => break,
                    }
                }
            })
            .map_err(|e| EngineError::TimingSource(e.to_string()))?;

        Ok(Self { stop_tx, handle })
    }

    fn join(self) {
        drop(self.stop_tx);
        if self.handle.join().is_err() {
            log::error!("Timer thread panicked");
        }
    }
}

/// Dedicated timer thread ticking at the lookahead period
#[derive(Default)]
pub struct ThreadTimer {
    thread: Option<TimerThread>,
}

impl ThreadTimer {
    pub fn new() -> Self {
        Self::default()
    }
}

impl TimingSource for ThreadTimer {
    fn start(&mut self, period: Duration, tick: TickFn) -> EngineResult<()> {
        self.stop();
        if period.is_zero() {
            return Err(EngineError::TimingSource(
                "timer period must be non-zero".to_string(),
            ));
        }
        self.thread = Some(TimerThread::spawn("metronome-timer", period, tick)?);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            thread.join();
        }
    }

    fn is_active(&self) -> bool {
        self.thread.is_some()
    }

    fn name(&self) -> &'static str {
        "worker"
    }
}

impl Drop for ThreadTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

/// Display frame period the fallback loop wakes at
pub const FRAME_PERIOD: Duration = Duration::from_micros(16_667);

/// Frame-paced fallback: wakes once per display frame and ticks when at
/// least `period` has passed since the previous tick
pub struct FrameTimer {
    frame: Duration,
    thread: Option<TimerThread>,
}

impl FrameTimer {
    pub fn new() -> Self {
        Self::with_frame_period(FRAME_PERIOD)
    }

    pub fn with_frame_period(frame: Duration) -> Self {
        Self {
            frame: frame.max(Duration::from_millis(1)),
            thread: None,
        }
    }
}

impl Default for FrameTimer {
    fn default() -> Self {
        Self::new()
    }
}

impl TimingSource for FrameTimer {
    fn start(&mut self, period: Duration, mut tick: TickFn) -> EngineResult<()> {
        self.stop();

        let mut last_tick = Instant::now();
        let throttled = move || {
            if last_tick.elapsed() >= period {
                last_tick = Instant::now();
                tick();
            }
        };

        self.thread = Some(TimerThread::spawn("metronome-frame", self.frame, throttled)?);
        Ok(())
    }

    fn stop(&mut self) {
        if let Some(thread) = self.thread.take() {
            thread.join();
        }
    }

    fn is_active(&self) -> bool {
        self.thread.is_some()
    }

    fn name(&self) -> &'static str {
        "frame"
    }
}

impl Drop for FrameTimer {
    fn drop(&mut self) {
        self.stop();
    }
}

#[derive(Default)]
struct ManualState {
    tick: Option<TickFn>,
    period: Option<Duration>,
}

/// Fired by hand. Clones share state, so a test can keep one handle while
/// the engine owns another.
#[derive(Clone, Default)]
pub struct ManualTimer {
    state: Arc<Mutex<ManualState>>,
    starts: Arc<AtomicUsize>,
    fail_start: bool,
}

impl ManualTimer {
    pub fn new() -> Self {
        Self::default()
    }

    /// A source whose start() always fails
    pub fn failing() -> Self {
        Self {
            fail_start: true,
            ..Self::default()
        }
    }

    /// Run one tick if started. Returns whether a tick ran.
    pub fn fire(&self) -> bool {
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        match state.tick.as_mut() {
            Some(tick) => {
                tick();
                true
            }
            None => false,
        }
    }

    /// Period passed to the last start()
    pub fn period(&self) -> Option<Duration> {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).period
    }

    /// Number of successful start() calls
    pub fn starts(&self) -> usize {
        self.starts.load(Ordering::Relaxed)
    }
}

impl TimingSource for ManualTimer {
    fn start(&mut self, period: Duration, tick: TickFn) -> EngineResult<()> {
        if self.fail_start {
            return Err(EngineError::TimingSource(
                "manual timer refused to start".to_string(),
            ));
        }
        let mut state = self.state.lock().unwrap_or_else(|p| p.into_inner());
        state.tick = Some(tick);
        state.period = Some(period);
        self.starts.fetch_add(1, Ordering::Relaxed);
        Ok(())
    }

    fn stop(&mut self) {
        self.state.lock().unwrap_or_else(|p| p.into_inner()).tick = None;
    }

    fn is_active(&self) -> bool {
        self.state
            .lock()
            .unwrap_or_else(|p| p.into_inner())
            .tick
            .is_some()
    }

    fn name(&self) -> &'static str {
        "manual"
    }
}
