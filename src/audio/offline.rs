// Offline render context - manually advanced audio clock
//
// Drives the same ClickRenderer as the real-time output, but the clock only
// moves when the caller advances it. Used for WAV export and for exercising
// the scheduler deterministically. The handle is cheap to clone; all clones
// share one context.

use super::context::{AudioContext, ContextProvider, ContextState, RenderTarget};
use crate::error::{EngineError, EngineResult};
use crate::synth::renderer::ClickRenderer;
use crate::synth::voice::ClickSpec;
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::{Arc, Mutex, MutexGuard};

const RENDER_BLOCK: usize = 512;

struct OfflineState {
    sample_rate: f32,
    frame: u64,
    state: ContextState,
    /// State a (re)opened context starts in
    initial_state: ContextState,
    resumable: bool,
    output_latency: Option<f64>,
    renderer: ClickRenderer,
    submitted: Vec<ClickSpec>,
    record_output: bool,
    output: Vec<f32>,
    reject_submissions: bool,
}

#[derive(Clone)]
pub struct OfflineContext {
    inner: Arc<Mutex<OfflineState>>,
}

impl OfflineContext {
    /// Running context at `sample_rate`
    pub fn new(sample_rate: f32) -> Self {
        Self {
            inner: Arc::new(Mutex::new(OfflineState {
                sample_rate,
                frame: 0,
                state: ContextState::Running,
                initial_state: ContextState::Running,
                resumable: true,
                output_latency: None,
                renderer: ClickRenderer::new(sample_rate),
                submitted: Vec::new(),
                record_output: false,
                output: Vec::new(),
                reject_submissions: false,
            })),
        }
    }

    /// Start suspended, like an output that needs an activation step.
    /// With `resumable == false` the activation always fails.
    pub fn suspended(self, resumable: bool) -> Self {
        {
            let mut inner = self.lock();
            inner.state = ContextState::Suspended;
            inner.initial_state = ContextState::Suspended;
            inner.resumable = resumable;
        }
        self
    }

    pub fn with_output_latency(self, latency: f64) -> Self {
        self.set_output_latency(Some(latency));
        self
    }

    /// Keep rendered audio so it can be collected with `take_output`
    pub fn recording(self) -> Self {
        self.lock().record_output = true;
        self
    }

    fn lock(&self) -> MutexGuard<'_, OfflineState> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    pub fn set_output_latency(&self, latency: Option<f64>) {
        self.lock().output_latency = latency;
    }

    /// Make every submission fail, as if the renderer were saturated
    pub fn set_rejecting(&self, reject: bool) {
        self.lock().reject_submissions = reject;
    }

    pub fn current_frame(&self) -> u64 {
        self.lock().frame
    }

    /// Render `seconds` of audio and move the clock forward
    pub fn advance(&self, seconds: f64) {
        let frames = {
            let inner = self.lock();
            (seconds.max(0.0) * inner.sample_rate as f64).round() as u64
        };
        self.advance_frames(frames);
    }

    pub fn advance_frames(&self, frames: u64) {
        let mut inner = self.lock();
        if inner.state != ContextState::Running {
            return;
        }

        let mut block = [0.0f32; RENDER_BLOCK];
        let mut remaining = frames;
        while remaining > 0 {
            let len = remaining.min(RENDER_BLOCK as u64) as usize;
            let start = inner.frame;
            inner.renderer.render(&mut block[..len], start);
            if inner.record_output {
                inner.output.extend_from_slice(&block[..len]);
            }
            inner.frame += len as u64;
            remaining -= len as u64;
        }
    }

    /// Every click handed to this context, in submission order
    pub fn submitted(&self) -> Vec<ClickSpec> {
        self.lock().submitted.clone()
    }

    pub fn clear_submitted(&self) {
        self.lock().submitted.clear();
    }

    pub fn take_output(&self) -> Vec<f32> {
        std::mem::take(&mut self.lock().output)
    }

    pub fn active_voices(&self) -> usize {
        self.lock().renderer.active_voices()
    }

    /// Reopen after close(), back to the initial state
    fn reopen(&self) {
        let mut inner = self.lock();
        if inner.state == ContextState::Closed {
            inner.state = inner.initial_state;
        }
    }
}

impl RenderTarget for OfflineContext {
    fn current_time(&self) -> f64 {
        let inner = self.lock();
        inner.frame as f64 / inner.sample_rate as f64
    }

    fn output_latency(&self) -> Option<f64> {
        self.lock().output_latency
    }

    fn submit(&mut self, click: ClickSpec) -> EngineResult<()> {
        let mut inner = self.lock();
        match inner.state {
            ContextState::Closed => return Err(EngineError::ContextClosed),
            _ if inner.reject_submissions => {
                return Err(EngineError::RenderQueueFull(click.start_time));
            }
            _ => {}
        }
        if !inner.renderer.submit(&click) {
            return Err(EngineError::RenderQueueFull(click.start_time));
        }
        inner.submitted.push(click);
        Ok(())
    }
}

impl AudioContext for OfflineContext {
    fn state(&self) -> ContextState {
        self.lock().state
    }

    fn resume(&mut self) -> EngineResult<()> {
        let mut inner = self.lock();
        match inner.state {
            ContextState::Running => Ok(()),
            ContextState::Closed => Err(EngineError::ContextClosed),
            ContextState::Suspended if inner.resumable => {
                inner.state = ContextState::Running;
                Ok(())
            }
            ContextState::Suspended => Err(EngineError::Activation(
                "offline context is not resumable".to_string(),
            )),
        }
    }

    fn current_time(&self) -> f64 {
        RenderTarget::current_time(self)
    }

    fn sample_rate(&self) -> f32 {
        self.lock().sample_rate
    }

    fn output_latency(&self) -> Option<f64> {
        RenderTarget::output_latency(self)
    }

    fn render_target(&self) -> EngineResult<Box<dyn RenderTarget>> {
        Ok(Box::new(self.clone()))
    }

    fn close(&mut self) {
        let mut inner = self.lock();
        inner.state = ContextState::Closed;
        inner.renderer.clear();
    }
}

/// Hands out one shared OfflineContext, or refuses if `available` is false
#[derive(Clone)]
pub struct OfflineProvider {
    context: OfflineContext,
    available: bool,
    created: Arc<AtomicUsize>,
}

impl OfflineProvider {
    pub fn new(context: OfflineContext) -> Self {
        Self {
            context,
            available: true,
            created: Arc::new(AtomicUsize::new(0)),
        }
    }

    /// A provider whose output can never be acquired
    pub fn unavailable(context: OfflineContext) -> Self {
        Self {
            available: false,
            ..Self::new(context)
        }
    }

    /// Number of contexts created so far
    pub fn created(&self) -> usize {
        self.created.load(Ordering::Relaxed)
    }
}

impl ContextProvider for OfflineProvider {
    fn create(&mut self) -> EngineResult<Box<dyn AudioContext>> {
        if !self.available {
            return Err(EngineError::NoOutputDevice);
        }
        self.context.reopen();
        self.created.fetch_add(1, Ordering::Relaxed);
        Ok(Box::new(self.context.clone()))
    }
}
