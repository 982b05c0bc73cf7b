// Render context seams
//
// AudioContext is the controlling-thread view of an output: lifecycle,
// diagnostics. RenderTarget is the scheduler-side view: the audio clock plus a
// queue into the renderer. It must be Send because the scheduler is driven
// from a timing-source thread, while AudioContext need not be (a cpal Stream
// is not Send on every platform).

use crate::error::EngineResult;
use crate::synth::voice::ClickSpec;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum ContextState {
    /// Created but not pulling audio yet
    Suspended,
    Running,
    /// Closed or failed; a new context must be created
    Closed,
}

pub trait RenderTarget: Send {
    /// Audio clock, seconds
    fn current_time(&self) -> f64;

    /// Measured output latency, if the host reports one
    fn output_latency(&self) -> Option<f64>;

    /// Hand a click to the renderer. The renderer places it at its start time.
    fn submit(&mut self, click: ClickSpec) -> EngineResult<()>;
}

pub trait AudioContext {
    fn state(&self) -> ContextState;

    /// Start pulling audio. Only meaningful from Suspended.
    fn resume(&mut self) -> EngineResult<()>;

    fn current_time(&self) -> f64;

    fn sample_rate(&self) -> f32;

    fn output_latency(&self) -> Option<f64>;

    /// A new scheduler-side handle onto this context
    fn render_target(&self) -> EngineResult<Box<dyn RenderTarget>>;

    /// Release the output. Already submitted clicks are discarded.
    fn close(&mut self);
}

/// Creates the render context on first use
pub trait ContextProvider {
    fn create(&mut self) -> EngineResult<Box<dyn AudioContext>>;
}
