// Engine errors
//
// None of these escape the public transport operations: start()/test_click()
// turn them into a boolean and a log line. They exist so the internal seams
// (contexts, timing sources, export) can propagate with `?`.

use thiserror::Error;

#[derive(Debug, Error)]
pub enum EngineError {
    #[error("No audio output device available")]
    NoOutputDevice,

    #[error("Audio device configuration failed: {0}")]
    DeviceConfig(String),

    #[error("Audio stream error: {0}")]
    Stream(String),

    #[error("Audio context activation failed: {0}")]
    Activation(String),

    #[error("Audio context is closed")]
    ContextClosed,

    #[error("Render queue full, click at {0:.3}s dropped")]
    RenderQueueFull(f64),

    #[error("Timing source failed to start: {0}")]
    TimingSource(String),

    #[error("Unknown sound profile: {0}")]
    UnknownProfile(String),

    #[error("Invalid render duration: {0}s")]
    InvalidDuration(f64),

    #[error("WAV export error: {0}")]
    Export(#[from] hound::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

pub type EngineResult<T> = Result<T, EngineError>;
