// Metronome Engine - Library exports for the CLI, tests and benchmarks

pub mod audio;
pub mod config;
pub mod error;
pub mod messaging;
pub mod sequencer;
pub mod synth;

// Re-export commonly used types for convenience
pub use audio::export::{ClickTrackExporter, ExportSettings};
pub use audio::{AudioContext, ContextProvider, ContextState, OfflineContext, OfflineProvider};
pub use config::{EngineConfig, HostProfile, TimingStrategy, Tuning};
pub use error::{EngineError, EngineResult};
pub use sequencer::{
    BeatCallbacks, BeatObserver, EngineState, ManualTimer, Metronome, ObserverId, ScheduledEvent,
    SettingsUpdate, TimingInfo, TimingSource, TransportConfig,
};
pub use synth::{ClickSpec, SoundProfile};
