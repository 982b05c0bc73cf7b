// Sequencer module
// Musical time, transport state and the lookahead scheduler

pub mod clock;
pub mod metronome;
pub mod observer;
pub mod scheduler;
pub mod timeline;
pub mod timer;
pub mod transport;

pub use clock::ClockPosition;
pub use metronome::{Metronome, TimingInfo};
pub use observer::{BeatCallbacks, BeatObserver, ObserverId};
pub use scheduler::{LookaheadScheduler, ScheduledEvent};
pub use timeline::{Subdivision, Tempo, TimeSignature};
pub use timer::{FrameTimer, ManualTimer, ThreadTimer, TimingSource};
pub use transport::{EngineState, SettingsUpdate, TransportConfig};
