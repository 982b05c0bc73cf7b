// Audio - render contexts (CPAL real-time output, offline) and the audio clock

pub mod context;
pub mod device;
pub mod dsp_utils;
pub mod export;
pub mod offline;
pub mod output;
pub mod parameters;
pub mod timing;

pub use context::{AudioContext, ContextProvider, ContextState, RenderTarget};
pub use offline::{OfflineContext, OfflineProvider};
pub use output::CpalProvider;
