// Click synthesis - profiles, voice building blocks and the voice pool

pub mod click;
pub mod envelope;
pub mod filter;
pub mod oscillator;
pub mod profile;
pub mod renderer;
pub mod voice;

pub use click::ClickSynth;
pub use profile::SoundProfile;
pub use renderer::ClickRenderer;
pub use voice::ClickSpec;
