// Transport - engine state and the live click settings
//
// TransportConfig is read by the scheduler on every pass, so edits take effect
// on the next scheduled click. SettingsUpdate carries a partial edit: only the
// fields that are Some are merged.

use super::timeline::Tempo;
use crate::synth::profile::SoundProfile;
use serde::{Deserialize, Serialize};

pub const MAX_BEATS_PER_MEASURE: u32 = 16;
pub const MAX_SUBDIVISIONS: u32 = 16;

/// Engine lifecycle. Pausing is stop + remembering the position, done by
/// the caller.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
pub enum EngineState {
    #[default]
    Idle,
    Running,
}

impl EngineState {
    pub fn is_running(&self) -> bool {
        matches!(self, EngineState::Running)
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct TransportConfig {
    pub tempo_bpm: f64,
    pub beats_per_measure: u32,
    pub accent_first_beat: bool,
    pub subdivision_count: u32,
    pub main_volume: f32,
    pub subdivision_volume: f32,
    pub sound_profile: SoundProfile,
}

impl Default for TransportConfig {
    fn default() -> Self {
        Self {
            tempo_bpm: Tempo::DEFAULT_BPM,
            beats_per_measure: 4,
            accent_first_beat: true,
            subdivision_count: 1,
            main_volume: 0.7,
            subdivision_volume: 0.5,
            sound_profile: SoundProfile::Classic,
        }
    }
}

fn clamp_volume(volume: f32) -> f32 {
    if volume.is_nan() {
        0.0
    } else {
        volume.clamp(0.0, 1.0)
    }
}

impl TransportConfig {
    /// Copy with every field forced into its supported range
    pub fn clamped(self) -> Self {
        Self {
            tempo_bpm: Tempo::clamp_bpm(self.tempo_bpm),
            beats_per_measure: self.beats_per_measure.clamp(1, MAX_BEATS_PER_MEASURE),
            subdivision_count: self.subdivision_count.clamp(1, MAX_SUBDIVISIONS),
            main_volume: clamp_volume(self.main_volume),
            subdivision_volume: clamp_volume(self.subdivision_volume),
            ..self
        }
    }

    pub fn tempo(&self) -> Tempo {
        Tempo::new(self.tempo_bpm)
    }

    /// Seconds between two consecutive clicks
    pub fn seconds_per_subdivision(&self) -> f64 {
        self.tempo().subdivision_duration_seconds(self.subdivision_count)
    }

    /// Merge the fields present in `update`
    pub fn apply(&mut self, update: &SettingsUpdate) {
        if let Some(beats) = update.beats_per_measure {
            self.beats_per_measure = beats;
        }
        if let Some(accent) = update.accent_first_beat {
            self.accent_first_beat = accent;
        }
        if let Some(profile) = update.sound_profile {
            self.sound_profile = profile;
        }
        if let Some(volume) = update.main_volume {
            self.main_volume = volume;
        }
        if let Some(count) = update.subdivision_count {
            self.subdivision_count = count;
        }
        if let Some(volume) = update.subdivision_volume {
            self.subdivision_volume = volume;
        }
        *self = self.clamped();
    }
}

/// Partial settings edit, tempo excluded (see `Metronome::update_tempo`)
#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize, Deserialize)]
#[serde(default)]
pub struct SettingsUpdate {
    pub beats_per_measure: Option<u32>,
    pub accent_first_beat: Option<bool>,
    pub sound_profile: Option<SoundProfile>,
    pub main_volume: Option<f32>,
    pub subdivision_count: Option<u32>,
    pub subdivision_volume: Option<f32>,
}

impl SettingsUpdate {
    pub fn is_empty(&self) -> bool {
        *self == Self::default()
    }

    pub fn beats_per_measure(mut self, beats: u32) -> Self {
        self.beats_per_measure = Some(beats);
        self
    }

    pub fn accent_first_beat(mut self, accent: bool) -> Self {
        self.accent_first_beat = Some(accent);
        self
    }

    pub fn sound_profile(mut self, profile: SoundProfile) -> Self {
        self.sound_profile = Some(profile);
        self
    }

    pub fn main_volume(mut self, volume: f32) -> Self {
        self.main_volume = Some(volume);
        self
    }

    pub fn subdivision_count(mut self, count: u32) -> Self {
        self.subdivision_count = Some(count);
        self
    }

    pub fn subdivision_volume(mut self, volume: f32) -> Self {
        self.subdivision_volume = Some(volume);
        self
    }
}
