// Click synthesizer - abstract beat events to concrete click descriptions
//
// Accent: higher pitch (profile multiplier) and gain x1.2.
// Plain main beat: base pitch, gain x0.8 of the main volume.
// Subdivision: base pitch, gain x0.8 of the subdivision volume.

use super::profile::SoundProfile;
use super::voice::ClickSpec;
use crate::config::Tuning;
use crate::sequencer::scheduler::ScheduledEvent;
use crate::sequencer::transport::TransportConfig;

pub const ACCENT_GAIN: f32 = 1.2;
pub const REGULAR_GAIN: f32 = 0.8;

/// Volume used by test_click()
pub const TEST_CLICK_VOLUME: f32 = 0.8;

#[derive(Debug, Clone, Copy)]
pub struct ClickSynth {
    attack: f32,
    release: f32,
}

impl ClickSynth {
    pub fn new(tuning: &Tuning) -> Self {
        Self {
            attack: tuning.attack,
            release: tuning.release,
        }
    }

    /// Describe the click for `event` using the transport settings current
    /// at scheduling time.
    pub fn synthesize(&self, event: &ScheduledEvent, config: &TransportConfig) -> ClickSpec {
        let volume = if event.is_main_beat() {
            config.main_volume
        } else {
            config.subdivision_volume
        };
        self.build(
            config.sound_profile,
            event.timestamp,
            event.is_accent,
            volume,
        )
    }

    pub fn build(
        &self,
        profile: SoundProfile,
        start_time: f64,
        is_accent: bool,
        volume: f32,
    ) -> ClickSpec {
        let params = profile.params();
        let (frequency, gain) = if is_accent {
            (
                params.base_frequency * params.accent_multiplier,
                volume * ACCENT_GAIN,
            )
        } else {
            (params.base_frequency, volume * REGULAR_GAIN)
        };

        ClickSpec {
            start_time,
            frequency,
            waveform: params.waveform,
            filter: params.filter,
            filter_cutoff: params.filter_cutoff,
            filter_q: params.filter_q,
            gain,
            attack: self.attack,
            release: self.release,
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::HostProfile;
    use crate::synth::filter::FilterKind;

    fn event(beat: u32, sub: u32, accent: bool) -> ScheduledEvent {
        ScheduledEvent {
            beat_index: beat,
            subdivision_index: sub,
            timestamp: 1.25,
            is_accent: accent,
        }
    }

    fn config() -> TransportConfig {
        TransportConfig {
            main_volume: 0.5,
            subdivision_volume: 0.25,
            sound_profile: SoundProfile::Wood,
            subdivision_count: 2,
            ..Default::default()
        }
    }

    #[test]
    fn test_accent_is_higher_and_louder() {
        let synth = ClickSynth::new(&Tuning::for_host(HostProfile::Desktop));
        let accent = synth.synthesize(&event(0, 0, true), &config());
        let regular = synth.synthesize(&event(1, 0, false), &config());

        assert!((accent.frequency - 1300.0).abs() < 1e-3);
        assert_eq!(regular.frequency, 1000.0);
        assert!((accent.gain - 0.6).abs() < 1e-6);
        assert!((regular.gain - 0.4).abs() < 1e-6);
        assert_eq!(accent.start_time, 1.25);
    }

    #[test]
    fn test_subdivision_uses_its_own_volume() {
        let synth = ClickSynth::new(&Tuning::for_host(HostProfile::Desktop));
        let sub = synth.synthesize(&event(1, 1, false), &config());
        assert!((sub.gain - 0.2).abs() < 1e-6);
        assert_eq!(sub.filter, FilterKind::BandPass);
    }

    #[test]
    fn test_envelope_follows_host() {
        let desktop = ClickSynth::new(&Tuning::for_host(HostProfile::Desktop));
        let constrained = ClickSynth::new(&Tuning::for_host(HostProfile::Constrained));
        let a = desktop.synthesize(&event(0, 0, false), &config());
        let b = constrained.synthesize(&event(0, 0, false), &config());
        assert_eq!(a.attack, 0.001);
        assert_eq!(b.attack, 0.003);
        assert_eq!(b.release, 0.2);
    }
}
