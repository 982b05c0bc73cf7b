// Sound profiles - lookup table from profile id to click timbre
//
// Profiles only change timbre. Timing never depends on them.

use super::filter::FilterKind;
use super::oscillator::Waveform;
use crate::error::EngineError;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Click sound preset
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SoundProfile {
    #[default]
    Classic,
    Wood,
    Electronic,
    Sine,
}

/// Audio parameters for one profile
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ProfileParams {
    pub waveform: Waveform,
    pub filter: FilterKind,
    pub filter_cutoff: f32,
    pub filter_q: f32,
    /// Frequency of unaccented clicks, Hz
    pub base_frequency: f32,
    /// Applied to base_frequency on accented clicks
    pub accent_multiplier: f32,
}

const PROFILES: [ProfileParams; 4] = [
    // Classic
    ProfileParams {
        waveform: Waveform::Square,
        filter: FilterKind::LowPass,
        filter_cutoff: 2000.0,
        filter_q: 0.707,
        base_frequency: 800.0,
        accent_multiplier: 1.5,
    },
    // Wood
    ProfileParams {
        waveform: Waveform::Triangle,
        filter: FilterKind::BandPass,
        filter_cutoff: 800.0,
        filter_q: 3.0,
        base_frequency: 1000.0,
        accent_multiplier: 1.3,
    },
    // Electronic
    ProfileParams {
        waveform: Waveform::Sawtooth,
        filter: FilterKind::HighPass,
        filter_cutoff: 300.0,
        filter_q: 0.707,
        base_frequency: 1200.0,
        accent_multiplier: 1.4,
    },
    // Sine
    ProfileParams {
        waveform: Waveform::Sine,
        filter: FilterKind::LowPass,
        filter_cutoff: 1500.0,
        filter_q: 0.707,
        base_frequency: 600.0,
        accent_multiplier: 1.2,
    },
];

impl SoundProfile {
    pub const ALL: [SoundProfile; 4] = [
        SoundProfile::Classic,
        SoundProfile::Wood,
        SoundProfile::Electronic,
        SoundProfile::Sine,
    ];

    pub fn params(&self) -> &'static ProfileParams {
        &PROFILES[*self as usize]
    }

    pub fn id(&self) -> &'static str {
        match self {
            SoundProfile::Classic => "classic",
            SoundProfile::Wood => "wood",
            SoundProfile::Electronic => "electronic",
            SoundProfile::Sine => "sine",
        }
    }

    /// Human readable name
    pub fn name(&self) -> &'static str {
        match self {
            SoundProfile::Classic => "Classic",
            SoundProfile::Wood => "Wood Block",
            SoundProfile::Electronic => "Electronic",
            SoundProfile::Sine => "Sine Wave",
        }
    }
}

impl fmt::Display for SoundProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.id())
    }
}

impl FromStr for SoundProfile {
    type Err = EngineError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        SoundProfile::ALL
            .into_iter()
            .find(|profile| profile.id().eq_ignore_ascii_case(s))
            .ok_or_else(|| EngineError::UnknownProfile(s.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_table_matches_variants() {
        assert_eq!(SoundProfile::Classic.params().base_frequency, 800.0);
        assert_eq!(SoundProfile::Wood.params().base_frequency, 1000.0);
        assert_eq!(SoundProfile::Electronic.params().base_frequency, 1200.0);
        assert_eq!(SoundProfile::Sine.params().base_frequency, 600.0);

        assert_eq!(SoundProfile::Wood.params().filter, FilterKind::BandPass);
        assert_eq!(SoundProfile::Electronic.params().filter, FilterKind::HighPass);
        assert_eq!(SoundProfile::Classic.params().waveform, Waveform::Square);
    }

    #[test]
    fn test_accent_raises_pitch() {
        for profile in SoundProfile::ALL {
            assert!(profile.params().accent_multiplier > 1.0, "{profile}");
        }
    }

    #[test]
    fn test_parse_ids() {
        assert_eq!("wood".parse::<SoundProfile>().unwrap(), SoundProfile::Wood);
        assert_eq!("SINE".parse::<SoundProfile>().unwrap(), SoundProfile::Sine);
        assert!(matches!(
            "cowbell".parse::<SoundProfile>(),
            Err(EngineError::UnknownProfile(_))
        ));
    }
}
