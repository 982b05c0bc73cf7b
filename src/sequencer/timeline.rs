// Timeline - tempo, meter and subdivision presets
//
// Values coming from the UI are continuously adjustable, so out-of-range
// input is clamped rather than rejected.

use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;

/// Tempo in BPM, always within [MIN_BPM, MAX_BPM]
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct Tempo {
    bpm: f64,
}

impl Tempo {
    pub const MIN_BPM: f64 = 30.0;
    pub const MAX_BPM: f64 = 300.0;
    pub const DEFAULT_BPM: f64 = 120.0;

    pub fn new(bpm: f64) -> Self {
        Self {
            bpm: Self::clamp_bpm(bpm),
        }
    }

    pub fn clamp_bpm(bpm: f64) -> f64 {
        if bpm.is_nan() {
            Self::DEFAULT_BPM
        } else {
            bpm.clamp(Self::MIN_BPM, Self::MAX_BPM)
        }
    }

    pub fn is_valid_bpm(bpm: f64) -> bool {
        (Self::MIN_BPM..=Self::MAX_BPM).contains(&bpm)
    }

    pub fn bpm(&self) -> f64 {
        self.bpm
    }

    /// Duration of one beat in seconds
    pub fn beat_duration_seconds(&self) -> f64 {
        60.0 / self.bpm
    }

    /// Duration of one subdivision tick in seconds
    pub fn subdivision_duration_seconds(&self, subdivisions: u32) -> f64 {
        self.beat_duration_seconds() / subdivisions.max(1) as f64
    }
}

impl Default for Tempo {
    fn default() -> Self {
        Self::new(Self::DEFAULT_BPM)
    }
}

impl fmt::Display for Tempo {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:.1} BPM", self.bpm)
    }
}

/// Time signature (numerator/denominator)
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct TimeSignature {
    pub numerator: u8,
    pub denominator: u8,
}

impl TimeSignature {
    pub const PRESETS: [TimeSignature; 6] = [
        TimeSignature::new(4, 4),
        TimeSignature::new(3, 4),
        TimeSignature::new(2, 4),
        TimeSignature::new(6, 8),
        TimeSignature::new(9, 8),
        TimeSignature::new(12, 8),
    ];

    pub const fn new(numerator: u8, denominator: u8) -> Self {
        Self {
            numerator,
            denominator,
        }
    }

    pub fn four_four() -> Self {
        Self::new(4, 4)
    }

    pub fn three_four() -> Self {
        Self::new(3, 4)
    }

    /// Clicks per measure. The engine clicks on the numerator, whatever the
    /// note value.
    pub fn beats_per_measure(&self) -> u32 {
        self.numerator.max(1) as u32
    }

    /// Parse "6/8" style strings
    pub fn parse(text: &str) -> Option<Self> {
        let (num, den) = text.trim().split_once('/')?;
        let numerator: u8 = num.trim().parse().ok()?;
        let denominator: u8 = den.trim().parse().ok()?;
        if numerator == 0 || !denominator.is_power_of_two() {
            return None;
        }
        Some(Self::new(numerator, denominator))
    }
}

impl Default for TimeSignature {
    fn default() -> Self {
        Self::four_four()
    }
}

impl fmt::Display for TimeSignature {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}/{}", self.numerator, self.denominator)
    }
}

/// Common beat subdivisions
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Subdivision {
    /// Quarter notes only
    #[default]
    None,
    Eighth,
    Triplet,
    Sixteenth,
}

impl Subdivision {
    pub fn count(&self) -> u32 {
        match self {
            Subdivision::None => 1,
            Subdivision::Eighth => 2,
            Subdivision::Triplet => 3,
            Subdivision::Sixteenth => 4,
        }
    }

    pub fn from_count(count: u32) -> Option<Self> {
        match count {
            1 => Some(Subdivision::None),
            2 => Some(Subdivision::Eighth),
            3 => Some(Subdivision::Triplet),
            4 => Some(Subdivision::Sixteenth),
            _ => None,
        }
    }

    pub fn label(&self) -> &'static str {
        match self {
            Subdivision::None => "Quarter Notes",
            Subdivision::Eighth => "8th Notes",
            Subdivision::Triplet => "Triplets",
            Subdivision::Sixteenth => "16th Notes",
        }
    }
}

impl FromStr for Subdivision {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.trim().to_ascii_lowercase().as_str() {
            "none" | "quarter" => Ok(Subdivision::None),
            "eighth" | "8th" => Ok(Subdivision::Eighth),
            "triplet" | "triplets" => Ok(Subdivision::Triplet),
            "sixteenth" | "16th" => Ok(Subdivision::Sixteenth),
            other => Err(format!("unknown subdivision: {}", other)),
        }
    }
}
