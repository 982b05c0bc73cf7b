// Engine configuration - host tuning and defaults, loaded from RON
//
// The lookahead tick (L) and schedule-ahead window (S) depend on how reliably
// the host wakes us up. Each HostProfile carries one consistent tuning set;
// individual values can be overridden from the config file.

use crate::sequencer::transport::TransportConfig;
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::Path;
use std::str::FromStr;
use std::time::Duration;

#[derive(Debug, thiserror::Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse config: {0}")]
    Parse(String),

    #[error("Unknown host profile: {0}")]
    UnknownHost(String),
}

/// Class of host the engine runs on
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum HostProfile {
    /// Low-latency, reliable wake-ups
    #[default]
    Desktop,
    /// Higher output latency, occasionally delayed callbacks
    Mobile,
    /// Heavily throttled runtime, needs the largest safety margins
    Constrained,
}

impl HostProfile {
    pub fn as_str(&self) -> &'static str {
        match self {
            HostProfile::Desktop => "desktop",
            HostProfile::Mobile => "mobile",
            HostProfile::Constrained => "constrained",
        }
    }
}

impl fmt::Display for HostProfile {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for HostProfile {
    type Err = ConfigError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s.to_ascii_lowercase().as_str() {
            "desktop" => Ok(HostProfile::Desktop),
            "mobile" => Ok(HostProfile::Mobile),
            "constrained" | "android" => Ok(HostProfile::Constrained),
            other => Err(ConfigError::UnknownHost(other.to_string())),
        }
    }
}

/// Bounds for the schedule-ahead window, configured or latency-derived
pub const MIN_SCHEDULE_AHEAD: f64 = 0.02;
pub const MAX_SCHEDULE_AHEAD: f64 = 2.0;

/// Tick period override bounds, milliseconds
pub const LOOKAHEAD_MS_RANGE: (f64, f64) = (1.0, 100.0);
/// Envelope override bounds, milliseconds
pub const ATTACK_MS_RANGE: (f64, f64) = (0.1, 50.0);
pub const RELEASE_MS_RANGE: (f64, f64) = (10.0, 500.0);

/// Burst fill horizon as a multiple of the window
pub const BURST_WINDOW_FACTOR: f64 = 1.5;

/// Extra scheduling pass for hosts that stall for long periods
#[derive(Debug, Clone, Copy, PartialEq, Serialize, Deserialize)]
pub struct BurstFill {
    /// Multiplier applied to the schedule-ahead window
    pub window_factor: f64,
    /// Stop filling once this many events are queued
    pub max_queued: usize,
}

/// Resolved timing and envelope constants for one deployment target
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Tuning {
    /// Period of the scheduler tick (L)
    pub lookahead: Duration,
    /// How far ahead of the audio clock events may be committed (S), seconds
    pub schedule_ahead: f64,
    /// Added to the measured output latency when re-deriving S
    pub latency_margin: f64,
    /// Minimum spacing between ticks when running on the frame fallback
    pub frame_interval: Duration,
    /// Delay between start() and the first click, seconds
    pub first_event_offset: f64,
    /// Scheduled events stay queued this long after their timestamp, seconds
    pub queue_retention: f64,
    /// Click attack, seconds
    pub attack: f32,
    /// Click release, seconds
    pub release: f32,
    pub burst_fill: Option<BurstFill>,
}

impl Tuning {
    pub fn for_host(host: HostProfile) -> Self {
        match host {
            HostProfile::Desktop => Self {
                lookahead: Duration::from_millis(25),
                schedule_ahead: 0.1,
                latency_margin: 0.05,
                frame_interval: Duration::from_micros(16_667),
                first_event_offset: 0.005,
                queue_retention: 1.0,
                attack: 0.001,
                release: 0.1,
                burst_fill: None,
            },
            HostProfile::Mobile => Self {
                lookahead: Duration::from_millis(25),
                schedule_ahead: 0.3,
                latency_margin: 0.05,
                frame_interval: Duration::from_millis(20),
                first_event_offset: 0.005,
                queue_retention: 1.0,
                attack: 0.002,
                release: 0.15,
                burst_fill: None,
            },
            HostProfile::Constrained => Self {
                lookahead: Duration::from_millis(50),
                schedule_ahead: 0.4,
                latency_margin: 0.1,
                frame_interval: Duration::from_millis(30),
                first_event_offset: 0.005,
                queue_retention: 1.0,
                attack: 0.003,
                release: 0.2,
                burst_fill: Some(BurstFill {
                    window_factor: BURST_WINDOW_FACTOR,
                    max_queued: 10,
                }),
            },
        }
    }

    /// Schedule-ahead window after accounting for the host's output latency.
    /// Never smaller than the configured window.
    pub fn effective_schedule_ahead(&self, output_latency: Option<f64>) -> f64 {
        match output_latency {
            Some(latency) if latency.is_finite() && latency > 0.0 => {
                self.schedule_ahead
                    .max((latency + self.latency_margin).min(MAX_SCHEDULE_AHEAD))
            }
            _ => self.schedule_ahead,
        }
    }
}

/// Preferred periodic tick mechanism
#[derive(Debug, Clone, Copy, PartialEq, Eq, Default, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum TimingStrategy {
    /// Dedicated timer thread, falls back to frame pacing if it cannot start
    #[default]
    Worker,
    /// Frame-paced loop only
    Frame,
}

/// Top-level engine configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EngineConfig {
    pub host: HostProfile,
    pub lookahead_ms: Option<f64>,
    pub schedule_ahead_secs: Option<f64>,
    pub attack_ms: Option<f32>,
    pub release_ms: Option<f32>,
    pub timing: TimingStrategy,
    /// Output device name, default device when None
    pub output_device: Option<String>,
    /// Capacity of the scheduler -> audio thread queue
    pub render_queue_capacity: usize,
    pub transport: TransportConfig,
}

impl Default for EngineConfig {
    fn default() -> Self {
        Self {
            host: HostProfile::Desktop,
            lookahead_ms: None,
            schedule_ahead_secs: None,
            attack_ms: None,
            release_ms: None,
            timing: TimingStrategy::Worker,
            output_device: None,
            render_queue_capacity: 256,
            transport: TransportConfig::default(),
        }
    }
}

impl EngineConfig {
    pub fn for_host(host: HostProfile) -> Self {
        Self {
            host,
            ..Default::default()
        }
    }

    /// Load from a RON file
    pub fn load(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let text = std::fs::read_to_string(path)?;
        Self::from_ron_str(&text)
    }

    pub fn from_ron_str(text: &str) -> Result<Self, ConfigError> {
        let mut config: EngineConfig =
            ron::from_str(text).map_err(|e| ConfigError::Parse(e.to_string()))?;
        config.transport = config.transport.clamped();
        Ok(config)
    }

    pub fn to_ron_string(&self) -> Result<String, ConfigError> {
        ron::ser::to_string_pretty(self, ron::ser::PrettyConfig::default())
            .map_err(|e| ConfigError::Parse(e.to_string()))
    }

    /// Host tuning with the file overrides applied. Non-positive overrides
    /// are ignored, the rest are clamped to the supported ranges.
    pub fn tuning(&self) -> Tuning {
        let mut tuning = Tuning::for_host(self.host);

        if let Some(ms) = usable(self.lookahead_ms) {
            let ms = ms.clamp(LOOKAHEAD_MS_RANGE.0, LOOKAHEAD_MS_RANGE.1);
            tuning.lookahead = Duration::from_secs_f64(ms / 1000.0);
        }
        if let Some(secs) = usable(self.schedule_ahead_secs) {
            tuning.schedule_ahead = secs.clamp(MIN_SCHEDULE_AHEAD, MAX_SCHEDULE_AHEAD);
        }
        if let Some(ms) = usable(self.attack_ms.map(f64::from)) {
            tuning.attack = (ms.clamp(ATTACK_MS_RANGE.0, ATTACK_MS_RANGE.1) / 1000.0) as f32;
        }
        if let Some(ms) = usable(self.release_ms.map(f64::from)) {
            tuning.release = (ms.clamp(RELEASE_MS_RANGE.0, RELEASE_MS_RANGE.1) / 1000.0) as f32;
        }
        // The decay needs room after the attack
        if tuning.release <= tuning.attack {
            tuning.release = tuning.attack * 2.0;
        }

        tuning
    }
}

fn usable(value: Option<f64>) -> Option<f64> {
    value.filter(|v| v.is_finite() && *v > 0.0)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::profile::SoundProfile;

    #[test]
    fn test_host_tuning_table() {
        let desktop = Tuning::for_host(HostProfile::Desktop);
        assert_eq!(desktop.lookahead, Duration::from_millis(25));
        assert_eq!(desktop.schedule_ahead, 0.1);
        assert!(desktop.burst_fill.is_none());

        let constrained = Tuning::for_host(HostProfile::Constrained);
        assert_eq!(constrained.lookahead, Duration::from_millis(50));
        assert_eq!(constrained.schedule_ahead, 0.4);
        assert!(constrained.release > desktop.release);
        assert!(constrained.attack > desktop.attack);
        assert!(constrained.burst_fill.is_some());
    }

    #[test]
    fn test_window_rederived_from_latency() {
        let tuning = Tuning::for_host(HostProfile::Desktop);

        // Latency below the window leaves it alone
        assert_eq!(tuning.effective_schedule_ahead(Some(0.01)), 0.1);
        // High latency pushes it up
        let window = tuning.effective_schedule_ahead(Some(0.2));
        assert!((window - 0.25).abs() < 1e-9);
        // Unknown latency
        assert_eq!(tuning.effective_schedule_ahead(None), 0.1);
        assert_eq!(tuning.effective_schedule_ahead(Some(f64::NAN)), 0.1);
    }

    #[test]
    fn test_overrides() {
        let config = EngineConfig {
            lookahead_ms: Some(10.0),
            schedule_ahead_secs: Some(0.25),
            release_ms: Some(150.0),
            ..Default::default()
        };
        let tuning = config.tuning();
        assert_eq!(tuning.lookahead, Duration::from_millis(10));
        assert_eq!(tuning.schedule_ahead, 0.25);
        assert!((tuning.release - 0.15).abs() < 1e-6);

        // Nonsense overrides are ignored
        let config = EngineConfig {
            lookahead_ms: Some(-5.0),
            ..Default::default()
        };
        assert_eq!(config.tuning().lookahead, Duration::from_millis(25));
    }

    #[test]
    fn test_out_of_range_overrides_are_clamped() {
        let config = EngineConfig::from_ron_str(
            "(lookahead_ms: Some(1e300), schedule_ahead_secs: Some(1e9), \
             attack_ms: Some(1e30), release_ms: Some(1e30))",
        )
        .unwrap();
        let tuning = config.tuning();
        assert_eq!(tuning.lookahead, Duration::from_millis(100));
        assert_eq!(tuning.schedule_ahead, MAX_SCHEDULE_AHEAD);
        assert!((tuning.attack - 0.05).abs() < 1e-6);
        assert!((tuning.release - 0.5).abs() < 1e-6);

        let config = EngineConfig {
            lookahead_ms: Some(1e-9),
            schedule_ahead_secs: Some(1e-9),
            ..Default::default()
        };
        let tuning = config.tuning();
        assert_eq!(tuning.lookahead, Duration::from_millis(1));
        assert_eq!(tuning.schedule_ahead, MIN_SCHEDULE_AHEAD);

        // Latency cannot push the window past its ceiling either
        assert_eq!(
            tuning.effective_schedule_ahead(Some(30.0)),
            MAX_SCHEDULE_AHEAD
        );
    }

    #[test]
    fn test_ron_roundtrip_with_partial_file() {
        let text = r#"(
            host: mobile,
            schedule_ahead_secs: Some(0.35),
            transport: (
                tempo_bpm: 500.0,
                sound_profile: wood,
            ),
        )"#;

        let config = EngineConfig::from_ron_str(text).unwrap();
        assert_eq!(config.host, HostProfile::Mobile);
        assert_eq!(config.schedule_ahead_secs, Some(0.35));
        assert_eq!(config.transport.sound_profile, SoundProfile::Wood);
        // Out-of-range values are clamped on load
        assert_eq!(config.transport.tempo_bpm, 300.0);
        // Unspecified fields keep their defaults
        assert_eq!(config.transport.beats_per_measure, 4);
        assert_eq!(config.render_queue_capacity, 256);

        let serialized = config.to_ron_string().unwrap();
        assert_eq!(EngineConfig::from_ron_str(&serialized).unwrap(), config);
    }

    #[test]
    fn test_parse_error() {
        assert!(matches!(
            EngineConfig::from_ron_str("(host: "),
            Err(ConfigError::Parse(_))
        ));
    }

    #[test]
    fn test_host_from_str() {
        assert_eq!("Mobile".parse::<HostProfile>().unwrap(), HostProfile::Mobile);
        assert_eq!(
            "android".parse::<HostProfile>().unwrap(),
            HostProfile::Constrained
        );
        assert!("toaster".parse::<HostProfile>().is_err());
    }
}
