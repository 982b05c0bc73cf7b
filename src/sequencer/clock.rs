// Virtual musical clock
//
// Tracks where the next click falls, both musically (beat/subdivision) and on
// the audio clock. Advancing reads the tempo at call time, which is what makes
// tempo changes apply from the next click onward.

use super::transport::TransportConfig;
use serde::Serialize;

#[derive(Debug, Clone, Copy, PartialEq, Default, Serialize)]
pub struct ClockPosition {
    pub beat_index: u32,
    pub subdivision_index: u32,
    /// Audio-clock time of the next click, seconds
    pub next_event_time: f64,
}

impl ClockPosition {
    /// Downbeat of a fresh measure at `time`
    pub fn at(time: f64) -> Self {
        Self {
            beat_index: 0,
            subdivision_index: 0,
            next_event_time: time,
        }
    }

    pub fn is_main_beat(&self) -> bool {
        self.subdivision_index == 0
    }

    /// Move to the following subdivision
    pub fn advance(&mut self, config: &TransportConfig) {
        let subdivisions = config.subdivision_count.max(1);
        let beats = config.beats_per_measure.max(1);

        self.next_event_time += config.seconds_per_subdivision();

        self.subdivision_index = (self.subdivision_index + 1) % subdivisions;
        if self.subdivision_index == 0 {
            self.beat_index = (self.beat_index + 1) % beats;
        }
    }

    /// Pull the position back into range after the meter or subdivision count
    /// shrank. An unfinished beat is treated as complete; a beat past the end
    /// of the new measure starts a new one.
    pub fn normalize(&mut self, config: &TransportConfig) {
        let subdivisions = config.subdivision_count.max(1);
        let beats = config.beats_per_measure.max(1);

        if self.subdivision_index >= subdivisions {
            self.subdivision_index = 0;
            self.beat_index += 1;
        }
        if self.beat_index >= beats {
            self.beat_index = 0;
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn config(bpm: f64, beats: u32, subdivisions: u32) -> TransportConfig {
        TransportConfig {
            tempo_bpm: bpm,
            beats_per_measure: beats,
            subdivision_count: subdivisions,
            ..Default::default()
        }
    }

    #[test]
    fn test_advance_quarter_notes() {
        let config = config(120.0, 4, 1);
        let mut clock = ClockPosition::at(0.0);

        let mut beats = Vec::new();
        for _ in 0..5 {
            clock.advance(&config);
            beats.push(clock.beat_index);
        }
        assert_eq!(beats, vec![1, 2, 3, 0, 1]);
        assert!((clock.next_event_time - 2.5).abs() < 1e-12);
    }

    #[test]
    fn test_advance_with_subdivisions() {
        let config = config(60.0, 3, 2);
        let mut clock = ClockPosition::at(1.0);

        let mut positions = vec![(clock.beat_index, clock.subdivision_index)];
        for _ in 0..6 {
            clock.advance(&config);
            positions.push((clock.beat_index, clock.subdivision_index));
        }

        assert_eq!(
            positions,
            vec![(0, 0), (0, 1), (1, 0), (1, 1), (2, 0), (2, 1), (0, 0)]
        );
        assert!((clock.next_event_time - 4.0).abs() < 1e-12);
    }

    #[test]
    fn test_tempo_read_at_advance_time() {
        let mut config = config(120.0, 4, 1);
        let mut clock = ClockPosition::at(0.0);

        clock.advance(&config);
        assert!((clock.next_event_time - 0.5).abs() < 1e-12);

        config.tempo_bpm = 60.0;
        clock.advance(&config);
        assert!((clock.next_event_time - 1.5).abs() < 1e-12);
    }

    #[test]
    fn test_normalize_after_shrink() {
        let mut clock = ClockPosition {
            beat_index: 2,
            subdivision_index: 3,
            next_event_time: 0.0,
        };

        // Subdivisions 4 -> 2: beat 2 is considered complete
        clock.normalize(&config(120.0, 4, 2));
        assert_eq!((clock.beat_index, clock.subdivision_index), (3, 0));

        // Meter 4 -> 3: beat 3 no longer exists, start a new measure
        clock.normalize(&config(120.0, 3, 2));
        assert_eq!((clock.beat_index, clock.subdivision_index), (0, 0));

        // Already in range: untouched
        let mut clock = ClockPosition {
            beat_index: 1,
            subdivision_index: 1,
            next_event_time: 0.0,
        };
        clock.normalize(&config(120.0, 4, 2));
        assert_eq!((clock.beat_index, clock.subdivision_index), (1, 1));
    }
}
