// Click renderer - fixed pool of voices mixed into an output buffer
//
// Runs inside the real-time callback: no allocation after construction.
// A submitted click waits in its slot until the clock reaches its onset,
// plays, and the slot is reused once the envelope has finished.

use super::voice::{ClickSpec, ClickVoice};
use crate::audio::dsp_utils::{flush_denormals_to_zero, soft_clip};
use crate::config::{BURST_WINDOW_FACTOR, MAX_SCHEDULE_AHEAD, RELEASE_MS_RANGE};
use crate::sequencer::timeline::Tempo;
use crate::sequencer::transport::MAX_SUBDIVISIONS;

/// Densest click rate the transport allows, clicks per second
const MAX_CLICK_RATE: f64 = Tempo::MAX_BPM / 60.0 * MAX_SUBDIVISIONS as f64;

/// Pending plus sounding clicks in the worst case: the widest burst horizon
/// filled at the densest rate, each click held for the longest release
pub const MAX_VOICES: usize = ((MAX_SCHEDULE_AHEAD * BURST_WINDOW_FACTOR
    + RELEASE_MS_RANGE.1 / 1000.0)
    * MAX_CLICK_RATE) as usize
    + 1;

pub struct ClickRenderer {
    voices: Vec<Option<ClickVoice>>,
    sample_rate: f32,
    dropped: u64,
}

impl ClickRenderer {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            voices: (0..MAX_VOICES).map(|_| None).collect(),
            sample_rate,
            dropped: 0,
        }
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    /// Queue a click. Returns false if every slot is busy.
    pub fn submit(&mut self, spec: &ClickSpec) -> bool {
        match self.voices.iter_mut().find(|slot| slot.is_none()) {
            Some(slot) => {
                *slot = Some(ClickVoice::new(spec, self.sample_rate));
                true
            }
            None => {
                self.dropped += 1;
                false
            }
        }
    }

    /// Voices waiting or sounding
    pub fn active_voices(&self) -> usize {
        self.voices.iter().filter(|slot| slot.is_some()).count()
    }

    /// Clicks rejected because the pool was full
    pub fn dropped(&self) -> u64 {
        self.dropped
    }

    /// Drop every voice, sounding or pending
    pub fn clear(&mut self) {
        for slot in self.voices.iter_mut() {
            *slot = None;
        }
    }

    /// Render mono output for the block starting at absolute sample `start`
    pub fn render(&mut self, output: &mut [f32], start: u64) {
        for (offset, out) in output.iter_mut().enumerate() {
            let index = start + offset as u64;
            let mut mix = 0.0;
            for voice in self.voices.iter_mut().flatten() {
                mix += voice.sample_at(index);
            }
            *out = soft_clip(flush_denormals_to_zero(mix));
        }

        for slot in self.voices.iter_mut() {
            if slot.as_ref().is_some_and(|voice| voice.is_finished()) {
                *slot = None;
            }
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::synth::filter::FilterKind;
    use crate::synth::oscillator::Waveform;

    const SAMPLE_RATE: f32 = 48000.0;

    fn click(start_time: f64) -> ClickSpec {
        ClickSpec {
            start_time,
            frequency: 800.0,
            waveform: Waveform::Square,
            filter: FilterKind::LowPass,
            filter_cutoff: 2000.0,
            filter_q: 0.707,
            gain: 0.5,
            attack: 0.001,
            release: 0.1,
        }
    }

    #[test]
    fn test_click_lands_on_its_sample() {
        let mut renderer = ClickRenderer::new(SAMPLE_RATE);
        assert!(renderer.submit(&click(0.005)));

        let mut buffer = vec![0.0f32; 512];
        renderer.render(&mut buffer, 0);

        // 5ms = sample 240
        assert!(buffer[..240].iter().all(|&s| s == 0.0));
        assert!(buffer[241..].iter().any(|&s| s.abs() > 0.01));
    }

    #[test]
    fn test_slot_released_after_release_window() {
        let mut renderer = ClickRenderer::new(SAMPLE_RATE);
        renderer.submit(&click(0.0));
        assert_eq!(renderer.active_voices(), 1);

        let mut buffer = vec![0.0f32; 512];
        let mut position = 0;
        // 100ms release = 4800 samples, ten blocks is plenty
        for _ in 0..10 {
            renderer.render(&mut buffer, position);
            position += buffer.len() as u64;
        }
        assert_eq!(renderer.active_voices(), 0);
        assert!(buffer.iter().all(|&s| s == 0.0));
    }

    #[test]
    fn test_pool_exhaustion_is_counted() {
        let mut renderer = ClickRenderer::new(SAMPLE_RATE);
        for i in 0..MAX_VOICES {
            assert!(renderer.submit(&click(i as f64)));
        }
        assert!(!renderer.submit(&click(100.0)));
        assert_eq!(renderer.dropped(), 1);

        renderer.clear();
        assert_eq!(renderer.active_voices(), 0);
    }

    #[test]
    fn test_output_bounded() {
        let mut renderer = ClickRenderer::new(SAMPLE_RATE);
        for _ in 0..8 {
            let mut loud = click(0.0);
            loud.gain = 1.2;
            renderer.submit(&loud);
        }
        let mut buffer = vec![0.0f32; 2048];
        renderer.render(&mut buffer, 0);
        assert!(buffer.iter().all(|s| s.abs() <= 1.0));
    }
}
