// Click voice - one scheduled percussive pulse
//
// A ClickSpec is the plain-data description handed across the render queue.
// The renderer turns it into a ClickVoice (oscillator -> filter -> envelope)
// and frees the voice once its release window has elapsed.

use super::envelope::ClickEnvelope;
use super::filter::{ClickFilter, FilterKind};
use super::oscillator::{ClickOscillator, Waveform};

/// Everything the renderer needs to play one click
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct ClickSpec {
    /// Audio-clock time of the click onset, seconds
    pub start_time: f64,
    pub frequency: f32,
    pub waveform: Waveform,
    pub filter: FilterKind,
    pub filter_cutoff: f32,
    pub filter_q: f32,
    /// Envelope peak
    pub gain: f32,
    /// Seconds from onset
    pub attack: f32,
    /// Seconds from onset
    pub release: f32,
}

impl ClickSpec {
    /// Sample index of the onset on a clock running at `sample_rate`
    pub fn start_sample(&self, sample_rate: f32) -> u64 {
        (self.start_time.max(0.0) * sample_rate as f64).round() as u64
    }
}

pub struct ClickVoice {
    oscillator: ClickOscillator,
    filter: ClickFilter,
    envelope: ClickEnvelope,
    start_sample: u64,
}

impl ClickVoice {
    pub fn new(spec: &ClickSpec, sample_rate: f32) -> Self {
        Self {
            oscillator: ClickOscillator::new(spec.waveform, spec.frequency, sample_rate),
            filter: ClickFilter::new(spec.filter, spec.filter_cutoff, spec.filter_q, sample_rate),
            envelope: ClickEnvelope::new(spec.gain, spec.attack, spec.release, sample_rate),
            start_sample: spec.start_sample(sample_rate),
        }
    }

    pub fn start_sample(&self) -> u64 {
        self.start_sample
    }

    pub fn is_finished(&self) -> bool {
        self.envelope.is_finished()
    }

    /// Render the sample at absolute clock position `sample_index`.
    /// Silent until the onset; the voice only advances once it has started.
    #[inline]
    pub fn sample_at(&mut self, sample_index: u64) -> f32 {
        if sample_index < self.start_sample || self.is_finished() {
            return 0.0;
        }

        let raw = self.oscillator.next_sample();
        let filtered = self.filter.process(raw);
        filtered * self.envelope.next_level()
    }
}
