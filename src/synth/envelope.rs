// Click envelope - linear attack, exponential release
//
//   gain
//   peak ┤   /\
//        │  /  `.
//        │ /     `-._
//  0.001 ┤/          `--.___
//        0  attack        release   (seconds from voice start)
//
// The decay runs from the end of the attack to `release`, reaching FLOOR
// exactly at `release`. After that the envelope reports finished.

/// Level reached at the end of the release window
pub const FLOOR: f32 = 0.001;

#[derive(Debug, Clone, Copy)]
pub struct ClickEnvelope {
    peak: f32,
    attack_samples: u32,
    total_samples: u32,
    /// Per-sample multiplier during the decay
    decay_ratio: f32,
    position: u32,
    level: f32,
}

impl ClickEnvelope {
    /// `attack` and `release` are in seconds measured from the start of the
    /// voice. `release` is clamped to leave at least one decay sample.
    pub fn new(peak: f32, attack: f32, release: f32, sample_rate: f32) -> Self {
        let peak = peak.max(0.0);
        let attack_samples = ((attack.max(0.0) * sample_rate).round() as u32).max(1);
        let total_samples = ((release.max(0.0) * sample_rate).round() as u32).max(attack_samples + 1);
        let decay_samples = (total_samples - attack_samples) as f32;

        // peak * ratio^decay_samples == FLOOR
        let decay_ratio = if peak > FLOOR {
            (FLOOR / peak).powf(1.0 / decay_samples)
        } else {
            0.0
        };

        Self {
            peak,
            attack_samples,
            total_samples,
            decay_ratio,
            position: 0,
            level: 0.0,
        }
    }

    pub fn is_finished(&self) -> bool {
        self.position >= self.total_samples
    }

    /// Length of the whole envelope in samples
    pub fn len_samples(&self) -> u32 {
        self.total_samples
    }

    #[inline]
    pub fn next_level(&mut self) -> f32 {
        if self.is_finished() {
            return 0.0;
        }

        self.level = if self.position < self.attack_samples {
            self.peak * self.position as f32 / self.attack_samples as f32
        } else if self.position == self.attack_samples {
            self.peak
        } else {
            self.level * self.decay_ratio
        };

        self.position += 1;
        self.level
    }
}
