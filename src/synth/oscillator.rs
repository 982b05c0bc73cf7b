// Click oscillator - naive waveforms for short percussive pulses
//
// Aliasing is acceptable here: clicks last a few hundred milliseconds at most
// and are shaped by the profile filter anyway.

use std::f32::consts::TAU;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Waveform {
    Sine,
    Square,
    Sawtooth,
    Triangle,
}

#[derive(Debug, Clone, Copy)]
pub struct ClickOscillator {
    waveform: Waveform,
    /// Normalised phase in [0, 1)
    phase: f32,
    phase_increment: f32,
}

impl ClickOscillator {
    pub fn new(waveform: Waveform, frequency: f32, sample_rate: f32) -> Self {
        let phase_increment = if sample_rate > 0.0 {
            (frequency / sample_rate).clamp(0.0, 0.5)
        } else {
            0.0
        };

        Self {
            waveform,
            phase: 0.0,
            phase_increment,
        }
    }

    pub fn waveform(&self) -> Waveform {
        self.waveform
    }

    #[inline]
    pub fn next_sample(&mut self) -> f32 {
        let p = self.phase;
        let sample = match self.waveform {
            Waveform::Sine => (p * TAU).sin(),
            Waveform::Square => {
                if p < 0.5 {
                    1.0
                } else {
                    -1.0
                }
            }
            Waveform::Sawtooth => 2.0 * p - 1.0,
            Waveform::Triangle => {
                if p < 0.5 {
                    4.0 * p - 1.0
                } else {
                    3.0 - 4.0 * p
                }
            }
        };

        self.phase += self.phase_increment;
        if self.phase >= 1.0 {
            self.phase -= 1.0;
        }

        sample
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const SAMPLE_RATE: f32 = 48000.0;

    #[test]
    fn test_all_waveforms_bounded() {
        for waveform in [
            Waveform::Sine,
            Waveform::Square,
            Waveform::Sawtooth,
            Waveform::Triangle,
        ] {
            let mut osc = ClickOscillator::new(waveform, 1200.0, SAMPLE_RATE);
            for _ in 0..2000 {
                let s = osc.next_sample();
                assert!((-1.0..=1.0).contains(&s), "{:?} produced {}", waveform, s);
            }
        }
    }

    #[test]
    fn test_sine_starts_at_zero() {
        let mut osc = ClickOscillator::new(Waveform::Sine, 800.0, SAMPLE_RATE);
        assert!(osc.next_sample().abs() < 1e-6);
    }

    #[test]
    fn test_square_period() {
        // 750 Hz at 48 kHz = 64 samples per cycle, 32 high then 32 low
        let mut osc = ClickOscillator::new(Waveform::Square, 750.0, SAMPLE_RATE);
        let cycle: Vec<f32> = (0..64).map(|_| osc.next_sample()).collect();
        assert!(cycle[..32].iter().all(|&s| s == 1.0));
        assert!(cycle[32..].iter().all(|&s| s == -1.0));
    }

    #[test]
    fn test_frequency_capped_at_nyquist() {
        let mut osc = ClickOscillator::new(Waveform::Sawtooth, 100_000.0, SAMPLE_RATE);
        for _ in 0..100 {
            assert!(osc.next_sample().is_finite());
            assert!(osc.phase >= 0.0 && osc.phase < 1.0);
        }
    }

    #[test]
    fn test_zero_sample_rate_is_silent_dc() {
        let mut osc = ClickOscillator::new(Waveform::Sine, 800.0, 0.0);
        assert_eq!(osc.next_sample(), 0.0);
        assert_eq!(osc.next_sample(), 0.0);
    }
}
