// Click filter - Chamberlin state variable filter with fixed coefficients
//
// Each click voice gets its own filter, configured once when the voice is
// built. Unlike a synth voice filter there is no cutoff modulation, so the
// coefficients are computed up front and never smoothed.
//
// Reference: Hal Chamberlin, "Musical Applications of Microprocessors" (1985)

use std::f32::consts::PI;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum FilterKind {
    LowPass,
    HighPass,
    /// Normalised to unity gain at the centre frequency
    BandPass,
}

#[derive(Debug, Clone, Copy)]
pub struct ClickFilter {
    kind: FilterKind,
    low: f32,
    band: f32,
    /// f = 2 sin(pi fc / fs)
    f: f32,
    /// Damping, 1/Q
    q: f32,
}

impl ClickFilter {
    pub fn new(kind: FilterKind, cutoff: f32, resonance: f32, sample_rate: f32) -> Self {
        // The Chamberlin topology is only stable up to ~fs/6
        let max_cutoff = (sample_rate / 6.0).max(20.0);
        let cutoff = cutoff.clamp(20.0, max_cutoff);
        let f = if sample_rate > 0.0 {
            2.0 * (PI * cutoff / sample_rate).sin()
        } else {
            0.0
        };
        let q = (1.0 / resonance.clamp(0.5, 20.0)).clamp(0.01, 2.0);

        Self {
            kind,
            low: 0.0,
            band: 0.0,
            f,
            q,
        }
    }

    pub fn kind(&self) -> FilterKind {
        self.kind
    }

    #[inline]
    pub fn process(&mut self, input: f32) -> f32 {
        let high = input - self.low - self.q * self.band;
        self.band += self.f * high;
        self.low += self.f * self.band;

        match self.kind {
            FilterKind::LowPass => self.low,
            FilterKind::HighPass => high,
            FilterKind::BandPass => self.band * self.q,
        }
    }
}
