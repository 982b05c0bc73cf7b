// DSP hygiene for the real-time mix

/// Flush denormals to zero
///
/// Tails of decaying clicks drift into the denormal range, which is slow on
/// some CPUs. Threshold 1e-15 is far below 32-bit float noise.
#[inline]
pub fn flush_denormals_to_zero(x: f32) -> f32 {
    if x.abs() < 1e-15 { 0.0 } else { x }
}

/// Soft saturation into [-1, 1]
///
/// Accented clicks run at 1.2x the main volume and overlapping clicks can
/// sum past full scale; tanh keeps that from hard clipping.
#[inline]
pub fn soft_clip(x: f32) -> f32 {
    x.tanh()
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_flush_denormals() {
        assert_eq!(flush_denormals_to_zero(1e-20), 0.0);
        assert_eq!(flush_denormals_to_zero(-1e-20), 0.0);
        assert_eq!(flush_denormals_to_zero(0.5), 0.5);
    }

    #[test]
    fn test_soft_clip_bounds() {
        assert!(soft_clip(10.0) <= 1.0);
        assert!(soft_clip(-10.0) >= -1.0);
        // Quasi-linear near zero
        assert!((soft_clip(0.01) - 0.01).abs() < 1e-5);
    }
}
