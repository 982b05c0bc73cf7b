// Lock-free values shared with the audio thread

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

/// Optional f64 stored as bits; NaN encodes "not measured yet"
#[derive(Clone, Debug)]
pub struct AtomicF64 {
    inner: Arc<AtomicU64>,
}

impl AtomicF64 {
    pub fn new(value: f64) -> Self {
        Self {
            inner: Arc::new(AtomicU64::new(value.to_bits())),
        }
    }

    pub fn unset() -> Self {
        Self::new(f64::NAN)
    }

    /// Called from the audio thread
    pub fn set(&self, value: f64) {
        self.inner.store(value.to_bits(), Ordering::Relaxed);
    }

    pub fn get(&self) -> f64 {
        f64::from_bits(self.inner.load(Ordering::Relaxed))
    }

    /// The stored value, if one has been measured
    pub fn get_finite(&self) -> Option<f64> {
        Some(self.get()).filter(|v| v.is_finite())
    }
}

impl Default for AtomicF64 {
    fn default() -> Self {
        Self::unset()
    }
}
