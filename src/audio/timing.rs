// Audio clock - frames rendered by the output callback
//
// This is the time base every click timestamp refers to. It only advances
// while the renderer is actually pulling audio, so it is immune to timer
// jitter on the scheduling side.

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering};

#[derive(Clone, Debug)]
pub struct AudioTiming {
    /// Frames rendered so far (incremented by the audio callback)
    frame_position: Arc<AtomicU64>,
    sample_rate: f64,
}

impl AudioTiming {
    pub fn new(sample_rate: f32) -> Self {
        Self {
            frame_position: Arc::new(AtomicU64::new(0)),
            sample_rate: sample_rate as f64,
        }
    }

    pub fn current_frame(&self) -> u64 {
        self.frame_position.load(Ordering::Acquire)
    }

    /// Called from the audio callback once a block is rendered
    pub fn advance(&self, frames: usize) {
        self.frame_position
            .fetch_add(frames as u64, Ordering::AcqRel);
    }

    /// Audio clock now, in seconds
    pub fn current_time(&self) -> f64 {
        if self.sample_rate <= 0.0 {
            return 0.0;
        }
        self.current_frame() as f64 / self.sample_rate
    }

    pub fn seconds_to_frames(&self, seconds: f64) -> u64 {
        (seconds.max(0.0) * self.sample_rate).round() as u64
    }

    pub fn sample_rate(&self) -> f32 {
        self.sample_rate as f32
    }
}
