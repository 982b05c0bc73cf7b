// Beat notifications
//
// Both BeatCallbacks (one set per start()) and registered BeatObservers are
// invoked on the timing thread, at scheduling time, while the scheduler is
// locked. They run up to one schedule-ahead window before the click is heard
// and must not call back into the Metronome.

use super::scheduler::ScheduledEvent;

/// Long-lived listener, e.g. a beat indicator
pub trait BeatObserver: Send {
    /// Main beat (subdivision 0)
    fn on_beat(&mut self, _beat_index: u32) {}

    /// Every scheduled click, main beats included
    fn on_subdivision(&mut self, _beat_index: u32, _subdivision_index: u32) {}
}

pub type BeatCallback = Box<dyn FnMut(u32) + Send>;
pub type SubdivisionCallback = Box<dyn FnMut(u32, u32) + Send>;

/// Optional closures supplied with `start()`
#[derive(Default)]
pub struct BeatCallbacks {
    pub on_beat: Option<BeatCallback>,
    pub on_subdivision: Option<SubdivisionCallback>,
}

impl BeatCallbacks {
    pub fn none() -> Self {
        Self::default()
    }

    pub fn on_beat(mut self, callback: impl FnMut(u32) + Send + 'static) -> Self {
        self.on_beat = Some(Box::new(callback));
        self
    }

    pub fn on_subdivision(mut self, callback: impl FnMut(u32, u32) + Send + 'static) -> Self {
        self.on_subdivision = Some(Box::new(callback));
        self
    }

    pub(crate) fn notify(&mut self, event: &ScheduledEvent) {
        if event.is_main_beat() {
            if let Some(on_beat) = self.on_beat.as_mut() {
                on_beat(event.beat_index);
            }
        }
        if let Some(on_subdivision) = self.on_subdivision.as_mut() {
            on_subdivision(event.beat_index, event.subdivision_index);
        }
    }
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub struct ObserverId(u64);

/// Observers in registration order
#[derive(Default)]
pub(crate) struct ObserverList {
    next_id: u64,
    entries: Vec<(ObserverId, Box<dyn BeatObserver>)>,
}

impl ObserverList {
    pub fn add(&mut self, observer: Box<dyn BeatObserver>) -> ObserverId {
        let id = ObserverId(self.next_id);
        self.next_id += 1;
        self.entries.push((id, observer));
        id
    }

    pub fn remove(&mut self, id: ObserverId) -> bool {
        let before = self.entries.len();
        self.entries.retain(|(entry_id, _)| *entry_id != id);
        self.entries.len() != before
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn notify(&mut self, event: &ScheduledEvent) {
        for (_, observer) in self.entries.iter_mut() {
            if event.is_main_beat() {
                observer.on_beat(event.beat_index);
            }
            observer.on_subdivision(event.beat_index, event.subdivision_index);
        }
    }
}
