//! End-of-playback Signals
//!
//! A [`Signal`] is an opaque "fire" operation. Players call it from the audio
//! thread when they run out of data, so `fire()` must never block or allocate.

use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::Sender;

use crate::message::Event;

/// Something that can be fired from the audio thread
pub trait Signal: Send + Sync {
    fn fire(&self);
}

impl<F> Signal for F
where
    F: Fn() + Send + Sync,
{
    #[inline]
    fn fire(&self) {
        self()
    }
}

struct TriggerInner {
    fire_count: AtomicU64,
    listener: Option<Sender<Event>>,
}

/// Counting trigger with an optional event listener
///
/// Clones share the same state, so a control thread can keep a clone and
/// poll [`Trigger::fire_count`] while the player owns another.
#[derive(Clone)]
pub struct Trigger {
    inner: Arc<TriggerInner>,
}

impl Trigger {
    /// Create a trigger that only counts
    pub fn new() -> Self {
        Self {
            inner: Arc::new(TriggerInner {
                fire_count: AtomicU64::new(0),
                listener: None,
            }),
        }
    }

    /// Create a trigger that also sends [`Event::PlaybackEnded`] on each fire
    ///
    /// Delivery uses `try_send`: with a bounded channel that is full, or a
    /// dropped receiver, the notification is discarded (the count still moves).
    pub fn with_listener(listener: Sender<Event>) -> Self {
        Self {
            inner: Arc::new(TriggerInner {
                fire_count: AtomicU64::new(0),
                listener: Some(listener),
            }),
        }
    }

    /// Number of times this trigger has fired
    pub fn fire_count(&self) -> u64 {
        self.inner.fire_count.load(Ordering::Acquire)
    }

    pub fn has_fired(&self) -> bool {
        self.fire_count() > 0
    }
}

impl Default for Trigger {
    fn default() -> Self {
        Self::new()
    }
}

impl std::fmt::Debug for Trigger {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Trigger")
            .field("fire_count", &self.fire_count())
            .field("has_listener", &self.inner.listener.is_some())
            .finish()
    }
}

impl Signal for Trigger {
    fn fire(&self) {
        self.inner.fire_count.fetch_add(1, Ordering::AcqRel);
        if let Some(listener) = &self.inner.listener {
            let _ = listener.try_send(Event::PlaybackEnded);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicBool;

    #[test]
    fn test_trigger_counts() {
        let trigger = Trigger::new();
        assert!(!trigger.has_fired());

        trigger.fire();
        trigger.fire();
        assert_eq!(trigger.fire_count(), 2);
    }

    #[test]
    fn test_clones_share_state() {
        let trigger = Trigger::new();
        let observer = trigger.clone();

        trigger.fire();
        assert_eq!(observer.fire_count(), 1);
    }

    #[test]
    fn test_listener_receives_event() {
        let (sender, receiver) = crossbeam_channel::bounded(4);
        let trigger = Trigger::with_listener(sender);

        trigger.fire();
        assert!(matches!(receiver.try_recv(), Ok(Event::PlaybackEnded)));
        assert!(receiver.try_recv().is_err());
    }

    #[test]
    fn test_full_listener_does_not_block() {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        let trigger = Trigger::with_listener(sender);

        trigger.fire();
        trigger.fire();
        assert_eq!(trigger.fire_count(), 2);
        assert_eq!(receiver.len(), 1);
    }

    #[test]
    fn test_dropped_listener_is_ignored() {
        let (sender, receiver) = crossbeam_channel::bounded(1);
        drop(receiver);
        let trigger = Trigger::with_listener(sender);

        trigger.fire();
        assert_eq!(trigger.fire_count(), 1);
    }

    #[test]
    fn test_closure_signal() {
        let flag = Arc::new(AtomicBool::new(false));
        let flag_clone = Arc::clone(&flag);
        let signal: Arc<dyn Signal> = Arc::new(move || flag_clone.store(true, Ordering::Relaxed));

        signal.fire();
        assert!(flag.load(Ordering::Relaxed));
    }
}
