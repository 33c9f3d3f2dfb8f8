//! Notification queue (spec §6): a bounded, priority-and-sequence-ordered
//! pub/sub channel, specialized from `event_bus::EventBusImpl` to the
//! engine's own `Notification` enum. `EventBusImpl::drain`'s
//! priority-desc/seq-asc sort already satisfies the ordering requirement
//! in §5(c): events affecting the same cue are delivered in the order
//! they occurred.

use event_bus::EventBusImpl;

#[derive(Debug, Clone, Copy, PartialEq)]
pub enum Notification {
    MarkerReached { cue: u64, marker_id: u32 },
    CueStop { cue: u64 },
    CueDestroyed { cue: u64 },
    SoundBankDestroyed { bank: u32 },
    WaveBankPrepared { wave_bank: u32 },
}

pub struct NotificationQueue {
    bus: EventBusImpl,
}

impl NotificationQueue {
    pub fn new(capacity: usize) -> Self {
        Self {
            bus: EventBusImpl::with_capacity(capacity),
        }
    }

    /// Enqueues `n`. Drops silently (counted by the underlying bus) if the
    /// queue is full rather than blocking the audio thread.
    pub fn publish(&self, n: Notification) {
        let _ = self.bus.try_publish_with_priority(n, 0);
    }

    pub fn subscribe<F>(&self, handler: F) -> event_bus::SubscriptionId
    where
        F: Fn(&Notification) + Send + Sync + 'static,
    {
        self.bus.subscribe(handler)
    }

    pub fn unsubscribe(&self, id: event_bus::SubscriptionId) {
        self.bus.unsubscribe(id);
    }

    /// Delivers every queued notification to current subscribers, in
    /// FIFO order. Call once per control-thread tick.
    pub fn drain(&self) {
        self.bus.drain();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::{Arc, Mutex};

    #[test]
    fn delivers_in_order() {
        let q = NotificationQueue::new(16);
        let seen = Arc::new(Mutex::new(Vec::new()));
        let seen2 = seen.clone();
        q.subscribe(move |n| seen2.lock().unwrap().push(*n));
        q.publish(Notification::CueStop { cue: 1 });
        q.publish(Notification::CueDestroyed { cue: 1 });
        q.drain();
        let got = seen.lock().unwrap();
        assert_eq!(got.len(), 2);
        assert!(matches!(got[0], Notification::CueStop { cue: 1 }));
        assert!(matches!(got[1], Notification::CueDestroyed { cue: 1 }));
    }
}
