//! # Event bus for broadcasting runtime events.
//!
//! [`Bus`] is a thin wrapper around [`tokio::sync::broadcast`] that provides
//! non-blocking event publishing from multiple sources (controller, worker
//! group, workers).
//!
//! ## Rules
//! - **Non-blocking publish**: `publish()` never blocks or fails.
//! - **Bounded capacity**: a single ring buffer stores recent events.
//! - **Lag handling**: slow receivers get `RecvError::Lagged(n)` and skip
//!   the `n` oldest items.
//! - **No persistence**: events are dropped when no receiver is subscribed.

use tokio::sync::broadcast;

use super::event::Event;

/// Broadcast channel for runtime events.
///
/// Cheap to clone (internally holds an `Arc`-backed sender); every component
/// that needs to report holds its own clone.
#[derive(Clone, Debug)]
pub struct Bus {
    tx: broadcast::Sender<Event>,
}

impl Bus {
    /// Creates a new bus with the given channel capacity (clamped to ≥ 1).
    pub fn new(capacity: usize) -> Self {
        let (tx, _rx) = broadcast::channel::<Event>(capacity.max(1));
        Self { tx }
    }

    /// Publishes an event to all active subscribers.
    ///
    /// If there are no receivers the event is dropped; publishing still
    /// returns immediately.
    pub fn publish(&self, ev: Event) {
        let _ = self.tx.send(ev);
    }

    /// Creates a new receiver observing subsequent events.
    ///
    /// A receiver only sees events sent **after** it subscribes.
    pub fn subscribe(&self) -> broadcast::Receiver<Event> {
        self.tx.subscribe()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::EventKind;

    #[tokio::test]
    async fn test_publish_reaches_subscriber() {
        let bus = Bus::new(8);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::LockAcquired).with_job("job-1"));

        let ev = rx.recv().await.expect("event");
        assert_eq!(ev.kind, EventKind::LockAcquired);
        assert_eq!(ev.job.as_deref(), Some("job-1"));
    }

    #[tokio::test]
    async fn test_publish_without_subscribers_is_noop() {
        let bus = Bus::new(8);
        // Must not panic or block.
        bus.publish(Event::new(EventKind::LockReleased));
    }

    #[tokio::test]
    async fn test_capacity_is_clamped() {
        let bus = Bus::new(0);
        let mut rx = bus.subscribe();
        bus.publish(Event::new(EventKind::WorkerStarting));
        assert!(rx.recv().await.is_ok());
    }
}
