//! # Subscriber trait for runtime events.
//!
//! Subscribers attached through the controller builder receive every event
//! published on the bus — lock protocol outcomes, worker lifecycle, reload
//! and shutdown progress — from a dedicated listener task. Implement this for
//! logging, metrics, or test instrumentation.

use async_trait::async_trait;

use crate::events::Event;

/// # Asynchronous event consumer.
///
/// Handlers run sequentially on the listener task; keep them short or hand
/// work off internally so one slow subscriber does not delay the rest.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use migvisor::{Event, EventKind, Subscribe};
///
/// struct ConflictCounter(std::sync::atomic::AtomicU64);
///
/// #[async_trait]
/// impl Subscribe for ConflictCounter {
///     async fn on_event(&self, event: &Event) {
///         if event.kind == EventKind::LockConflict {
///             self.0.fetch_add(1, std::sync::atomic::Ordering::Relaxed);
///         }
///     }
/// }
/// ```
#[async_trait]
pub trait Subscribe: Send + Sync {
    /// Handles one runtime event.
    async fn on_event(&self, event: &Event);
}
