//! # Named diagnostic checkpoints.
//!
//! A checkpoint is a named synchronization point the controller fires at
//! protocol edges — currently after every unlock attempt. Production behavior
//! is unaffected beyond a counter increment; concurrency tests use
//! [`Checkpoints::wait_for`] to line up deterministic interleavings between
//! controllers instead of sleeping.

use std::collections::HashMap;
use std::sync::Mutex;

use tokio::sync::Notify;

/// Checkpoint fired after every unlock attempt, success or failure.
pub const UNLOCK_CHECKPOINT: &str = "controller:unlock";

/// Registry of named checkpoint hit counters.
#[derive(Default)]
pub struct Checkpoints {
    hits: Mutex<HashMap<String, u64>>,
    notify: Notify,
}

impl Checkpoints {
    /// Creates an empty registry.
    pub fn new() -> Self {
        Self::default()
    }

    /// Records one hit of `name` and wakes any waiters.
    pub fn fire(&self, name: &str) {
        {
            let mut hits = self.hits.lock().expect("checkpoint map poisoned");
            *hits.entry(name.to_string()).or_insert(0) += 1;
        }
        self.notify.notify_waiters();
    }

    /// Number of times `name` has fired so far.
    pub fn hits(&self, name: &str) -> u64 {
        let hits = self.hits.lock().expect("checkpoint map poisoned");
        hits.get(name).copied().unwrap_or(0)
    }

    /// Waits until `name` has fired at least `count` times.
    pub async fn wait_for(&self, name: &str, count: u64) {
        loop {
            let notified = self.notify.notified();
            tokio::pin!(notified);
            // Register with the notify before re-checking the counter, so a
            // fire landing in between is not lost.
            notified.as_mut().enable();
            if self.hits(name) >= count {
                return;
            }
            notified.await;
        }
    }
}
