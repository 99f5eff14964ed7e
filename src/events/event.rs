//! # Runtime events emitted by the controller and worker group.
//!
//! [`EventKind`] classifies events across three categories:
//! - **Lock protocol**: acquire/conflict/release outcomes per job.
//! - **Worker lifecycle**: start, finish, failure, removal from the group.
//! - **Controller lifecycle**: configuration reload and shutdown progress.
//!
//! [`Event`] carries the metadata: a wall-clock timestamp, a monotonic global
//! sequence number for ordering, and optional job/error fields depending on
//! the kind.
//!
//! ## Example
//! ```rust
//! use migvisor::{Event, EventKind};
//!
//! let ev = Event::new(EventKind::WorkerFailed)
//!     .with_job("job-42")
//!     .with_error("connection refused");
//!
//! assert_eq!(ev.kind, EventKind::WorkerFailed);
//! assert_eq!(ev.job.as_deref(), Some("job-42"));
//! assert_eq!(ev.error.as_deref(), Some("connection refused"));
//! ```

use std::sync::Arc;
use std::sync::atomic::{AtomicU64, Ordering as AtomicOrdering};
use std::time::SystemTime;

/// Global sequence counter for event ordering.
static EVENT_SEQ: AtomicU64 = AtomicU64::new(0);

/// Classification of runtime events.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EventKind {
    // === Lock protocol ===
    /// A lock record was created for a job; this controller owns it.
    ///
    /// Sets: `job`, `at`, `seq`.
    LockAcquired,

    /// A lock attempt did not produce a lock (uniqueness conflict, non-1
    /// modified count, or transport failure).
    ///
    /// Sets: `job`, `error` (failure label/message), `at`, `seq`.
    LockConflict,

    /// A lock record was deleted (or no matching record existed).
    ///
    /// Sets: `job`, `at`, `seq`.
    LockReleased,

    /// The store reported an error during release; the error was swallowed.
    ///
    /// Sets: `job`, `error`, `at`, `seq`.
    LockReleaseFailed,

    // === Worker lifecycle ===
    /// A migrator worker is starting under the group.
    ///
    /// Sets: `job`, `at`, `seq`.
    WorkerStarting,

    /// A worker ran its job to completion.
    ///
    /// Sets: `job`, `at`, `seq`.
    WorkerFinished,

    /// A worker failed (migrator error or panic).
    ///
    /// Sets: `job`, `error`, `at`, `seq`.
    WorkerFailed,

    /// A worker's entry was removed from the group after completion.
    ///
    /// Sets: `job`, `at`, `seq`.
    WorkerRemoved,

    // === Controller lifecycle ===
    /// Configuration was re-fetched successfully.
    ///
    /// Sets: `job` (configuration id), `at`, `seq`.
    ConfigReloaded,

    /// Configuration re-fetch failed; callers keep the previous value.
    ///
    /// Sets: `job` (configuration id), `error`, `at`, `seq`.
    ConfigReloadFailed,

    /// Controller shutdown was requested; workers are being cancelled.
    ///
    /// Sets: `at`, `seq`.
    ShutdownRequested,

    /// All workers finished within the configured grace period.
    ///
    /// Sets: `at`, `seq`.
    AllStoppedWithin,

    /// Grace period exceeded; some workers did not finish in time.
    ///
    /// Sets: `at`, `seq`.
    GraceExceeded,
}

/// Runtime event with optional metadata.
///
/// - `seq`: monotonic global sequence for ordering
/// - `at`: wall-clock timestamp (for logs)
/// - `job` / `error` are set depending on the [`EventKind`]
#[derive(Clone, Debug)]
pub struct Event {
    /// Globally unique, monotonically increasing sequence number.
    pub seq: u64,
    /// Wall-clock timestamp.
    pub at: SystemTime,
    /// Event classification.
    pub kind: EventKind,
    /// Job id (or configuration id for reload events), if applicable.
    pub job: Option<Arc<str>>,
    /// Human-readable error detail, if applicable.
    pub error: Option<Arc<str>>,
}

impl Event {
    /// Creates a new event of the given kind with the current timestamp and
    /// next sequence number.
    pub fn new(kind: EventKind) -> Self {
        Self {
            seq: EVENT_SEQ.fetch_add(1, AtomicOrdering::Relaxed),
            at: SystemTime::now(),
            kind,
            job: None,
            error: None,
        }
    }

    /// Attaches a job id.
    #[inline]
    pub fn with_job(mut self, job: impl Into<Arc<str>>) -> Self {
        self.job = Some(job.into());
        self
    }

    /// Attaches a human-readable error detail.
    #[inline]
    pub fn with_error(mut self, error: impl Into<Arc<str>>) -> Self {
        self.error = Some(error.into());
        self
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_sequence_is_monotonic() {
        let a = Event::new(EventKind::LockAcquired);
        let b = Event::new(EventKind::LockReleased);
        assert!(b.seq > a.seq);
    }

    #[test]
    fn test_builders_set_fields() {
        let ev = Event::new(EventKind::LockConflict)
            .with_job("job-9")
            .with_error("duplicate key");
        assert_eq!(ev.kind, EventKind::LockConflict);
        assert_eq!(ev.job.as_deref(), Some("job-9"));
        assert_eq!(ev.error.as_deref(), Some("duplicate key"));
    }

    #[test]
    fn test_fields_default_to_none() {
        let ev = Event::new(EventKind::ShutdownRequested);
        assert!(ev.job.is_none());
        assert!(ev.error.is_none());
    }
}
