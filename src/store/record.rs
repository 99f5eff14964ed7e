//! # Lock record entity and insert outcome.
//!
//! A [`LockRecord`] represents one active exclusive claim on one job. At most
//! one record per job id may exist in the store at any time; that invariant
//! is enforced by the store's uniqueness constraint, never by client-side
//! coordination.

use std::sync::Arc;
use std::time::{Duration, SystemTime};

/// One active execution claim on a migration job.
///
/// Created by the controller at lock-attempt time and destroyed by the
/// controller when the owning worker finishes or is abandoned. Exclusively
/// owned by the controller that created it for the duration of the worker's
/// run.
///
/// A controller crash leaves the record orphaned; an external reaper can use
/// [`age`](LockRecord::age) against the expected execution duration to decide
/// when a claim is stale.
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct LockRecord {
    job_id: Arc<str>,
    start_time: SystemTime,
}

impl LockRecord {
    /// Creates a claim on `job_id` timestamped now.
    pub fn new(job_id: impl Into<Arc<str>>) -> Self {
        Self {
            job_id: job_id.into(),
            start_time: SystemTime::now(),
        }
    }

    /// Identifier of the locked job. Immutable once created.
    pub fn job_id(&self) -> &str {
        &self.job_id
    }

    /// Timestamp of claim creation.
    pub fn start_time(&self) -> SystemTime {
        self.start_time
    }

    /// Time elapsed since the claim was created.
    ///
    /// Clock skew between controller and store hosts can make this zero even
    /// for an old record; reapers should treat it as a lower bound.
    pub fn age(&self) -> Duration {
        self.start_time.elapsed().unwrap_or(Duration::ZERO)
    }
}

/// Result of a create-if-absent lock insert.
///
/// Mirrors the store's own report: how many records the call created, and
/// the authoritative persisted version of the record (which may include
/// store-assigned fields). The lock protocol treats `modified_count == 1` as
/// the sole success condition.
#[derive(Clone, Debug)]
pub struct InsertOutcome {
    /// Number of records the insert created. Exactly 1 on success.
    pub modified_count: u64,
    /// The persisted record as the store sees it, when available.
    pub record: Option<LockRecord>,
}
