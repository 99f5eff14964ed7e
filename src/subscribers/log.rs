//! # Simple logging subscriber for debugging and demos.
//!
//! [`LogWriter`] prints events to stdout in a human-readable format.
//!
//! ## Output format
//! ```text
//! [lock-acquired] job=job-42
//! [lock-conflict] job=job-42 err="duplicate key: job-42"
//! [worker-starting] job=job-42
//! [worker-failed] job=job-42 err="migration failed: connection refused"
//! [lock-released] job=job-42
//! [shutdown-requested]
//! ```
//!
//! Enabled via the `logging` feature. Not intended for production use —
//! implement a custom [`Subscribe`] for structured logging or metrics.

use async_trait::async_trait;

use crate::events::{Event, EventKind};
use crate::subscribers::Subscribe;

/// Stdout logging subscriber.
pub struct LogWriter;

#[async_trait]
impl Subscribe for LogWriter {
    async fn on_event(&self, e: &Event) {
        let job = e.job.as_deref().unwrap_or("-");
        match e.kind {
            EventKind::LockAcquired => println!("[lock-acquired] job={job}"),
            EventKind::LockConflict => {
                println!("[lock-conflict] job={job} err={:?}", e.error)
            }
            EventKind::LockReleased => println!("[lock-released] job={job}"),
            EventKind::LockReleaseFailed => {
                println!("[lock-release-failed] job={job} err={:?}", e.error)
            }
            EventKind::WorkerStarting => println!("[worker-starting] job={job}"),
            EventKind::WorkerFinished => println!("[worker-finished] job={job}"),
            EventKind::WorkerFailed => {
                println!("[worker-failed] job={job} err={:?}", e.error)
            }
            EventKind::WorkerRemoved => println!("[worker-removed] job={job}"),
            EventKind::ConfigReloaded => println!("[config-reloaded] id={job}"),
            EventKind::ConfigReloadFailed => {
                println!("[config-reload-failed] id={job} err={:?}", e.error)
            }
            EventKind::ShutdownRequested => println!("[shutdown-requested]"),
            EventKind::AllStoppedWithin => println!("[all-stopped-within-grace]"),
            EventKind::GraceExceeded => println!("[grace-exceeded]"),
        }
    }
}
