//! Error types used by the migvisor controller, store boundary, and migrators.
//!
//! Four enums cover the failure taxonomy:
//!
//! - [`StoreError`] — failures reported by the remote coordination store.
//! - [`ControllerError`] — fatal construction and worker-instantiation failures.
//! - [`MigratorError`] — failures raised by individual migrator executions.
//! - [`GroupError`] — worker-group shutdown failures.
//!
//! Lock acquisition, lock release, and configuration reload deliberately do
//! **not** surface [`StoreError`] to callers: `lock` and `reload_configuration`
//! collapse every store failure into a `None` result, and `unlock` swallows
//! them after publishing an event. The polling layer above the controller can
//! therefore always make forward progress by skipping jobs it cannot lock.

use std::time::Duration;
use thiserror::Error;

/// # Errors reported by the remote coordination store.
///
/// The store boundary is the only place transport and backend failures enter
/// the system. The controller maps all of them to null-result outcomes.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum StoreError {
    /// Uniqueness constraint violation: a record with the same key already
    /// exists. For lock records this means another controller holds the lock.
    #[error("duplicate key: {key}")]
    Duplicate {
        /// The conflicting key (job id for lock records).
        key: String,
    },

    /// The remote call itself failed (network, timeout, protocol).
    #[error("transport failure: {error}")]
    Transport {
        /// The underlying transport error message.
        error: String,
    },

    /// The requested record does not exist.
    #[error("not found: {id}")]
    NotFound {
        /// Identifier of the missing record.
        id: String,
    },

    /// The store accepted the call but reported an error of its own.
    #[error("backend error: {error}")]
    Backend {
        /// The backend error message.
        error: String,
    },
}

impl StoreError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            StoreError::Duplicate { .. } => "store_duplicate",
            StoreError::Transport { .. } => "store_transport",
            StoreError::NotFound { .. } => "store_not_found",
            StoreError::Backend { .. } => "store_backend",
        }
    }

    /// True when the error is the uniqueness-violation case.
    ///
    /// For lock inserts this is the "another controller already holds the
    /// lock" signal, as opposed to an infrastructure failure.
    pub fn is_conflict(&self) -> bool {
        matches!(self, StoreError::Duplicate { .. })
    }
}

/// # Errors raised by controller construction and worker instantiation.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum ControllerError {
    /// The configuration names a migrator type that is not registered.
    ///
    /// Fatal at construction: the controller must not start with an
    /// unresolvable worker type.
    #[error("unknown migrator type: {name}")]
    UnknownMigratorType {
        /// The unresolvable type name from the configuration.
        name: String,
    },

    /// Migrator construction or binding failed after a lock was acquired.
    ///
    /// Surfaced to the caller, which still holds the lock and is responsible
    /// for releasing it.
    #[error("cannot create migrator for job {job}: {error}")]
    MigratorInit {
        /// Job whose worker could not be built.
        job: String,
        /// The underlying initialization error message.
        error: String,
    },
}

impl ControllerError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            ControllerError::UnknownMigratorType { .. } => "controller_unknown_migrator_type",
            ControllerError::MigratorInit { .. } => "controller_migrator_init",
        }
    }
}

/// # Errors produced by migrator execution.
///
/// Raised by individual workers running under the worker group. The group
/// reports them on the event bus; they never cross the lock protocol.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum MigratorError {
    /// Migration failed but may succeed if the job is retried later.
    #[error("migration failed: {error}")]
    Fail {
        /// The underlying error message.
        error: String,
    },

    /// Non-recoverable fatal error (the job should not be retried as-is).
    #[error("fatal migration error: {error}")]
    Fatal {
        /// The underlying error message.
        error: String,
    },

    /// Worker observed cancellation and exited early.
    #[error("migration cancelled")]
    Canceled,
}

impl MigratorError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            MigratorError::Fail { .. } => "migrator_failed",
            MigratorError::Fatal { .. } => "migrator_fatal",
            MigratorError::Canceled => "migrator_canceled",
        }
    }

    /// Indicates whether a scheduler may safely re-run the job.
    pub fn is_retryable(&self) -> bool {
        matches!(self, MigratorError::Fail { .. })
    }
}

/// # Errors produced by worker-group shutdown.
#[non_exhaustive]
#[derive(Error, Debug)]
pub enum GroupError {
    /// Join grace period was exceeded; some workers remained stuck.
    #[error("join grace {grace:?} exceeded; stuck: {stuck:?}")]
    GraceExceeded {
        /// The configured grace duration.
        grace: Duration,
        /// Job ids of workers that did not finish in time.
        stuck: Vec<String>,
    },
}

impl GroupError {
    /// Returns a short stable label (snake_case) for use in logs/metrics.
    pub fn as_label(&self) -> &'static str {
        match self {
            GroupError::GraceExceeded { .. } => "group_grace_exceeded",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_store_error_labels() {
        let dup = StoreError::Duplicate { key: "job-1".into() };
        assert_eq!(dup.as_label(), "store_duplicate");
        assert!(dup.is_conflict());

        let tr = StoreError::Transport { error: "refused".into() };
        assert_eq!(tr.as_label(), "store_transport");
        assert!(!tr.is_conflict());
    }

    #[test]
    fn test_migrator_error_retryability() {
        assert!(MigratorError::Fail { error: "boom".into() }.is_retryable());
        assert!(!MigratorError::Fatal { error: "nope".into() }.is_retryable());
        assert!(!MigratorError::Canceled.is_retryable());
    }

    #[test]
    fn test_display_includes_detail() {
        let err = ControllerError::MigratorInit {
            job: "job-7".into(),
            error: "missing credentials".into(),
        };
        let text = err.to_string();
        assert!(text.contains("job-7"));
        assert!(text.contains("missing credentials"));
    }
}
