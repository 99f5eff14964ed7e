//! # Built-in default migrator.
//!
//! Selected when the configuration declares no migrator type. It performs no
//! data movement of its own: jobs are idempotent by design, and deployments
//! that only exercise the lock protocol (or that register their real
//! implementations under explicit names) use this as the neutral variant.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::WorkerGroupHandle;
use crate::error::MigratorError;

use super::migrator::{Migrator, MigratorBinding};
use super::registry::DEFAULT_MIGRATOR;

/// Neutral migrator: validates its binding and completes immediately.
pub struct DefaultMigrator {
    #[allow(dead_code)]
    group: WorkerGroupHandle,
    binding: Option<MigratorBinding>,
}

impl DefaultMigrator {
    /// Creates an unbound instance under the given supervision context.
    pub fn new(group: WorkerGroupHandle) -> Self {
        Self {
            group,
            binding: None,
        }
    }
}

#[async_trait]
impl Migrator for DefaultMigrator {
    fn name(&self) -> &str {
        DEFAULT_MIGRATOR
    }

    fn bind(&mut self, binding: MigratorBinding) {
        self.binding = Some(binding);
    }

    async fn migrate(&self, ctx: CancellationToken) -> Result<(), MigratorError> {
        let binding = self.binding.as_ref().ok_or(MigratorError::Fatal {
            error: "migrator was never bound".into(),
        })?;
        if ctx.is_cancelled() {
            return Err(MigratorError::Canceled);
        }

        // The binding invariant the protocol promises: the lock we were
        // handed is for the job we were handed.
        if binding.lock.job_id() != binding.job.job_id() {
            return Err(MigratorError::Fatal {
                error: "lock record does not match bound job".into(),
            });
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn group_handle() -> WorkerGroupHandle {
        WorkerGroupHandle::detached()
    }

    #[tokio::test]
    async fn test_unbound_migrator_is_fatal() {
        let migrator = DefaultMigrator::new(group_handle());
        let err = migrator
            .migrate(CancellationToken::new())
            .await
            .expect_err("unbound");
        assert!(matches!(err, MigratorError::Fatal { .. }));
    }

    #[tokio::test]
    async fn test_cancelled_before_start() {
        use crate::store::LockRecord;
        use crate::MigrationJob;

        let mut migrator = DefaultMigrator::new(group_handle());
        migrator.bind(MigratorBinding {
            controller: crate::core::ControllerHandle::detached(),
            job: MigrationJob::new("job-1"),
            lock: LockRecord::new("job-1"),
        });

        let token = CancellationToken::new();
        token.cancel();
        let err = migrator.migrate(token).await.expect_err("cancelled");
        assert!(matches!(err, MigratorError::Canceled));
    }
}
