//! # Migrator trait, binding bundle, and factory type.
//!
//! Construction and binding follow a fixed order, because later steps may
//! depend on the supervision context established by the first:
//!
//! 1. The factory builds the migrator from a [`WorkerGroupHandle`]
//!    (supervision context: group cancellation token and event bus).
//! 2. [`Migrator::bind`] attaches the [`MigratorBinding`]: the owning
//!    controller's handle (for callbacks such as configuration reload), the
//!    job to execute, and the lock record proving exclusive ownership.
//! 3. The worker group runs [`Migrator::migrate`] as its own task; it must
//!    never block the caller that created it.
//!
//! Completion is observable on the event bus: the group publishes
//! `WorkerFinished` / `WorkerFailed` for every run, which is what lets the
//! controller release the lock.

use async_trait::async_trait;
use tokio_util::sync::CancellationToken;

use crate::core::{ControllerHandle, WorkerGroupHandle};
use crate::error::MigratorError;
use crate::store::LockRecord;

use super::job::MigrationJob;

/// Everything a migrator learns after construction: who owns it, what to
/// migrate, and the claim proving it may.
#[derive(Clone)]
pub struct MigratorBinding {
    /// Handle to the owning controller, for callbacks such as
    /// [`reload_configuration`](ControllerHandle::reload_configuration).
    pub controller: ControllerHandle,
    /// The job to execute.
    pub job: MigrationJob,
    /// The lock record this controller holds for the job.
    pub lock: LockRecord,
}

/// # Polymorphic migration worker.
///
/// Implementations are resolved by name through the
/// [`MigratorRegistry`](super::MigratorRegistry) and executed under the
/// controller's worker group. `migrate` receives a cancellation token derived
/// from the group; implementations should check it at safe points and exit
/// promptly with [`MigratorError::Canceled`] during shutdown.
///
/// # Example
/// ```
/// use async_trait::async_trait;
/// use tokio_util::sync::CancellationToken;
/// use migvisor::{Migrator, MigratorBinding, MigratorError};
///
/// struct NoopMigrator {
///     binding: Option<MigratorBinding>,
/// }
///
/// #[async_trait]
/// impl Migrator for NoopMigrator {
///     fn name(&self) -> &str { "noop" }
///
///     fn bind(&mut self, binding: MigratorBinding) {
///         self.binding = Some(binding);
///     }
///
///     async fn migrate(&self, ctx: CancellationToken) -> Result<(), MigratorError> {
///         if ctx.is_cancelled() {
///             return Err(MigratorError::Canceled);
///         }
///         // move data...
///         Ok(())
///     }
/// }
/// ```
#[async_trait]
pub trait Migrator: Send + Sync + 'static {
    /// Stable implementation name (matches its registry key).
    fn name(&self) -> &str;

    /// Attaches controller, job, and lock after construction.
    ///
    /// Called exactly once, before `migrate`.
    fn bind(&mut self, binding: MigratorBinding);

    /// Runs the bound job to completion or cancellation.
    async fn migrate(&self, ctx: CancellationToken) -> Result<(), MigratorError>;
}

/// Factory producing a migrator from the supervision context.
///
/// Stored in the [`MigratorRegistry`](super::MigratorRegistry) under the
/// implementation name. A factory may fail (missing prerequisites, bad
/// configuration); the failure propagates as
/// [`ControllerError::MigratorInit`](crate::ControllerError::MigratorInit)
/// and the caller remains responsible for the lock it already holds.
pub type MigratorFactory = std::sync::Arc<
    dyn Fn(WorkerGroupHandle) -> Result<Box<dyn Migrator>, MigratorError> + Send + Sync,
>;
