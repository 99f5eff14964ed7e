//! # Controller: the exclusive-execution core.
//!
//! The controller owns the lock protocol, the resolved migrator factory, and
//! the worker group supervising running migrators. Several controllers —
//! typically one per process — share a remote store; the store's uniqueness
//! constraint on job ids is the only cross-controller coordination.
//!
//! ## Control flow
//! ```text
//! process(job)
//!   ├─► lock(job_id) ──────────────► store.insert_lock (create-if-absent)
//!   │       ├─ modified_count == 1 → LockRecord (authoritative copy)
//!   │       └─ conflict / transport error → None → Ok(false), skip job
//!   ├─► create_migrator(job, lock)
//!   │       ├─ factory(group.handle()) then bind(controller, job, lock)
//!   │       └─ Err → unlock(job_id), propagate MigratorInit
//!   └─► group.spawn(worker, on_complete = unlock(job_id))
//!           └─ worker exits (any path) → lock released → checkpoint fires
//! ```
//!
//! ## Rules
//! - `lock` is optimistic: no pre-check query. The insert either creates the
//!   record atomically or reports a conflict; check-then-act races between
//!   controllers cannot happen.
//! - `lock`, `unlock`, and `reload_configuration` never raise to the polling
//!   layer; failures are visible only through events and null results.
//! - The migrator factory is resolved once, at construction. Reload does not
//!   change it for in-flight or future work of this controller instance.

use std::sync::{Arc, Weak};

use tokio::sync::broadcast;
use tokio_util::sync::CancellationToken;

use crate::config::{ControllerConfig, MigrationConfiguration};
use crate::error::{ControllerError, GroupError};
use crate::events::{Bus, Event, EventKind};
use crate::migrators::{MigrationJob, Migrator, MigratorBinding, MigratorFactory, MigratorRegistry};
use crate::store::{LockRecord, RemoteStore};
use crate::subscribers::Subscribe;

use super::checkpoint::{Checkpoints, UNLOCK_CHECKPOINT};
use super::group::WorkerGroup;

/// Coordinates exclusive job execution against a shared remote store.
///
/// Build via [`Controller::builder`]; construction fails when the
/// configuration names an unregistered migrator type.
pub struct Controller {
    configuration: MigrationConfiguration,
    store: Arc<dyn RemoteStore>,
    factory: MigratorFactory,
    group: Arc<WorkerGroup>,
    bus: Bus,
    checkpoints: Arc<Checkpoints>,
    token: CancellationToken,
}

impl Controller {
    /// Starts building a controller for `configuration` against `store`.
    pub fn builder(
        configuration: MigrationConfiguration,
        store: Arc<dyn RemoteStore>,
    ) -> ControllerBuilder {
        ControllerBuilder::new(configuration, store)
    }

    /// The configuration this controller was constructed with.
    pub fn configuration(&self) -> &MigrationConfiguration {
        &self.configuration
    }

    /// The worker group supervising this controller's migrators.
    pub fn group(&self) -> &Arc<WorkerGroup> {
        &self.group
    }

    /// The event bus; subscribe for lock and worker lifecycle events.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Diagnostic checkpoint registry.
    pub fn checkpoints(&self) -> &Arc<Checkpoints> {
        &self.checkpoints
    }

    /// Returns a weak handle for migrator callbacks.
    pub fn handle(self: &Arc<Self>) -> ControllerHandle {
        ControllerHandle {
            inner: Arc::downgrade(self),
        }
    }

    /// Attempts to lock a migration job.
    ///
    /// Submits a fresh [`LockRecord`] as a create-if-absent insert. The store
    /// reporting exactly one created record is the sole success condition; on
    /// success the store's authoritative version of the record is returned.
    ///
    /// Everything else — uniqueness conflict, a modified count other than 1,
    /// or a transport failure — yields `None`. The caller treats `None` as
    /// "try another job"; it is never fatal.
    pub async fn lock(&self, job_id: &str) -> Option<LockRecord> {
        let record = LockRecord::new(job_id);

        match self.store.insert_lock(&record).await {
            Ok(outcome) if outcome.modified_count == 1 => {
                self.bus
                    .publish(Event::new(EventKind::LockAcquired).with_job(job_id));
                Some(outcome.record.unwrap_or(record))
            }
            Ok(outcome) => {
                self.bus.publish(
                    Event::new(EventKind::LockConflict)
                        .with_job(job_id)
                        .with_error(format!("modified count {}", outcome.modified_count)),
                );
                None
            }
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::LockConflict)
                        .with_job(job_id)
                        .with_error(e.to_string()),
                );
                None
            }
        }
    }

    /// Releases the lock for a job. Best-effort and idempotent.
    ///
    /// Deletes every lock record matching `job_id` (normally exactly one;
    /// zero when the lock was already released). Store errors are published
    /// as [`EventKind::LockReleaseFailed`] and swallowed: failing to unlock
    /// must never crash the controller — an orphaned record is an operational
    /// condition for an external reaper, not a fatal one.
    ///
    /// The [`UNLOCK_CHECKPOINT`] fires after every attempt, success or
    /// failure.
    pub async fn unlock(&self, job_id: &str) {
        match self.store.delete_locks(job_id).await {
            Ok(_deleted) => {
                self.bus
                    .publish(Event::new(EventKind::LockReleased).with_job(job_id));
            }
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::LockReleaseFailed)
                        .with_job(job_id)
                        .with_error(e.to_string()),
                );
            }
        }
        self.checkpoints.fire(UNLOCK_CHECKPOINT);
    }

    /// Builds a migrator bound to `job` and the `lock` proving ownership.
    ///
    /// The factory was resolved at construction; this instantiates it with
    /// the group's supervision context and then binds controller handle, job,
    /// and lock — in that order, since binding may depend on the supervision
    /// context established first.
    ///
    /// An instantiation error propagates: job processing cannot proceed
    /// without a valid worker, and the caller still holds the lock and must
    /// release it.
    pub fn create_migrator(
        self: &Arc<Self>,
        job: MigrationJob,
        lock: LockRecord,
    ) -> Result<Box<dyn Migrator>, ControllerError> {
        let mut migrator =
            (self.factory)(self.group.handle()).map_err(|e| ControllerError::MigratorInit {
                job: job.job_id().to_string(),
                error: e.to_string(),
            })?;
        migrator.bind(MigratorBinding {
            controller: self.handle(),
            job,
            lock,
        });
        Ok(migrator)
    }

    /// Re-fetches this controller's configuration from the store.
    ///
    /// Returns `None` on any failure; callers keep using the previous
    /// configuration in that case. A successful reload does not change the
    /// already-resolved migrator factory.
    pub async fn reload_configuration(&self) -> Option<MigrationConfiguration> {
        let id = self.configuration.configuration_id();
        match self.store.fetch_configuration(id).await {
            Ok(configuration) => {
                self.bus
                    .publish(Event::new(EventKind::ConfigReloaded).with_job(id));
                Some(configuration)
            }
            Err(e) => {
                self.bus.publish(
                    Event::new(EventKind::ConfigReloadFailed)
                        .with_job(id)
                        .with_error(e.to_string()),
                );
                None
            }
        }
    }

    /// Locks `job` and, on success, runs a migrator for it under the group.
    ///
    /// Returns `Ok(false)` when the lock was not acquired (another controller
    /// holds it, or the store was unreachable) — the caller simply moves on.
    /// Returns `Ok(true)` once a worker is running; its completion releases
    /// the lock on every exit path.
    ///
    /// A migrator instantiation failure releases the just-acquired lock
    /// before propagating, so no orphan record is left behind.
    pub async fn process(self: &Arc<Self>, job: MigrationJob) -> Result<bool, ControllerError> {
        let job_id = job.job_id().to_string();
        let Some(lock) = self.lock(&job_id).await else {
            return Ok(false);
        };

        let migrator = match self.create_migrator(job, lock) {
            Ok(migrator) => migrator,
            Err(e) => {
                self.unlock(&job_id).await;
                return Err(e);
            }
        };

        let me = Arc::clone(self);
        let id = job_id.clone();
        let spawned = self
            .group
            .spawn(&job_id, migrator, move || async move {
                me.unlock(&id).await;
            })
            .await;

        if !spawned {
            // A previous worker for this job is still tearing down; give the
            // lock back rather than strand it.
            self.unlock(&job_id).await;
            return Ok(false);
        }
        Ok(true)
    }

    /// Graceful shutdown: cancel workers, join with grace, stop listeners.
    pub async fn shutdown(&self) -> Result<(), GroupError> {
        self.bus.publish(Event::new(EventKind::ShutdownRequested));
        self.group.cancel_all();
        let result = self.group.join_all().await;
        self.token.cancel();
        result
    }
}

/// Weak handle to a controller, held by migrators for callbacks.
///
/// Holding it weakly keeps a long-running worker from extending its
/// controller's lifetime. Every callback degrades to a null result once the
/// controller is gone.
#[derive(Clone)]
pub struct ControllerHandle {
    inner: Weak<Controller>,
}

impl ControllerHandle {
    /// Handle attached to no controller; for constructing bindings in tests.
    pub fn detached() -> Self {
        Self { inner: Weak::new() }
    }

    /// Re-fetches the owning controller's configuration.
    ///
    /// `None` when the reload failed **or** the controller is gone; either
    /// way the caller keeps its previous configuration.
    pub async fn reload_configuration(&self) -> Option<MigrationConfiguration> {
        match self.inner.upgrade() {
            Some(controller) => controller.reload_configuration().await,
            None => None,
        }
    }

    /// The configuration the owning controller was constructed with.
    pub fn configuration(&self) -> Option<MigrationConfiguration> {
        self.inner
            .upgrade()
            .map(|controller| controller.configuration().clone())
    }
}

/// Builder for a [`Controller`] with optional observability hooks.
pub struct ControllerBuilder {
    configuration: MigrationConfiguration,
    store: Arc<dyn RemoteStore>,
    config: ControllerConfig,
    registry: MigratorRegistry,
    subscribers: Vec<Arc<dyn Subscribe>>,
    checkpoints: Option<Arc<Checkpoints>>,
}

impl ControllerBuilder {
    /// Creates a builder with default runtime settings and an empty-but-for-
    /// the-default migrator registry.
    pub fn new(configuration: MigrationConfiguration, store: Arc<dyn RemoteStore>) -> Self {
        Self {
            configuration,
            store,
            config: ControllerConfig::default(),
            registry: MigratorRegistry::new(),
            subscribers: Vec::new(),
            checkpoints: None,
        }
    }

    /// Sets local runtime settings (grace period, bus capacity).
    pub fn with_config(mut self, config: ControllerConfig) -> Self {
        self.config = config;
        self
    }

    /// Replaces the migrator registry.
    ///
    /// The configuration's declared type is resolved against this registry
    /// during [`build`](ControllerBuilder::build).
    pub fn with_registry(mut self, registry: MigratorRegistry) -> Self {
        self.registry = registry;
        self
    }

    /// Attaches event subscribers, served by a dedicated listener task.
    pub fn with_subscribers(mut self, subscribers: Vec<Arc<dyn Subscribe>>) -> Self {
        self.subscribers = subscribers;
        self
    }

    /// Shares a checkpoint registry, usually between test controllers.
    pub fn with_checkpoints(mut self, checkpoints: Arc<Checkpoints>) -> Self {
        self.checkpoints = Some(checkpoints);
        self
    }

    /// Builds the controller.
    ///
    /// Fails with [`ControllerError::UnknownMigratorType`] when the
    /// configuration declares a type the registry does not know — the
    /// controller must not start with an unresolvable worker type.
    pub fn build(self) -> Result<Arc<Controller>, ControllerError> {
        // Resolve before wiring anything: resolution failure is fatal.
        let factory = self.registry.resolve(self.configuration.migrator_type())?;

        let bus = Bus::new(self.config.bus_capacity_clamped());
        let token = CancellationToken::new();
        let group = WorkerGroup::new(bus.clone(), token.child_token(), self.config.grace);

        if !self.subscribers.is_empty() {
            spawn_subscriber_listener(bus.subscribe(), self.subscribers, token.clone());
        }

        Ok(Arc::new(Controller {
            configuration: self.configuration,
            store: self.store,
            factory,
            group,
            bus,
            checkpoints: self.checkpoints.unwrap_or_default(),
            token,
        }))
    }
}

/// Forwards bus events to the attached subscribers until cancellation.
pub(crate) fn spawn_subscriber_listener(
    mut rx: broadcast::Receiver<Event>,
    subscribers: Vec<Arc<dyn Subscribe>>,
    token: CancellationToken,
) {
    tokio::spawn(async move {
        loop {
            tokio::select! {
                _ = token.cancelled() => break,
                msg = rx.recv() => match msg {
                    Ok(ev) => {
                        for subscriber in &subscribers {
                            subscriber.on_event(&ev).await;
                        }
                    }
                    Err(broadcast::error::RecvError::Closed) => break,
                    Err(broadcast::error::RecvError::Lagged(_)) => continue,
                }
            }
        }
    });
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::Arc;

    use crate::core::checkpoint::UNLOCK_CHECKPOINT;
    use crate::error::MigratorError;
    use crate::store::MemoryStore;

    fn controller_for(store: &Arc<MemoryStore>) -> Arc<Controller> {
        Controller::builder(
            MigrationConfiguration::new("cfg-test"),
            Arc::clone(store) as Arc<dyn RemoteStore>,
        )
        .build()
        .expect("controller")
    }

    /// Migrator that runs until its token is cancelled.
    struct BlockingMigrator;

    #[async_trait]
    impl Migrator for BlockingMigrator {
        fn name(&self) -> &str {
            "blocking"
        }
        fn bind(&mut self, _binding: MigratorBinding) {}
        async fn migrate(
            &self,
            ctx: CancellationToken,
        ) -> Result<(), MigratorError> {
            ctx.cancelled().await;
            Err(MigratorError::Canceled)
        }
    }

    #[tokio::test]
    async fn test_mutual_exclusion_between_controllers() {
        let store = Arc::new(MemoryStore::new());
        let first = controller_for(&store);
        let second = controller_for(&store);

        let lock = first.lock("job-42").await.expect("first wins");
        assert_eq!(lock.job_id(), "job-42");
        assert!(second.lock("job-42").await.is_none());

        // Exclusion ends with release.
        first.unlock("job-42").await;
        assert!(second.lock("job-42").await.is_some());
    }

    #[tokio::test]
    async fn test_unlock_is_idempotent_and_fires_checkpoint() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_for(&store);

        // No lock exists for this job; both calls must complete quietly.
        controller.unlock("job-42").await;
        controller.unlock("job-42").await;
        assert_eq!(controller.checkpoints().hits(UNLOCK_CHECKPOINT), 2);
    }

    #[tokio::test]
    async fn test_unlock_swallows_store_error_and_fires_checkpoint() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_for(&store);
        let mut rx = controller.bus().subscribe();

        assert!(controller.lock("job-6").await.is_some());
        store.set_unreachable(true);

        // The delete fails at the store, but unlock must complete quietly.
        controller.unlock("job-6").await;
        assert_eq!(controller.checkpoints().hits(UNLOCK_CHECKPOINT), 1);

        // The record stays orphaned for an external reaper to collect.
        assert_eq!(store.lock_count(), 1);

        let mut saw_release_failed = false;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::LockReleaseFailed {
                assert_eq!(ev.job.as_deref(), Some("job-6"));
                saw_release_failed = true;
            }
        }
        assert!(saw_release_failed);
    }

    #[tokio::test]
    async fn test_lock_after_release_succeeds() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_for(&store);

        assert!(controller.lock("job-1").await.is_some());
        controller.unlock("job-1").await;
        assert!(controller.lock("job-1").await.is_some());
    }

    #[tokio::test]
    async fn test_unreachable_store_yields_null_results() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_for(&store);
        store.set_unreachable(true);

        assert!(controller.lock("job-1").await.is_none());
        assert!(controller.reload_configuration().await.is_none());
    }

    #[tokio::test]
    async fn test_reload_returns_fresh_configuration() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_for(&store);

        // Nothing stored yet: reload fails softly.
        assert!(controller.reload_configuration().await.is_none());

        let fresh = MigrationConfiguration::new("cfg-test").with_property("batch", "100");
        store.put_configuration(fresh.clone());
        assert_eq!(controller.reload_configuration().await, Some(fresh));

        // The constructed configuration is untouched.
        assert_eq!(controller.configuration().property("batch"), None);
    }

    #[test]
    fn test_unknown_migrator_type_fails_construction() {
        let store = Arc::new(MemoryStore::new());
        let result = Controller::builder(
            MigrationConfiguration::new("cfg-test").with_migrator_type("ghost"),
            store as Arc<dyn RemoteStore>,
        )
        .build();

        assert!(matches!(
            result.err().expect("must not start"),
            ControllerError::UnknownMigratorType { ref name } if name == "ghost"
        ));
    }

    #[tokio::test(flavor = "multi_thread", worker_threads = 4)]
    async fn test_concurrent_lock_has_single_winner() {
        let store = Arc::new(MemoryStore::new());
        let first = controller_for(&store);
        let second = controller_for(&store);

        let mut handles = Vec::new();
        for i in 0..8 {
            let controller = if i % 2 == 0 {
                Arc::clone(&first)
            } else {
                Arc::clone(&second)
            };
            handles.push(tokio::spawn(async move {
                controller.lock("job-42").await
            }));
        }

        let mut winners = 0;
        for handle in handles {
            if let Some(lock) = handle.await.expect("join") {
                assert_eq!(lock.job_id(), "job-42");
                winners += 1;
            }
        }
        assert_eq!(winners, 1);
    }

    #[tokio::test]
    async fn test_instantiation_failure_releases_lock() {
        let store = Arc::new(MemoryStore::new());

        let mut registry = MigratorRegistry::new();
        registry.register(
            "failing",
            Arc::new(|_group| {
                Err(MigratorError::Fatal {
                    error: "no constructor".into(),
                })
            }),
        );

        let controller = Controller::builder(
            MigrationConfiguration::new("cfg-test").with_migrator_type("failing"),
            Arc::clone(&store) as Arc<dyn RemoteStore>,
        )
        .with_registry(registry)
        .build()
        .expect("construction is fine; instantiation fails later");

        let err = controller
            .process(MigrationJob::new("job-7"))
            .await
            .expect_err("instantiation failure propagates");
        assert!(matches!(err, ControllerError::MigratorInit { .. }));

        // The just-acquired lock was given back, not orphaned.
        assert_eq!(store.lock_count(), 0);
        assert_eq!(controller.checkpoints().hits(UNLOCK_CHECKPOINT), 1);
    }

    #[tokio::test]
    async fn test_worker_completion_releases_lock() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_for(&store);

        let started = controller
            .process(MigrationJob::new("job-3"))
            .await
            .expect("process");
        assert!(started);

        controller
            .checkpoints()
            .wait_for(UNLOCK_CHECKPOINT, 1)
            .await;
        assert_eq!(store.lock_count(), 0);
        assert!(controller.lock("job-3").await.is_some());
    }

    #[tokio::test]
    async fn test_process_skips_job_locked_elsewhere() {
        let store = Arc::new(MemoryStore::new());
        let holder = controller_for(&store);
        let poller = controller_for(&store);

        assert!(holder.lock("job-5").await.is_some());
        let started = poller
            .process(MigrationJob::new("job-5"))
            .await
            .expect("process");
        assert!(!started, "held lock means skip, not error");
    }

    #[tokio::test]
    async fn test_shutdown_cancels_workers_and_releases_locks() {
        let store = Arc::new(MemoryStore::new());

        let mut registry = MigratorRegistry::new();
        registry.register(
            "blocking",
            Arc::new(|_group| Ok(Box::new(BlockingMigrator) as Box<dyn Migrator>)),
        );

        let controller = Controller::builder(
            MigrationConfiguration::new("cfg-test").with_migrator_type("blocking"),
            Arc::clone(&store) as Arc<dyn RemoteStore>,
        )
        .with_registry(registry)
        .build()
        .expect("controller");

        assert!(controller
            .process(MigrationJob::new("job-8"))
            .await
            .expect("process"));
        assert_eq!(controller.group().active().await, vec!["job-8".to_string()]);

        controller.shutdown().await.expect("graceful shutdown");
        assert_eq!(store.lock_count(), 0);
        assert!(controller.group().is_empty().await);
    }

    #[tokio::test]
    async fn test_handle_outlives_controller_softly() {
        let store = Arc::new(MemoryStore::new());
        let controller = controller_for(&store);
        let handle = controller.handle();

        store.put_configuration(MigrationConfiguration::new("cfg-test"));
        assert!(handle.reload_configuration().await.is_some());

        drop(controller);
        assert!(handle.reload_configuration().await.is_none());
        assert!(handle.configuration().is_none());
    }
}
