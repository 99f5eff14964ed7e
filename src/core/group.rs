//! # Worker group: per-controller supervision of running migrators.
//!
//! The group owns a bounded set of concurrently running workers, keyed by job
//! id, each with its own `JoinHandle` and a child [`CancellationToken`] off
//! the group's root token. It is the sole mutator of its membership: a worker
//! is added at spawn and removed after its completion epilogue ran.
//!
//! ## Worker lifecycle
//! ```text
//! spawn(job, migrator, on_complete)
//!   ├─► publish WorkerStarting
//!   ├─► run migrator.migrate(child_token) as its own task
//!   │     ├─ Ok          → publish WorkerFinished
//!   │     ├─ Err(e)      → publish WorkerFailed(e)
//!   │     └─ panic       → publish WorkerFailed("worker panic")
//!   ├─► on_complete().await          (controller releases the lock here)
//!   └─► remove entry → publish WorkerRemoved
//! ```
//!
//! ## Rules
//! - A worker never blocks the caller that spawned it.
//! - `on_complete` runs on **every** exit path, including panics, so a held
//!   lock is always released.
//! - `cancel_all` only requests cooperative cancellation; `join_all` bounds
//!   the wait with the grace period and names the stragglers.

use std::collections::HashMap;
use std::future::Future;
use std::sync::Arc;
use std::time::Duration;

use tokio::sync::RwLock;
use tokio::task::JoinHandle;
use tokio_util::sync::CancellationToken;

use crate::error::GroupError;
use crate::events::{Bus, Event, EventKind};
use crate::migrators::Migrator;

/// Handle to one running worker.
struct WorkerHandle {
    /// Join handle for the worker's wrapper task (execution + epilogue).
    join: JoinHandle<()>,
}

/// Supervision context passed to migrator factories.
///
/// Carries what a worker may need from its group before binding: the group's
/// root cancellation token (to derive watchers from) and the event bus (to
/// publish implementation-specific progress).
#[derive(Clone)]
pub struct WorkerGroupHandle {
    token: CancellationToken,
    bus: Bus,
}

impl WorkerGroupHandle {
    /// The group's root cancellation token.
    pub fn token(&self) -> &CancellationToken {
        &self.token
    }

    /// The event bus shared with the owning controller.
    pub fn bus(&self) -> &Bus {
        &self.bus
    }

    /// Handle attached to no group; for constructing migrators in tests.
    pub fn detached() -> Self {
        Self {
            token: CancellationToken::new(),
            bus: Bus::new(8),
        }
    }
}

/// Owned set of concurrently running migrator workers.
pub struct WorkerGroup {
    workers: RwLock<HashMap<String, WorkerHandle>>,
    bus: Bus,
    token: CancellationToken,
    grace: Duration,
}

impl WorkerGroup {
    /// Creates an empty group.
    pub fn new(bus: Bus, token: CancellationToken, grace: Duration) -> Arc<Self> {
        Arc::new(Self {
            workers: RwLock::new(HashMap::new()),
            bus,
            token,
            grace,
        })
    }

    /// Returns the supervision context handed to migrator factories.
    pub fn handle(&self) -> WorkerGroupHandle {
        WorkerGroupHandle {
            token: self.token.clone(),
            bus: self.bus.clone(),
        }
    }

    /// Sorted job ids of currently running workers.
    pub async fn active(&self) -> Vec<String> {
        let workers = self.workers.read().await;
        let mut names: Vec<String> = workers.keys().cloned().collect();
        names.sort_unstable();
        names
    }

    /// True when no worker is running.
    pub async fn is_empty(&self) -> bool {
        self.workers.read().await.is_empty()
    }

    /// Spawns a bound migrator as an independently scheduled worker.
    ///
    /// Returns `false` without spawning when a worker for `job_id` is still
    /// active — the caller holds the lock, so this only happens when a
    /// previous worker's epilogue has not finished yet.
    ///
    /// `on_complete` runs after the migrator exits (success, failure, or
    /// panic) and before the worker is removed from the group; the controller
    /// uses it to release the job's lock.
    pub async fn spawn<F, Fut>(
        self: &Arc<Self>,
        job_id: &str,
        migrator: Box<dyn Migrator>,
        on_complete: F,
    ) -> bool
    where
        F: FnOnce() -> Fut + Send + 'static,
        Fut: Future<Output = ()> + Send + 'static,
    {
        let name = job_id.to_string();

        // Hold the write lock across the spawn so the worker's epilogue
        // cannot observe the map before its own entry is inserted.
        let mut workers = self.workers.write().await;
        if workers.contains_key(&name) {
            self.bus.publish(
                Event::new(EventKind::WorkerFailed)
                    .with_job(name.clone())
                    .with_error("worker already active"),
            );
            return false;
        }

        let child = self.token.child_token();
        let bus = self.bus.clone();
        let group = Arc::clone(self);
        let id = name.clone();

        let join = tokio::spawn(async move {
            bus.publish(Event::new(EventKind::WorkerStarting).with_job(id.clone()));

            // Run the migrator as its own task so a panic is contained and
            // the epilogue below still executes.
            let run = tokio::spawn(async move { migrator.migrate(child).await });
            match run.await {
                Ok(Ok(())) => {
                    bus.publish(Event::new(EventKind::WorkerFinished).with_job(id.clone()));
                }
                Ok(Err(e)) => {
                    bus.publish(
                        Event::new(EventKind::WorkerFailed)
                            .with_job(id.clone())
                            .with_error(e.to_string()),
                    );
                }
                Err(_join_error) => {
                    bus.publish(
                        Event::new(EventKind::WorkerFailed)
                            .with_job(id.clone())
                            .with_error("worker panic"),
                    );
                }
            }

            on_complete().await;

            group.remove(&id).await;
            bus.publish(Event::new(EventKind::WorkerRemoved).with_job(id));
        });

        workers.insert(name, WorkerHandle { join });
        true
    }

    /// Requests cooperative cancellation of every worker in the group.
    pub fn cancel_all(&self) {
        self.token.cancel();
    }

    /// Waits for all workers to finish within the configured grace period.
    ///
    /// Publishes [`EventKind::AllStoppedWithin`] on success, or
    /// [`EventKind::GraceExceeded`] on timeout together with
    /// [`GroupError::GraceExceeded`] listing the stuck job ids.
    pub async fn join_all(&self) -> Result<(), GroupError> {
        let handles: Vec<(String, WorkerHandle)> = {
            let mut workers = self.workers.write().await;
            workers.drain().collect()
        };

        let deadline = tokio::time::Instant::now() + self.grace;
        let mut stuck: Vec<String> = Vec::new();
        let mut iter = handles.into_iter();

        while let Some((name, handle)) = iter.next() {
            let remaining = deadline.saturating_duration_since(tokio::time::Instant::now());
            match tokio::time::timeout(remaining, handle.join).await {
                Ok(_joined) => {}
                Err(_elapsed) => {
                    stuck.push(name);
                    stuck.extend(iter.map(|(n, _)| n));
                    break;
                }
            }
        }

        if stuck.is_empty() {
            self.bus.publish(Event::new(EventKind::AllStoppedWithin));
            Ok(())
        } else {
            stuck.sort_unstable();
            self.bus.publish(Event::new(EventKind::GraceExceeded));
            Err(GroupError::GraceExceeded {
                grace: self.grace,
                stuck,
            })
        }
    }

    /// Removes a finished worker's entry. Missing entries are fine: the
    /// worker may already have been drained by `join_all`.
    async fn remove(&self, job_id: &str) {
        self.workers.write().await.remove(job_id);
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use async_trait::async_trait;
    use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

    use crate::error::MigratorError;
    use crate::migrators::MigratorBinding;

    fn group(grace: Duration) -> (Arc<WorkerGroup>, Bus) {
        let bus = Bus::new(64);
        let group = WorkerGroup::new(bus.clone(), CancellationToken::new(), grace);
        (group, bus)
    }

    /// Migrator that completes with a fixed outcome.
    struct FixedMigrator {
        outcome: Result<(), MigratorError>,
    }

    #[async_trait]
    impl Migrator for FixedMigrator {
        fn name(&self) -> &str {
            "fixed"
        }
        fn bind(&mut self, _binding: MigratorBinding) {}
        async fn migrate(&self, _ctx: CancellationToken) -> Result<(), MigratorError> {
            match &self.outcome {
                Ok(()) => Ok(()),
                Err(MigratorError::Canceled) => Err(MigratorError::Canceled),
                Err(e) => Err(MigratorError::Fail {
                    error: e.to_string(),
                }),
            }
        }
    }

    /// Migrator that runs until its token is cancelled.
    struct BlockingMigrator;

    #[async_trait]
    impl Migrator for BlockingMigrator {
        fn name(&self) -> &str {
            "blocking"
        }
        fn bind(&mut self, _binding: MigratorBinding) {}
        async fn migrate(&self, ctx: CancellationToken) -> Result<(), MigratorError> {
            ctx.cancelled().await;
            Err(MigratorError::Canceled)
        }
    }

    /// Migrator that panics mid-run.
    struct PanickingMigrator;

    #[async_trait]
    impl Migrator for PanickingMigrator {
        fn name(&self) -> &str {
            "panicking"
        }
        fn bind(&mut self, _binding: MigratorBinding) {}
        async fn migrate(&self, _ctx: CancellationToken) -> Result<(), MigratorError> {
            panic!("boom");
        }
    }

    #[tokio::test]
    async fn test_worker_runs_and_is_removed() {
        let (group, bus) = group(Duration::from_secs(5));
        let mut rx = bus.subscribe();

        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        let spawned = group
            .spawn("job-1", Box::new(FixedMigrator { outcome: Ok(()) }), move || async move {
                flag.store(true, AtomicOrdering::SeqCst);
            })
            .await;
        assert!(spawned);

        group.join_all().await.expect("join");
        assert!(done.load(AtomicOrdering::SeqCst), "on_complete must run");
        assert!(group.is_empty().await);

        let mut kinds = Vec::new();
        while let Ok(ev) = rx.try_recv() {
            kinds.push(ev.kind);
        }
        assert!(kinds.contains(&EventKind::WorkerStarting));
        assert!(kinds.contains(&EventKind::WorkerFinished));
    }

    #[tokio::test]
    async fn test_duplicate_spawn_is_rejected() {
        let (group, _bus) = group(Duration::from_secs(5));

        assert!(
            group
                .spawn("job-1", Box::new(BlockingMigrator), || async {})
                .await
        );
        assert!(
            !group
                .spawn("job-1", Box::new(BlockingMigrator), || async {})
                .await
        );

        group.cancel_all();
        group.join_all().await.expect("join");
    }

    #[tokio::test]
    async fn test_panicking_worker_still_runs_epilogue() {
        let (group, bus) = group(Duration::from_secs(5));
        let mut rx = bus.subscribe();

        let done = Arc::new(AtomicBool::new(false));
        let flag = Arc::clone(&done);
        group
            .spawn("job-9", Box::new(PanickingMigrator), move || async move {
                flag.store(true, AtomicOrdering::SeqCst);
            })
            .await;

        group.join_all().await.expect("join");
        assert!(done.load(AtomicOrdering::SeqCst), "on_complete after panic");

        let mut saw_panic_failure = false;
        while let Ok(ev) = rx.try_recv() {
            if ev.kind == EventKind::WorkerFailed
                && ev.error.as_deref() == Some("worker panic")
            {
                saw_panic_failure = true;
            }
        }
        assert!(saw_panic_failure);
    }

    #[tokio::test]
    async fn test_grace_exceeded_names_stuck_workers() {
        let (group, _bus) = group(Duration::from_millis(50));

        group
            .spawn("job-stuck", Box::new(BlockingMigrator), || async {})
            .await;

        // No cancellation: the worker blocks past the grace period.
        let err = group.join_all().await.expect_err("grace");
        match err {
            GroupError::GraceExceeded { stuck, .. } => {
                assert_eq!(stuck, vec!["job-stuck".to_string()]);
            }
        }

        group.cancel_all();
    }

    #[tokio::test]
    async fn test_cancel_all_unblocks_workers() {
        let (group, _bus) = group(Duration::from_secs(5));

        group
            .spawn("job-a", Box::new(BlockingMigrator), || async {})
            .await;
        group
            .spawn("job-b", Box::new(BlockingMigrator), || async {})
            .await;
        assert_eq!(
            group.active().await,
            vec!["job-a".to_string(), "job-b".to_string()]
        );

        group.cancel_all();
        group.join_all().await.expect("join after cancel");
        assert!(group.is_empty().await);
    }
}
