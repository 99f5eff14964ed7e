//! # migvisor
//!
//! **Migvisor** coordinates execution of discrete, idempotent-by-design
//! migration jobs across any number of concurrently running controller
//! processes that share a remote coordination store.
//!
//! The core guarantee: for a given job id, at most one worker executes at a
//! time — enforced by an acquire-lock / spawn-worker / release-lock protocol
//! whose single source of truth is the store's uniqueness constraint, never
//! client-side coordination.
//!
//! ## Architecture
//! ```text
//!   polling layer (external)          polling layer (external)
//!            │                                 │
//!            ▼                                 ▼
//! ┌─────────────────────────┐       ┌─────────────────────────┐
//! │ Controller (process A)  │       │ Controller (process B)  │
//! │  - lock / unlock        │       │  - lock / unlock        │
//! │  - MigratorRegistry     │       │  - MigratorRegistry     │
//! │  - WorkerGroup          │       │  - WorkerGroup          │
//! │  - Bus + subscribers    │       │  - Bus + subscribers    │
//! └──────┬────────────┬─────┘       └─────┬───────────────────┘
//!        │            │                   │
//!        │            ▼                   ▼
//!        │   ┌─────────────────────────────────────┐
//!        │   │  RemoteStore (shared)               │
//!        │   │  - insert_lock: unique on job_id    │
//!        │   │  - delete_locks                     │
//!        │   │  - fetch_configuration              │
//!        │   └─────────────────────────────────────┘
//!        ▼
//! ┌──────────────┐  ┌──────────────┐
//! │   Migrator   │  │   Migrator   │   (one task per locked job,
//! │  (job-17)    │  │  (job-42)    │    supervised by WorkerGroup)
//! └──────────────┘  └──────────────┘
//! ```
//!
//! ## Lifecycle
//! ```text
//! Controller::process(job)
//!   ├─► lock(job_id): create-if-absent LockRecord insert
//!   │     ├─ store created exactly 1 record → proceed
//!   │     └─ conflict / transport failure   → Ok(false), try another job
//!   ├─► create_migrator(job, lock):
//!   │     factory(group handle) → bind(controller, job, lock)
//!   │     └─ failure → unlock first, then propagate
//!   └─► WorkerGroup::spawn:
//!         WorkerStarting → migrate() → WorkerFinished / WorkerFailed
//!         → unlock(job_id) on every exit path (panic included)
//!         → WorkerRemoved
//! ```
//!
//! ## Features
//! | Area            | Description                                          | Key types / traits                  |
//! |-----------------|------------------------------------------------------|-------------------------------------|
//! | **Lock protocol** | Optimistic per-job exclusion over a shared store.  | [`Controller`], [`LockRecord`]      |
//! | **Store boundary**| Injected coordination store; in-memory double.     | [`RemoteStore`], [`MemoryStore`]    |
//! | **Workers**       | Pluggable migrators, resolved by name at startup.  | [`Migrator`], [`MigratorRegistry`]  |
//! | **Supervision**   | Per-controller group with cancel/join-with-grace.  | [`WorkerGroup`]                     |
//! | **Observability** | Broadcast events plus subscriber fan-out.          | [`Event`], [`Subscribe`]            |
//! | **Errors**        | Typed taxonomy; lock paths never raise upward.     | [`StoreError`], [`ControllerError`] |
//!
//! ## Optional features
//! - `logging`: exports a simple built-in [`LogWriter`] _(demo/reference only)_.
//!
//! ## Example
//! ```rust
//! use std::sync::Arc;
//! use migvisor::{Controller, MemoryStore, MigrationConfiguration, MigrationJob, RemoteStore};
//!
//! #[tokio::main(flavor = "current_thread")]
//! async fn main() -> Result<(), Box<dyn std::error::Error>> {
//!     let store = Arc::new(MemoryStore::new());
//!
//!     let controller = Controller::builder(
//!         MigrationConfiguration::new("customers-v2"),
//!         Arc::clone(&store) as Arc<dyn RemoteStore>,
//!     )
//!     .build()?;
//!
//!     // Lock the job, run the configured migrator, release on completion.
//!     let started = controller.process(MigrationJob::new("job-42")).await?;
//!     assert!(started);
//!
//!     controller.shutdown().await?;
//!     Ok(())
//! }
//! ```

mod config;
mod core;
mod error;
mod events;
mod migrators;
mod store;
mod subscribers;

// ---- Public re-exports ----

pub use config::{ControllerConfig, MigrationConfiguration};
pub use self::core::{Checkpoints, Controller, ControllerBuilder, ControllerHandle, WorkerGroup,
    WorkerGroupHandle, UNLOCK_CHECKPOINT};
pub use error::{ControllerError, GroupError, MigratorError, StoreError};
pub use events::{Bus, Event, EventKind};
pub use migrators::{DefaultMigrator, MigrationJob, Migrator, MigratorBinding, MigratorFactory,
    MigratorRegistry, DEFAULT_MIGRATOR};
pub use store::{InsertOutcome, LockRecord, MemoryStore, RemoteStore};
pub use subscribers::Subscribe;

// Optional: expose the simple built-in logger subscriber (demo/reference).
// Enable with: `--features logging`
#[cfg(feature = "logging")]
pub use subscribers::LogWriter;
