//! Remote coordination store boundary.
//!
//! The controller depends on one capability: a shared store with atomic
//! uniqueness enforcement on lock inserts. Everything else about the store —
//! query language, schema, transport — stays behind the [`RemoteStore`]
//! trait. The trait is always constructor-injected, never a process-wide
//! global, so the lock protocol is testable against a substitute store.
//!
//! Internal modules:
//! - [`record`]: the [`LockRecord`] entity and insert outcome;
//! - [`memory`]: in-process [`MemoryStore`] for tests and demos.

mod memory;
mod record;

pub use memory::MemoryStore;
pub use record::{InsertOutcome, LockRecord};

use async_trait::async_trait;

use crate::config::MigrationConfiguration;
use crate::error::StoreError;

/// Remote coordination store consumed by the controller.
///
/// Contract per operation:
/// - [`insert_lock`](RemoteStore::insert_lock) must enforce a uniqueness
///   constraint on the lock's job id and report how many records the call
///   created, returning the authoritative persisted record on success.
/// - [`delete_locks`](RemoteStore::delete_locks) deletes every lock record
///   matching the job id (normally exactly one) and reports the count.
///   Deleting zero records is not an error.
/// - [`fetch_configuration`](RemoteStore::fetch_configuration) returns the
///   stored configuration for the given id.
///
/// Each call maps to one remote round-trip and may suspend for its full
/// duration; callers must not hold shared resources across it.
#[async_trait]
pub trait RemoteStore: Send + Sync {
    /// Create-if-absent insert of a lock record.
    ///
    /// A uniqueness violation on the job id is reported as
    /// [`StoreError::Duplicate`], not as a zero-count success.
    async fn insert_lock(&self, record: &LockRecord) -> Result<InsertOutcome, StoreError>;

    /// Deletes all lock records matching `job_id`; returns the deleted count.
    async fn delete_locks(&self, job_id: &str) -> Result<u64, StoreError>;

    /// Fetches the configuration stored under `configuration_id`.
    async fn fetch_configuration(
        &self,
        configuration_id: &str,
    ) -> Result<MigrationConfiguration, StoreError>;
}
