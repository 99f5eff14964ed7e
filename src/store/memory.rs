//! # In-process store for tests and demos.
//!
//! [`MemoryStore`] implements [`RemoteStore`] with plain maps behind a mutex,
//! enforcing the same uniqueness semantics a real backend would. It also
//! carries a reachability toggle so tests can exercise the transport-failure
//! paths deterministically.
//!
//! Not intended for production: there is no persistence and no cross-process
//! sharing. Share one instance between several controllers (via `Arc`) to
//! simulate controllers pointing at the same backend.

use std::collections::HashMap;
use std::sync::Mutex;
use std::sync::atomic::{AtomicBool, Ordering as AtomicOrdering};

use async_trait::async_trait;

use crate::config::MigrationConfiguration;
use crate::error::StoreError;

use super::record::{InsertOutcome, LockRecord};
use super::RemoteStore;

/// Shared in-memory implementation of [`RemoteStore`].
#[derive(Default)]
pub struct MemoryStore {
    locks: Mutex<HashMap<String, LockRecord>>,
    configurations: Mutex<HashMap<String, MigrationConfiguration>>,
    unreachable: AtomicBool,
}

impl MemoryStore {
    /// Creates an empty store.
    pub fn new() -> Self {
        Self::default()
    }

    /// Toggles simulated unreachability.
    ///
    /// While set, every operation fails with [`StoreError::Transport`].
    pub fn set_unreachable(&self, unreachable: bool) {
        self.unreachable.store(unreachable, AtomicOrdering::SeqCst);
    }

    /// Seeds a configuration so `fetch_configuration` can find it.
    pub fn put_configuration(&self, configuration: MigrationConfiguration) {
        let mut configurations = self.configurations.lock().expect("configurations poisoned");
        configurations.insert(configuration.configuration_id().to_string(), configuration);
    }

    /// Number of lock records currently held. Test helper.
    pub fn lock_count(&self) -> usize {
        self.locks.lock().expect("locks poisoned").len()
    }

    fn check_reachable(&self) -> Result<(), StoreError> {
        if self.unreachable.load(AtomicOrdering::SeqCst) {
            Err(StoreError::Transport {
                error: "store unreachable".into(),
            })
        } else {
            Ok(())
        }
    }
}

#[async_trait]
impl RemoteStore for MemoryStore {
    async fn insert_lock(&self, record: &LockRecord) -> Result<InsertOutcome, StoreError> {
        self.check_reachable()?;

        let mut locks = self.locks.lock().expect("locks poisoned");
        if locks.contains_key(record.job_id()) {
            return Err(StoreError::Duplicate {
                key: record.job_id().to_string(),
            });
        }
        locks.insert(record.job_id().to_string(), record.clone());

        Ok(InsertOutcome {
            modified_count: 1,
            record: Some(record.clone()),
        })
    }

    async fn delete_locks(&self, job_id: &str) -> Result<u64, StoreError> {
        self.check_reachable()?;

        let mut locks = self.locks.lock().expect("locks poisoned");
        Ok(u64::from(locks.remove(job_id).is_some()))
    }

    async fn fetch_configuration(
        &self,
        configuration_id: &str,
    ) -> Result<MigrationConfiguration, StoreError> {
        self.check_reachable()?;

        let configurations = self.configurations.lock().expect("configurations poisoned");
        configurations
            .get(configuration_id)
            .cloned()
            .ok_or_else(|| StoreError::NotFound {
                id: configuration_id.to_string(),
            })
    }
}
