//! Controller core: lock protocol, worker supervision, checkpoints.
//!
//! Internal modules:
//! - [`controller`]: lock/unlock/reload and the migrator glue;
//! - [`group`]: per-controller supervision of running workers;
//! - [`checkpoint`]: named synchronization points for concurrency tests.

mod checkpoint;
mod controller;
mod group;

pub use checkpoint::{Checkpoints, UNLOCK_CHECKPOINT};
pub use controller::{Controller, ControllerBuilder, ControllerHandle};
pub use group::{WorkerGroup, WorkerGroupHandle};
