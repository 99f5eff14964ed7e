//! Runtime events and the broadcast bus that carries them.
//!
//! Internal modules:
//! - [`bus`]: thin wrapper over `tokio::sync::broadcast` for fan-out;
//! - [`event`]: event payloads with sequence numbers and timestamps.

mod bus;
mod event;

pub use bus::Bus;
pub use event::{Event, EventKind};
