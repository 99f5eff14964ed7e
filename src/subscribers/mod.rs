//! Event subscribers: observability hooks for controller and worker events.

mod subscriber;

#[cfg(feature = "logging")]
mod log;

pub use subscriber::Subscribe;

#[cfg(feature = "logging")]
pub use log::LogWriter;
