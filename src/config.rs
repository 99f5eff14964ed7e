//! # Controller configuration.
//!
//! Two configuration types with different owners:
//!
//! 1. [`MigrationConfiguration`] — externally persisted, fetched from the
//!    remote store. Says *what* this controller migrates and with which
//!    migrator implementation. The controller never mutates it, only
//!    re-fetches it via `reload_configuration`.
//! 2. [`ControllerConfig`] — local runtime settings (shutdown grace, event
//!    bus capacity). Owned by the embedding process.
//!
//! ## Sentinel values
//! - `ControllerConfig::bus_capacity` is clamped to a minimum of 1 by the bus.

use std::collections::HashMap;
use std::time::Duration;

/// Externally persisted description of one controller's migration duties.
///
/// Read once at controller construction; the resolved migrator factory is
/// fixed from that point on. A later [`reload_configuration`] only affects
/// future decisions made by callers that consult the refreshed value.
///
/// [`reload_configuration`]: crate::Controller::reload_configuration
#[derive(Clone, Debug, PartialEq, Eq)]
pub struct MigrationConfiguration {
    configuration_id: String,
    migrator_type: Option<String>,
    properties: HashMap<String, String>,
}

impl MigrationConfiguration {
    /// Creates a configuration that uses the built-in default migrator.
    pub fn new(configuration_id: impl Into<String>) -> Self {
        Self {
            configuration_id: configuration_id.into(),
            migrator_type: None,
            properties: HashMap::new(),
        }
    }

    /// Selects a migrator implementation by registry name.
    pub fn with_migrator_type(mut self, name: impl Into<String>) -> Self {
        self.migrator_type = Some(name.into());
        self
    }

    /// Attaches a free-form property migrators may consult.
    pub fn with_property(mut self, key: impl Into<String>, value: impl Into<String>) -> Self {
        self.properties.insert(key.into(), value.into());
        self
    }

    /// Identity of this configuration in the remote store.
    pub fn configuration_id(&self) -> &str {
        &self.configuration_id
    }

    /// Declared migrator type name, if any (`None` selects the default).
    pub fn migrator_type(&self) -> Option<&str> {
        self.migrator_type.as_deref()
    }

    /// Looks up a free-form property.
    pub fn property(&self, key: &str) -> Option<&str> {
        self.properties.get(key).map(String::as_str)
    }
}

/// Local runtime settings for one controller instance.
///
/// ## Field semantics
/// - `grace`: maximum wait for workers to finish during [`shutdown`]
///   (`0s` = do not wait, report stragglers immediately)
/// - `bus_capacity`: event bus ring buffer size (min 1; clamped by the bus)
///
/// [`shutdown`]: crate::Controller::shutdown
#[derive(Clone, Debug)]
pub struct ControllerConfig {
    /// Maximum time to wait for workers during graceful shutdown.
    ///
    /// When shutdown is requested, workers are cancelled via their tokens and
    /// the group is joined for up to `grace`; exceeding it yields
    /// [`GroupError::GraceExceeded`](crate::GroupError::GraceExceeded).
    pub grace: Duration,

    /// Capacity of the event bus broadcast channel ring buffer.
    ///
    /// Slow subscribers lagging behind more than `bus_capacity` events will
    /// observe `Lagged` and skip older items.
    pub bus_capacity: usize,
}

impl ControllerConfig {
    /// Returns a bus capacity clamped to a minimum of 1.
    #[inline]
    pub fn bus_capacity_clamped(&self) -> usize {
        self.bus_capacity.max(1)
    }
}

impl Default for ControllerConfig {
    /// Default configuration:
    ///
    /// - `grace = 60s` (reasonable graceful shutdown window)
    /// - `bus_capacity = 1024` (good baseline)
    fn default() -> Self {
        Self {
            grace: Duration::from_secs(60),
            bus_capacity: 1024,
        }
    }
}
