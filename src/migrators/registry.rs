//! # Typed migrator registry.
//!
//! Maps the configuration's declared type name to a factory for a fixed,
//! explicitly registered set of implementations. Resolution happens once, at
//! controller construction; an unknown name is a configuration-validation
//! error raised at startup, never a runtime failure during job execution.

use std::collections::HashMap;

use crate::error::ControllerError;

use super::default::DefaultMigrator;
use super::migrator::{Migrator, MigratorFactory};

/// Registry name of the built-in [`DefaultMigrator`].
pub const DEFAULT_MIGRATOR: &str = "default";

/// Closed set of migrator implementations, keyed by name.
///
/// A fresh registry always contains the built-in default, so a configuration
/// that declares no type resolves without any registration.
///
/// ## Example
/// ```
/// use std::sync::Arc;
/// use migvisor::{MigratorRegistry, DefaultMigrator, Migrator};
///
/// let mut registry = MigratorRegistry::new();
/// registry.register("custom", Arc::new(|group| {
///     Ok(Box::new(DefaultMigrator::new(group)) as Box<dyn Migrator>)
/// }));
///
/// assert!(registry.resolve(Some("custom")).is_ok());
/// assert!(registry.resolve(None).is_ok()); // built-in default
/// assert!(registry.resolve(Some("nope")).is_err());
/// ```
pub struct MigratorRegistry {
    factories: HashMap<String, MigratorFactory>,
}

impl MigratorRegistry {
    /// Creates a registry containing only the built-in default.
    pub fn new() -> Self {
        let mut registry = Self {
            factories: HashMap::new(),
        };
        registry.register(
            DEFAULT_MIGRATOR,
            std::sync::Arc::new(|group| Ok(Box::new(DefaultMigrator::new(group)) as Box<dyn Migrator>)),
        );
        registry
    }

    /// Registers (or replaces) an implementation under `name`.
    pub fn register(&mut self, name: impl Into<String>, factory: MigratorFactory) {
        self.factories.insert(name.into(), factory);
    }

    /// Resolves a declared type name to its factory.
    ///
    /// `None` selects the built-in default. An unknown name is fatal for the
    /// controller being constructed.
    pub fn resolve(&self, name: Option<&str>) -> Result<MigratorFactory, ControllerError> {
        let name = name.unwrap_or(DEFAULT_MIGRATOR);
        self.factories
            .get(name)
            .cloned()
            .ok_or_else(|| ControllerError::UnknownMigratorType {
                name: name.to_string(),
            })
    }

    /// Sorted list of registered implementation names.
    pub fn names(&self) -> Vec<String> {
        let mut names: Vec<String> = self.factories.keys().cloned().collect();
        names.sort_unstable();
        names
    }
}

impl Default for MigratorRegistry {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::Arc;

    #[test]
    fn test_unspecified_type_resolves_to_default() {
        let registry = MigratorRegistry::new();
        assert!(registry.resolve(None).is_ok());
        assert!(registry.resolve(Some(DEFAULT_MIGRATOR)).is_ok());
    }

    #[test]
    fn test_unknown_type_is_an_error() {
        let registry = MigratorRegistry::new();
        let err = registry.resolve(Some("missing")).err().expect("unknown");
        assert!(matches!(
            err,
            ControllerError::UnknownMigratorType { ref name } if name == "missing"
        ));
    }

    #[test]
    fn test_registered_type_resolves() {
        let mut registry = MigratorRegistry::new();
        registry.register(
            "custom",
            Arc::new(|group| {
                Ok(Box::new(DefaultMigrator::new(group)) as Box<dyn Migrator>)
            }),
        );
        assert!(registry.resolve(Some("custom")).is_ok());
        assert_eq!(registry.names(), vec!["custom".to_string(), "default".to_string()]);
    }
}
