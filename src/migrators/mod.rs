//! Migrator worker abstraction and implementation registry.
//!
//! This is the plugin boundary of the crate. A migrator is polymorphic over
//! one capability: run the bound job to completion and report the outcome.
//!
//! Internal modules:
//! - [`migrator`]: the [`Migrator`] trait, binding bundle, and factory type;
//! - [`job`]: the [`MigrationJob`] entity handed in by the polling layer;
//! - [`default`]: the built-in [`DefaultMigrator`];
//! - [`registry`]: typed name → factory resolution.

mod default;
mod job;
mod migrator;
mod registry;

pub use default::DefaultMigrator;
pub use job::MigrationJob;
pub use migrator::{Migrator, MigratorBinding, MigratorFactory};
pub use registry::{MigratorRegistry, DEFAULT_MIGRATOR};
