// src/deps/mod.rs

//! Named-dependency units.
//!
//! A [`ProviderRegistry`] tracks which providers (plugins, services, ...)
//! are currently available. A [`DependantTask`] declares required and
//! optional providers and derives its readiness from the registry; once it
//! has run, it publishes its own `provides` names so that later units can
//! depend on it.

pub mod registry;
pub mod task;

pub use registry::ProviderRegistry;
pub use task::DependantTask;
