// src/deps/task.rs

use std::fmt;
use std::sync::Arc;

use tracing::debug;

use crate::runner::{DependantUnit, UnitRef};
use crate::types::DependencyStatus;

use super::registry::ProviderRegistry;

type Action = Box<dyn Fn(&[String]) -> anyhow::Result<()> + Send + Sync>;

/// Unit whose readiness is derived from named providers.
///
/// - any required provider missing → `NotReady`
/// - all required present, some optional missing → `PartiallyReady`
/// - everything present → `Ready`
///
/// The action receives the optional providers that are still missing. After
/// it succeeds, every name in `provides` is published to the registry.
pub struct DependantTask {
    name: String,
    requires: Vec<String>,
    optional: Vec<String>,
    provides: Vec<String>,
    registry: ProviderRegistry,
    action: Action,
}

impl fmt::Debug for DependantTask {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependantTask")
            .field("name", &self.name)
            .field("requires", &self.requires)
            .field("optional", &self.optional)
            .field("provides", &self.provides)
            .finish_non_exhaustive()
    }
}

impl DependantTask {
    pub fn new(name: impl Into<String>, registry: ProviderRegistry) -> Self {
        Self {
            name: name.into(),
            requires: Vec::new(),
            optional: Vec::new(),
            provides: Vec::new(),
            registry,
            action: Box::new(|_| Ok(())),
        }
    }

    pub fn requires<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.requires.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn optional<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.optional.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn provides<I, S>(mut self, names: I) -> Self
    where
        I: IntoIterator<Item = S>,
        S: Into<String>,
    {
        self.provides.extend(names.into_iter().map(Into::into));
        self
    }

    pub fn action<F>(mut self, action: F) -> Self
    where
        F: Fn(&[String]) -> anyhow::Result<()> + Send + Sync + 'static,
    {
        self.action = Box::new(action);
        self
    }

    pub fn into_unit(self) -> UnitRef {
        Arc::new(self)
    }
}

impl DependantUnit for DependantTask {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependency_status(&self) -> anyhow::Result<DependencyStatus> {
        if !self.registry.missing(&self.requires).is_empty() {
            return Ok(DependencyStatus::NotReady);
        }
        if !self.registry.missing(&self.optional).is_empty() {
            return Ok(DependencyStatus::PartiallyReady);
        }
        Ok(DependencyStatus::Ready)
    }

    fn run(&self) -> anyhow::Result<()> {
        let missing_optional = self.registry.missing(&self.optional);
        (self.action)(&missing_optional)?;

        for name in &self.provides {
            self.registry.provide(name.clone());
        }
        debug!(unit = %self.name, provides = ?self.provides, "dependant task published providers");
        Ok(())
    }
}
