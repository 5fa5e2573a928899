// src/deps/registry.rs

use std::collections::BTreeSet;
use std::sync::{Arc, RwLock, RwLockReadGuard, RwLockWriteGuard};

use tracing::debug;

/// Shared set of available provider names.
///
/// Cloning is cheap; all clones observe the same set.
#[derive(Debug, Clone, Default)]
pub struct ProviderRegistry {
    inner: Arc<RwLock<BTreeSet<String>>>,
}

impl ProviderRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Mark `name` as available. Returns `false` if it already was.
    pub fn provide(&self, name: impl Into<String>) -> bool {
        let name = name.into();
        debug!(provider = %name, "provider available");
        self.write().insert(name)
    }

    /// Mark `name` as unavailable again. Returns `false` if it was not present.
    pub fn withdraw(&self, name: &str) -> bool {
        debug!(provider = %name, "provider withdrawn");
        self.write().remove(name)
    }

    pub fn is_available(&self, name: &str) -> bool {
        self.read().contains(name)
    }

    /// Those of `names` that are not currently available, in input order.
    pub fn missing(&self, names: &[String]) -> Vec<String> {
        let set = self.read();
        names
            .iter()
            .filter(|n| !set.contains(n.as_str()))
            .cloned()
            .collect()
    }

    /// Sorted copy of all available names.
    pub fn snapshot(&self) -> Vec<String> {
        self.read().iter().cloned().collect()
    }

    fn read(&self) -> RwLockReadGuard<'_, BTreeSet<String>> {
        self.inner.read().unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn write(&self) -> RwLockWriteGuard<'_, BTreeSet<String>> {
        self.inner.write().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}
