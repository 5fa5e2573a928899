// src/runner/pending.rs

use std::fmt;

use super::unit::UnitRef;

/// Set of units waiting for their dependencies, keyed by reference identity.
///
/// Iteration follows insertion order, though nothing outside tests should
/// rely on it.
#[derive(Clone, Default)]
pub struct PendingSet {
    units: Vec<UnitRef>,
}

impl fmt::Debug for PendingSet {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_list().entries(self.units.iter().map(|u| u.name())).finish()
    }
}

fn same_unit(a: &UnitRef, b: &UnitRef) -> bool {
    std::ptr::addr_eq(std::sync::Arc::as_ptr(a), std::sync::Arc::as_ptr(b))
}

impl PendingSet {
    pub fn new() -> Self {
        Self::default()
    }

    /// Insert `unit`; returns `false` if it was already present.
    pub fn insert(&mut self, unit: UnitRef) -> bool {
        if self.contains(&unit) {
            return false;
        }
        self.units.push(unit);
        true
    }

    pub fn remove(&mut self, unit: &UnitRef) -> bool {
        match self.units.iter().position(|u| same_unit(u, unit)) {
            Some(idx) => {
                self.units.remove(idx);
                true
            }
            None => false,
        }
    }

    pub fn contains(&self, unit: &UnitRef) -> bool {
        self.units.iter().any(|u| same_unit(u, unit))
    }

    pub fn len(&self) -> usize {
        self.units.len()
    }

    pub fn is_empty(&self) -> bool {
        self.units.is_empty()
    }

    /// Copy of the current members.
    pub fn snapshot(&self) -> Vec<UnitRef> {
        self.units.clone()
    }
}
