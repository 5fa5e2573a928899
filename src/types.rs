// src/types.rs

use std::fmt;

/// Tri-state answer a unit gives when asked whether it may run.
///
/// - `NotReady`: at least one required dependency is missing.
/// - `PartiallyReady`: every required dependency is present, but some
///   optional ones are not. Such units only run in the final sweep when the
///   runner stops.
/// - `Ready`: everything is present; the unit runs on the next poll.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash)]
pub enum DependencyStatus {
    #[default]
    NotReady,
    PartiallyReady,
    Ready,
}

impl DependencyStatus {
    /// Whether a unit with this status runs during a regular poll.
    pub fn runs_on_poll(self) -> bool {
        matches!(self, DependencyStatus::Ready)
    }

    /// Whether a unit with this status runs during the final stop sweep.
    pub fn runs_on_stop(self) -> bool {
        matches!(
            self,
            DependencyStatus::Ready | DependencyStatus::PartiallyReady
        )
    }
}

impl fmt::Display for DependencyStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        let s = match self {
            DependencyStatus::NotReady => "not_ready",
            DependencyStatus::PartiallyReady => "partially_ready",
            DependencyStatus::Ready => "ready",
        };
        f.write_str(s)
    }
}
