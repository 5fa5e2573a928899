// src/runner/options.rs

use std::time::Duration;

use crate::scheduler::DEFAULT_TICK;

/// Timing knobs for a [`DependencyRunner`](super::DependencyRunner).
///
/// Defaults: first poll after one tick, then every ten ticks, giving up
/// after ten seconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct RunnerOptions {
    /// How long after `start()` the watcher gives up on pending units.
    pub timeout: Duration,
    /// Delay before the first poll.
    pub initial_delay: Duration,
    /// Interval between polls.
    pub period: Duration,
}

impl Default for RunnerOptions {
    fn default() -> Self {
        Self {
            timeout: Duration::from_secs(10),
            initial_delay: DEFAULT_TICK,
            period: DEFAULT_TICK * 10,
        }
    }
}

impl RunnerOptions {
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn with_initial_delay(mut self, delay: Duration) -> Self {
        self.initial_delay = delay;
        self
    }

    pub fn with_period(mut self, period: Duration) -> Self {
        self.period = period;
        self
    }
}
