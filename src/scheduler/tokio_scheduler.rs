// src/scheduler/tokio_scheduler.rs

//! Wall-clock [`HostScheduler`] backed by Tokio timers.
//!
//! Every schedule gets its own Tokio task. A repeating schedule uses
//! `interval_at(start + delay, period)` with `MissedTickBehavior::Delay`, so a
//! slow callback pushes the next poll back instead of bursting.

use std::fmt;
use std::time::Duration;

use tokio::runtime::Handle;
use tokio::time::{self, Instant, MissedTickBehavior};
use tracing::{debug, trace};

use crate::errors::{DepgateError, Result};

use super::{HostScheduler, OnceTask, RepeatingTask, TaskHandle};

/// `tokio::time::interval` rejects a zero period.
const MIN_PERIOD: Duration = Duration::from_millis(1);

/// Start instant used when `now + delay` does not fit in an `Instant`.
/// Roughly 30 years, like Tokio's own sleep fallback.
const FAR_FUTURE: Duration = Duration::from_secs(86_400 * 365 * 30);

pub struct TokioScheduler {
    runtime: Handle,
    origin: Instant,
    tick: Duration,
    parent: Option<TaskHandle>,
}

impl fmt::Debug for TokioScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("TokioScheduler")
            .field("tick", &self.tick)
            .field("parent", &self.parent)
            .finish_non_exhaustive()
    }
}

impl TokioScheduler {
    /// Create a scheduler bound to the current Tokio runtime.
    ///
    /// Fails if called outside a runtime context.
    pub fn new(tick: Duration) -> Result<Self> {
        let runtime = Handle::try_current().map_err(|e| DepgateError::Other(e.into()))?;
        Ok(Self {
            runtime,
            origin: Instant::now(),
            tick,
            parent: None,
        })
    }

    /// Make every handle returned by this scheduler a child of `parent`.
    pub fn with_parent(mut self, parent: TaskHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    fn new_handle(&self) -> TaskHandle {
        match &self.parent {
            Some(parent) => parent.child(),
            None => TaskHandle::new(),
        }
    }
}

impl HostScheduler for TokioScheduler {
    fn now(&self) -> Duration {
        Instant::now().duration_since(self.origin)
    }

    fn tick(&self) -> Duration {
        self.tick
    }

    fn schedule_repeating(
        &self,
        delay: Duration,
        period: Duration,
        mut task: RepeatingTask,
    ) -> TaskHandle {
        let handle = self.new_handle();
        let task_handle = handle.clone();
        let now = Instant::now();
        let start = now.checked_add(delay).unwrap_or(now + FAR_FUTURE);
        let period = period.max(MIN_PERIOD);

        debug!(
            delay_ms = delay.as_millis() as u64,
            period_ms = period.as_millis() as u64,
            "scheduling repeating task"
        );

        self.runtime.spawn(async move {
            let mut interval = time::interval_at(start, period);
            interval.set_missed_tick_behavior(MissedTickBehavior::Delay);

            loop {
                tokio::select! {
                    biased;
                    _ = task_handle.cancelled() => break,
                    _ = interval.tick() => {
                        task(&task_handle);
                        if task_handle.is_cancelled() {
                            break;
                        }
                    }
                }
            }

            // Teardown call with the cancelled handle.
            task(&task_handle);
            trace!("repeating task finished");
        });

        handle
    }

    fn schedule_once(&self, delay: Duration, task: OnceTask) -> TaskHandle {
        let handle = self.new_handle();
        let task_handle = handle.clone();

        self.runtime.spawn(async move {
            tokio::select! {
                biased;
                _ = task_handle.cancelled() => {
                    trace!("one-shot task cancelled before it ran");
                }
                _ = time::sleep(delay) => task(),
            }
        });

        handle
    }
}
