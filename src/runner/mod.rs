// src/runner/mod.rs

//! Dependency-gated task runner.
//!
//! Callers queue [`DependantUnit`]s and [`FinishHandler`]s on a
//! [`DependencyRunner`], then call [`DependencyRunner::start`]. From then on a
//! repeating host schedule drives the [`Watcher`]:
//!
//! - every poll runs the units that report `Ready` and drops them from the
//!   pending set;
//! - once nothing is pending or the deadline has passed, a final sweep also
//!   runs `PartiallyReady` units, then every finish handler receives the
//!   units that never became ready.
//!
//! The poll schedule's handle stays private, so callers cannot stop a started
//! runner. If the host cancels it anyway (for example through a parent
//! handle on shutdown), the scheduler's teardown call stops the watcher
//! early and the finish handlers still fire.
//!
//! - [`unit`] defines the unit trait and a closure-backed implementation.
//! - [`finish`] defines the finish-handler trait.
//! - [`pending`] holds the identity-keyed pending set.
//! - [`watcher`] is the pure poll-loop state machine.
//! - [`options`] holds timing configuration.

pub mod finish;
pub mod options;
pub mod pending;
pub mod unit;
pub mod watcher;

use std::fmt;
use std::sync::atomic::{AtomicBool, Ordering};
use std::sync::Arc;

use tracing::{debug, info};

use crate::errors::{DepgateError, Result};
use crate::scheduler::{HostScheduler, TaskHandle};

pub use finish::{BoxFinishHandler, FinishHandler};
pub use options::RunnerOptions;
pub use pending::PendingSet;
pub use unit::{unit_names, DependantUnit, UnitFn, UnitRef};
pub use watcher::{WatchStep, Watcher};

/// Builder-style facade that accumulates units and finish handlers and starts
/// the watcher exactly once.
///
/// Registration is only allowed before [`start`](Self::start); afterwards it
/// fails with [`DepgateError::InvalidState`] and leaves the runner untouched.
pub struct DependencyRunner {
    scheduler: Arc<dyn HostScheduler>,
    options: RunnerOptions,
    pending: PendingSet,
    finish: Vec<BoxFinishHandler>,
    /// Set by `start()`; doubles as the "already started" flag.
    handle: Option<TaskHandle>,
    finished: Arc<AtomicBool>,
}

impl fmt::Debug for DependencyRunner {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("DependencyRunner")
            .field("options", &self.options)
            .field("pending", &self.pending)
            .field("finish_handlers", &self.finish.len())
            .field("started", &self.is_started())
            .field("finished", &self.is_finished())
            .finish_non_exhaustive()
    }
}

impl DependencyRunner {
    pub fn new(scheduler: Arc<dyn HostScheduler>) -> Self {
        Self::with_options(scheduler, RunnerOptions::default())
    }

    pub fn with_options(scheduler: Arc<dyn HostScheduler>, options: RunnerOptions) -> Self {
        Self {
            scheduler,
            options,
            pending: PendingSet::new(),
            finish: Vec::new(),
            handle: None,
            finished: Arc::new(AtomicBool::new(false)),
        }
    }

    pub fn options(&self) -> &RunnerOptions {
        &self.options
    }

    pub fn is_started(&self) -> bool {
        self.handle.is_some()
    }

    /// Units queued so far. Always zero once started, since the watcher owns
    /// them from then on.
    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Whether the watcher has stopped and the finish handlers have fired.
    pub fn is_finished(&self) -> bool {
        self.finished.load(Ordering::SeqCst)
    }

    /// Queue a unit. Adding the same `Arc` twice keeps one entry.
    pub fn add(&mut self, unit: UnitRef) -> Result<&mut Self> {
        self.ensure_not_started("add")?;
        if !self.pending.insert(unit) {
            debug!("unit already queued; ignoring duplicate");
        }
        Ok(self)
    }

    /// Queue several units at once.
    pub fn add_all<I>(&mut self, units: I) -> Result<&mut Self>
    where
        I: IntoIterator<Item = UnitRef>,
    {
        self.ensure_not_started("add_all")?;
        for unit in units {
            self.pending.insert(unit);
        }
        Ok(self)
    }

    /// Register a handler to call once the watcher stops. Handlers fire in
    /// registration order.
    pub fn on_finish<H>(&mut self, handler: H) -> Result<&mut Self>
    where
        H: FinishHandler + 'static,
    {
        self.ensure_not_started("on_finish")?;
        self.finish.push(Box::new(handler));
        Ok(self)
    }

    /// Start polling.
    ///
    /// The deadline is fixed here as `now + timeout`, saturating at
    /// `Duration::MAX`. With nothing queued the first poll stops immediately
    /// and finish handlers receive an empty list.
    pub fn start(&mut self) -> Result<()> {
        self.ensure_not_started("start")?;

        let deadline = self.scheduler.now().saturating_add(self.options.timeout);
        let pending = std::mem::take(&mut self.pending);
        let finish = std::mem::take(&mut self.finish);

        info!(
            units = pending.len(),
            finish_handlers = finish.len(),
            timeout_ms = self.options.timeout.as_millis() as u64,
            period_ms = self.options.period.as_millis() as u64,
            "dependency runner starting"
        );

        let mut watcher = Watcher::new(pending, finish, deadline);
        let clock = Arc::clone(&self.scheduler);
        let finished = Arc::clone(&self.finished);

        let handle = self.scheduler.schedule_repeating(
            self.options.initial_delay,
            self.options.period,
            Box::new(move |handle: &TaskHandle| {
                // Teardown call: the schedule was cancelled from outside.
                let step = if handle.is_cancelled() {
                    watcher.shutdown()
                } else {
                    watcher.poll(clock.now())
                };
                if !step.executed.is_empty() || !step.failed.is_empty() {
                    debug!(executed = ?step.executed, failed = ?step.failed, "poll finished");
                }
                if step.finished {
                    finished.store(true, Ordering::SeqCst);
                    handle.cancel();
                }
            }),
        );

        self.handle = Some(handle);
        Ok(())
    }

    fn ensure_not_started(&self, op: &str) -> Result<()> {
        if self.is_started() {
            return Err(DepgateError::InvalidState(format!(
                "cannot call `{op}` after the runner has started"
            )));
        }
        Ok(())
    }
}
