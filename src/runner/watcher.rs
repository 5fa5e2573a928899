// src/runner/watcher.rs

//! Pure poll-loop state machine.
//!
//! The watcher knows nothing about timers: the runner calls
//! [`Watcher::poll`] from a repeating host schedule and cancels that
//! schedule once a step reports `finished`. Keeping the clock outside makes
//! every transition testable without a runtime.

use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::time::Duration;

use anyhow::anyhow;
use tracing::{debug, info, warn};

use crate::types::DependencyStatus;

use super::finish::BoxFinishHandler;
use super::pending::PendingSet;
use super::unit::UnitRef;

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
enum WatcherState {
    Running,
    /// Terminal: finish handlers have fired.
    Stopped,
}

/// What happened during one call to [`Watcher::poll`].
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct WatchStep {
    /// Units that ran successfully (and left the pending set).
    pub executed: Vec<String>,
    /// Units whose `run` failed; they remain pending.
    pub failed: Vec<String>,
    /// Whether this poll stopped the watcher.
    pub finished: bool,
    /// Units still pending when the watcher stopped (empty unless `finished`).
    pub remaining: Vec<String>,
}

pub struct Watcher {
    pending: PendingSet,
    finish: Vec<BoxFinishHandler>,
    deadline: Duration,
    state: WatcherState,
    polls: u64,
}

impl std::fmt::Debug for Watcher {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Watcher")
            .field("pending", &self.pending)
            .field("finish_handlers", &self.finish.len())
            .field("deadline", &self.deadline)
            .field("state", &self.state)
            .field("polls", &self.polls)
            .finish()
    }
}

impl Watcher {
    pub fn new(pending: PendingSet, finish: Vec<BoxFinishHandler>, deadline: Duration) -> Self {
        Self {
            pending,
            finish,
            deadline,
            state: WatcherState::Running,
            polls: 0,
        }
    }

    pub fn is_stopped(&self) -> bool {
        self.state == WatcherState::Stopped
    }

    pub fn pending_len(&self) -> usize {
        self.pending.len()
    }

    /// Number of polls handled while running.
    pub fn polls(&self) -> u64 {
        self.polls
    }

    /// Run one sweep at time `now`.
    ///
    /// Stops (inclusive deadline) when the pending set is empty or
    /// `now >= deadline`. Polling a stopped watcher does nothing.
    pub fn poll(&mut self, now: Duration) -> WatchStep {
        let mut step = WatchStep::default();
        if self.is_stopped() {
            return step;
        }

        self.polls += 1;
        self.sweep(DependencyStatus::runs_on_poll, &mut step);

        let expired = now >= self.deadline;
        if self.pending.is_empty() || expired {
            debug!(
                poll = self.polls,
                expired,
                pending = self.pending.len(),
                "watcher stop condition reached"
            );
            self.stop(&mut step);
        }

        step
    }

    /// Stop now regardless of the deadline: the final sweep runs and the
    /// finish handlers fire. Does nothing once stopped.
    pub fn shutdown(&mut self) -> WatchStep {
        let mut step = WatchStep::default();
        if !self.is_stopped() {
            info!(
                poll = self.polls,
                pending = self.pending.len(),
                "polling cancelled by host; stopping early"
            );
            self.stop(&mut step);
        }
        step
    }

    /// Visit a snapshot of the pending set and run every unit whose status
    /// passes `should_run`.
    fn sweep(&mut self, should_run: fn(DependencyStatus) -> bool, step: &mut WatchStep) {
        for unit in self.pending.snapshot() {
            let status = match guarded(|| unit.dependency_status()) {
                Ok(status) => status,
                Err(err) => {
                    warn!(unit = %unit.name(), error = %err, "dependency status check failed; treating as not ready");
                    DependencyStatus::NotReady
                }
            };

            if !should_run(status) {
                continue;
            }

            match guarded(|| unit.run()) {
                Ok(()) => {
                    debug!(unit = %unit.name(), %status, "unit executed");
                    self.pending.remove(&unit);
                    step.executed.push(unit.name().to_string());
                }
                Err(err) => {
                    warn!(unit = %unit.name(), error = %err, "unit failed; keeping it pending");
                    step.failed.push(unit.name().to_string());
                }
            }
        }
    }

    fn stop(&mut self, step: &mut WatchStep) {
        self.state = WatcherState::Stopped;

        // Best effort: run units whose required dependencies arrived even if
        // optional ones never did.
        self.sweep(DependencyStatus::runs_on_stop, step);

        let remaining: Vec<UnitRef> = std::mem::take(&mut self.pending).snapshot();
        step.finished = true;
        step.remaining = super::unit::unit_names(&remaining);

        info!(
            polls = self.polls,
            remaining = remaining.len(),
            "dependency watcher stopped"
        );

        for (idx, handler) in std::mem::take(&mut self.finish).into_iter().enumerate() {
            let copy = remaining.clone();
            if let Err(err) = guarded(move || handler.on_finish(copy)) {
                warn!(handler = idx, error = %err, "finish handler failed");
            }
        }
    }
}

/// Run caller code, turning a panic into an error.
fn guarded<T>(f: impl FnOnce() -> anyhow::Result<T>) -> anyhow::Result<T> {
    match panic::catch_unwind(AssertUnwindSafe(f)) {
        Ok(res) => res,
        Err(payload) => Err(anyhow!("panicked: {}", panic_message(payload.as_ref()))),
    }
}

fn panic_message(payload: &(dyn Any + Send)) -> &str {
    if let Some(s) = payload.downcast_ref::<&str>() {
        s
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s
    } else {
        "non-string panic payload"
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};
    use std::sync::{Arc, Mutex};

    use super::*;
    use crate::runner::{unit_names, FinishHandler, UnitFn};

    const POLL: Duration = Duration::from_millis(500);

    /// Unit that reports `NotReady` for its first `after` status checks.
    fn ready_after(name: &'static str, after: usize, runs: Arc<AtomicUsize>) -> UnitRef {
        let checks = AtomicUsize::new(0);
        UnitFn::arc(
            name,
            move || {
                if checks.fetch_add(1, Ordering::SeqCst) >= after {
                    Ok(DependencyStatus::Ready)
                } else {
                    Ok(DependencyStatus::NotReady)
                }
            },
            move || {
                runs.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        )
    }

    fn recorder(log: Arc<Mutex<Vec<(usize, Vec<String>)>>>, id: usize) -> BoxFinishHandler {
        Box::new(move |remaining: Vec<UnitRef>| -> anyhow::Result<()> {
            log.lock().unwrap().push((id, unit_names(&remaining)));
            Ok(())
        })
    }

    fn pending_of(units: &[UnitRef]) -> PendingSet {
        let mut set = PendingSet::new();
        for u in units {
            set.insert(Arc::clone(u));
        }
        set
    }

    #[test]
    fn ready_units_run_and_never_ready_units_remain() {
        let (a_runs, b_runs, c_runs) = (
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
            Arc::new(AtomicUsize::new(0)),
        );
        let units = vec![
            ready_after("A", 0, a_runs.clone()),
            ready_after("B", 2, b_runs.clone()),
            ready_after("C", usize::MAX, c_runs.clone()),
        ];
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut watcher = Watcher::new(pending_of(&units), vec![recorder(log.clone(), 0)], POLL * 5);

        let mut now = Duration::ZERO;
        while !watcher.is_stopped() {
            now += POLL;
            watcher.poll(now);
        }

        assert_eq!(a_runs.load(Ordering::SeqCst), 1);
        assert_eq!(b_runs.load(Ordering::SeqCst), 1);
        assert_eq!(c_runs.load(Ordering::SeqCst), 0);
        assert_eq!(*log.lock().unwrap(), vec![(0, vec!["C".to_string()])]);
    }

    #[test]
    fn empty_watcher_stops_on_first_poll() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut watcher = Watcher::new(PendingSet::new(), vec![recorder(log.clone(), 0)], POLL * 5);

        let step = watcher.poll(POLL);

        assert!(step.finished);
        assert!(step.remaining.is_empty());
        assert_eq!(*log.lock().unwrap(), vec![(0, Vec::<String>::new())]);
    }

    #[test]
    fn deadline_is_inclusive() {
        let unit = ready_after("never", usize::MAX, Arc::new(AtomicUsize::new(0)));
        let mut watcher = Watcher::new(pending_of(&[unit]), Vec::new(), POLL * 2);

        assert!(!watcher.poll(POLL).finished);
        let step = watcher.poll(POLL * 2);

        assert!(step.finished);
        assert_eq!(step.remaining, vec!["never".to_string()]);
    }

    #[test]
    fn partially_ready_unit_runs_only_in_final_sweep() {
        let runs = Arc::new(AtomicUsize::new(0));
        let r = runs.clone();
        let unit = UnitFn::arc(
            "partial",
            || Ok(DependencyStatus::PartiallyReady),
            move || {
                r.fetch_add(1, Ordering::SeqCst);
                Ok(())
            },
        );
        let mut watcher = Watcher::new(pending_of(&[unit]), Vec::new(), POLL * 2);

        watcher.poll(POLL);
        assert_eq!(runs.load(Ordering::SeqCst), 0);

        let step = watcher.poll(POLL * 2);
        assert_eq!(runs.load(Ordering::SeqCst), 1);
        assert_eq!(step.executed, vec!["partial".to_string()]);
        assert!(step.remaining.is_empty());
    }

    #[test]
    fn failing_unit_stays_pending_and_does_not_block_others() {
        let attempts = Arc::new(AtomicUsize::new(0));
        let a = attempts.clone();
        let broken = UnitFn::arc(
            "broken",
            || Ok(DependencyStatus::Ready),
            move || {
                a.fetch_add(1, Ordering::SeqCst);
                Err(anyhow!("boom"))
            },
        );
        let ok_runs = Arc::new(AtomicUsize::new(0));
        let fine = ready_after("fine", 0, ok_runs.clone());

        let mut watcher = Watcher::new(pending_of(&[broken, fine]), Vec::new(), POLL * 3);

        let first = watcher.poll(POLL);
        assert_eq!(first.failed, vec!["broken".to_string()]);
        assert_eq!(first.executed, vec!["fine".to_string()]);
        assert_eq!(watcher.pending_len(), 1);

        watcher.poll(POLL * 2);
        assert_eq!(attempts.load(Ordering::SeqCst), 2);
        assert_eq!(ok_runs.load(Ordering::SeqCst), 1);
    }

    #[test]
    fn panicking_predicate_is_treated_as_not_ready() {
        let unit = UnitFn::arc(
            "explodes",
            || -> anyhow::Result<DependencyStatus> { panic!("predicate blew up") },
            || Ok(()),
        );
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut watcher = Watcher::new(pending_of(&[unit]), vec![recorder(log.clone(), 0)], POLL);

        let step = watcher.poll(POLL);

        assert!(step.finished);
        assert!(step.executed.is_empty());
        assert_eq!(*log.lock().unwrap(), vec![(0, vec!["explodes".to_string()])]);
    }

    #[test]
    fn failing_finish_handler_does_not_suppress_later_ones() {
        let log = Arc::new(Mutex::new(Vec::new()));
        let first_called = Arc::new(AtomicUsize::new(0));
        let fc = first_called.clone();
        let failing: BoxFinishHandler = Box::new(move |_remaining: Vec<UnitRef>| -> anyhow::Result<()> {
            fc.fetch_add(1, Ordering::SeqCst);
            Err(anyhow!("handler failed"))
        });
        let panicking: BoxFinishHandler = Box::new(|_remaining: Vec<UnitRef>| -> anyhow::Result<()> {
            panic!("handler panicked")
        });

        let mut watcher = Watcher::new(
            PendingSet::new(),
            vec![failing, panicking, recorder(log.clone(), 2)],
            POLL,
        );
        watcher.poll(POLL);

        assert_eq!(first_called.load(Ordering::SeqCst), 1);
        assert_eq!(log.lock().unwrap().len(), 1);
    }

    #[test]
    fn stopped_watcher_ignores_further_polls() {
        let mut watcher = Watcher::new(PendingSet::new(), Vec::new(), POLL);
        assert!(watcher.poll(POLL).finished);

        let again = watcher.poll(POLL * 2);
        assert_eq!(again, WatchStep::default());
        assert_eq!(watcher.polls(), 1);
    }

    #[test]
    fn shutdown_reports_before_the_deadline_and_only_once() {
        let runs = Arc::new(AtomicUsize::new(0));
        let waiting = ready_after("waiting", usize::MAX, runs.clone());
        let log = Arc::new(Mutex::new(Vec::new()));
        let mut watcher = Watcher::new(
            pending_of(&[waiting]),
            vec![recorder(log.clone(), 0)],
            POLL * 100,
        );

        assert!(!watcher.poll(POLL).finished);
        let step = watcher.shutdown();

        assert!(step.finished);
        assert_eq!(step.remaining, vec!["waiting".to_string()]);
        assert!(watcher.is_stopped());
        assert_eq!(watcher.shutdown(), WatchStep::default());
        assert_eq!(*log.lock().unwrap(), vec![(0, vec!["waiting".to_string()])]);
        assert_eq!(runs.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn closures_are_finish_handlers() {
        fn assert_handler<H: FinishHandler>(_h: &H) {}
        let h = |_r: Vec<UnitRef>| -> anyhow::Result<()> { Ok(()) };
        assert_handler(&h);
    }
}
