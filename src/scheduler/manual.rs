// src/scheduler/manual.rs

//! Deterministic tick-driven [`HostScheduler`].
//!
//! Nothing happens until the caller steps the clock with
//! [`ManualScheduler::advance`]; due tasks then run synchronously on the
//! calling thread. This mirrors a game loop, where plugins are polled from
//! the server's main thread once per tick.

use std::fmt;
use std::sync::{Mutex, MutexGuard};
use std::time::Duration;

use tracing::trace;

use super::{HostScheduler, OnceTask, RepeatingTask, TaskHandle};

enum EntryTask {
    Repeating(RepeatingTask),
    Once(OnceTask),
}

struct Entry {
    id: u64,
    due: u64,
    /// `Some` for repeating schedules.
    period: Option<u64>,
    handle: TaskHandle,
    task: EntryTask,
}

#[derive(Default)]
struct Inner {
    now: u64,
    next_id: u64,
    entries: Vec<Entry>,
}

pub struct ManualScheduler {
    tick: Duration,
    parent: Option<TaskHandle>,
    inner: Mutex<Inner>,
}

impl fmt::Debug for ManualScheduler {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("ManualScheduler")
            .field("tick", &self.tick)
            .field("now_ticks", &self.now_ticks())
            .field("scheduled", &self.scheduled_len())
            .finish()
    }
}

impl ManualScheduler {
    pub fn new(tick: Duration) -> Self {
        Self {
            tick,
            parent: None,
            inner: Mutex::new(Inner::default()),
        }
    }

    /// Make every handle returned by this scheduler a child of `parent`.
    pub fn with_parent(mut self, parent: TaskHandle) -> Self {
        self.parent = Some(parent);
        self
    }

    /// Current clock value in ticks.
    pub fn now_ticks(&self) -> u64 {
        self.lock().now
    }

    /// Number of schedules that have not finished or been cancelled.
    pub fn scheduled_len(&self) -> usize {
        self.lock()
            .entries
            .iter()
            .filter(|e| !e.handle.is_cancelled())
            .count()
    }

    /// Convert a duration to whole ticks, rounding up.
    pub fn ticks_for(&self, duration: Duration) -> u64 {
        let tick = self.tick.as_nanos().max(1);
        u64::try_from(duration.as_nanos().div_ceil(tick)).unwrap_or(u64::MAX)
    }

    /// Step the clock `ticks` times, running every task that falls due.
    pub fn advance(&self, ticks: u64) {
        for _ in 0..ticks {
            let now = {
                let mut inner = self.lock();
                inner.now += 1;
                inner.now
            };
            self.run_due(now);
        }
    }

    /// Step the clock until nothing is scheduled any more, or `max_ticks`
    /// have passed. Returns the number of ticks stepped.
    ///
    /// Cancelled repeating schedules still count until their teardown call
    /// has run.
    pub fn run_until_idle(&self, max_ticks: u64) -> u64 {
        let mut stepped = 0;
        while stepped < max_ticks && !self.lock().entries.is_empty() {
            self.advance(1);
            stepped += 1;
        }
        stepped
    }

    fn run_due(&self, now: u64) {
        let mut due = {
            let mut inner = self.lock();
            let (due, rest): (Vec<_>, Vec<_>) = inner
                .entries
                .drain(..)
                .partition(|e| e.due <= now || e.handle.is_cancelled());
            inner.entries = rest;
            due
        };
        due.sort_by_key(|e| (e.due, e.id));

        // The lock is released while tasks run so they may schedule more work.
        for entry in due {
            match entry.task {
                EntryTask::Once(task) => {
                    if !entry.handle.is_cancelled() {
                        trace!(id = entry.id, tick = now, "running due task");
                        task();
                    }
                }
                EntryTask::Repeating(mut task) => {
                    if entry.handle.is_cancelled() {
                        trace!(id = entry.id, tick = now, "tearing down cancelled task");
                        task(&entry.handle);
                        continue;
                    }
                    trace!(id = entry.id, tick = now, "running due task");
                    task(&entry.handle);
                    if entry.handle.is_cancelled() {
                        task(&entry.handle);
                    } else if let Some(period) = entry.period {
                        self.lock().entries.push(Entry {
                            due: now.saturating_add(period),
                            task: EntryTask::Repeating(task),
                            ..entry
                        });
                    }
                }
            }
        }
    }

    fn insert(&self, delay: Duration, period: Option<u64>, task: EntryTask) -> TaskHandle {
        let handle = match &self.parent {
            Some(parent) => parent.child(),
            None => TaskHandle::new(),
        };
        let delay_ticks = self.ticks_for(delay);

        let mut inner = self.lock();
        let id = inner.next_id;
        inner.next_id += 1;
        let due = inner.now.saturating_add(delay_ticks);
        inner.entries.push(Entry {
            id,
            due,
            period,
            handle: handle.clone(),
            task,
        });

        handle
    }

    fn lock(&self) -> MutexGuard<'_, Inner> {
        self.inner.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
    }
}

impl HostScheduler for ManualScheduler {
    fn now(&self) -> Duration {
        let ticks = self.now_ticks();
        self.tick.saturating_mul(ticks.min(u32::MAX as u64) as u32)
    }

    fn tick(&self) -> Duration {
        self.tick
    }

    fn schedule_repeating(
        &self,
        delay: Duration,
        period: Duration,
        task: RepeatingTask,
    ) -> TaskHandle {
        let period = self.ticks_for(period).max(1);
        self.insert(delay, Some(period), EntryTask::Repeating(task))
    }

    fn schedule_once(&self, delay: Duration, task: OnceTask) -> TaskHandle {
        self.insert(delay, None, EntryTask::Once(task))
    }
}

#[cfg(test)]
mod tests {
    use std::sync::Arc;
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::scheduler::DEFAULT_TICK;

    #[test]
    fn repeating_task_runs_after_delay_then_every_period() {
        let scheduler = Arc::new(ManualScheduler::new(DEFAULT_TICK));
        let fired_at = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&fired_at);
        let clock = Arc::clone(&scheduler);
        scheduler.schedule_repeating(
            DEFAULT_TICK,
            DEFAULT_TICK * 10,
            Box::new(move |_h: &TaskHandle| {
                sink.lock().unwrap().push(clock.now_ticks());
            }),
        );

        scheduler.advance(25);

        assert_eq!(*fired_at.lock().unwrap(), vec![1, 11, 21]);
    }

    #[test]
    fn cancelled_task_is_dropped() {
        let scheduler = ManualScheduler::new(DEFAULT_TICK);
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        let handle = scheduler.schedule_repeating(
            Duration::ZERO,
            DEFAULT_TICK,
            Box::new(move |_h: &TaskHandle| {
                c.fetch_add(1, Ordering::SeqCst);
            }),
        );

        scheduler.advance(3);
        handle.cancel();
        assert_eq!(scheduler.scheduled_len(), 0);
        scheduler.advance(3);

        // Three regular calls plus the teardown call.
        assert_eq!(count.load(Ordering::SeqCst), 4);
        assert_eq!(scheduler.run_until_idle(10), 0);
    }

    #[test]
    fn task_can_cancel_itself() {
        let scheduler = ManualScheduler::new(DEFAULT_TICK);
        let count = Arc::new(AtomicUsize::new(0));

        let c = Arc::clone(&count);
        scheduler.schedule_repeating(
            Duration::ZERO,
            DEFAULT_TICK,
            Box::new(move |h: &TaskHandle| {
                if c.fetch_add(1, Ordering::SeqCst) == 1 {
                    h.cancel();
                }
            }),
        );

        scheduler.advance(10);
        // The teardown call follows the cancelling call directly.
        assert_eq!(count.load(Ordering::SeqCst), 3);
    }

    #[test]
    fn teardown_call_sees_a_cancelled_handle() {
        let root = TaskHandle::new();
        let scheduler = ManualScheduler::new(DEFAULT_TICK).with_parent(root.clone());
        let calls = Arc::new(Mutex::new(Vec::new()));

        let sink = Arc::clone(&calls);
        scheduler.schedule_repeating(
            Duration::ZERO,
            DEFAULT_TICK,
            Box::new(move |h: &TaskHandle| {
                sink.lock().unwrap().push(h.is_cancelled());
            }),
        );

        scheduler.advance(2);
        root.cancel();
        assert_eq!(scheduler.run_until_idle(10), 1);
        scheduler.advance(5);

        assert_eq!(*calls.lock().unwrap(), vec![false, false, true]);
    }

    #[test]
    fn huge_delays_saturate_instead_of_overflowing() {
        let scheduler = ManualScheduler::new(DEFAULT_TICK);
        assert_eq!(scheduler.ticks_for(Duration::MAX), u64::MAX);

        let fired = Arc::new(AtomicUsize::new(0));
        let f = Arc::clone(&fired);
        scheduler.advance(3);
        scheduler.schedule_once(
            Duration::MAX,
            Box::new(move || {
                f.fetch_add(1, Ordering::SeqCst);
            }),
        );
        scheduler.advance(10);

        assert_eq!(fired.load(Ordering::SeqCst), 0);
        assert_eq!(scheduler.scheduled_len(), 1);
    }

    #[test]
    fn parent_cancellation_reaches_scheduled_tasks() {
        let root = TaskHandle::new();
        let scheduler = ManualScheduler::new(DEFAULT_TICK).with_parent(root.clone());
        let fired = Arc::new(AtomicUsize::new(0));

        let f = Arc::clone(&fired);
        scheduler.schedule_once(
            DEFAULT_TICK * 5,
            Box::new(move || {
                f.fetch_add(1, Ordering::SeqCst);
            }),
        );

        root.cancel();
        scheduler.advance(10);

        assert_eq!(fired.load(Ordering::SeqCst), 0);
    }

    #[test]
    fn durations_round_up_to_whole_ticks() {
        let scheduler = ManualScheduler::new(DEFAULT_TICK);
        assert_eq!(scheduler.ticks_for(Duration::ZERO), 0);
        assert_eq!(scheduler.ticks_for(Duration::from_millis(1)), 1);
        assert_eq!(scheduler.ticks_for(Duration::from_millis(500)), 10);
        assert_eq!(scheduler.ticks_for(Duration::from_millis(501)), 11);
    }
}
