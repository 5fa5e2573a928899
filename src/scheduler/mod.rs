// src/scheduler/mod.rs

//! Host scheduler abstraction.
//!
//! The dependency runner never owns a timer of its own; it asks a
//! [`HostScheduler`] to call it back at a fixed cadence and cancels the
//! returned [`TaskHandle`] when it is done.
//!
//! - [`handle`] holds the cancellable handle type (a tree of cancellation
//!   tokens, so cancelling a parent cancels every child task).
//! - [`tokio_scheduler`] is the wall-clock implementation used in production.
//! - [`manual`] is a deterministic tick clock, stepped by the caller. Tests
//!   and tick-driven hosts use it.

use std::time::Duration;

pub mod handle;
pub mod manual;
pub mod tokio_scheduler;

pub use handle::TaskHandle;
pub use manual::ManualScheduler;
pub use tokio_scheduler::TokioScheduler;

/// Length of one host tick (20 ticks per second).
pub const DEFAULT_TICK: Duration = Duration::from_millis(50);

/// Callback for a repeating schedule. It receives its own handle so it can
/// cancel itself.
///
/// Once the handle is cancelled, by the task itself, its owner or a parent
/// handle, the scheduler makes exactly one more teardown call in which
/// `handle.is_cancelled()` is true.
pub type RepeatingTask = Box<dyn FnMut(&TaskHandle) + Send + 'static>;

/// Callback for a one-shot schedule.
pub type OnceTask = Box<dyn FnOnce() + Send + 'static>;

/// Trait abstracting the host's task scheduler.
///
/// Implementations run callbacks on their own designated thread/task; all
/// callbacks of one repeating schedule run sequentially.
pub trait HostScheduler: Send + Sync {
    /// Current time on the scheduler's clock, measured from its origin.
    fn now(&self) -> Duration;

    /// Length of one tick on this scheduler.
    fn tick(&self) -> Duration;

    /// Call `task` first after `delay`, then every `period`, until the
    /// returned handle is cancelled.
    fn schedule_repeating(
        &self,
        delay: Duration,
        period: Duration,
        task: RepeatingTask,
    ) -> TaskHandle;

    /// Call `task` once after `delay`, unless the handle is cancelled first.
    fn schedule_once(&self, delay: Duration, task: OnceTask) -> TaskHandle;
}
