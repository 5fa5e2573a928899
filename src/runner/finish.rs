// src/runner/finish.rs

use super::unit::UnitRef;

/// Handler notified once when the runner stops.
///
/// `remaining` is a point-in-time copy of the units that never became
/// ready. The handler is consumed by the call, so it can only fire once.
pub trait FinishHandler: Send {
    fn on_finish(self: Box<Self>, remaining: Vec<UnitRef>) -> anyhow::Result<()>;
}

impl<F> FinishHandler for F
where
    F: FnOnce(Vec<UnitRef>) -> anyhow::Result<()> + Send,
{
    fn on_finish(self: Box<Self>, remaining: Vec<UnitRef>) -> anyhow::Result<()> {
        (*self)(remaining)
    }
}

pub type BoxFinishHandler = Box<dyn FinishHandler>;
