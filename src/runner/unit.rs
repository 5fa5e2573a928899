// src/runner/unit.rs

//! Units of work gated by a readiness predicate.

use std::borrow::Cow;
use std::fmt;
use std::sync::Arc;

use crate::types::DependencyStatus;

/// A caller-supplied action that may only run once its dependencies are
/// available.
///
/// The runner identifies units by reference identity: registering the same
/// `Arc` twice keeps a single pending entry.
pub trait DependantUnit: Send + Sync {
    /// Name used in logs and reports.
    fn name(&self) -> &str;

    /// Current readiness. An `Err` is logged and treated as `NotReady`.
    fn dependency_status(&self) -> anyhow::Result<DependencyStatus>;

    /// Execute the unit. An `Err` is logged and the unit stays pending.
    fn run(&self) -> anyhow::Result<()>;
}

/// Shared handle to a unit.
pub type UnitRef = Arc<dyn DependantUnit>;

/// Names of the given units, in order.
pub fn unit_names(units: &[UnitRef]) -> Vec<String> {
    units.iter().map(|u| u.name().to_string()).collect()
}

/// Closure-backed unit.
///
/// ```
/// use depgate::runner::{UnitFn, UnitRef};
/// use depgate::types::DependencyStatus;
///
/// let unit: UnitRef = UnitFn::arc(
///     "hello",
///     || Ok(DependencyStatus::Ready),
///     || Ok(()),
/// );
/// assert_eq!(unit.name(), "hello");
/// ```
pub struct UnitFn<S, R> {
    name: Cow<'static, str>,
    status: S,
    run: R,
}

impl<S, R> fmt::Debug for UnitFn<S, R> {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.debug_struct("UnitFn")
            .field("name", &self.name)
            .finish_non_exhaustive()
    }
}

impl<S, R> UnitFn<S, R>
where
    S: Fn() -> anyhow::Result<DependencyStatus> + Send + Sync + 'static,
    R: Fn() -> anyhow::Result<()> + Send + Sync + 'static,
{
    pub fn new(name: impl Into<Cow<'static, str>>, status: S, run: R) -> Self {
        Self {
            name: name.into(),
            status,
            run,
        }
    }

    /// Create the unit and return it as a shared [`UnitRef`].
    pub fn arc(name: impl Into<Cow<'static, str>>, status: S, run: R) -> UnitRef {
        Arc::new(Self::new(name, status, run))
    }
}

impl<S, R> DependantUnit for UnitFn<S, R>
where
    S: Fn() -> anyhow::Result<DependencyStatus> + Send + Sync,
    R: Fn() -> anyhow::Result<()> + Send + Sync,
{
    fn name(&self) -> &str {
        &self.name
    }

    fn dependency_status(&self) -> anyhow::Result<DependencyStatus> {
        (self.status)()
    }

    fn run(&self) -> anyhow::Result<()> {
        (self.run)()
    }
}
