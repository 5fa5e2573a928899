use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use anyhow::anyhow;
use depgate::runner::{DependantUnit, UnitRef};
use depgate::types::DependencyStatus;

#[derive(Debug, Clone, Copy)]
enum Predicate {
    /// `NotReady` for the first `n` checks, then `Ready`.
    ReadyAfter(usize),
    Always(DependencyStatus),
    Errors,
    Panics,
}

#[derive(Debug, Clone, Copy)]
enum RunBehaviour {
    Succeed,
    /// Fail the first `n` attempts.
    FailFirst(usize),
    Panic,
}

/// Unit whose readiness follows a fixed script and which counts its checks
/// and runs.
#[derive(Debug)]
pub struct ScriptedUnit {
    name: String,
    predicate: Predicate,
    behaviour: RunBehaviour,
    checks: AtomicUsize,
    attempts: AtomicUsize,
    runs: AtomicUsize,
}

impl ScriptedUnit {
    fn with(name: &str, predicate: Predicate) -> Self {
        Self {
            name: name.to_string(),
            predicate,
            behaviour: RunBehaviour::Succeed,
            checks: AtomicUsize::new(0),
            attempts: AtomicUsize::new(0),
            runs: AtomicUsize::new(0),
        }
    }

    pub fn ready(name: &str) -> Self {
        Self::with(name, Predicate::Always(DependencyStatus::Ready))
    }

    pub fn never(name: &str) -> Self {
        Self::with(name, Predicate::Always(DependencyStatus::NotReady))
    }

    pub fn partial(name: &str) -> Self {
        Self::with(name, Predicate::Always(DependencyStatus::PartiallyReady))
    }

    /// `NotReady` for the first `checks` status queries, `Ready` afterwards.
    pub fn ready_after(name: &str, checks: usize) -> Self {
        Self::with(name, Predicate::ReadyAfter(checks))
    }

    pub fn erroring_predicate(name: &str) -> Self {
        Self::with(name, Predicate::Errors)
    }

    pub fn panicking_predicate(name: &str) -> Self {
        Self::with(name, Predicate::Panics)
    }

    pub fn failing_first(mut self, attempts: usize) -> Self {
        self.behaviour = RunBehaviour::FailFirst(attempts);
        self
    }

    pub fn panicking_run(mut self) -> Self {
        self.behaviour = RunBehaviour::Panic;
        self
    }

    /// Wrap in an `Arc`, returning both the concrete handle (for assertions)
    /// and the `UnitRef` to register.
    pub fn shared(self) -> (Arc<ScriptedUnit>, UnitRef) {
        let unit = Arc::new(self);
        let as_ref: UnitRef = unit.clone();
        (unit, as_ref)
    }

    /// Successful runs.
    pub fn runs(&self) -> usize {
        self.runs.load(Ordering::SeqCst)
    }

    /// Run attempts, including failed ones.
    pub fn attempts(&self) -> usize {
        self.attempts.load(Ordering::SeqCst)
    }

    /// Number of status queries answered.
    pub fn checks(&self) -> usize {
        self.checks.load(Ordering::SeqCst)
    }
}

impl DependantUnit for ScriptedUnit {
    fn name(&self) -> &str {
        &self.name
    }

    fn dependency_status(&self) -> anyhow::Result<DependencyStatus> {
        let seen = self.checks.fetch_add(1, Ordering::SeqCst);
        match self.predicate {
            Predicate::ReadyAfter(n) if seen >= n => Ok(DependencyStatus::Ready),
            Predicate::ReadyAfter(_) => Ok(DependencyStatus::NotReady),
            Predicate::Always(status) => Ok(status),
            Predicate::Errors => Err(anyhow!("dependency lookup failed for {}", self.name)),
            Predicate::Panics => panic!("dependency lookup panicked for {}", self.name),
        }
    }

    fn run(&self) -> anyhow::Result<()> {
        let attempt = self.attempts.fetch_add(1, Ordering::SeqCst);
        match self.behaviour {
            RunBehaviour::FailFirst(n) if attempt < n => {
                return Err(anyhow!("{} failed attempt {}", self.name, attempt + 1));
            }
            RunBehaviour::Panic => panic!("{} panicked while running", self.name),
            _ => {}
        }

        self.runs.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }
}
