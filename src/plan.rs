// src/plan.rs

//! Turn a validated [`PlanFile`] into a running [`DependencyRunner`].
//!
//! Providers are scheduled to appear on the registry after their configured
//! delay; every unit becomes a [`DependantTask`] whose action records that it
//! ran. The finish handler forwards the remaining units over a oneshot so the
//! caller can await (or poll for) the outcome.

use std::sync::atomic::{AtomicU32, Ordering};
use std::sync::{Arc, Mutex};

use anyhow::anyhow;
use tokio::sync::oneshot;
use tracing::{info, warn};

use crate::config::{PlanFile, UnitConfig};
use crate::deps::{DependantTask, ProviderRegistry};
use crate::errors::{DepgateError, Result};
use crate::runner::{unit_names, DependencyRunner, RunnerOptions, UnitRef};
use crate::scheduler::{HostScheduler, TaskHandle};

/// Outcome of a plan run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct PlanReport {
    /// Units that ran, in execution order.
    pub ran: Vec<String>,
    /// Units that never became ready.
    pub remaining: Vec<String>,
}

/// A started plan.
#[derive(Debug)]
pub struct PlanRun {
    runner: DependencyRunner,
    providers: Vec<TaskHandle>,
    ran: Arc<Mutex<Vec<String>>>,
    report_rx: oneshot::Receiver<Vec<String>>,
}

impl PlanRun {
    /// Whether the runner has stopped and reported.
    pub fn is_finished(&self) -> bool {
        self.runner.is_finished()
    }

    /// Non-blocking check for the final report.
    pub fn try_report(&mut self) -> Option<PlanReport> {
        let remaining = self.report_rx.try_recv().ok()?;
        Some(self.report(remaining))
    }

    /// Wait until the runner has stopped.
    pub async fn wait(self) -> Result<PlanReport> {
        let remaining = self
            .report_rx
            .await
            .map_err(|_| DepgateError::Other(anyhow!("runner stopped without reporting")))?;
        let ran = lock_names(&self.ran).clone();
        Ok(PlanReport { ran, remaining })
    }

    /// Cancel provider arrivals that have not happened yet. The runner keeps
    /// polling until its deadline and reports as usual.
    pub fn cancel_providers(&self) {
        for handle in &self.providers {
            handle.cancel();
        }
    }

    fn report(&self, remaining: Vec<String>) -> PlanReport {
        PlanReport {
            ran: lock_names(&self.ran).clone(),
            remaining,
        }
    }
}

fn lock_names(names: &Mutex<Vec<String>>) -> std::sync::MutexGuard<'_, Vec<String>> {
    names.lock().unwrap_or_else(|poisoned| poisoned.into_inner())
}

/// Schedule every provider in the plan to appear on `registry`.
pub fn schedule_providers(
    plan: &PlanFile,
    scheduler: &dyn HostScheduler,
    registry: &ProviderRegistry,
) -> Vec<TaskHandle> {
    plan.providers
        .iter()
        .map(|(name, provider)| {
            let registry = registry.clone();
            let name = name.clone();
            scheduler.schedule_once(
                provider.available_after,
                Box::new(move || {
                    info!(provider = %name, "provider became available");
                    registry.provide(name);
                }),
            )
        })
        .collect()
}

/// Build one unit per `[unit.<name>]`, recording successful runs in `ran`.
pub fn build_units(
    plan: &PlanFile,
    registry: &ProviderRegistry,
    ran: &Arc<Mutex<Vec<String>>>,
) -> Vec<UnitRef> {
    plan.units
        .iter()
        .map(|(name, cfg)| build_unit(name, cfg, registry, ran))
        .collect()
}

fn build_unit(
    name: &str,
    cfg: &UnitConfig,
    registry: &ProviderRegistry,
    ran: &Arc<Mutex<Vec<String>>>,
) -> UnitRef {
    let attempts = AtomicU32::new(0);
    let fail_first = cfg.fail_first;
    let log = Arc::clone(ran);
    let unit_name = name.to_string();

    DependantTask::new(name, registry.clone())
        .requires(cfg.requires.iter().cloned())
        .optional(cfg.optional.iter().cloned())
        .provides(cfg.provides.iter().cloned())
        .action(move |missing_optional| {
            let attempt = attempts.fetch_add(1, Ordering::SeqCst) + 1;
            if attempt <= fail_first {
                return Err(anyhow!("simulated failure {attempt}/{fail_first}"));
            }
            if missing_optional.is_empty() {
                info!(unit = %unit_name, "unit ran");
            } else {
                warn!(unit = %unit_name, missing = ?missing_optional, "unit ran without optional providers");
            }
            lock_names(&log).push(unit_name.clone());
            Ok(())
        })
        .into_unit()
}

/// Schedule providers, queue all units and start the runner.
pub fn start_plan(
    plan: &PlanFile,
    options: RunnerOptions,
    scheduler: Arc<dyn HostScheduler>,
    registry: ProviderRegistry,
) -> Result<PlanRun> {
    let providers = schedule_providers(plan, scheduler.as_ref(), &registry);

    let ran = Arc::new(Mutex::new(Vec::new()));
    let (tx, report_rx) = oneshot::channel();

    let mut runner = DependencyRunner::with_options(scheduler, options);
    runner
        .add_all(build_units(plan, &registry, &ran))?
        .on_finish(move |remaining: Vec<UnitRef>| -> anyhow::Result<()> {
            tx.send(unit_names(&remaining))
                .map_err(|_| anyhow!("plan report receiver dropped"))
        })?;
    runner.start()?;

    Ok(PlanRun {
        runner,
        providers,
        ran,
        report_rx,
    })
}
