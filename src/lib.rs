// src/lib.rs

pub mod cli;
pub mod config;
pub mod deps;
pub mod errors;
pub mod logging;
pub mod plan;
pub mod runner;
pub mod scheduler;
pub mod types;

use std::sync::Arc;

use anyhow::Result;
use tracing::{debug, info};

use crate::cli::CliArgs;
use crate::config::{load_and_validate, parse_duration, PlanFile};
use crate::deps::ProviderRegistry;
use crate::errors::DepgateError;
use crate::plan::{start_plan, PlanReport};
use crate::runner::RunnerOptions;
use crate::scheduler::{TaskHandle, TokioScheduler, DEFAULT_TICK};

/// High-level entry point used by `main.rs`.
///
/// This wires together:
/// - plan loading
/// - the Tokio host scheduler (children of one root handle)
/// - provider arrivals and the dependency runner
/// - Ctrl-C handling (cancel everything, still print the report)
pub async fn run(args: CliArgs) -> Result<()> {
    let plan = load_and_validate(&args.plan)?;

    let mut options = plan.runner;
    if let Some(ref timeout) = args.timeout {
        options.timeout = parse_duration(timeout).map_err(DepgateError::ConfigError)?;
    }

    if args.dry_run {
        print_dry_run(&plan, &options);
        return Ok(());
    }

    let root = TaskHandle::new();
    let scheduler = Arc::new(TokioScheduler::new(DEFAULT_TICK)?.with_parent(root.clone()));
    let registry = ProviderRegistry::new();

    let run = start_plan(&plan, options, scheduler, registry.clone())?;
    info!(units = plan.units.len(), providers = plan.providers.len(), "plan started");

    let mut wait = std::pin::pin!(run.wait());
    let finished = tokio::select! {
        report = &mut wait => Some(report),
        signal = tokio::signal::ctrl_c() => {
            signal?;
            None
        }
    };

    let report = match finished {
        Some(report) => report?,
        None => {
            // Cancelling the root stops provider arrivals; the runner's
            // teardown still reports whatever is left.
            info!("interrupted; cancelling scheduled work");
            root.cancel();
            wait.await?
        }
    };
    print_report(&report, &registry);

    Ok(())
}

fn print_report(report: &PlanReport, registry: &ProviderRegistry) {
    println!("ran ({}):", report.ran.len());
    for name in &report.ran {
        println!("  - {name}");
    }
    println!("remaining ({}):", report.remaining.len());
    for name in &report.remaining {
        println!("  - {name}");
    }
    debug!(available = ?registry.snapshot(), "providers at finish");
}

/// Print runner settings, providers and units without running anything.
fn print_dry_run(plan: &PlanFile, options: &RunnerOptions) {
    println!("depgate dry-run");
    println!("  runner.timeout = {:?}", options.timeout);
    println!("  runner.initial_delay = {:?}", options.initial_delay);
    println!("  runner.period = {:?}", options.period);
    println!();

    println!("providers ({}):", plan.providers.len());
    for (name, provider) in plan.providers.iter() {
        println!("  - {name} (after {:?})", provider.available_after);
    }
    println!();

    println!("units ({}):", plan.units.len());
    for (name, unit) in plan.units.iter() {
        println!("  - {name}");
        if !unit.requires.is_empty() {
            println!("      requires: {:?}", unit.requires);
        }
        if !unit.optional.is_empty() {
            println!("      optional: {:?}", unit.optional);
        }
        if !unit.provides.is_empty() {
            println!("      provides: {:?}", unit.provides);
        }
        if unit.fail_first > 0 {
            println!("      fail_first: {}", unit.fail_first);
        }
    }

    debug!("dry-run complete (nothing executed)");
}
