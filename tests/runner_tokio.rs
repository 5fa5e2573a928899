// tests/runner_tokio.rs

use std::sync::Arc;
use std::time::Duration;

use tokio::sync::oneshot;

use depgate::deps::{DependantTask, ProviderRegistry};
use depgate::runner::{unit_names, DependencyRunner, RunnerOptions, UnitRef};
use depgate::scheduler::{HostScheduler, TaskHandle, TokioScheduler, DEFAULT_TICK};
use depgate_test_utils::units::ScriptedUnit;
use depgate_test_utils::{init_tracing, with_timeout};

type TestResult = Result<(), Box<dyn std::error::Error>>;

fn fast_options(timeout_ms: u64) -> RunnerOptions {
    RunnerOptions::default()
        .with_initial_delay(Duration::from_millis(1))
        .with_period(Duration::from_millis(10))
        .with_timeout(Duration::from_millis(timeout_ms))
}

/// Finish handler forwarding the remaining unit names over a oneshot.
fn report_channel() -> (
    impl FnOnce(Vec<UnitRef>) -> anyhow::Result<()> + Send + 'static,
    oneshot::Receiver<Vec<String>>,
) {
    let (tx, rx) = oneshot::channel();
    let handler = move |remaining: Vec<UnitRef>| -> anyhow::Result<()> {
        tx.send(unit_names(&remaining))
            .map_err(|_| anyhow::anyhow!("receiver dropped"))
    };
    (handler, rx)
}

async fn wait_until_finished(runner: &DependencyRunner) {
    while !runner.is_finished() {
        tokio::time::sleep(Duration::from_millis(1)).await;
    }
}

#[tokio::test]
async fn units_run_once_their_provider_arrives() -> TestResult {
    init_tracing();

    let scheduler = Arc::new(TokioScheduler::new(DEFAULT_TICK)?);
    let registry = ProviderRegistry::new();

    let economy = registry.clone();
    scheduler.schedule_once(
        Duration::from_millis(30),
        Box::new(move || {
            economy.provide("economy");
        }),
    );

    let shop = DependantTask::new("shop", registry.clone())
        .requires(["economy"])
        .provides(["shop"])
        .into_unit();
    let (stuck, stuck_ref) = ScriptedUnit::never("stuck").shared();
    let (handler, rx) = report_channel();

    let mut runner = DependencyRunner::with_options(scheduler.clone(), fast_options(300));
    runner.add(shop)?.add(stuck_ref)?.on_finish(handler)?;
    runner.start()?;

    let remaining = with_timeout(rx).await?;

    assert_eq!(remaining, vec!["stuck".to_string()]);
    assert!(registry.is_available("shop"));
    assert_eq!(stuck.runs(), 0);
    Ok(())
}

#[tokio::test]
async fn empty_runner_reports_promptly() -> TestResult {
    let scheduler = Arc::new(TokioScheduler::new(DEFAULT_TICK)?);
    let (handler, rx) = report_channel();

    let mut runner = DependencyRunner::with_options(scheduler, fast_options(60_000));
    runner.on_finish(handler)?;
    runner.start()?;

    let remaining = with_timeout(rx).await?;
    assert!(remaining.is_empty());

    // The flag is set right after the handlers return.
    with_timeout(wait_until_finished(&runner)).await;
    Ok(())
}

#[tokio::test]
async fn runner_finishes_early_when_everything_ran() -> TestResult {
    let scheduler = Arc::new(TokioScheduler::new(DEFAULT_TICK)?);
    let (a, a_ref) = ScriptedUnit::ready_after("a", 2).shared();
    let (handler, rx) = report_channel();

    // A one-minute timeout would trip `with_timeout` if the runner waited for it.
    let mut runner = DependencyRunner::with_options(scheduler, fast_options(60_000));
    runner.add(a_ref)?.on_finish(handler)?;
    runner.start()?;

    let remaining = with_timeout(rx).await?;
    assert!(remaining.is_empty());
    assert_eq!(a.runs(), 1);
    Ok(())
}

#[tokio::test]
async fn cancelling_the_parent_handle_cancels_work_but_still_reports() -> TestResult {
    let root = TaskHandle::new();
    let scheduler = Arc::new(TokioScheduler::new(DEFAULT_TICK)?.with_parent(root.clone()));
    let registry = ProviderRegistry::new();

    let late = registry.clone();
    let provider_handle = scheduler.schedule_once(
        Duration::from_millis(50),
        Box::new(move || {
            late.provide("late");
        }),
    );

    let (unit, unit_ref) = ScriptedUnit::never("waiting").shared();
    let (handler, rx) = report_channel();
    let mut runner = DependencyRunner::with_options(scheduler.clone(), fast_options(60_000));
    runner.add(unit_ref)?.on_finish(handler)?;
    runner.start()?;

    tokio::time::sleep(Duration::from_millis(25)).await;
    root.cancel();

    let remaining = with_timeout(rx).await?;
    assert_eq!(remaining, vec!["waiting".to_string()]);
    with_timeout(wait_until_finished(&runner)).await;

    let checks_after_report = unit.checks();
    tokio::time::sleep(Duration::from_millis(60)).await;

    assert!(provider_handle.is_cancelled());
    assert!(!registry.is_available("late"));
    assert_eq!(unit.checks(), checks_after_report);
    assert_eq!(unit.runs(), 0);
    Ok(())
}

#[tokio::test]
async fn huge_initial_delay_does_not_overflow_the_start_instant() -> TestResult {
    let root = TaskHandle::new();
    let scheduler = Arc::new(TokioScheduler::new(DEFAULT_TICK)?.with_parent(root.clone()));
    let (unit, unit_ref) = ScriptedUnit::ready("never_polled").shared();
    let (handler, rx) = report_channel();

    let options = fast_options(60_000).with_initial_delay(Duration::MAX);
    let mut runner = DependencyRunner::with_options(scheduler, options);
    runner.add(unit_ref)?.on_finish(handler)?;
    runner.start()?;

    tokio::time::sleep(Duration::from_millis(20)).await;
    assert_eq!(unit.checks(), 0);

    root.cancel();
    let remaining = with_timeout(rx).await?;

    // The teardown still runs the final sweep.
    assert!(remaining.is_empty());
    assert_eq!(unit.runs(), 1);
    Ok(())
}

#[tokio::test]
async fn scheduler_clock_advances() -> TestResult {
    let scheduler = TokioScheduler::new(DEFAULT_TICK)?;
    let before = scheduler.now();
    tokio::time::sleep(Duration::from_millis(20)).await;
    assert!(scheduler.now() >= before + Duration::from_millis(20));
    assert_eq!(scheduler.tick(), DEFAULT_TICK);
    Ok(())
}

#[test]
fn tokio_scheduler_requires_a_runtime() {
    assert!(TokioScheduler::new(DEFAULT_TICK).is_err());
}
