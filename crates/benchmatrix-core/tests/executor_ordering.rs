//! Executor ordering, concurrency bound and cancellation.

use benchmatrix_core::executor::CANCELLED_DETAIL;
use benchmatrix_core::fakes::ScriptedBackend;
use benchmatrix_core::{
    Bench, BenchRegistry, Bindings, Cancellation, Executor, ExecutorConfig, OutcomeStatus,
    RunUnit, SimulationBackend,
};
use std::sync::Arc;
use std::time::Duration;

fn registry(ids: &[String]) -> Arc<BenchRegistry> {
    Arc::new(
        BenchRegistry::from_benches(ids.iter().map(|id| Bench::new(id.clone(), "tests", format!("{id}.vhd"))))
            .unwrap(),
    )
}

fn bench_ids(n: usize) -> Vec<String> {
    (0..n).map(|i| format!("b{i:02}")).collect()
}

/// Test: completion order never leaks into the outcome order
#[tokio::test]
async fn test_outcomes_follow_input_order_despite_delays() {
    let ids = bench_ids(8);
    let mut backend = ScriptedBackend::new();
    for (i, id) in ids.iter().enumerate() {
        // Earlier units finish last.
        backend = backend.delay(id, "c", Duration::from_millis(20 * (ids.len() - i) as u64));
    }
    let backend: Arc<dyn SimulationBackend> = Arc::new(backend);

    let units: Vec<RunUnit> = ids.iter().map(|id| RunUnit::new(id.clone(), "c", Bindings::new())).collect();
    let executor = Executor::new(ExecutorConfig {
        workers: 4,
        unit_timeout: None,
        fail_fast: false,
    });
    let outcomes = executor
        .run(units.clone(), registry(&ids), backend, &Cancellation::new())
        .await;

    assert_eq!(outcomes.len(), units.len());
    for (outcome, unit) in outcomes.iter().zip(&units) {
        assert_eq!(&outcome.run_unit, unit);
        assert_eq!(outcome.status, OutcomeStatus::Pass);
    }
}

/// Test: no more than `workers` invocations are in flight at once
#[tokio::test]
async fn test_concurrency_bounded_by_workers() {
    let ids = bench_ids(10);
    let mut scripted = ScriptedBackend::new();
    for id in &ids {
        scripted = scripted.delay(id, "c", Duration::from_millis(30));
    }
    let backend = Arc::new(scripted);

    let units: Vec<RunUnit> = ids.iter().map(|id| RunUnit::new(id.clone(), "c", Bindings::new())).collect();
    let executor = Executor::new(ExecutorConfig {
        workers: 3,
        unit_timeout: None,
        fail_fast: false,
    });
    let outcomes = executor
        .run(units, registry(&ids), backend.clone(), &Cancellation::new())
        .await;

    assert!(outcomes.iter().all(|o| o.passed()));
    assert_eq!(backend.invocations(), 10);
    assert!(backend.peak_concurrency() <= 3, "peak {}", backend.peak_concurrency());
    assert!(backend.peak_concurrency() >= 1);
}

/// Test: one worker runs units strictly in order
#[tokio::test]
async fn test_single_worker_dispatches_in_order() {
    let ids = bench_ids(5);
    let backend = Arc::new(ScriptedBackend::new());
    let units: Vec<RunUnit> = ids.iter().map(|id| RunUnit::new(id.clone(), "c", Bindings::new())).collect();

    let executor = Executor::new(ExecutorConfig {
        workers: 1,
        unit_timeout: None,
        fail_fast: false,
    });
    executor
        .run(units, registry(&ids), backend.clone(), &Cancellation::new())
        .await;

    assert_eq!(backend.peak_concurrency(), 1);
    assert_eq!(backend.invocations(), 5);
}

/// Test: host cancellation mid-run still yields a complete outcome list
#[tokio::test]
async fn test_host_cancellation_mid_run() {
    let ids = bench_ids(6);
    let mut scripted = ScriptedBackend::new();
    for id in &ids[1..] {
        scripted = scripted.delay(id, "c", Duration::from_secs(10));
    }
    let backend: Arc<dyn SimulationBackend> = Arc::new(scripted);
    let units: Vec<RunUnit> = ids.iter().map(|id| RunUnit::new(id.clone(), "c", Bindings::new())).collect();

    let cancel = Cancellation::new();
    let trigger = cancel.clone();
    tokio::spawn(async move {
        tokio::time::sleep(Duration::from_millis(100)).await;
        trigger.cancel();
    });

    let executor = Executor::new(ExecutorConfig {
        workers: 2,
        unit_timeout: None,
        fail_fast: false,
    });
    let outcomes = tokio::time::timeout(
        Duration::from_secs(5),
        executor.run(units.clone(), registry(&ids), backend, &cancel),
    )
    .await
    .expect("cancellation did not stop the run");

    assert_eq!(outcomes.len(), units.len());
    assert_eq!(outcomes[0].status, OutcomeStatus::Pass);
    for outcome in &outcomes[1..] {
        assert_eq!(outcome.status, OutcomeStatus::Error);
        assert_eq!(outcome.detail, CANCELLED_DETAIL);
    }
    for (outcome, unit) in outcomes.iter().zip(&units) {
        assert_eq!(&outcome.run_unit, unit);
    }
}
