//! Integration tests for the full plan/run pipeline with ScriptedBackend.

use benchmatrix_core::fakes::ScriptedBackend;
use benchmatrix_core::{
    parse_bindings, Cancellation, ConfigMatrix, ExecutorConfig, Harness, HarnessSpec,
    LibrarySpec, MatrixError, NamePattern, OutcomeStatus, RunUnit, SimulationBackend,
};
use std::sync::Arc;
use tempfile::TempDir;

/// Design sources under `src/`, benches `b1.vhd` and `b2.vhd` under `tests/`.
fn workspace() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    for rel in ["src/rle_enc.vhd", "src/rle_dec.vhd", "tests/b1.vhd", "tests/b2.vhd"] {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "-- vhdl\n").unwrap();
    }
    dir
}

fn glob(dir: &TempDir, rest: &str) -> String {
    format!("{}/{}", dir.path().display(), rest)
}

fn two_configs() -> ConfigMatrix {
    let mut configs = ConfigMatrix::new();
    configs
        .add_config("S8-C8", parse_bindings("SYMBOL_WIDTH=8,COUNTER_WIDTH=8").unwrap())
        .unwrap();
    configs
        .add_config("S8-C3", parse_bindings("SYMBOL_WIDTH=8,COUNTER_WIDTH=3").unwrap())
        .unwrap();
    configs
}

fn spec(dir: &TempDir) -> HarnessSpec {
    HarnessSpec::new(LibrarySpec::new("tests", glob(dir, "tests/*.vhd")), two_configs())
        .with_library(LibrarySpec::new("axis_rle", glob(dir, "src/*.vhd")))
}

fn unit_names(units: &[RunUnit]) -> Vec<String> {
    units.iter().map(RunUnit::name).collect()
}

/// Test: every unit passes
#[tokio::test]
async fn test_all_units_pass() {
    let dir = workspace();
    let backend = Arc::new(ScriptedBackend::new());

    let plan = Harness::plan(&spec(&dir), backend.as_ref()).expect("plan failed");
    assert_eq!(
        unit_names(&plan.units),
        vec!["b1.S8-C8", "b1.S8-C3", "b2.S8-C8", "b2.S8-C3"]
    );
    assert_eq!(plan.sources.len(), 2);

    let report = Harness::run(plan, backend.clone(), ExecutorConfig::default(), &Cancellation::new()).await;

    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.passed, 4);
    assert_eq!(report.summary.failed, 0);
    assert_eq!(report.summary.errored, 0);
    assert!(report.summary.failing_units.is_empty());
    assert_eq!(report.exit_code(), 0);
    assert!(backend.prepared());
    assert_eq!(backend.invocations(), 4);
    assert!(!report.run_id.is_empty());
}

/// Test: one failing pair is reported and flips the exit code
#[tokio::test]
async fn test_single_failure_reported() {
    let dir = workspace();
    let backend = Arc::new(ScriptedBackend::new().fail("b2", "S8-C3"));

    let plan = Harness::plan(&spec(&dir), backend.as_ref()).unwrap();
    let report = Harness::run(plan, backend, ExecutorConfig::default(), &Cancellation::new()).await;

    assert_eq!(report.summary.total, 4);
    assert_eq!(report.summary.passed, 3);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.summary.errored, 0);
    assert_eq!(unit_names(&report.summary.failing_units), vec!["b2.S8-C3"]);
    assert_eq!(report.exit_code(), 1);
    assert_eq!(report.outcomes[3].status, OutcomeStatus::Fail);
}

/// Test: a pattern that matches nothing is fatal before execution
#[tokio::test]
async fn test_unmatched_pattern_is_not_found() {
    let dir = workspace();
    let backend = ScriptedBackend::new();
    let spec = HarnessSpec::new(LibrarySpec::new("tests", glob(&dir, "tests/*.none")), two_configs());

    let err = Harness::plan(&spec, &backend).unwrap_err();
    match err {
        MatrixError::NotFound { library, .. } => assert_eq!(library, "tests"),
        other => panic!("expected NotFound, got {other:?}"),
    }
    assert_eq!(backend.invocations(), 0);
}

/// Test: bindings reach the backend unchanged
#[tokio::test]
async fn test_bindings_reach_backend() {
    let dir = workspace();
    let backend = Arc::new(ScriptedBackend::new());
    let plan = Harness::plan(&spec(&dir), backend.as_ref()).unwrap();
    let report = Harness::run(plan, backend, ExecutorConfig::default(), &Cancellation::new()).await;

    assert_eq!(
        report.outcomes[1].detail,
        "b1.S8-C3 [COUNTER_WIDTH=3,SYMBOL_WIDTH=8]"
    );
}

/// Test: a failed preparation errors every unit without executing any
#[tokio::test]
async fn test_prepare_failure_errors_all_units() {
    let dir = workspace();
    let backend = Arc::new(ScriptedBackend::new().fail_prepare("analysis failed"));
    let plan = Harness::plan(&spec(&dir), backend.as_ref()).unwrap();

    let report = Harness::run(plan, backend.clone(), ExecutorConfig::default(), &Cancellation::new()).await;

    assert_eq!(report.summary.errored, 4);
    assert!(report
        .outcomes
        .iter()
        .all(|o| o.detail.starts_with("backend preparation failed")));
    assert_eq!(backend.invocations(), 0);
    assert_eq!(report.exit_code(), 1);
}

/// Test: one erroring and one panicking unit leave their siblings intact
#[tokio::test]
async fn test_faults_are_isolated() {
    let dir = workspace();
    let backend = Arc::new(
        ScriptedBackend::new()
            .error("b1", "S8-C3", "simulator crashed")
            .panic_on("b2", "S8-C8"),
    );
    let plan = Harness::plan(&spec(&dir), backend.as_ref()).unwrap();
    let report = Harness::run(plan, backend, ExecutorConfig::default(), &Cancellation::new()).await;

    let statuses: Vec<_> = report.outcomes.iter().map(|o| o.status).collect();
    assert_eq!(
        statuses,
        vec![
            OutcomeStatus::Pass,
            OutcomeStatus::Error,
            OutcomeStatus::Error,
            OutcomeStatus::Pass,
        ]
    );
    assert!(report.outcomes[1].detail.contains("simulator crashed"));
    assert!(report.outcomes[2].detail.contains("backend panicked"));
    assert_eq!(report.summary.errored, 2);
}

/// Test: filters narrow the matrix and keep unit order
#[tokio::test]
async fn test_filters_select_units() {
    let dir = workspace();
    let backend = ScriptedBackend::new();
    let spec = spec(&dir).with_filter(NamePattern::new("*.S8-C3").unwrap());

    let plan = Harness::plan(&spec, &backend).unwrap();
    assert_eq!(unit_names(&plan.units), vec!["b1.S8-C3", "b2.S8-C3"]);
}

/// Test: filters that exclude everything are a configuration error
#[tokio::test]
async fn test_filters_excluding_everything_is_empty_matrix() {
    let dir = workspace();
    let backend = ScriptedBackend::new();
    let spec = spec(&dir).with_filter(NamePattern::new("nothing.*").unwrap());

    let err = Harness::plan(&spec, &backend).unwrap_err();
    assert!(matches!(err, MatrixError::EmptyMatrix { .. }));
}

/// Test: no registered configs is a configuration error
#[tokio::test]
async fn test_no_configs_is_empty_matrix() {
    let dir = workspace();
    let backend = ScriptedBackend::new();
    let spec = HarnessSpec::new(LibrarySpec::new("tests", glob(&dir, "tests/*.vhd")), ConfigMatrix::new());

    let err = Harness::plan(&spec, &backend).unwrap_err();
    assert!(matches!(err, MatrixError::EmptyMatrix { .. }));
}

/// Test: a digest identifies the planned matrix
#[tokio::test]
async fn test_matrix_digest_stable_across_plans() {
    let dir = workspace();
    let backend = ScriptedBackend::new();
    let a = Harness::plan(&spec(&dir), &backend).unwrap();
    let b = Harness::plan(&spec(&dir), &backend).unwrap();
    assert_eq!(a.matrix_digest, b.matrix_digest);
    assert_eq!(a.matrix_digest.len(), 64);
}

/// Test: the backend trait object is usable through Arc<dyn _>
#[tokio::test]
async fn test_dyn_backend() {
    let dir = workspace();
    let backend: Arc<dyn SimulationBackend> = Arc::new(ScriptedBackend::new().fail("b1", "S8-C8"));
    let plan = Harness::plan(&spec(&dir), backend.as_ref()).unwrap();
    let report = Harness::run(plan, backend, ExecutorConfig::default(), &Cancellation::new()).await;
    assert_eq!(unit_names(&report.summary.failing_units), vec!["b1.S8-C8"]);
}
