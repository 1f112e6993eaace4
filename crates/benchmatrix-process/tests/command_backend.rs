//! End-to-end runs of the harness against real subprocesses.

use benchmatrix_core::{
    parse_bindings, Cancellation, ConfigMatrix, ExecutorConfig, Harness, HarnessSpec, LibrarySpec,
    OutcomeStatus, RunUnit, SimulationBackend,
};
use benchmatrix_process::{CommandBackend, CommandTemplate};
use std::sync::Arc;
use tempfile::TempDir;

fn workspace() -> TempDir {
    let dir = TempDir::new().expect("tempdir");
    for rel in [
        "src/rle_enc.vhd",
        "src/rle_dec.vhd",
        "tests/tb_encoder.vhd",
        "tests/tb_decoder.vhd",
        "tests/helpers.vhd",
    ] {
        let path = dir.path().join(rel);
        std::fs::create_dir_all(path.parent().unwrap()).unwrap();
        std::fs::write(&path, "-- vhdl\n").unwrap();
    }
    dir
}

fn spec(dir: &TempDir) -> HarnessSpec {
    let mut configs = ConfigMatrix::new();
    configs
        .add_config("S8-C8", parse_bindings("SYMBOL_WIDTH=8,COUNTER_WIDTH=8").unwrap())
        .unwrap();
    configs
        .add_config("S8-C3", parse_bindings("SYMBOL_WIDTH=8,COUNTER_WIDTH=3").unwrap())
        .unwrap();
    HarnessSpec::new(
        LibrarySpec::new("tests", format!("{}/tests/*.vhd", dir.path().display())),
        configs,
    )
    .with_library(LibrarySpec::new("axis_rle", format!("{}/src/*.vhd", dir.path().display())))
}

fn sh(script: &str) -> CommandTemplate {
    CommandTemplate::from_argv(vec!["sh".to_string(), "-c".to_string(), script.to_string()]).unwrap()
}

/// Test: only tb_* files become benches, and the exit code decides the verdict
#[tokio::test]
async fn test_counter_width_three_fails_decoder() {
    let dir = workspace();
    // The decoder bench fails when the counter is narrow.
    let run = CommandTemplate::from_argv(vec![
        "sh".to_string(),
        "-c".to_string(),
        "if [ \"$1\" = tb_decoder ] && [ \"$GENERIC_COUNTER_WIDTH\" = 3 ]; then echo 'overflow' >&2; exit 1; fi".to_string(),
        "sh".to_string(),
        "{bench}".to_string(),
    ])
    .unwrap();
    let backend: Arc<dyn SimulationBackend> = Arc::new(CommandBackend::new(run).unwrap());

    let plan = Harness::plan(&spec(&dir), backend.as_ref()).expect("plan failed");
    let names: Vec<_> = plan.units.iter().map(RunUnit::name).collect();
    assert_eq!(
        names,
        vec![
            "tb_decoder.S8-C8",
            "tb_decoder.S8-C3",
            "tb_encoder.S8-C8",
            "tb_encoder.S8-C3",
        ]
    );

    let report = Harness::run(plan, backend, ExecutorConfig::default(), &Cancellation::new()).await;
    assert_eq!(report.summary.passed, 3);
    assert_eq!(report.summary.failed, 1);
    assert_eq!(report.outcomes[1].status, OutcomeStatus::Fail);
    assert_eq!(report.outcomes[1].detail, "exit code 1: overflow");
    assert_eq!(report.exit_code(), 1);
}

/// Test: the compile step sees every registered source
#[tokio::test]
async fn test_compile_receives_all_sources() {
    let dir = workspace();
    // 2 design files + 3 test files.
    let compile = CommandTemplate::from_argv(vec![
        "sh".to_string(),
        "-c".to_string(),
        "test $# -eq 5".to_string(),
        "sh".to_string(),
        "{sources}".to_string(),
    ])
    .unwrap();
    let backend: Arc<dyn SimulationBackend> =
        Arc::new(CommandBackend::new(sh("true")).unwrap().with_compile(compile));

    let plan = Harness::plan(&spec(&dir), backend.as_ref()).unwrap();
    let report = Harness::run(plan, backend, ExecutorConfig::default(), &Cancellation::new()).await;
    assert_eq!(report.summary.passed, 4);
}

/// Test: a failing compile step errors every unit
#[tokio::test]
async fn test_failed_compile_errors_every_unit() {
    let dir = workspace();
    let backend: Arc<dyn SimulationBackend> = Arc::new(
        CommandBackend::new(sh("true"))
            .unwrap()
            .with_compile(sh("echo 'syntax error' >&2; exit 1")),
    );

    let plan = Harness::plan(&spec(&dir), backend.as_ref()).unwrap();
    let report = Harness::run(plan, backend, ExecutorConfig::default(), &Cancellation::new()).await;
    assert_eq!(report.summary.errored, 4);
    assert!(report.outcomes[0].detail.contains("syntax error"));
}
