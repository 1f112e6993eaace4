//! benchmatrix - test-matrix runner for HDL testbenches
//!
//! ## Commands
//!
//! - `run`: discover benches, expand them against every configuration and
//!   execute the resulting matrix through a simulator command
//!
//! ## Exit status
//!
//! - `0`: every run unit passed
//! - `1`: at least one unit failed or errored
//! - `2`: the run could not be configured (nothing was executed)

use std::path::{Path, PathBuf};
use std::process::ExitCode;
use std::sync::Arc;
use std::time::Duration;

use anyhow::{Context, Result};
use clap::{ArgAction, Args, Parser, Subcommand};
use tracing::{info, warn, Level};

use benchmatrix_core::settings::{DEFAULT_SOURCE_LIBRARY, DEFAULT_TEST_LIBRARY};
use benchmatrix_core::{
    parse_bindings, render_outcome_line, render_summary_line, write_report_json, Cancellation,
    ConfigEntry, Harness, HarnessSettings, LibrarySpec, MatrixFile, RunUnit, SettingsOverrides,
    SimulationBackend,
};
use benchmatrix_process::{CommandBackend, CommandTemplate, DEFAULT_BENCH_PATTERN, DEFAULT_ENV_PREFIX};

/// Exit status for configuration errors.
const EXIT_CONFIG_ERROR: u8 = 2;

#[derive(Parser)]
#[command(name = "benchmatrix")]
#[command(version = env!("CARGO_PKG_VERSION"))]
#[command(about = "Run every testbench against every parameter configuration", long_about = None)]
struct Cli {
    /// Enable verbose output
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Emit JSON-formatted log lines
    #[arg(long, global = true)]
    json: bool,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Plan and execute a test matrix
    Run(RunArgs),
}

#[derive(Args, Debug)]
struct RunArgs {
    /// Glob for design sources
    #[arg(long, env = "BENCHMATRIX_SOURCES")]
    sources: Option<String>,

    /// Glob for test sources; benches are discovered here
    #[arg(long, env = "BENCHMATRIX_TESTS")]
    tests: Option<String>,

    /// Library name for design sources
    #[arg(long, default_value = DEFAULT_SOURCE_LIBRARY)]
    source_library: String,

    /// Library name for test sources
    #[arg(long, default_value = DEFAULT_TEST_LIBRARY)]
    test_library: String,

    /// Parameter set: NAME KEY=VALUE[,KEY=VALUE...] (repeatable)
    #[arg(long = "config", num_args = 2, value_names = ["NAME", "BINDINGS"], action = ArgAction::Append)]
    configs: Vec<String>,

    /// TOML matrix file; command-line values take precedence
    #[arg(long, env = "BENCHMATRIX_MATRIX")]
    matrix: Option<PathBuf>,

    /// Maximum concurrent run units (default: available parallelism)
    #[arg(short = 'j', long, env = "BENCHMATRIX_WORKERS")]
    workers: Option<usize>,

    /// Per-unit time limit in seconds
    #[arg(long)]
    unit_timeout: Option<u64>,

    /// Global deadline in seconds; remaining units are cancelled
    #[arg(long)]
    timeout: Option<u64>,

    /// Stop dispatching after the first failing unit
    #[arg(long)]
    fail_fast: bool,

    /// Simulator command run per unit, e.g. "ghdl -r {bench} {generics}"
    #[arg(long, env = "BENCHMATRIX_RUNNER")]
    runner: Option<String>,

    /// Command run once before the matrix, e.g. "ghdl -a {sources}"
    #[arg(long, env = "BENCHMATRIX_COMPILE")]
    compile: Option<String>,

    /// Regex a file stem must match to count as a bench
    #[arg(long, default_value = DEFAULT_BENCH_PATTERN)]
    bench_pattern: String,

    /// Prefix of the environment variables carrying bindings
    #[arg(long, default_value = DEFAULT_ENV_PREFIX)]
    env_prefix: String,

    /// Print the planned run units and exit
    #[arg(long)]
    list: bool,

    /// Write a JSON run report to this path
    #[arg(long)]
    report: Option<PathBuf>,

    /// Only run units whose `bench.config` name matches one of these
    filters: Vec<String>,
}

#[tokio::main]
async fn main() -> ExitCode {
    let cli = Cli::parse();

    // Setup logging
    let level = if cli.verbose {
        Level::DEBUG
    } else {
        Level::INFO
    };
    benchmatrix_core::init_tracing(cli.json, level);

    let result = match cli.command {
        Commands::Run(args) => cmd_run(args).await,
    };

    match result {
        Ok(code) => ExitCode::from(code),
        Err(e) => {
            eprintln!("error: {e:#}");
            ExitCode::from(EXIT_CONFIG_ERROR)
        }
    }
}

async fn cmd_run(args: RunArgs) -> Result<u8> {
    let settings = resolve_settings(&args)?;
    let spec = settings.to_spec()?;
    let backend: Arc<dyn SimulationBackend> = Arc::new(build_backend(&args, settings.unit_timeout)?);

    let plan = Harness::plan(&spec, backend.as_ref())?;

    if args.list {
        for name in unit_names(&plan.units) {
            println!("{name}");
        }
        return Ok(0);
    }

    let cancel = Cancellation::new();
    spawn_interrupt_handler(cancel.clone());
    if let Some(deadline) = settings.global_timeout {
        spawn_deadline(cancel.clone(), deadline);
    }

    let report = Harness::run(plan, backend, settings.executor_config(), &cancel).await;

    for outcome in &report.outcomes {
        println!("{}", render_outcome_line(outcome));
    }
    println!("{}", render_summary_line(&report.summary));

    if let Some(path) = &args.report {
        write_report_json(path, &report)?;
        info!(path = %path.display(), "wrote run report");
    }

    Ok(exit_status(report.exit_code()))
}

/// Planned unit names, the strings filters match against.
fn unit_names(units: &[RunUnit]) -> Vec<String> {
    units.iter().map(RunUnit::name).collect()
}

fn exit_status(code: i32) -> u8 {
    u8::try_from(code).unwrap_or(1)
}

/// Defaults, then the matrix file, then command-line values.
fn resolve_settings(args: &RunArgs) -> Result<HarnessSettings> {
    let mut settings = match &args.matrix {
        Some(path) => HarnessSettings::from_file(load_matrix_file(path)?),
        None => HarnessSettings::default(),
    };

    settings.apply(SettingsOverrides {
        sources: args
            .sources
            .as_ref()
            .map(|glob| LibrarySpec::new(&args.source_library, glob)),
        tests: args
            .tests
            .as_ref()
            .map(|glob| LibrarySpec::new(&args.test_library, glob)),
        configs: config_entries(&args.configs)?,
        filters: args.filters.clone(),
        workers: args.workers,
        unit_timeout: args.unit_timeout.map(Duration::from_secs),
        global_timeout: args.timeout.map(Duration::from_secs),
        fail_fast: args.fail_fast,
    });

    Ok(settings)
}

fn load_matrix_file(path: &Path) -> Result<MatrixFile> {
    MatrixFile::load(path).with_context(|| format!("Failed to load matrix file {:?}", path))
}

/// Pair up the flat `--config NAME BINDINGS` values.
fn config_entries(values: &[String]) -> Result<Vec<ConfigEntry>> {
    values
        .chunks(2)
        .map(|pair| match pair {
            [name, bindings] => {
                let bindings = parse_bindings(bindings)
                    .with_context(|| format!("Invalid bindings for configuration '{name}'"))?;
                Ok(ConfigEntry::new(name, bindings))
            }
            _ => anyhow::bail!("--config expects NAME and BINDINGS"),
        })
        .collect()
}

fn build_backend(args: &RunArgs, unit_timeout: Option<Duration>) -> Result<CommandBackend> {
    let runner = args
        .runner
        .as_deref()
        .context("No simulator command given (use --runner or BENCHMATRIX_RUNNER)")?;

    let mut backend = CommandBackend::new(CommandTemplate::parse(runner)?)?
        .with_bench_pattern(&args.bench_pattern)?
        .with_env_prefix(&args.env_prefix);
    if let Some(compile) = &args.compile {
        backend = backend.with_compile(CommandTemplate::parse(compile)?);
    }
    // The process limit matches the unit limit so timed-out simulators are reaped.
    if let Some(limit) = unit_timeout {
        backend = backend.with_timeout(limit);
    }
    Ok(backend)
}

fn spawn_interrupt_handler(cancel: Cancellation) {
    tokio::spawn(async move {
        match tokio::signal::ctrl_c().await {
            Ok(()) => {
                warn!("interrupt received, cancelling remaining run units");
                cancel.cancel();
            }
            Err(e) => warn!(error = %e, "cannot listen for interrupt"),
        }
    });
}

fn spawn_deadline(cancel: Cancellation, deadline: Duration) {
    tokio::spawn(async move {
        tokio::time::sleep(deadline).await;
        warn!(secs = deadline.as_secs(), "global deadline reached, cancelling remaining run units");
        cancel.cancel();
    });
}
