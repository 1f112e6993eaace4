//! [`SimulationBackend`] that drives an external simulator through
//! subprocesses.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use benchmatrix_core::{
    BackendError, BackendReport, BackendResult, Bench, Bindings, SimulationBackend, SourceCatalog,
};
use regex::Regex;
use tracing::{info, warn};

use crate::command::{CommandTemplate, TemplateContext};
use crate::error::{ProcessError, ProcessResult};
use crate::runner::{CommandOutput, ProcessRunner};

/// File stems recognized as benches unless configured otherwise.
pub const DEFAULT_BENCH_PATTERN: &str = "^tb_|_tb$";

/// Prefix for the environment variables carrying bindings.
pub const DEFAULT_ENV_PREFIX: &str = "GENERIC_";

/// Runs each unit as `run` and, when set, `compile` once before the run.
#[derive(Debug, Clone)]
pub struct CommandBackend {
    run: CommandTemplate,
    compile: Option<CommandTemplate>,
    bench_pattern: Regex,
    timeout: Option<Duration>,
    env_prefix: String,
}

impl CommandBackend {
    pub fn new(run: CommandTemplate) -> ProcessResult<Self> {
        Ok(Self {
            run,
            compile: None,
            bench_pattern: compile_bench_pattern(DEFAULT_BENCH_PATTERN)?,
            timeout: None,
            env_prefix: DEFAULT_ENV_PREFIX.to_string(),
        })
    }

    pub fn with_compile(mut self, compile: CommandTemplate) -> Self {
        self.compile = Some(compile);
        self
    }

    /// Recognize benches whose file stem matches `pattern`.
    pub fn with_bench_pattern(mut self, pattern: &str) -> ProcessResult<Self> {
        self.bench_pattern = compile_bench_pattern(pattern)?;
        Ok(self)
    }

    /// Per-process time limit, applied to compile and run alike.
    pub fn with_timeout(mut self, timeout: Duration) -> Self {
        self.timeout = Some(timeout);
        self
    }

    pub fn with_env_prefix(mut self, prefix: &str) -> Self {
        self.env_prefix = prefix.to_string();
        self
    }

    pub fn bench_pattern(&self) -> &str {
        self.bench_pattern.as_str()
    }

    fn env_for(&self, config_name: &str, bindings: &Bindings) -> Vec<(String, String)> {
        let mut envs: Vec<(String, String)> = bindings
            .iter()
            .map(|(key, value)| (format!("{}{}", self.env_prefix, key), value.to_string()))
            .collect();
        envs.push(("BENCHMATRIX_CONFIG".to_string(), config_name.to_string()));
        envs
    }
}

fn compile_bench_pattern(pattern: &str) -> ProcessResult<Regex> {
    Regex::new(pattern).map_err(|e| ProcessError::InvalidBenchPattern {
        pattern: pattern.to_string(),
        reason: e.to_string(),
    })
}

/// `exit code 2: <last stderr line>`.
fn failure_detail(output: &CommandOutput) -> String {
    match output.last_stderr_line() {
        Some(line) => format!("exit code {}: {}", output.exit_code, line),
        None => format!("exit code {}", output.exit_code),
    }
}

#[async_trait]
impl SimulationBackend for CommandBackend {
    fn is_bench(&self, source: &Path) -> bool {
        Bench::id_for(source)
            .map(|id| self.bench_pattern.is_match(&id))
            .unwrap_or(false)
    }

    async fn prepare(&self, sources: &SourceCatalog) -> BackendResult<()> {
        let Some(compile) = &self.compile else {
            return Ok(());
        };

        let argv = compile.expand(&TemplateContext::for_sources(sources))?;
        info!(program = %compile.program(), files = argv.len().saturating_sub(1), "compiling sources");

        let output = ProcessRunner::run(&argv, &[], self.timeout).await?;
        if output.passed() {
            Ok(())
        } else {
            warn!(exit_code = output.exit_code, "compile step failed");
            Err(BackendError::Rejected(format!(
                "compile step failed with {}",
                failure_detail(&output)
            )))
        }
    }

    async fn execute(
        &self,
        bench: &Bench,
        config_name: &str,
        bindings: &Bindings,
    ) -> BackendResult<BackendReport> {
        let argv = self
            .run
            .expand(&TemplateContext::for_unit(bench, config_name, bindings))?;
        let envs = self.env_for(config_name, bindings);

        let output = ProcessRunner::run(&argv, &envs, self.timeout).await?;
        if output.passed() {
            Ok(BackendReport::pass(output.last_stdout_line().unwrap_or_default()))
        } else {
            Ok(BackendReport::fail(failure_detail(&output)))
        }
    }
}
