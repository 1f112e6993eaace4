//! Subprocess execution with timeout.

use std::process::Stdio;
use std::time::{Duration, Instant};

use tokio::process::Command;
use tracing::debug;

use crate::error::{ProcessError, ProcessResult};

/// Result of one finished process.
#[derive(Debug, Clone)]
pub struct CommandOutput {
    /// Exit code (0 = success, -1 when killed by a signal).
    pub exit_code: i32,

    /// Captured stdout.
    pub stdout: String,

    /// Captured stderr.
    pub stderr: String,

    /// Duration in milliseconds.
    pub duration_ms: u64,

    /// Whether the process exited successfully.
    pub success: bool,
}

impl CommandOutput {
    /// Whether this process passed (exit code 0).
    pub fn passed(&self) -> bool {
        self.success && self.exit_code == 0
    }

    /// Last non-blank line written to stderr.
    pub fn last_stderr_line(&self) -> Option<&str> {
        last_line(&self.stderr)
    }

    pub fn last_stdout_line(&self) -> Option<&str> {
        last_line(&self.stdout)
    }
}

fn last_line(text: &str) -> Option<&str> {
    text.lines().map(str::trim).rev().find(|line| !line.is_empty())
}

/// Runs a fully expanded argv.
pub struct ProcessRunner;

impl ProcessRunner {
    /// Spawn `argv` with `envs` added to the inherited environment and wait
    /// for it, up to `timeout`.
    ///
    /// The child is killed when the returned future is dropped, so a
    /// cancelled or timed-out invocation leaves no process behind.
    pub async fn run(
        argv: &[String],
        envs: &[(String, String)],
        timeout: Option<Duration>,
    ) -> ProcessResult<CommandOutput> {
        let start = Instant::now();

        let Some((exe, args)) = argv.split_first() else {
            return Err(ProcessError::EmptyCommand);
        };

        debug!(program = %exe, args = args.len(), "spawning process");

        let child = Command::new(exe)
            .args(args)
            .envs(envs.iter().map(|(k, v)| (k.as_str(), v.as_str())))
            .stdin(Stdio::null())
            .stdout(Stdio::piped())
            .stderr(Stdio::piped())
            .kill_on_drop(true)
            .spawn()
            .map_err(|source| ProcessError::Spawn {
                program: exe.clone(),
                source,
            })?;

        let waited = match timeout {
            Some(limit) => tokio::time::timeout(limit, child.wait_with_output())
                .await
                .map_err(|_| ProcessError::Timeout {
                    program: exe.clone(),
                    elapsed_ms: limit.as_millis() as u64,
                })?,
            None => child.wait_with_output().await,
        };
        let output = waited.map_err(|source| ProcessError::Io {
            program: exe.clone(),
            source,
        })?;

        let duration_ms = start.elapsed().as_millis() as u64;
        let exit_code = output.status.code().unwrap_or(-1);

        Ok(CommandOutput {
            exit_code,
            stdout: String::from_utf8_lossy(&output.stdout).to_string(),
            stderr: String::from_utf8_lossy(&output.stderr).to_string(),
            duration_ms,
            success: output.status.success(),
        })
    }
}
