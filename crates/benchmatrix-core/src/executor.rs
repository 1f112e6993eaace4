//! Concurrent run-unit execution.
//!
//! Units are dispatched to a pool of at most `workers` concurrent tasks
//! (a [`Semaphore`] bounds the pool). Results land in one slot per input
//! index, so the returned outcomes always follow input order no matter
//! which worker finishes first. Nothing a single unit does (backend error,
//! timeout, panic) stops the others; it becomes an `ERROR` outcome instead.

use std::any::Any;
use std::num::NonZeroUsize;
use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::{Duration, Instant};

use futures::FutureExt;
use serde::{Deserialize, Serialize};
use tokio::sync::Semaphore;
use tokio::task::JoinSet;
use tracing::{instrument, warn};

use crate::backend::{SimulationBackend, Verdict};
use crate::bench::BenchRegistry;
use crate::cancel::Cancellation;
use crate::error::BackendError;
use crate::matrix::RunUnit;
use crate::obs;

/// Detail recorded for units that were stopped before or while running.
pub const CANCELLED_DETAIL: &str = "cancelled";

/// Status of one executed unit.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "UPPERCASE")]
pub enum OutcomeStatus {
    /// The bench ran and reported success.
    Pass,
    /// The bench ran and reported failure.
    Fail,
    /// Infrastructure failure: the bench never produced a verdict.
    Error,
}

impl OutcomeStatus {
    pub fn as_str(&self) -> &'static str {
        match self {
            OutcomeStatus::Pass => "pass",
            OutcomeStatus::Fail => "fail",
            OutcomeStatus::Error => "error",
        }
    }
}

impl From<Verdict> for OutcomeStatus {
    fn from(verdict: Verdict) -> Self {
        match verdict {
            Verdict::Pass => OutcomeStatus::Pass,
            Verdict::Fail => OutcomeStatus::Fail,
        }
    }
}

/// Result of executing one [`RunUnit`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Outcome {
    pub run_unit: RunUnit,
    pub status: OutcomeStatus,
    pub detail: String,
    pub duration_ms: u64,
}

impl Outcome {
    pub fn new(run_unit: RunUnit, status: OutcomeStatus, detail: impl Into<String>, duration_ms: u64) -> Self {
        Self {
            run_unit,
            status,
            detail: detail.into(),
            duration_ms,
        }
    }

    pub fn error(run_unit: RunUnit, detail: impl Into<String>, duration_ms: u64) -> Self {
        Self::new(run_unit, OutcomeStatus::Error, detail, duration_ms)
    }

    pub fn passed(&self) -> bool {
        self.status == OutcomeStatus::Pass
    }

    /// `FAIL` or `ERROR`.
    pub fn is_failure(&self) -> bool {
        !self.passed()
    }
}

/// Worker pool and per-unit controls.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ExecutorConfig {
    /// Maximum concurrent backend invocations. Zero is treated as one.
    pub workers: usize,
    /// Per-unit wall-clock limit.
    pub unit_timeout: Option<Duration>,
    /// Cancel the remaining units after the first `FAIL` or `ERROR`.
    pub fail_fast: bool,
}

impl Default for ExecutorConfig {
    fn default() -> Self {
        Self {
            workers: default_workers(),
            unit_timeout: None,
            fail_fast: false,
        }
    }
}

/// Worker count matching the host's available parallelism.
pub fn default_workers() -> usize {
    std::thread::available_parallelism()
        .map(NonZeroUsize::get)
        .unwrap_or(1)
}

/// Drives run units through a [`SimulationBackend`].
#[derive(Debug, Clone, Default)]
pub struct Executor {
    config: ExecutorConfig,
}

impl Executor {
    pub fn new(config: ExecutorConfig) -> Self {
        Self { config }
    }

    pub fn config(&self) -> &ExecutorConfig {
        &self.config
    }

    /// Execute every unit and return one outcome per unit, in input order.
    ///
    /// Once `cancel` fires, in-flight invocations are dropped and units that
    /// have not started are recorded as `ERROR` with detail `"cancelled"`.
    /// The returned sequence is always complete.
    #[instrument(skip_all, fields(units = run_units.len(), workers = self.config.workers.max(1)))]
    pub async fn run(
        &self,
        run_units: Vec<RunUnit>,
        benches: Arc<BenchRegistry>,
        backend: Arc<dyn SimulationBackend>,
        cancel: &Cancellation,
    ) -> Vec<Outcome> {
        let workers = self.config.workers.max(1);
        let semaphore = Arc::new(Semaphore::new(workers));

        // Fail-fast stops this run only; the host's handle is left untouched.
        let stop = Cancellation::new();
        let forwarder = {
            let host = cancel.clone();
            let stop = stop.clone();
            tokio::spawn(async move {
                host.cancelled().await;
                stop.cancel();
            })
        };

        let mut join_set = JoinSet::new();
        for (idx, unit) in run_units.iter().cloned().enumerate() {
            let semaphore = Arc::clone(&semaphore);
            let benches = Arc::clone(&benches);
            let backend = Arc::clone(&backend);
            let stop = stop.clone();
            let unit_timeout = self.config.unit_timeout;
            let fail_fast = self.config.fail_fast;

            join_set.spawn(async move {
                let permit = tokio::select! {
                    permit = semaphore.acquire_owned() => permit.ok(),
                    _ = stop.cancelled() => None,
                };
                if permit.is_none() || stop.is_cancelled() {
                    return (idx, Outcome::error(unit, CANCELLED_DETAIL, 0));
                }

                let outcome = dispatch(backend.as_ref(), &benches, unit, unit_timeout, &stop).await;
                if fail_fast && outcome.is_failure() {
                    stop.cancel();
                }
                drop(permit);
                (idx, outcome)
            });
        }

        let mut slots: Vec<Option<Outcome>> = (0..run_units.len()).map(|_| None).collect();
        while let Some(joined) = join_set.join_next().await {
            match joined {
                Ok((idx, outcome)) => {
                    if slots[idx].is_none() {
                        slots[idx] = Some(outcome);
                    } else {
                        warn!(index = idx, "duplicate outcome for run unit ignored");
                    }
                }
                Err(e) => warn!(error = %e, "executor worker aborted"),
            }
        }
        forwarder.abort();

        let outcomes: Vec<Outcome> = run_units
            .into_iter()
            .zip(slots)
            .map(|(unit, slot)| slot.unwrap_or_else(|| Outcome::error(unit, "worker aborted", 0)))
            .collect();

        if stop.is_cancelled() {
            let cancelled = outcomes
                .iter()
                .filter(|o| o.status == OutcomeStatus::Error && o.detail == CANCELLED_DETAIL)
                .count();
            obs::emit_run_cancelled(cancelled);
        }

        outcomes
    }
}

/// Run one unit to an outcome. Never fails.
async fn dispatch(
    backend: &dyn SimulationBackend,
    benches: &BenchRegistry,
    unit: RunUnit,
    unit_timeout: Option<Duration>,
    stop: &Cancellation,
) -> Outcome {
    let Some(bench) = benches.get(&unit.bench_id) else {
        let detail = format!("bench '{}' not found", unit.bench_id);
        return Outcome::error(unit, detail, 0);
    };

    if let Some(declared) = backend.declared_parameters(bench) {
        let unknown: Vec<&str> = unit
            .bindings
            .keys()
            .filter(|key| !declared.contains(*key))
            .map(String::as_str)
            .collect();
        if !unknown.is_empty() {
            let detail = format!(
                "bench '{}' does not declare parameter(s): {}",
                unit.bench_id,
                unknown.join(", ")
            );
            return Outcome::error(unit, detail, 0);
        }
    }

    let name = unit.name();
    obs::emit_unit_started(&name);
    let start = Instant::now();

    let result = {
        let invocation =
            AssertUnwindSafe(backend.execute(bench, &unit.config_name, &unit.bindings)).catch_unwind();
        let bounded = async {
            match unit_timeout {
                Some(limit) => match tokio::time::timeout(limit, invocation).await {
                    Ok(result) => result,
                    Err(_) => Ok(Err(BackendError::TimedOut {
                        elapsed_ms: limit.as_millis() as u64,
                    })),
                },
                None => invocation.await,
            }
        };
        tokio::select! {
            result = bounded => result,
            _ = stop.cancelled() => Ok(Err(BackendError::Cancelled)),
        }
    };

    let duration_ms = start.elapsed().as_millis() as u64;
    let outcome = match result {
        Ok(Ok(report)) => Outcome::new(unit, report.verdict.into(), report.detail, duration_ms),
        Ok(Err(BackendError::Cancelled)) => Outcome::error(unit, CANCELLED_DETAIL, duration_ms),
        Ok(Err(e)) => Outcome::error(unit, e.to_string(), duration_ms),
        Err(panic) => Outcome::error(
            unit,
            format!("backend panicked: {}", panic_message(panic.as_ref())),
            duration_ms,
        ),
    };
    obs::emit_unit_finished(&name, outcome.status.as_str(), duration_ms);
    outcome
}

fn panic_message(payload: &(dyn Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic payload".to_string()
    }
}
