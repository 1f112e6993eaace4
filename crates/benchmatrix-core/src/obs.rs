//! Structured observability hooks for the matrix run lifecycle.
//!
//! This module provides:
//! - A run-scoped tracing span via [`run_span`]
//! - Emission functions for key lifecycle events: planning, unit start and
//!   finish, cancellation, run completion
//!
//! Events are emitted at `info!`/`debug!` level and filtered through
//! `RUST_LOG`. Pass `--json` on the CLI for JSON lines.

use tracing::{debug, info, warn, Span};

/// Run-scoped span; every event emitted inside it carries `run_id`.
///
/// # Example
///
/// ```ignore
/// async { /* ... */ }.instrument(run_span(&run_id)).await;
/// ```
pub fn run_span(run_id: &str) -> Span {
    tracing::info_span!("benchmatrix.run", run_id = %run_id)
}

/// Emit event: matrix expanded and ready to run.
pub fn emit_matrix_planned(benches: usize, configs: usize, units: usize, digest: &str) {
    info!(
        event = "matrix.planned",
        benches = benches,
        configs = configs,
        units = units,
        matrix_digest = %digest,
    );
}

/// Emit event: a unit was handed to the backend.
pub fn emit_unit_started(unit: &str) {
    debug!(event = "unit.started", unit = %unit);
}

/// Emit event: a unit produced an outcome.
pub fn emit_unit_finished(unit: &str, status: &str, duration_ms: u64) {
    info!(event = "unit.finished", unit = %unit, status = %status, duration_ms = duration_ms);
}

/// Emit event: the run was cancelled (warning level).
pub fn emit_run_cancelled(cancelled_units: usize) {
    warn!(event = "run.cancelled", cancelled_units = cancelled_units);
}

/// Emit event: backend preparation failed (warning level).
pub fn emit_prepare_failed(error: &dyn std::fmt::Display) {
    warn!(event = "backend.prepare_failed", error = %error);
}

/// Emit event: run finished with counts and overall verdict.
pub fn emit_run_finished(total: usize, passed: usize, failed: usize, errored: usize, duration_ms: u64) {
    info!(
        event = "run.finished",
        total = total,
        passed = passed,
        failed = failed,
        errored = errored,
        duration_ms = duration_ms,
        success = failed == 0 && errored == 0,
    );
}
