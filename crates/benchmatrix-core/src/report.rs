//! Run report artifacts.
//!
//! - `RunReport`: machine-readable record of a run (report.json)
//! - console lines: one per outcome plus a trailing summary line

use std::path::Path;

use anyhow::{Context, Result};
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

use crate::executor::Outcome;
use crate::summary::Summary;

/// Everything a run produced.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct RunReport {
    pub run_id: String,
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,
    pub duration_ms: u64,
    pub matrix_digest: String,
    /// One per run unit, in run-unit order.
    pub outcomes: Vec<Outcome>,
    pub summary: Summary,
}

impl RunReport {
    pub fn exit_code(&self) -> i32 {
        self.summary.exit_code()
    }
}

/// Write `report` as pretty JSON.
pub fn write_report_json(path: &Path, report: &RunReport) -> Result<()> {
    let content = serde_json::to_string_pretty(report).context("serialize run report")?;
    std::fs::write(path, content).with_context(|| format!("write {:?}", path))?;
    Ok(())
}

/// `pass b1.S8-C8 (12ms)` or `fail b2.S8-C3 (40ms): <detail>`.
pub fn render_outcome_line(outcome: &Outcome) -> String {
    let mut line = format!(
        "{:<5} {} ({}ms)",
        outcome.status.as_str(),
        outcome.run_unit.name(),
        outcome.duration_ms
    );
    if outcome.is_failure() && !outcome.detail.is_empty() {
        line.push_str(": ");
        line.push_str(&outcome.detail);
    }
    line
}

/// `total=4 passed=3 failed=1 errored=0`.
pub fn render_summary_line(summary: &Summary) -> String {
    format!(
        "total={} passed={} failed={} errored={}",
        summary.total, summary.passed, summary.failed, summary.errored
    )
}
