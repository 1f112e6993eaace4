//! Result aggregation.

use serde::{Deserialize, Serialize};

use crate::executor::{Outcome, OutcomeStatus};
use crate::matrix::RunUnit;

/// Terminal artifact of a run.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Summary {
    pub total: usize,
    pub passed: usize,
    pub failed: usize,
    pub errored: usize,
    /// `FAIL` and `ERROR` units, in outcome order.
    pub failing_units: Vec<RunUnit>,
}

impl Summary {
    /// Overall verdict: no failures and no errors.
    pub fn is_success(&self) -> bool {
        self.failed == 0 && self.errored == 0
    }

    /// Process exit status for this summary.
    pub fn exit_code(&self) -> i32 {
        if self.is_success() {
            0
        } else {
            1
        }
    }

    pub fn pass_rate(&self) -> f32 {
        if self.total == 0 {
            0.0
        } else {
            self.passed as f32 / self.total as f32
        }
    }
}

/// Reduces outcomes to a [`Summary`]. Pure; no I/O.
pub struct ResultAggregator;

impl ResultAggregator {
    pub fn summarize(outcomes: &[Outcome]) -> Summary {
        let mut summary = Summary {
            total: outcomes.len(),
            ..Summary::default()
        };

        for outcome in outcomes {
            match outcome.status {
                OutcomeStatus::Pass => summary.passed += 1,
                OutcomeStatus::Fail => summary.failed += 1,
                OutcomeStatus::Error => summary.errored += 1,
            }
            if outcome.is_failure() {
                summary.failing_units.push(outcome.run_unit.clone());
            }
        }

        summary
    }
}
