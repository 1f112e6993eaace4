//! The simulation backend seam.
//!
//! The core never decides on its own what a bench is or how a bench runs.
//! Both questions are delegated to an injected [`SimulationBackend`]; the
//! process backend in `benchmatrix-process` and the scripted fake in
//! [`crate::fakes`] are the two implementations shipped with the workspace.

use std::collections::BTreeSet;
use std::path::Path;

use async_trait::async_trait;
use serde::{Deserialize, Serialize};

use crate::bench::Bench;
use crate::error::BackendResult;
use crate::params::Bindings;
use crate::source::SourceCatalog;

/// Verdict a self-checking bench reported.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum Verdict {
    Pass,
    Fail,
}

/// What the backend hands back for a completed bench invocation.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct BackendReport {
    pub verdict: Verdict,
    pub detail: String,
}

impl BackendReport {
    pub fn pass(detail: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Pass,
            detail: detail.into(),
        }
    }

    pub fn fail(detail: impl Into<String>) -> Self {
        Self {
            verdict: Verdict::Fail,
            detail: detail.into(),
        }
    }
}

/// Injectable toolchain collaborator.
///
/// Implementations must be cheap to share across workers (`Send + Sync`);
/// the executor calls [`SimulationBackend::execute`] concurrently.
#[async_trait]
pub trait SimulationBackend: Send + Sync {
    /// Whether `source` is a runnable, self-checking bench.
    fn is_bench(&self, source: &Path) -> bool;

    /// Parameters `bench` accepts, or `None` to accept any binding.
    fn declared_parameters(&self, _bench: &Bench) -> Option<BTreeSet<String>> {
        None
    }

    /// One-time preparation (compile, elaborate) before any bench runs.
    async fn prepare(&self, _sources: &SourceCatalog) -> BackendResult<()> {
        Ok(())
    }

    /// Run `bench` under the config named `config_name`, with its
    /// `bindings`, and report the bench's verdict.
    async fn execute(
        &self,
        bench: &Bench,
        config_name: &str,
        bindings: &Bindings,
    ) -> BackendResult<BackendReport>;
}
