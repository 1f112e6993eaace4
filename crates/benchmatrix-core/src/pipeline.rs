//! End-to-end harness orchestration.
//!
//! [`Harness::plan`] performs the configuration-time stages (source
//! registration, bench discovery, matrix expansion, filtering); any error
//! there is fatal. [`Harness::run`] performs the execution-time stages and
//! always returns a [`RunReport`].

use std::sync::Arc;
use std::time::Instant;

use chrono::Utc;
use sha2::{Digest, Sha256};
use tracing::{info, instrument, Instrument};
use uuid::Uuid;

use crate::backend::SimulationBackend;
use crate::bench::BenchRegistry;
use crate::cancel::Cancellation;
use crate::error::{MatrixError, MatrixResult};
use crate::executor::{Executor, ExecutorConfig, Outcome};
use crate::matrix::{ConfigMatrix, RunUnit};
use crate::obs;
use crate::params::render_bindings;
use crate::pattern::NamePattern;
use crate::report::RunReport;
use crate::source::SourceCatalog;
use crate::summary::ResultAggregator;

/// A library to register: name plus glob.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct LibrarySpec {
    pub name: String,
    pub pattern: String,
}

impl LibrarySpec {
    pub fn new(name: impl Into<String>, pattern: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            pattern: pattern.into(),
        }
    }
}

/// Everything needed to plan a run.
#[derive(Debug, Clone)]
pub struct HarnessSpec {
    /// Design libraries, registered before the test library.
    pub libraries: Vec<LibrarySpec>,
    /// The library benches are discovered in.
    pub test_library: LibrarySpec,
    pub configs: ConfigMatrix,
    /// Keep only units whose name matches one of these. Empty keeps all.
    pub filters: Vec<NamePattern>,
}

impl HarnessSpec {
    pub fn new(test_library: LibrarySpec, configs: ConfigMatrix) -> Self {
        Self {
            libraries: Vec::new(),
            test_library,
            configs,
            filters: Vec::new(),
        }
    }

    pub fn with_library(mut self, library: LibrarySpec) -> Self {
        self.libraries.push(library);
        self
    }

    pub fn with_filter(mut self, filter: NamePattern) -> Self {
        self.filters.push(filter);
        self
    }
}

/// A fully expanded, validated run.
#[derive(Debug, Clone)]
pub struct MatrixPlan {
    pub sources: SourceCatalog,
    pub benches: Arc<BenchRegistry>,
    pub units: Vec<RunUnit>,
    /// SHA-256 over the ordered unit names and bindings.
    pub matrix_digest: String,
}

/// Harness orchestrator.
pub struct Harness;

impl Harness {
    /// Register sources, discover benches, expand and filter the matrix.
    #[instrument(skip_all, fields(test_library = %spec.test_library.name))]
    pub fn plan(spec: &HarnessSpec, backend: &dyn SimulationBackend) -> MatrixResult<MatrixPlan> {
        let mut sources = SourceCatalog::new();
        for library in &spec.libraries {
            sources.add(&library.name, &library.pattern)?;
        }
        let test_set = sources
            .add(&spec.test_library.name, &spec.test_library.pattern)?
            .clone();

        let benches = BenchRegistry::discover(&test_set, backend)?;

        if spec.configs.is_empty() {
            return Err(MatrixError::EmptyMatrix {
                reason: "no configurations registered".to_string(),
            });
        }

        let expanded = spec.configs.expand(&benches.benches());
        let expanded_len = expanded.len();
        let units: Vec<RunUnit> = if spec.filters.is_empty() {
            expanded
        } else {
            expanded
                .into_iter()
                .filter(|unit| {
                    let name = unit.name();
                    spec.filters.iter().any(|f| f.matches(&name))
                })
                .collect()
        };

        if units.is_empty() {
            let reason = if expanded_len == 0 {
                "no configuration applies to any discovered bench".to_string()
            } else {
                format!("filters excluded all {expanded_len} run units")
            };
            return Err(MatrixError::EmptyMatrix { reason });
        }

        let matrix_digest = compute_matrix_digest(&units);
        obs::emit_matrix_planned(benches.len(), spec.configs.len(), units.len(), &matrix_digest);

        Ok(MatrixPlan {
            sources,
            benches: Arc::new(benches),
            units,
            matrix_digest,
        })
    }

    /// Prepare the backend, execute every unit and aggregate the outcomes.
    ///
    /// A failed preparation turns every unit into an `ERROR` outcome; the
    /// run still produces a summary.
    pub async fn run(
        plan: MatrixPlan,
        backend: Arc<dyn SimulationBackend>,
        config: ExecutorConfig,
        cancel: &Cancellation,
    ) -> RunReport {
        let run_id = Uuid::new_v4().to_string();
        let span = obs::run_span(&run_id);
        async move {
            let started_at = Utc::now();
            let start = Instant::now();

            info!(units = plan.units.len(), workers = config.workers, "starting matrix run");

            let outcomes = match backend.prepare(&plan.sources).await {
                Ok(()) => {
                    Executor::new(config)
                        .run(plan.units, Arc::clone(&plan.benches), backend, cancel)
                        .await
                }
                Err(e) => {
                    obs::emit_prepare_failed(&e);
                    let detail = format!("backend preparation failed: {e}");
                    plan.units
                        .into_iter()
                        .map(|unit| Outcome::error(unit, detail.clone(), 0))
                        .collect()
                }
            };

            let summary = ResultAggregator::summarize(&outcomes);
            let duration_ms = start.elapsed().as_millis() as u64;
            obs::emit_run_finished(
                summary.total,
                summary.passed,
                summary.failed,
                summary.errored,
                duration_ms,
            );

            RunReport {
                run_id,
                started_at,
                finished_at: Utc::now(),
                duration_ms,
                matrix_digest: plan.matrix_digest,
                outcomes,
                summary,
            }
        }
        .instrument(span)
        .await
    }
}

/// Deterministic digest of an ordered unit list.
pub fn compute_matrix_digest(units: &[RunUnit]) -> String {
    let mut hasher = Sha256::new();
    for unit in units {
        hasher.update(unit.name().as_bytes());
        hasher.update(b"\0");
        hasher.update(render_bindings(&unit.bindings).as_bytes());
        hasher.update(b"\0");
    }
    hex::encode(hasher.finalize())
}
