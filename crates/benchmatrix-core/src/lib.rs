//! benchmatrix core - test-matrix orchestration for HDL testbenches
//!
//! Provides a harness that:
//! - Registers design and test sources from glob patterns
//! - Discovers testbenches through a pluggable simulation backend
//! - Expands benches × parameter sets into run units
//! - Executes run units on a bounded worker pool with fault isolation
//! - Aggregates outcomes into a summary and exit status

pub mod backend;
pub mod bench;
pub mod cancel;
pub mod error;
pub mod executor;
pub mod fakes;
pub mod matrix;
pub mod obs;
pub mod params;
pub mod pattern;
pub mod pipeline;
pub mod report;
pub mod settings;
pub mod source;
pub mod summary;
pub mod telemetry;

// Re-export key types
pub use backend::{BackendReport, SimulationBackend, Verdict};
pub use bench::{Bench, BenchRegistry};
pub use cancel::Cancellation;
pub use error::{BackendError, BackendResult, MatrixError, MatrixResult};
pub use executor::{Executor, ExecutorConfig, Outcome, OutcomeStatus};
pub use matrix::{BenchSelector, ConfigMatrix, ParameterSet, RunUnit};
pub use params::{parse_bindings, render_bindings, Bindings, ParamValue};
pub use pattern::{NamePattern, PathGlob};
pub use pipeline::{Harness, HarnessSpec, LibrarySpec, MatrixPlan};
pub use report::{render_outcome_line, render_summary_line, write_report_json, RunReport};
pub use settings::{ConfigEntry, HarnessSettings, MatrixFile, SettingsOverrides};
pub use source::{SourceCatalog, SourceSet};
pub use summary::{ResultAggregator, Summary};
pub use telemetry::init_tracing;
