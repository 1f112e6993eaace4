//! benchmatrix process backend
//!
//! Drives an external simulator toolchain through subprocesses:
//! - Recognizes benches by file-stem regex
//! - Compiles all registered sources once before the run
//! - Runs each unit with its bindings as argv elements and environment
//! - Maps exit status to a verdict

pub mod backend;
pub mod command;
pub mod error;
pub mod runner;

// Re-export key types
pub use backend::{CommandBackend, DEFAULT_BENCH_PATTERN, DEFAULT_ENV_PREFIX};
pub use command::{CommandTemplate, TemplateContext};
pub use error::{ProcessError, ProcessResult};
pub use runner::{CommandOutput, ProcessRunner};
