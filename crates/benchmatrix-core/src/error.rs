//! Error types for benchmatrix.
//!
//! [`MatrixError`] covers everything that can go wrong while building a run
//! (source registration, discovery, matrix expansion). These are fatal and
//! abort before any unit executes. [`BackendError`] covers collaborator
//! failures during execution; those never abort a run and are folded into
//! `ERROR` outcomes by the executor.

use std::path::PathBuf;

use thiserror::Error;

/// Configuration-time errors. Any of these aborts the run.
#[derive(Debug, Error)]
pub enum MatrixError {
    /// A source glob matched no files.
    #[error("library '{library}': pattern '{pattern}' matched no files")]
    NotFound { library: String, pattern: String },

    /// The test library contains no recognizable benches.
    #[error("no test benches discovered in library '{library}'")]
    Discovery { library: String },

    /// A parameter set name was registered twice.
    #[error("configuration '{name}' is already registered")]
    DuplicateConfig { name: String },

    /// A library name was registered twice.
    #[error("library '{name}' is already registered")]
    DuplicateLibrary { name: String },

    /// Two source units resolve to the same bench id.
    #[error("bench id '{id}' is declared by both {first:?} and {second:?}")]
    DuplicateBench {
        id: String,
        first: PathBuf,
        second: PathBuf,
    },

    /// A glob or name pattern could not be compiled.
    #[error("invalid pattern '{pattern}': {reason}")]
    InvalidPattern { pattern: String, reason: String },

    /// A `key=value` binding list could not be parsed.
    #[error("invalid binding '{input}': {reason}")]
    InvalidBinding { input: String, reason: String },

    /// The expanded matrix is empty (no configs, or everything filtered out).
    #[error("empty test matrix: {reason}")]
    EmptyMatrix { reason: String },

    /// A matched source file could not be opened for reading.
    #[error("source file {path:?} is not readable: {source}")]
    Unreadable {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    /// Directory traversal failed.
    #[error("failed to walk source tree: {0}")]
    Walk(String),

    /// The matrix settings file is malformed.
    #[error("invalid settings: {0}")]
    Settings(String),
}

/// Result alias for configuration-time operations.
pub type MatrixResult<T> = std::result::Result<T, MatrixError>;

/// Failures reported by a [`crate::backend::SimulationBackend`].
#[derive(Debug, Clone, Error, PartialEq, Eq)]
pub enum BackendError {
    /// The toolchain could not be reached at all.
    #[error("backend unavailable: {0}")]
    Unavailable(String),

    /// Invoking the bench failed before a verdict was produced.
    #[error("invocation failed: {0}")]
    Invocation(String),

    /// The bench did not finish within its time limit.
    #[error("timed out after {elapsed_ms}ms")]
    TimedOut { elapsed_ms: u64 },

    /// The backend refused the request (e.g. unsupported parameter).
    #[error("rejected: {0}")]
    Rejected(String),

    /// The invocation was cancelled by the host.
    #[error("cancelled")]
    Cancelled,
}

/// Result alias for backend operations.
pub type BackendResult<T> = std::result::Result<T, BackendError>;
