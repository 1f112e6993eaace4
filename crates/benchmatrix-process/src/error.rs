//! Process backend errors.

use std::io;

use benchmatrix_core::BackendError;
use thiserror::Error;

#[derive(Debug, Error)]
pub enum ProcessError {
    #[error("command template is empty")]
    EmptyCommand,

    #[error("placeholder {{{placeholder}}} is not available in this command")]
    UnboundPlaceholder { placeholder: String },

    #[error("invalid bench pattern '{pattern}': {reason}")]
    InvalidBenchPattern { pattern: String, reason: String },

    #[error("failed to spawn '{program}': {source}")]
    Spawn {
        program: String,
        #[source]
        source: io::Error,
    },

    #[error("'{program}' timed out after {elapsed_ms}ms")]
    Timeout { program: String, elapsed_ms: u64 },

    #[error("waiting for '{program}' failed: {source}")]
    Io {
        program: String,
        #[source]
        source: io::Error,
    },
}

pub type ProcessResult<T> = std::result::Result<T, ProcessError>;

impl From<ProcessError> for BackendError {
    fn from(err: ProcessError) -> Self {
        match err {
            ProcessError::Timeout { elapsed_ms, .. } => BackendError::TimedOut { elapsed_ms },
            ProcessError::Spawn { .. } => BackendError::Unavailable(err.to_string()),
            ProcessError::Io { .. } => BackendError::Invocation(err.to_string()),
            ProcessError::EmptyCommand
            | ProcessError::UnboundPlaceholder { .. }
            | ProcessError::InvalidBenchPattern { .. } => BackendError::Rejected(err.to_string()),
        }
    }
}
