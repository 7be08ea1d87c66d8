//! Error types for hostexec.
//!
//! Uses thiserror for derive macros. Every failure a run can end in has its
//! own variant so callers are forced to branch on the kind rather than
//! string-match messages.

use crate::exit_codes;
use crate::result::RunStatus;
use std::path::PathBuf;
use thiserror::Error;

/// Main error type for harness operations.
#[derive(Error, Debug)]
pub enum HarnessError {
    /// The task descriptor does not exist under the task root.
    #[error("task descriptor not found: {}", path.display())]
    TaskNotFound { path: PathBuf },

    /// The argument mapping was rejected before augmentation.
    #[error("invalid input: {0}")]
    InvalidInput(String),

    /// The payload compiler failed for this task.
    #[error("could not generate executable for task '{task}' ({}): {message}", path.display())]
    CompileFailed {
        task: String,
        path: PathBuf,
        message: String,
    },

    /// The payload could not be staged or spawned, or it outlived its deadline.
    #[error("process failed: {reason}")]
    ProcessFailed { reason: String, stderr: String },

    /// The payload ran but stdout was not a single JSON object.
    #[error("could not parse payload output: {reason}")]
    ParseFailed {
        reason: String,
        stdout: String,
        stderr: String,
    },

    /// Configuration file or CLI usage problem.
    #[error("{0}")]
    Config(String),
}

impl HarnessError {
    /// Returns the run status this error terminates a run with.
    ///
    /// `Config` errors happen before any run exists; they are reported as
    /// `InvalidInput` when a status is required.
    pub fn status(&self) -> RunStatus {
        match self {
            HarnessError::TaskNotFound { .. } => RunStatus::TaskNotFound,
            HarnessError::InvalidInput(_) | HarnessError::Config(_) => RunStatus::InvalidInput,
            HarnessError::CompileFailed { .. } => RunStatus::CompileFailed,
            HarnessError::ProcessFailed { .. } => RunStatus::ProcessFailed,
            HarnessError::ParseFailed { .. } => RunStatus::ParseFailed,
        }
    }

    /// Returns the appropriate exit code for this error type.
    pub fn exit_code(&self) -> i32 {
        match self {
            HarnessError::Config(_) => exit_codes::USAGE_ERROR,
            HarnessError::TaskNotFound { .. } => exit_codes::TASK_NOT_FOUND,
            HarnessError::InvalidInput(_) => exit_codes::INVALID_INPUT,
            HarnessError::CompileFailed { .. } => exit_codes::COMPILE_FAILED,
            HarnessError::ProcessFailed { .. } => exit_codes::PROCESS_FAILED,
            HarnessError::ParseFailed { .. } => exit_codes::PARSE_FAILED,
        }
    }

    /// Standard error text captured from the payload, if the failure has any.
    pub fn stderr(&self) -> &str {
        match self {
            HarnessError::ProcessFailed { stderr, .. }
            | HarnessError::ParseFailed { stderr, .. } => stderr,
            _ => "",
        }
    }
}

/// Result type alias for harness operations.
pub type Result<T> = std::result::Result<T, HarnessError>;
