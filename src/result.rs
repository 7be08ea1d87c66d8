//! Run outcomes and payload output parsing.
//!
//! The sandbox hands back raw bytes; this module classifies them. A payload
//! that ran but printed nothing parseable is a `ParseFailed` outcome that
//! keeps the raw stdout, which lets callers tell "ran, said nothing useful"
//! apart from "never ran".

use crate::args::Arguments;
use crate::error::{HarnessError, Result};
use crate::exit_codes;
use serde::{Deserialize, Serialize};
use serde_json::Value;

/// Terminal status of a run. Exactly one per run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Success,
    CompileFailed,
    ProcessFailed,
    ParseFailed,
    InvalidInput,
    TaskNotFound,
}

impl RunStatus {
    pub fn is_success(&self) -> bool {
        matches!(self, RunStatus::Success)
    }

    /// Process exit code the CLI reports this status with.
    pub fn exit_code(&self) -> i32 {
        match self {
            RunStatus::Success => exit_codes::SUCCESS,
            RunStatus::TaskNotFound => exit_codes::TASK_NOT_FOUND,
            RunStatus::InvalidInput => exit_codes::INVALID_INPUT,
            RunStatus::CompileFailed => exit_codes::COMPILE_FAILED,
            RunStatus::ProcessFailed => exit_codes::PROCESS_FAILED,
            RunStatus::ParseFailed => exit_codes::PARSE_FAILED,
        }
    }
}

impl std::fmt::Display for RunStatus {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            RunStatus::Success => write!(f, "success"),
            RunStatus::CompileFailed => write!(f, "compile_failed"),
            RunStatus::ProcessFailed => write!(f, "process_failed"),
            RunStatus::ParseFailed => write!(f, "parse_failed"),
            RunStatus::InvalidInput => write!(f, "invalid_input"),
            RunStatus::TaskNotFound => write!(f, "task_not_found"),
        }
    }
}

/// Outcome of one run.
///
/// `output` is present iff `status` is `Success`; `stdout` only on
/// `ParseFailed`.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ExecutionResult {
    pub task: String,
    pub status: RunStatus,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub output: Option<Arguments>,

    /// Captured standard error; empty when the payload wrote none.
    pub stderr: String,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub stdout: Option<String>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub exit_code: Option<i32>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub duration_ms: Option<u64>,

    #[serde(skip_serializing_if = "Option::is_none")]
    pub error: Option<String>,
}

impl ExecutionResult {
    /// A successful run.
    pub fn success(task: impl Into<String>, output: Arguments, stderr: String) -> Self {
        Self {
            task: task.into(),
            status: RunStatus::Success,
            output: Some(output),
            stderr,
            stdout: None,
            exit_code: None,
            duration_ms: None,
            error: None,
        }
    }

    /// Flatten a failed run into a result record.
    pub fn failure(task: impl Into<String>, err: &HarnessError) -> Self {
        let stdout = match err {
            HarnessError::ParseFailed { stdout, .. } => Some(stdout.clone()),
            _ => None,
        };
        Self {
            task: task.into(),
            status: err.status(),
            output: None,
            stderr: err.stderr().to_string(),
            stdout,
            exit_code: None,
            duration_ms: None,
            error: Some(err.to_string()),
        }
    }

    pub fn is_success(&self) -> bool {
        self.status.is_success()
    }
}

/// Classifies payload stdout.
#[derive(Debug, Clone, Copy, Default)]
pub struct ResultParser;

impl ResultParser {
    /// Parse `stdout` as exactly one JSON object.
    ///
    /// Surrounding whitespace is ignored. Empty output, a non-object value,
    /// trailing data, or invalid UTF-8 all fail with `ParseFailed`, which
    /// carries the stdout verbatim and the captured stderr.
    pub fn parse(&self, stdout: &[u8], stderr: &str) -> Result<Arguments> {
        let fail = |reason: String| HarnessError::ParseFailed {
            reason,
            stdout: String::from_utf8_lossy(stdout).to_string(),
            stderr: stderr.to_string(),
        };

        let text = std::str::from_utf8(stdout)
            .map_err(|e| fail(format!("stdout is not valid UTF-8: {}", e)))?;

        if text.trim().is_empty() {
            return Err(fail("payload produced no output".to_string()));
        }

        match serde_json::from_str::<Value>(text) {
            Ok(Value::Object(map)) => Ok(map),
            Ok(other) => Err(fail(format!(
                "expected a JSON object, got {}",
                json_kind(&other)
            ))),
            Err(e) => Err(fail(format!("stdout is not valid JSON: {}", e))),
        }
    }
}

fn json_kind(value: &Value) -> &'static str {
    match value {
        Value::Null => "null",
        Value::Bool(_) => "a boolean",
        Value::Number(_) => "a number",
        Value::String(_) => "a string",
        Value::Array(_) => "an array",
        Value::Object(_) => "an object",
    }
}
