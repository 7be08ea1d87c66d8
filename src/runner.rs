//! Per-invocation run orchestration.
//!
//! A [`Runner`] walks one task through
//! `Created → Validated → Compiled → Executed → Parsed`. Any step can end the
//! run in `Failed`, and every failure is terminal: there is no retry, and
//! `run` consumes the runner so a retry needs a fresh one.

use crate::args::Arguments;
use crate::compiler::CompiledPayload;
use crate::error::{HarnessError, Result};
use crate::harness::Harness;
use crate::result::{ExecutionResult, RunStatus};
use crate::task::task_name;
use std::any::Any;
use std::panic::{self, AssertUnwindSafe};
use std::path::{Path, PathBuf};

/// Where a runner is in its lifecycle.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RunnerState {
    Created,
    Validated,
    Compiled,
    Executed,
    Parsed,
    Failed(RunStatus),
}

/// One invocation of one task.
#[derive(Debug)]
pub struct Runner<'h> {
    harness: &'h Harness,
    task_id: String,
    descriptor: PathBuf,
    args: Arguments,
    state: RunnerState,
    /// Set once the payload has run, whatever the outcome of parsing.
    exit_code: Option<i32>,
    duration_ms: Option<u64>,
}

impl<'h> Runner<'h> {
    /// Resolve the task and validate its arguments.
    ///
    /// # Returns
    ///
    /// * `Ok(Runner)` - In state `Validated`; `args` now carries the
    ///   harness-mandated key
    /// * `Err(HarnessError::TaskNotFound)` - No descriptor for `task_id`
    /// * `Err(HarnessError::InvalidInput)` - `args` was empty
    pub fn new(harness: &'h Harness, task_id: &str, args: Arguments) -> Result<Self> {
        tracing::debug!(task = task_id, state = ?RunnerState::Created, "runner created");

        let descriptor = harness.resolver.resolve(task_id, &harness.emitter)?;
        let args = harness.validator.validate(args, task_id, &harness.emitter)?;

        let runner = Self {
            harness,
            task_id: task_id.to_string(),
            descriptor,
            args,
            state: RunnerState::Validated,
            exit_code: None,
            duration_ms: None,
        };
        runner.trace_state();
        Ok(runner)
    }

    pub fn task_id(&self) -> &str {
        &self.task_id
    }

    pub fn descriptor(&self) -> &Path {
        &self.descriptor
    }

    pub fn args(&self) -> &Arguments {
        &self.args
    }

    pub fn state(&self) -> RunnerState {
        self.state
    }

    /// Compile, execute and parse the task.
    ///
    /// # Returns
    ///
    /// * `Ok(ExecutionResult)` - Status `Success` with the parsed output
    /// * `Err(HarnessError)` - `CompileFailed`, `ProcessFailed` or
    ///   `ParseFailed`; an error event has been emitted
    pub fn run(mut self) -> Result<ExecutionResult> {
        self.run_stages()
    }

    /// Like [`Runner::run`], but folds failures into the result record.
    ///
    /// A payload that ran but could not be parsed keeps its exit code and
    /// duration in the record.
    pub fn execute(mut self) -> ExecutionResult {
        match self.run_stages() {
            Ok(result) => result,
            Err(e) => {
                let mut result = ExecutionResult::failure(&self.task_id, &e);
                result.exit_code = self.exit_code;
                result.duration_ms = self.duration_ms;
                result
            }
        }
    }

    fn run_stages(&mut self) -> Result<ExecutionResult> {
        let payload = self.compile()?;
        self.advance(RunnerState::Compiled);
        tracing::debug!(
            task = %self.task_id,
            style = %payload.style,
            shebang = %payload.shebang,
            bytes = payload.content.len(),
            "payload compiled"
        );

        let output = match self.harness.sandbox.run(&payload.content) {
            Ok(output) => output,
            Err(e) => return Err(self.fail(e)),
        };
        drop(payload);
        self.exit_code = output.exit_code;
        self.duration_ms = Some(output.duration.as_millis() as u64);
        self.advance(RunnerState::Executed);

        let stderr = output.stderr_lossy();
        let parsed = match self.harness.parser.parse(&output.stdout, &stderr) {
            Ok(parsed) => parsed,
            Err(e) => {
                tracing::debug!(task = %self.task_id, exit_code = ?output.exit_code, "unparseable output");
                return Err(self.fail(e));
            }
        };
        self.advance(RunnerState::Parsed);

        let mut result = ExecutionResult::success(&self.task_id, parsed, stderr);
        result.exit_code = self.exit_code;
        result.duration_ms = self.duration_ms;

        tracing::info!(
            task = %self.task_id,
            exit_code = ?self.exit_code,
            duration_ms = ?self.duration_ms,
            "task completed"
        );
        Ok(result)
    }

    fn compile(&mut self) -> Result<CompiledPayload> {
        let name = task_name(&self.descriptor);
        let compiler = &self.harness.compiler;

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            compiler.compile(&name, &self.descriptor, &self.args)
        }));

        let message = match outcome {
            Ok(Ok(payload)) => return Ok(payload),
            Ok(Err(e)) => format!("{:#}", e),
            Err(panic) => format!("compiler panicked: {}", panic_message(&*panic)),
        };

        self.state = RunnerState::Failed(RunStatus::CompileFailed);
        self.harness.emitter.error(
            Some(self.task_id.as_str()),
            format!(
                "Could not generate executable data for task {} ({}). Error: {}",
                name,
                self.descriptor.display(),
                message
            ),
        );
        tracing::warn!(task = %self.task_id, error = %message, "payload compilation failed");

        Err(HarnessError::CompileFailed {
            task: name,
            path: self.descriptor.clone(),
            message,
        })
    }

    /// Record a terminal failure and report it to the event sink.
    fn fail(&mut self, err: HarnessError) -> HarnessError {
        self.state = RunnerState::Failed(err.status());

        let stderr = err.stderr();
        let message = if stderr.is_empty() || err.to_string().contains(stderr) {
            err.to_string()
        } else {
            format!("{} (stderr: {})", err, stderr.trim_end())
        };
        self.harness.emitter.error(Some(self.task_id.as_str()), message);
        tracing::warn!(task = %self.task_id, status = %err.status(), error = %err, "task failed");

        err
    }

    fn advance(&mut self, state: RunnerState) {
        self.state = state;
        self.trace_state();
    }

    fn trace_state(&self) {
        tracing::debug!(task = %self.task_id, state = ?self.state, "runner state");
    }
}

fn panic_message(panic: &(dyn Any + Send)) -> String {
    if let Some(s) = panic.downcast_ref::<&str>() {
        s.to_string()
    } else if let Some(s) = panic.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}
