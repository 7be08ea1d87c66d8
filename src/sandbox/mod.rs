//! Payload execution under a subprocess boundary.
//!
//! Each run follows the same discipline:
//!
//! 1. Stage the payload as a uniquely named file in the staging directory,
//!    closing the write handle before anything executes it
//! 2. Mark it executable (`0o700`)
//! 3. Spawn it directly, with no shell, no arguments and no stdin, capturing
//!    stdout and stderr as separate byte streams
//! 4. Remove the staged file, whatever happened in steps 1-3
//!
//! Step 4 is owned by [`StagedPayload`]'s `Drop`, so early returns and
//! panics release the file too.
//!
//! A non-zero exit is not an error at this layer: whether the output means
//! anything is for the result parser to decide.

mod process;
mod staged;

pub use process::ProcessOutput;
pub use staged::StagedPayload;

use crate::config::HarnessConfig;
use crate::error::Result;
use std::path::{Path, PathBuf};
use std::time::Duration;

/// Stages and runs payloads in a fixed directory.
#[derive(Debug, Clone)]
pub struct ExecutionSandbox {
    staging_dir: PathBuf,
    prefix: String,
    suffix: String,
    timeout: Option<Duration>,
}

impl ExecutionSandbox {
    pub fn new(staging_dir: impl Into<PathBuf>) -> Self {
        Self {
            staging_dir: staging_dir.into(),
            prefix: "hostexec_".to_string(),
            suffix: "exec".to_string(),
            timeout: None,
        }
    }

    pub fn from_config(config: &HarnessConfig) -> Self {
        Self::new(&config.staging_dir)
            .with_name(&config.temp_prefix, &config.temp_suffix)
            .with_timeout(config.timeout())
    }

    /// Set the staged file name prefix and suffix.
    pub fn with_name(mut self, prefix: &str, suffix: &str) -> Self {
        self.prefix = prefix.to_string();
        self.suffix = suffix.to_string();
        self
    }

    /// Kill payloads that run longer than `timeout` (`None` waits forever).
    pub fn with_timeout(mut self, timeout: Option<Duration>) -> Self {
        self.timeout = timeout;
        self
    }

    pub fn staging_dir(&self) -> &Path {
        &self.staging_dir
    }

    pub fn timeout(&self) -> Option<Duration> {
        self.timeout
    }

    /// Stage `content`, run it to completion, and remove it.
    ///
    /// # Returns
    ///
    /// * `Ok(ProcessOutput)` - The payload ran (any exit code)
    /// * `Err(HarnessError::ProcessFailed)` - Staging or spawning failed, or
    ///   the payload outlived the deadline
    pub fn run(&self, content: &[u8]) -> Result<ProcessOutput> {
        let staged = StagedPayload::create(&self.staging_dir, &self.prefix, &self.suffix, content)?;

        let output = process::run_executable(staged.path(), self.timeout);

        if let Err(e) = staged.release() {
            tracing::warn!(error = %e, "staged payload cleanup failed");
        }

        if let Ok(output) = &output {
            tracing::debug!(
                exit_code = ?output.exit_code,
                duration_ms = output.duration.as_millis() as u64,
                stdout_bytes = output.stdout.len(),
                stderr_bytes = output.stderr.len(),
                "payload finished"
            );
        }

        output
    }
}
