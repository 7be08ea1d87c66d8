//! RAII guard for a staged payload file.

use crate::error::{HarnessError, Result};
use std::fs;
use std::io::Write;
use std::path::{Path, PathBuf};

/// Random characters in a staged file name.
const NAME_RANDOM_LEN: usize = 16;

/// An executable payload written to the staging directory.
///
/// When dropped, the file is deleted. If deletion fails, a warning is logged
/// but no panic occurs.
#[derive(Debug)]
pub struct StagedPayload {
    path: PathBuf,

    /// Whether the file has been removed manually.
    released: bool,
}

impl StagedPayload {
    /// Write `content` to a new, uniquely named file in `dir` and mark it
    /// executable.
    ///
    /// The name is `{prefix}{random}{suffix}` and the file is created with
    /// exclusive-create semantics, so concurrent runners sharing `dir` never
    /// collide. The write handle is closed before this returns.
    pub fn create(dir: &Path, prefix: &str, suffix: &str, content: &[u8]) -> Result<Self> {
        let mut file = tempfile::Builder::new()
            .prefix(prefix)
            .suffix(suffix)
            .rand_bytes(NAME_RANDOM_LEN)
            .tempfile_in(dir)
            .map_err(|e| staging_error(format!("failed to create payload file in '{}'", dir.display()), e))?;

        // On any error below the NamedTempFile removes itself on drop.
        file.write_all(content)
            .map_err(|e| staging_error("failed to write payload file".to_string(), e))?;
        file.as_file()
            .sync_all()
            .map_err(|e| staging_error("failed to sync payload file".to_string(), e))?;

        let path = file
            .into_temp_path()
            .keep()
            .map_err(|e| staging_error("failed to persist payload file".to_string(), e.error))?;

        let staged = Self {
            path,
            released: false,
        };
        staged.make_executable()?;

        tracing::debug!(path = %staged.path.display(), bytes = content.len(), "payload staged");
        Ok(staged)
    }

    /// Get the path to the staged file.
    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Remove the file now and report failure instead of only logging it.
    pub fn release(mut self) -> Result<()> {
        self.released = true;
        fs::remove_file(&self.path).map_err(|e| {
            HarnessError::ProcessFailed {
                reason: format!("failed to remove payload '{}': {}", self.path.display(), e),
                stderr: String::new(),
            }
        })
    }

    #[cfg(unix)]
    fn make_executable(&self) -> Result<()> {
        use std::os::unix::fs::PermissionsExt;

        fs::set_permissions(&self.path, fs::Permissions::from_mode(0o700)).map_err(|e| {
            staging_error(
                format!("failed to mark '{}' executable", self.path.display()),
                e,
            )
        })
    }

    #[cfg(not(unix))]
    fn make_executable(&self) -> Result<()> {
        Ok(())
    }
}

impl Drop for StagedPayload {
    fn drop(&mut self) {
        if !self.released
            && let Err(e) = fs::remove_file(&self.path)
        {
            tracing::warn!(
                path = %self.path.display(),
                error = %e,
                "failed to remove staged payload"
            );
        }
    }
}

fn staging_error(context: String, e: std::io::Error) -> HarnessError {
    let reason = format!("{}: {}", context, e);
    HarnessError::ProcessFailed {
        stderr: reason.clone(),
        reason,
    }
}
