//! Maps task identifiers to descriptor paths under the task root.

use crate::error::{HarnessError, Result};
use crate::events::Emitter;
use std::path::{Component, Path, PathBuf};

/// Resolves task identifiers against a fixed root directory.
#[derive(Debug, Clone)]
pub struct TaskResolver {
    root: PathBuf,
}

impl TaskResolver {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }

    /// Resolve `task_id` to the path of an existing descriptor file.
    ///
    /// Identifiers that are empty, absolute, or step outside the root with
    /// `..` cannot name a file under the root and resolve to nothing.
    ///
    /// # Returns
    ///
    /// * `Ok(PathBuf)` - Absolute path of the descriptor
    /// * `Err(HarnessError::TaskNotFound)` - No such descriptor; a
    ///   debug-priority event has been emitted
    pub fn resolve(&self, task_id: &str, emitter: &Emitter) -> Result<PathBuf> {
        let path = self.root.join(task_id);

        if is_contained(task_id) && path.is_file() {
            return Ok(path);
        }

        tracing::debug!(task = task_id, path = %path.display(), "task descriptor missing");
        emitter.debug(
            Some(task_id),
            format!("Task path: {} does not exist", path.display()),
        );
        Err(HarnessError::TaskNotFound { path })
    }
}

/// The name a compiler knows a task by: the descriptor's file stem.
///
/// `system/check_disk.sh` → `check_disk`
pub fn task_name(path: &Path) -> String {
    path.file_stem()
        .map(|stem| stem.to_string_lossy().to_string())
        .unwrap_or_default()
}

fn is_contained(task_id: &str) -> bool {
    let relative = Path::new(task_id);
    relative.components().next().is_some()
        && relative
            .components()
            .all(|c| matches!(c, Component::Normal(_) | Component::CurDir))
}
