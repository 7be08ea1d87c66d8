use crate::args::Arguments;
use crate::compiler::{CompiledPayload, PayloadCompiler, PayloadStyle, ScriptCompiler};
use crate::events::MemorySink;
use crate::harness::Harness;
use crate::identity::Identity;
use crate::sandbox::ExecutionSandbox;
use crate::task::TaskResolver;
use serde_json::Value;
use std::path::{Path, PathBuf};
use std::sync::Arc;
use std::time::Duration;
use tempfile::TempDir;

/// A task root and a staging directory inside one temporary directory.
pub(crate) struct Workspace {
    _temp_dir: TempDir,
    pub(crate) task_root: PathBuf,
    pub(crate) staging_dir: PathBuf,
}

impl Workspace {
    pub(crate) fn new() -> Self {
        let temp_dir = TempDir::new().unwrap();
        let task_root = temp_dir.path().join("tasks");
        let staging_dir = temp_dir.path().join("staging");
        std::fs::create_dir_all(&task_root).unwrap();
        std::fs::create_dir_all(&staging_dir).unwrap();
        Self {
            _temp_dir: temp_dir,
            task_root,
            staging_dir,
        }
    }

    /// Write a task descriptor under the task root.
    pub(crate) fn write_task(&self, task_id: &str, content: &str) -> PathBuf {
        let path = self.task_root.join(task_id);
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent).unwrap();
        }
        std::fs::write(&path, content).unwrap();
        path
    }

    /// Names of the files currently in the staging directory.
    pub(crate) fn staged_files(&self) -> Vec<String> {
        let mut names: Vec<String> = std::fs::read_dir(&self.staging_dir)
            .unwrap()
            .map(|entry| entry.unwrap().file_name().to_string_lossy().to_string())
            .collect();
        names.sort();
        names
    }

    pub(crate) fn harness(&self, compiler: Arc<dyn PayloadCompiler>) -> (Harness, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let harness = Harness::new(
            Identity::new("test-publisher", "test-node", "/run/test.sock"),
            TaskResolver::new(&self.task_root),
            ExecutionSandbox::new(&self.staging_dir).with_timeout(Some(Duration::from_secs(20))),
            compiler,
            sink.clone(),
        );
        (harness, sink)
    }

    pub(crate) fn script_harness(&self) -> (Harness, Arc<MemorySink>) {
        self.harness(Arc::new(ScriptCompiler))
    }
}

/// Build an argument mapping from a JSON object literal.
pub(crate) fn args(value: Value) -> Arguments {
    value.as_object().cloned().unwrap_or_default()
}

/// Returns the same payload for every task.
pub(crate) struct StaticCompiler(pub(crate) &'static str);

impl PayloadCompiler for StaticCompiler {
    fn compile(&self, _: &str, _: &Path, _: &Arguments) -> anyhow::Result<CompiledPayload> {
        Ok(CompiledPayload {
            content: self.0.as_bytes().to_vec(),
            style: PayloadStyle::Standalone,
            shebang: String::new(),
        })
    }
}

/// Fails every compilation with the given message.
pub(crate) struct FailingCompiler(pub(crate) &'static str);

impl PayloadCompiler for FailingCompiler {
    fn compile(&self, _: &str, _: &Path, _: &Arguments) -> anyhow::Result<CompiledPayload> {
        anyhow::bail!("{}", self.0)
    }
}

/// Panics on every compilation.
pub(crate) struct PanickingCompiler;

impl PayloadCompiler for PanickingCompiler {
    fn compile(&self, _: &str, _: &Path, _: &Arguments) -> anyhow::Result<CompiledPayload> {
        panic!("compiler blew up")
    }
}
