//! Process-boundary factory for runners.
//!
//! A [`Harness`] bundles everything a run needs (identity, task root,
//! compiler, sandbox, event sink) and is built once per process. It is
//! `Send + Sync`, so concurrent callers can share one harness and create an
//! independent [`Runner`] per invocation.

use crate::args::{ArgumentValidator, Arguments};
use crate::compiler::PayloadCompiler;
use crate::config::HarnessConfig;
use crate::error::Result;
use crate::events::{Emitter, EventSink};
use crate::identity::Identity;
use crate::result::{ExecutionResult, ResultParser};
use crate::runner::Runner;
use crate::sandbox::ExecutionSandbox;
use crate::task::TaskResolver;
use std::path::PathBuf;
use std::sync::Arc;

/// Shared collaborators for every run in this process.
#[derive(Clone)]
pub struct Harness {
    pub(crate) resolver: TaskResolver,
    pub(crate) validator: ArgumentValidator,
    pub(crate) compiler: Arc<dyn PayloadCompiler>,
    pub(crate) sandbox: ExecutionSandbox,
    pub(crate) parser: ResultParser,
    pub(crate) emitter: Emitter,
}

impl Harness {
    /// Build a harness from explicit parts.
    pub fn new(
        identity: Identity,
        resolver: TaskResolver,
        sandbox: ExecutionSandbox,
        compiler: Arc<dyn PayloadCompiler>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self {
            resolver,
            validator: ArgumentValidator,
            compiler,
            sandbox,
            parser: ResultParser,
            emitter: Emitter::new(identity, sink),
        }
    }

    /// Build a harness from configuration, deriving identity, task root and
    /// sandbox settings from it.
    pub fn from_config(
        config: &HarnessConfig,
        compiler: Arc<dyn PayloadCompiler>,
        sink: Arc<dyn EventSink>,
    ) -> Self {
        Self::new(
            Identity::from_config(config),
            TaskResolver::new(&config.task_root),
            ExecutionSandbox::from_config(config),
            compiler,
            sink,
        )
    }

    pub fn identity(&self) -> &Identity {
        self.emitter.identity()
    }

    pub fn resolver(&self) -> &TaskResolver {
        &self.resolver
    }

    pub fn sandbox(&self) -> &ExecutionSandbox {
        &self.sandbox
    }

    /// Resolve `task_id` to its descriptor without running it.
    pub fn resolve(&self, task_id: &str) -> Result<PathBuf> {
        self.resolver.resolve(task_id, &self.emitter)
    }

    /// Create a runner for one invocation of `task_id`.
    ///
    /// Fails with `TaskNotFound` or `InvalidInput` before anything is
    /// compiled or staged.
    pub fn runner(&self, task_id: &str, args: Arguments) -> Result<Runner<'_>> {
        Runner::new(self, task_id, args)
    }

    /// Run `task_id` once and flatten the outcome into a result record.
    pub fn run(&self, task_id: &str, args: Arguments) -> ExecutionResult {
        match self.runner(task_id, args) {
            Ok(runner) => runner.execute(),
            Err(e) => ExecutionResult::failure(task_id, &e),
        }
    }
}

impl std::fmt::Debug for Harness {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.debug_struct("Harness")
            .field("resolver", &self.resolver)
            .field("sandbox", &self.sandbox)
            .field("emitter", &self.emitter)
            .finish_non_exhaustive()
    }
}
