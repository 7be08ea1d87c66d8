//! hostexec: single-host task execution harness.
//!
//! A task descriptor on local disk is compiled together with a JSON argument
//! mapping into a self-contained executable, staged in a private temporary
//! file, run as a child process, and its stdout parsed as one JSON object.
//! Every failure is classified into a terminal [`RunStatus`] and reported to
//! an event sink.
//!
//! ```no_run
//! use hostexec::{Harness, HarnessConfig, ScriptCompiler, TracingSink};
//! use serde_json::json;
//! use std::sync::Arc;
//!
//! let config = HarnessConfig::default();
//! let harness = Harness::from_config(&config, Arc::new(ScriptCompiler), Arc::new(TracingSink));
//!
//! let args = json!({"path": "/data"}).as_object().cloned().unwrap_or_default();
//! let result = harness.run("check_disk", args);
//! println!("{}", result.status);
//! ```

pub mod args;
pub mod compiler;
pub mod config;
pub mod error;
pub mod events;
pub mod exit_codes;
pub mod harness;
pub mod identity;
pub mod result;
pub mod runner;
pub mod sandbox;
pub mod task;

#[cfg(test)]
mod test_support;

pub use args::Arguments;
pub use compiler::{CompiledPayload, PayloadCompiler, PayloadStyle, ScriptCompiler};
pub use config::HarnessConfig;
pub use error::{HarnessError, Result};
pub use events::{EventSink, FanoutSink, NdjsonSink, SocketSink, TracingSink};
pub use harness::Harness;
pub use identity::Identity;
pub use result::{ExecutionResult, RunStatus};
pub use runner::{Runner, RunnerState};
