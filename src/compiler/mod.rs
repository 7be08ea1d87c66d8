//! Payload compilation.
//!
//! A compiler turns a task descriptor and its argument mapping into a
//! self-contained executable. The harness treats it as an opaque, possibly
//! slow, possibly failing black box: it never branches on the payload's
//! style or interpreter line, it only carries them along as provenance.

mod script;

pub use script::{ARGS_MARKER, ScriptCompiler};

use crate::args::Arguments;
use serde::{Deserialize, Serialize};
use std::path::Path;

/// How a compiler packaged the task.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum PayloadStyle {
    /// Arguments were embedded into the script as JSON.
    JsonArgs,
    /// The descriptor runs as-is; it takes no embedded arguments.
    Standalone,
    /// Non-text executable passed through untouched.
    Binary,
}

impl std::fmt::Display for PayloadStyle {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            PayloadStyle::JsonArgs => write!(f, "json_args"),
            PayloadStyle::Standalone => write!(f, "standalone"),
            PayloadStyle::Binary => write!(f, "binary"),
        }
    }
}

/// Executable produced for one run.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CompiledPayload {
    pub content: Vec<u8>,
    pub style: PayloadStyle,
    /// Interpreter line (`#!/bin/sh`), empty when the payload has none.
    pub shebang: String,
}

/// Turns a task into an executable payload.
pub trait PayloadCompiler: Send + Sync {
    fn compile(
        &self,
        task_name: &str,
        descriptor: &Path,
        args: &Arguments,
    ) -> anyhow::Result<CompiledPayload>;
}
