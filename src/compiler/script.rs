//! Script compiler for descriptors that are themselves executables.
//!
//! A descriptor is an executable script. If it contains [`ARGS_MARKER`],
//! each occurrence is replaced with the JSON encoding of the argument
//! mapping, so the script can read its inputs without stdin or argv:
//!
//! ```text
//! #!/usr/bin/env python3
//! import json
//! args = json.loads('''<<HARNESS_JSON_ARGS>>''')
//! print(json.dumps({"path": args["path"]}))
//! ```
//!
//! Descriptors without the marker run unchanged, and descriptors that are
//! not UTF-8 are treated as binaries.

use super::{CompiledPayload, PayloadCompiler, PayloadStyle};
use crate::args::Arguments;
use anyhow::{Context, bail};
use std::path::Path;

/// Placeholder replaced with the JSON-encoded argument mapping.
pub const ARGS_MARKER: &str = "<<HARNESS_JSON_ARGS>>";

/// Compiles script descriptors by embedding their arguments.
#[derive(Debug, Clone, Copy, Default)]
pub struct ScriptCompiler;

impl PayloadCompiler for ScriptCompiler {
    fn compile(
        &self,
        task_name: &str,
        descriptor: &Path,
        args: &Arguments,
    ) -> anyhow::Result<CompiledPayload> {
        let raw = std::fs::read(descriptor)
            .with_context(|| format!("failed to read descriptor '{}'", descriptor.display()))?;

        if raw.is_empty() {
            bail!("descriptor '{}' is empty", descriptor.display());
        }

        let shebang = shebang_line(&raw);

        let source = match String::from_utf8(raw) {
            Ok(source) => source,
            Err(e) => {
                tracing::debug!(task = task_name, "descriptor is not UTF-8, passing through as binary");
                return Ok(CompiledPayload {
                    content: e.into_bytes(),
                    style: PayloadStyle::Binary,
                    shebang,
                });
            }
        };

        if !source.contains(ARGS_MARKER) {
            return Ok(CompiledPayload {
                content: source.into_bytes(),
                style: PayloadStyle::Standalone,
                shebang,
            });
        }

        let encoded = serde_json::to_string(args)
            .with_context(|| format!("failed to encode arguments for task '{}'", task_name))?;

        Ok(CompiledPayload {
            content: source.replace(ARGS_MARKER, &encoded).into_bytes(),
            style: PayloadStyle::JsonArgs,
            shebang,
        })
    }
}

/// First line of the content when it is an interpreter directive.
fn shebang_line(content: &[u8]) -> String {
    if !content.starts_with(b"#!") {
        return String::new();
    }
    let end = content
        .iter()
        .position(|&b| b == b'\n')
        .unwrap_or(content.len());
    String::from_utf8_lossy(&content[..end]).trim_end().to_string()
}
