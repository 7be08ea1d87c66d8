//! Argument validation and harness-mandated defaults.
//!
//! Callers hand the harness an argument mapping for the task. The mapping
//! must not be empty, and before it reaches the compiler the harness adds
//! the list of filesystem types that the payload must exclude from its
//! privilege-escalation fast path. That list is not caller-overridable: the
//! quirks it papers over belong to the host, not to the task.

use crate::error::{HarnessError, Result};
use crate::events::Emitter;
use serde_json::{Map, Value};

/// Argument mapping passed to a task.
pub type Arguments = Map<String, Value>;

/// Key the harness always injects into the argument mapping.
pub const EXCLUDED_FILESYSTEMS_KEY: &str = "_escalation_excluded_filesystems";

/// Filesystem types excluded from the privileged fast path.
pub const EXCLUDED_FILESYSTEMS: [&str; 4] = ["nfs", "vboxsf", "fuse", "ramfs"];

/// Checks argument mappings and applies the harness defaults.
#[derive(Debug, Clone, Copy, Default)]
pub struct ArgumentValidator;

impl ArgumentValidator {
    /// Validate `args` for `task` and inject the mandated default key.
    ///
    /// # Returns
    ///
    /// * `Ok(Arguments)` - The caller's mapping plus [`EXCLUDED_FILESYSTEMS_KEY`]
    /// * `Err(HarnessError::InvalidInput)` - The mapping was empty; an
    ///   error-priority event has been emitted
    pub fn validate(&self, mut args: Arguments, task: &str, emitter: &Emitter) -> Result<Arguments> {
        if args.is_empty() {
            emitter.error(Some(task), "Empty argument dictionary");
            return Err(HarnessError::InvalidInput(
                "argument mapping must not be empty".to_string(),
            ));
        }

        if args.contains_key(EXCLUDED_FILESYSTEMS_KEY) {
            tracing::debug!(task, key = EXCLUDED_FILESYSTEMS_KEY, "overriding caller-supplied value");
        }
        args.insert(EXCLUDED_FILESYSTEMS_KEY.to_string(), excluded_filesystems());

        Ok(args)
    }
}

/// The mandated filesystem list as a JSON array.
pub fn excluded_filesystems() -> Value {
    Value::Array(
        EXCLUDED_FILESYSTEMS
            .iter()
            .map(|fs| Value::String((*fs).to_string()))
            .collect(),
    )
}

/// Parse a `KEY=VALUE` assignment into a JSON value.
///
/// The value is read as JSON when it parses (`count=3`, `force=true`,
/// `paths=["/a","/b"]`) and as a plain string otherwise (`path=/data`).
pub fn parse_assignment(assignment: &str) -> Result<(String, Value)> {
    let (key, raw) = assignment.split_once('=').ok_or_else(|| {
        HarnessError::Config(format!(
            "invalid argument '{}': expected KEY=VALUE",
            assignment
        ))
    })?;

    let key = key.trim();
    if key.is_empty() {
        return Err(HarnessError::Config(format!(
            "invalid argument '{}': key must not be empty",
            assignment
        )));
    }

    let value = serde_json::from_str(raw).unwrap_or_else(|_| Value::String(raw.to_string()));
    Ok((key.to_string(), value))
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::events::{MemorySink, Priority};
    use crate::identity::Identity;
    use serde_json::json;
    use std::sync::Arc;

    fn emitter() -> (Emitter, Arc<MemorySink>) {
        let sink = Arc::new(MemorySink::new());
        let emitter = Emitter::new(Identity::new("pub", "node", "/run/none.sock"), sink.clone());
        (emitter, sink)
    }

    fn args(value: Value) -> Arguments {
        value.as_object().cloned().unwrap()
    }

    #[test]
    fn test_empty_mapping_is_rejected() {
        let (emitter, sink) = emitter();

        let err = ArgumentValidator
            .validate(Arguments::new(), "check_disk", &emitter)
            .unwrap_err();

        assert!(matches!(err, HarnessError::InvalidInput(_)));
        let events = sink.events();
        assert_eq!(events.len(), 1);
        assert_eq!(events[0].priority, Priority::Error);
        assert_eq!(events[0].message(), "Empty argument dictionary");
    }

    #[test]
    fn test_default_key_is_injected() {
        let (emitter, sink) = emitter();

        let validated = ArgumentValidator
            .validate(args(json!({"path": "/data"})), "check_disk", &emitter)
            .unwrap();

        assert_eq!(validated["path"], "/data");
        assert_eq!(
            validated[EXCLUDED_FILESYSTEMS_KEY],
            json!(["nfs", "vboxsf", "fuse", "ramfs"])
        );
        assert_eq!(validated.len(), 2);
        assert!(sink.events().is_empty());
    }

    #[test]
    fn test_caller_cannot_override_default_key() {
        let (emitter, _sink) = emitter();

        for supplied in [json!([]), json!(["ext4"]), json!(null), json!("nfs")] {
            let mut input = Arguments::new();
            input.insert(EXCLUDED_FILESYSTEMS_KEY.to_string(), supplied);

            let validated = ArgumentValidator.validate(input, "t", &emitter).unwrap();
            assert_eq!(validated[EXCLUDED_FILESYSTEMS_KEY], excluded_filesystems());
        }
    }

    #[test]
    fn test_parse_assignment_reads_json_values() {
        assert_eq!(parse_assignment("count=3").unwrap(), ("count".to_string(), json!(3)));
        assert_eq!(parse_assignment("force=true").unwrap().1, json!(true));
        assert_eq!(parse_assignment("paths=[\"/a\"]").unwrap().1, json!(["/a"]));
    }

    #[test]
    fn test_parse_assignment_falls_back_to_string() {
        assert_eq!(parse_assignment("path=/data").unwrap().1, json!("/data"));
        assert_eq!(parse_assignment("expr=a=b").unwrap().1, json!("a=b"));
        assert_eq!(parse_assignment("empty=").unwrap().1, json!(""));
    }

    #[test]
    fn test_parse_assignment_rejects_malformed_input() {
        assert!(parse_assignment("no-equals").is_err());
        assert!(parse_assignment("=value").is_err());
    }
}
