//! Exit code constants for the hostexec CLI.
//!
//! Every run status has its own code so callers (shell wrappers, the cluster
//! agent) can branch on the outcome without parsing the JSON report:
//! - 0: Success
//! - 1: Usage or configuration error
//! - 2: Task not found
//! - 3: Invalid input (empty argument mapping)
//! - 4: Payload compilation failed
//! - 5: Process failed (staging, spawn, or deadline)
//! - 6: Output could not be parsed

/// Successful execution.
pub const SUCCESS: i32 = 0;

/// Bad CLI arguments or an invalid configuration file.
pub const USAGE_ERROR: i32 = 1;

/// The task descriptor does not exist under the task root.
pub const TASK_NOT_FOUND: i32 = 2;

/// The argument mapping was empty.
pub const INVALID_INPUT: i32 = 3;

/// The payload compiler rejected the task.
pub const COMPILE_FAILED: i32 = 4;

/// The payload could not be staged, spawned, or finished past its deadline.
pub const PROCESS_FAILED: i32 = 5;

/// The payload ran but its stdout was not a single JSON object.
pub const PARSE_FAILED: i32 = 6;
