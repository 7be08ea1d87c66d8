//! HarnessConfig struct definition and default implementation.

use serde::{Deserialize, Serialize};
use std::path::PathBuf;
use std::time::Duration;

/// Configuration for the execution harness.
///
/// Unknown fields in the YAML are ignored for forward compatibility.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct HarnessConfig {
    // =========================================================================
    // Filesystem layout
    // =========================================================================
    /// Directory task descriptors are looked up under.
    #[serde(default = "default_task_root")]
    pub task_root: PathBuf,

    /// Writable directory payloads are staged in before execution.
    #[serde(default = "default_staging_dir")]
    pub staging_dir: PathBuf,

    /// File name prefix for staged payloads.
    #[serde(default = "default_temp_prefix")]
    pub temp_prefix: String,

    /// File name suffix for staged payloads.
    #[serde(default = "default_temp_suffix")]
    pub temp_suffix: String,

    // =========================================================================
    // Execution
    // =========================================================================
    /// Seconds a payload may run before it is killed (0 disables the deadline).
    #[serde(default = "default_timeout_seconds")]
    pub timeout_seconds: u64,

    // =========================================================================
    // Identity and events
    // =========================================================================
    /// Publisher id stamped on every emitted event.
    #[serde(default = "default_publisher_id")]
    pub publisher_id: String,

    /// Node id stamped on every emitted event (host name when unset).
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub node_id: Option<String>,

    /// Unix socket the cluster agent's event bus listens on.
    #[serde(default = "default_log_socket_path")]
    pub log_socket_path: PathBuf,

    /// Optional NDJSON file events are appended to.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub event_log: Option<PathBuf>,
}

impl HarnessConfig {
    /// The payload deadline, or `None` when disabled.
    pub fn timeout(&self) -> Option<Duration> {
        (self.timeout_seconds > 0).then(|| Duration::from_secs(self.timeout_seconds))
    }
}

impl Default for HarnessConfig {
    fn default() -> Self {
        Self {
            task_root: default_task_root(),
            staging_dir: default_staging_dir(),
            temp_prefix: default_temp_prefix(),
            temp_suffix: default_temp_suffix(),
            timeout_seconds: default_timeout_seconds(),
            publisher_id: default_publisher_id(),
            node_id: None,
            log_socket_path: default_log_socket_path(),
            event_log: None,
        }
    }
}

// Default value functions for serde
fn default_task_root() -> PathBuf {
    PathBuf::from("/usr/share/hostexec/tasks")
}
fn default_staging_dir() -> PathBuf {
    PathBuf::from("/tmp")
}
fn default_temp_prefix() -> String {
    "hostexec_".to_string()
}
fn default_temp_suffix() -> String {
    "exec".to_string()
}
fn default_timeout_seconds() -> u64 {
    300
}
fn default_publisher_id() -> String {
    "hostexec".to_string()
}
fn default_log_socket_path() -> PathBuf {
    PathBuf::from("/var/run/hostexec/message.sock")
}
