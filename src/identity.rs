//! Process identity attached to every event a runner emits.
//!
//! The harness never reaches for ambient globals: an [`Identity`] is built
//! once at the process boundary (usually from [`HarnessConfig`]) and passed
//! down explicitly.

use crate::config::HarnessConfig;
use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

/// Publisher id, node id, and event-socket address of this agent process.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct Identity {
    pub publisher_id: String,
    pub node_id: String,
    pub socket_path: PathBuf,
}

impl Identity {
    pub fn new(
        publisher_id: impl Into<String>,
        node_id: impl Into<String>,
        socket_path: impl Into<PathBuf>,
    ) -> Self {
        Self {
            publisher_id: publisher_id.into(),
            node_id: node_id.into(),
            socket_path: socket_path.into(),
        }
    }

    /// Build the identity from configuration, filling the node id from the
    /// host name when the config leaves it unset.
    pub fn from_config(config: &HarnessConfig) -> Self {
        let node_id = config.node_id.clone().unwrap_or_else(local_node_id);
        Self::new(
            config.publisher_id.clone(),
            node_id,
            config.log_socket_path.clone(),
        )
    }

    pub fn socket_path(&self) -> &Path {
        &self.socket_path
    }
}

/// Host name of this machine, or `unknown` when it cannot be read.
fn local_node_id() -> String {
    hostname::get()
        .map(|h| h.to_string_lossy().to_string())
        .unwrap_or_else(|_| "unknown".to_string())
}
