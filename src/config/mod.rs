//! Configuration model for hostexec.
//!
//! This module defines the `HarnessConfig` struct loaded from a YAML file
//! (`/etc/hostexec/config.yaml` or `$HOSTEXEC_CONFIG`). It supports
//! forward-compatible YAML parsing (unknown fields are ignored), defaults for
//! every field, and validation of config values.

mod model;
mod operations;


// Re-export public API
pub use model::HarnessConfig;
pub use operations::{CONFIG_ENV_VAR, DEFAULT_CONFIG_PATH};
