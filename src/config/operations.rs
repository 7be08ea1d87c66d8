//! Config loading, validation, and utility operations.

use super::model::HarnessConfig;
use crate::error::{HarnessError, Result};
use std::path::{Path, PathBuf};

/// Environment variable that points at an alternative config file.
pub const CONFIG_ENV_VAR: &str = "HOSTEXEC_CONFIG";

/// Config file read when neither a flag nor the environment names one.
pub const DEFAULT_CONFIG_PATH: &str = "/etc/hostexec/config.yaml";

impl HarnessConfig {
    /// Load config from a YAML file.
    ///
    /// Unknown fields in the YAML are silently ignored for forward compatibility.
    ///
    /// # Returns
    ///
    /// * `Ok(HarnessConfig)` - Successfully loaded and validated config
    /// * `Err(HarnessError::Config)` - Read error, parse error, or validation failure
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        let content = std::fs::read_to_string(path).map_err(|e| {
            HarnessError::Config(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Resolve and load the effective config file.
    ///
    /// An explicit path must exist. Otherwise `$HOSTEXEC_CONFIG` is consulted
    /// (and must exist when set), then [`DEFAULT_CONFIG_PATH`]; when no file
    /// is found the defaults are used.
    pub fn load_or_default(explicit: Option<&Path>) -> Result<Self> {
        if let Some(path) = explicit {
            return Self::load(path);
        }

        if let Some(path) = std::env::var_os(CONFIG_ENV_VAR) {
            return Self::load(PathBuf::from(path));
        }

        let default_path = Path::new(DEFAULT_CONFIG_PATH);
        if default_path.exists() {
            return Self::load(default_path);
        }

        tracing::debug!("no config file found, using defaults");
        Ok(Self::default())
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: HarnessConfig = serde_yaml::from_str(yaml)
            .map_err(|e| HarnessError::Config(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| HarnessError::Config(format!("failed to serialize config to YAML: {}", e)))
    }

    /// Validate config values and return error on invalid values.
    ///
    /// Validation rules:
    /// - `publisher_id` must be non-empty
    /// - `task_root` and `staging_dir` must be absolute
    /// - `temp_prefix` and `temp_suffix` must not contain path separators
    pub fn validate(&self) -> Result<()> {
        if self.publisher_id.trim().is_empty() {
            return Err(HarnessError::Config(
                "config validation failed: publisher_id must not be empty".to_string(),
            ));
        }

        for (key, path) in [("task_root", &self.task_root), ("staging_dir", &self.staging_dir)] {
            if !path.is_absolute() {
                return Err(HarnessError::Config(format!(
                    "config validation failed: {} must be an absolute path, got '{}'",
                    key,
                    path.display()
                )));
            }
        }

        for (key, value) in [("temp_prefix", &self.temp_prefix), ("temp_suffix", &self.temp_suffix)] {
            if value.contains('/') || value.contains('\\') {
                return Err(HarnessError::Config(format!(
                    "config validation failed: {} must not contain path separators, got '{}'",
                    key, value
                )));
            }
        }

        Ok(())
    }
}
