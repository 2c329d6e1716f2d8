//! Coordination configuration for muster.
//!
//! This struct represents the contents of `{data_dir}/config.yaml`. Unknown
//! fields are preserved in the `extra` map for forward compatibility.
//!
//! # File Format
//!
//! ```yaml
//! match_threshold: 0.6
//! team_size_min: 2
//! team_size_max: 4
//! exchange_rounds: 2
//! base_unit_minutes: 10.0
//! executor_timeout_seconds: 600
//! ```

use crate::error::{MusterError, Result};
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::Path;

/// Configuration for the coordination loop.
#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(default)]
pub struct CoordinationConfig {
    /// Minimum fitness score an agent needs to be matched to a task.
    #[serde(default = "default_match_threshold")]
    pub match_threshold: f64,

    /// Minimum team size once candidates clear the threshold.
    #[serde(default = "default_team_size_min")]
    pub team_size_min: usize,

    /// Maximum team size.
    #[serde(default = "default_team_size_max")]
    pub team_size_max: usize,

    /// Number of capability-sharing rounds in the exchange phase.
    #[serde(default = "default_exchange_rounds")]
    pub exchange_rounds: u32,

    /// Minutes of work one requirement represents at speed 1.0, used for
    /// completion time estimates.
    #[serde(default = "default_base_unit_minutes")]
    pub base_unit_minutes: f64,

    /// Timeout applied to subprocess executors. A timed-out execution is a
    /// failed task, not an error.
    #[serde(default = "default_executor_timeout_seconds")]
    pub executor_timeout_seconds: u64,

    /// Unknown fields preserved for forward compatibility.
    #[serde(flatten)]
    pub extra: BTreeMap<String, serde_yaml::Value>,
}

fn default_match_threshold() -> f64 {
    0.6
}

fn default_team_size_min() -> usize {
    2
}

fn default_team_size_max() -> usize {
    4
}

fn default_exchange_rounds() -> u32 {
    2
}

fn default_base_unit_minutes() -> f64 {
    10.0
}

fn default_executor_timeout_seconds() -> u64 {
    600
}

impl Default for CoordinationConfig {
    fn default() -> Self {
        Self {
            match_threshold: default_match_threshold(),
            team_size_min: default_team_size_min(),
            team_size_max: default_team_size_max(),
            exchange_rounds: default_exchange_rounds(),
            base_unit_minutes: default_base_unit_minutes(),
            executor_timeout_seconds: default_executor_timeout_seconds(),
            extra: BTreeMap::new(),
        }
    }
}

impl CoordinationConfig {
    /// Load config from a YAML file.
    ///
    /// Returns the default config if the file does not exist.
    pub fn load<P: AsRef<Path>>(path: P) -> Result<Self> {
        let path = path.as_ref();

        if !path.exists() {
            return Ok(Self::default());
        }

        let content = std::fs::read_to_string(path).map_err(|e| {
            MusterError::UserError(format!(
                "failed to read config file '{}': {}",
                path.display(),
                e
            ))
        })?;

        Self::from_yaml(&content)
    }

    /// Parse config from a YAML string.
    pub fn from_yaml(yaml: &str) -> Result<Self> {
        let config: CoordinationConfig = serde_yaml::from_str(yaml)
            .map_err(|e| MusterError::UserError(format!("failed to parse config YAML: {}", e)))?;

        config.validate()?;
        Ok(config)
    }

    /// Serialize config to a YAML string.
    pub fn to_yaml(&self) -> Result<String> {
        serde_yaml::to_string(self)
            .map_err(|e| MusterError::UserError(format!("failed to serialize config: {}", e)))
    }

    /// Validate config values.
    ///
    /// Validation rules:
    /// - `match_threshold` must be within [0, 1]
    /// - `team_size_min` must be at least 1 and not exceed `team_size_max`
    /// - `exchange_rounds` must be positive
    /// - `base_unit_minutes` must be positive
    /// - `executor_timeout_seconds` must be positive
    pub fn validate(&self) -> Result<()> {
        if !(0.0..=1.0).contains(&self.match_threshold) {
            return Err(MusterError::UserError(
                "config validation failed: match_threshold must be within [0, 1]".to_string(),
            ));
        }

        if self.team_size_min == 0 {
            return Err(MusterError::UserError(
                "config validation failed: team_size_min must be at least 1".to_string(),
            ));
        }

        if self.team_size_min > self.team_size_max {
            return Err(MusterError::UserError(format!(
                "config validation failed: team_size_min ({}) exceeds team_size_max ({})",
                self.team_size_min, self.team_size_max
            )));
        }

        if self.exchange_rounds == 0 {
            return Err(MusterError::UserError(
                "config validation failed: exchange_rounds must be greater than 0".to_string(),
            ));
        }

        if self.base_unit_minutes <= 0.0 {
            return Err(MusterError::UserError(
                "config validation failed: base_unit_minutes must be greater than 0".to_string(),
            ));
        }

        if self.executor_timeout_seconds == 0 {
            return Err(MusterError::UserError(
                "config validation failed: executor_timeout_seconds must be greater than 0"
                    .to_string(),
            ));
        }

        Ok(())
    }
}
