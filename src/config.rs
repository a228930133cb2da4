//! Dispatcher configuration.
//!
//! The default group and default priority are explicit values passed at
//! construction instead of hidden constants.

use std::path::Path;

use serde::{Deserialize, Serialize};

use crate::error::ConfigError;

/// Group used when a pattern or fired name carries no `group@` prefix.
pub const DEFAULT_GROUP: &str = "system";

/// Priority assigned to bindings registered without an explicit priority.
pub const DEFAULT_PRIORITY: i32 = 100;

/// Configuration for a [`crate::Dispatcher`].
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(default)]
pub struct DispatcherConfig {
    /// Group applied to names without a `group@` prefix.
    pub default_group: String,
    /// Priority applied to bindings registered without one.
    pub default_priority: i32,
}

impl Default for DispatcherConfig {
    fn default() -> Self {
        Self {
            default_group: DEFAULT_GROUP.to_string(),
            default_priority: DEFAULT_PRIORITY,
        }
    }
}

impl DispatcherConfig {
    /// Sets the default group.
    #[must_use]
    pub fn with_default_group(mut self, group: impl Into<String>) -> Self {
        self.default_group = group.into();
        self
    }

    /// Sets the default priority.
    #[must_use]
    pub const fn with_default_priority(mut self, priority: i32) -> Self {
        self.default_priority = priority;
        self
    }

    /// Checks that the configuration can be used by a dispatcher.
    pub fn validate(&self) -> Result<(), ConfigError> {
        if self.default_group.is_empty() {
            return Err(ConfigError::EmptyDefaultGroup);
        }
        if self.default_group.contains('@') {
            return Err(ConfigError::InvalidDefaultGroup {
                group: self.default_group.clone(),
            });
        }
        Ok(())
    }

    /// Parses and validates a JSON configuration document.
    ///
    /// Missing fields fall back to their defaults.
    pub fn from_json_str(json: &str) -> Result<Self, ConfigError> {
        let cfg: Self = serde_json::from_str(json).map_err(|e| ConfigError::Parse {
            message: e.to_string(),
        })?;
        cfg.validate()?;
        Ok(cfg)
    }

    /// Reads, parses and validates a JSON configuration file.
    pub fn from_json_file(path: impl AsRef<Path>) -> Result<Self, ConfigError> {
        let path = path.as_ref();
        let raw = std::fs::read_to_string(path).map_err(|e| ConfigError::Read {
            path: path.display().to_string(),
            message: e.to_string(),
        })?;
        Self::from_json_str(&raw)
    }
}
