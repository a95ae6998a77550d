//! Config - Scene Configuration
//!
//! Loaded from `scene-kit.toml` in the platform config directory. Every field
//! has a default so partial files are accepted.

use crate::constants::{
    CONFIG_FILE_NAME, DEFAULT_ERROR_DISPLAY_MS, DEFAULT_HISTORY_CAPACITY, PREFERENCES_SLOT,
};
use crate::error::Result;
use crate::helpers::get_or_create_config_dir;
use serde::{Deserialize, Serialize};
use std::path::Path;
use std::time::Duration;
use tracing::{info, warn};

/// Main scene configuration
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct SceneConfig {
    /// Event bus configuration
    pub bus: EventBusConfig,
    /// State store configuration
    pub state: StateConfig,
}

/// Event bus configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct EventBusConfig {
    /// Number of emitted events kept in history
    pub max_history_size: usize,
    /// Log every emit at debug level
    pub log_emits: bool,
}

impl Default for EventBusConfig {
    fn default() -> Self {
        Self {
            max_history_size: DEFAULT_HISTORY_CAPACITY,
            log_emits: false,
        }
    }
}

/// State store configuration
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(default)]
pub struct StateConfig {
    /// Storage slot for persisted preferences
    pub storage_slot: String,
    /// Default error message lifetime in milliseconds
    pub error_display_ms: u64,
}

impl StateConfig {
    pub fn error_display(&self) -> Duration {
        Duration::from_millis(self.error_display_ms)
    }
}

impl Default for StateConfig {
    fn default() -> Self {
        Self {
            storage_slot: PREFERENCES_SLOT.to_string(),
            error_display_ms: DEFAULT_ERROR_DISPLAY_MS,
        }
    }
}

impl SceneConfig {
    /// Parse a TOML config file
    pub fn load(path: &Path) -> Result<Self> {
        info!(path = ?path, "Loading scene config");
        let value = std::fs::read_to_string(path)?;
        Self::parse(&value)
    }

    /// Parse TOML config text; an empty document yields defaults
    pub fn parse(value: &str) -> Result<Self> {
        if value.trim().is_empty() {
            return Ok(Self::default());
        }
        Ok(toml::from_str(value)?)
    }

    /// Load from the platform config directory, falling back to defaults
    pub fn load_or_default() -> Self {
        let path = match get_or_create_config_dir() {
            Ok(dir) => dir.join(CONFIG_FILE_NAME),
            Err(e) => {
                warn!(error = %e, "No config directory, using default scene config");
                return Self::default();
            }
        };
        if !path.exists() {
            return Self::default();
        }
        Self::load(&path).unwrap_or_else(|e| {
            warn!(error = %e, path = ?path, "Failed to load scene config, using defaults");
            Self::default()
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn empty_document_yields_defaults() {
        let config = SceneConfig::parse("").expect("parse empty");
        assert_eq!(config, SceneConfig::default());
        assert_eq!(config.bus.max_history_size, 100);
        assert_eq!(config.state.error_display(), Duration::from_millis(5000));
    }

    #[test]
    fn partial_document_keeps_other_defaults() {
        let config = SceneConfig::parse(
            r#"
            [bus]
            max_history_size = 20
            "#,
        )
        .expect("parse partial");
        assert_eq!(config.bus.max_history_size, 20);
        assert!(!config.bus.log_emits);
        assert_eq!(config.state.storage_slot, PREFERENCES_SLOT);
    }

    #[test]
    fn invalid_document_is_an_error() {
        let result = SceneConfig::parse("[bus]\nmax_history_size = \"many\"");
        assert!(result.is_err());
    }
}
