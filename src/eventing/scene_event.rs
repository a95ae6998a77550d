//! Scene Events
//!
//! Well-known event names exchanged by the components of one screen, with
//! their payloads.

use chrono::{DateTime, Local};
use serde::{Deserialize, Serialize};

use crate::domain::AchievementCategory;

pub const DIALOG_OPENED: &str = "dialog-opened";
pub const DIALOG_CLOSED: &str = "dialog-closed";
pub const COMPONENT_ERROR: &str = "component-error";
pub const ACHIEVEMENT_CATEGORY_CHANGED: &str = "achievement-category-changed";
pub const DATA_RESET: &str = "data-reset";
pub const CACHE_CLEARED: &str = "cache_cleared";
pub const STATE_RESET: &str = "state_reset";

/// Payload of `dialog-opened` / `dialog-closed`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct DialogEvent {
    /// Dialog kind, e.g. "username", "export", "import"
    #[serde(rename = "type")]
    pub kind: String,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<serde_json::Value>,
}

impl DialogEvent {
    pub fn new(kind: impl Into<String>) -> Self {
        Self {
            kind: kind.into(),
            data: None,
        }
    }

    pub fn with_data(mut self, data: serde_json::Value) -> Self {
        self.data = Some(data);
        self
    }
}

/// Payload of `component-error`
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ComponentError {
    /// Component that failed
    pub component: String,
    pub message: String,
    pub timestamp: DateTime<Local>,
}

impl ComponentError {
    /// Create an error report with current timestamp
    pub fn new(component: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            component: component.into(),
            message: message.into(),
            timestamp: Local::now(),
        }
    }
}

/// Payload of `achievement-category-changed`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct CategoryChanged {
    pub category: AchievementCategory,
    pub previous: AchievementCategory,
}

/// Payload of `cache_cleared`; `None` means every bucket
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct CacheCleared {
    pub bucket: Option<String>,
}

/// Payload of `state_reset`
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct StateReset {
    pub preserve_preferences: bool,
}
