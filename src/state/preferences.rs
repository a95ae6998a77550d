//! Scene Preferences
//!
//! The persisted subset of the scene state, and the allow-list of keys whose
//! mutation triggers a save.

use super::path::StatePath;
use crate::domain::{AchievementCategory, PeriodFilter, SceneTab, ViewMode};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{Map, Value};
use tracing::warn;

pub const CURRENT_TAB: &str = "current_tab";
pub const VIEW_MODE: &str = "view_mode";
pub const PERIOD_FILTER: &str = "period_filter";
pub const DISPLAY_SETTINGS: &str = "display_settings";
pub const CURRENT_ACHIEVEMENT_CATEGORY: &str = "current_achievement_category";

/// Top-level keys whose mutation (or mutation of a nested child) is persisted
pub const AUTO_SAVE_KEYS: [&str; 5] = [
    CURRENT_TAB,
    VIEW_MODE,
    PERIOD_FILTER,
    DISPLAY_SETTINGS,
    CURRENT_ACHIEVEMENT_CATEGORY,
];

pub fn triggers_auto_save(path: &StatePath) -> bool {
    AUTO_SAVE_KEYS.iter().any(|key| path.is_within(key))
}

/// Display toggles of the statistics views
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct DisplaySettings {
    pub show_charts: bool,
    pub show_details: bool,
    pub animations_enabled: bool,
    pub compact_mode: bool,
}

impl Default for DisplaySettings {
    fn default() -> Self {
        Self {
            show_charts: true,
            show_details: true,
            animations_enabled: true,
            compact_mode: false,
        }
    }
}

impl DisplaySettings {
    fn merge_from(&mut self, object: &Map<String, Value>) {
        merge_field(object, "show_charts", &mut self.show_charts);
        merge_field(object, "show_details", &mut self.show_details);
        merge_field(object, "animations_enabled", &mut self.animations_enabled);
        merge_field(object, "compact_mode", &mut self.compact_mode);
    }
}

/// Persisted scene preferences
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ScenePreferences {
    pub current_tab: SceneTab,
    pub view_mode: ViewMode,
    pub period_filter: PeriodFilter,
    pub display_settings: DisplaySettings,
    pub current_achievement_category: AchievementCategory,
}

/// Overwrite `target` with `object[key]` when it deserializes; otherwise keep it
fn merge_field<T: DeserializeOwned>(object: &Map<String, Value>, key: &str, target: &mut T) {
    let Some(raw) = object.get(key) else {
        return;
    };
    match serde_json::from_value::<T>(raw.clone()) {
        Ok(value) => *target = value,
        Err(e) => warn!(key, error = %e, "Discarding invalid preference value"),
    }
}

impl ScenePreferences {
    /// Merge a stored object over defaults, field by field
    ///
    /// Unknown keys and values that do not validate are dropped; a non-object
    /// document yields plain defaults.
    pub fn merged_over_defaults(raw: &Value) -> Self {
        let mut preferences = Self::default();
        let Some(object) = raw.as_object() else {
            warn!("Stored preferences are not an object, using defaults");
            return preferences;
        };
        preferences.merge_from(object);
        preferences
    }

    fn merge_from(&mut self, object: &Map<String, Value>) {
        merge_field(object, CURRENT_TAB, &mut self.current_tab);
        merge_field(object, VIEW_MODE, &mut self.view_mode);
        merge_field(object, PERIOD_FILTER, &mut self.period_filter);
        merge_field(
            object,
            CURRENT_ACHIEVEMENT_CATEGORY,
            &mut self.current_achievement_category,
        );
        match object.get(DISPLAY_SETTINGS) {
            Some(Value::Object(settings)) => self.display_settings.merge_from(settings),
            Some(_) => warn!(key = DISPLAY_SETTINGS, "Discarding invalid preference value"),
            None => {}
        }
    }

    /// Derive the preferences snapshot from the live state data
    pub fn from_state(data: &Map<String, Value>) -> Self {
        let mut preferences = Self::default();
        preferences.merge_from(data);
        preferences
    }

    /// Write every preference field into the state data
    pub fn write_into(&self, data: &mut Map<String, Value>) {
        if let Ok(Value::Object(fields)) = serde_json::to_value(self) {
            data.extend(fields);
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[test]
    fn valid_fields_are_merged() {
        let raw = json!({
            "current_tab": "help",
            "view_mode": "detailed",
            "period_filter": "weekly",
            "display_settings": { "compact_mode": true },
            "current_achievement_category": "score"
        });
        let preferences = ScenePreferences::merged_over_defaults(&raw);
        assert_eq!(preferences.current_tab, SceneTab::Help);
        assert_eq!(preferences.view_mode, ViewMode::Detailed);
        assert_eq!(preferences.period_filter, PeriodFilter::Weekly);
        assert!(preferences.display_settings.compact_mode);
        assert!(preferences.display_settings.show_charts);
        assert_eq!(
            preferences.current_achievement_category,
            AchievementCategory::Score
        );
    }

    #[test]
    fn invalid_and_unknown_fields_are_discarded() {
        let raw = json!({
            "current_tab": "settings",
            "view_mode": 3,
            "display_settings": { "show_charts": "yes", "show_details": false },
            "unknown": true
        });
        let preferences = ScenePreferences::merged_over_defaults(&raw);
        assert_eq!(preferences.current_tab, SceneTab::Statistics);
        assert_eq!(preferences.view_mode, ViewMode::Overview);
        assert!(preferences.display_settings.show_charts);
        assert!(!preferences.display_settings.show_details);
    }

    #[test]
    fn non_object_document_yields_defaults() {
        let preferences = ScenePreferences::merged_over_defaults(&json!([1, 2, 3]));
        assert_eq!(preferences, ScenePreferences::default());
    }

    #[test]
    fn auto_save_allow_list() {
        let hit = |raw: &str| triggers_auto_save(&StatePath::parse(raw).expect("path"));
        assert!(hit("current_tab"));
        assert!(hit("display_settings.show_charts"));
        assert!(hit("current_achievement_category"));
        assert!(!hit("scroll_position"));
        assert!(!hit("current_tabs"));
    }

    #[test]
    fn write_into_round_trips_through_state() {
        let preferences = ScenePreferences {
            current_tab: SceneTab::Management,
            ..ScenePreferences::default()
        };
        let mut data = Map::new();
        preferences.write_into(&mut data);
        assert_eq!(data.get(CURRENT_TAB), Some(&json!("management")));
        assert_eq!(ScenePreferences::from_state(&data), preferences);
    }
}
