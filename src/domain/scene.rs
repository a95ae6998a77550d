//! Scene - User info scene vocabulary
//!
//! Tabs, achievement categories, view modes and cache buckets shared by the
//! components of the user info screen.

use serde::{Deserialize, Serialize};

/// Tabs of the user info screen
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum SceneTab {
    #[default]
    Statistics,
    Achievements,
    Leaderboard,
    Challenges,
    Management,
    Help,
}

impl SceneTab {
    pub const ALL: [SceneTab; 6] = [
        SceneTab::Statistics,
        SceneTab::Achievements,
        SceneTab::Leaderboard,
        SceneTab::Challenges,
        SceneTab::Management,
        SceneTab::Help,
    ];

    pub fn id(self) -> &'static str {
        match self {
            SceneTab::Statistics => "statistics",
            SceneTab::Achievements => "achievements",
            SceneTab::Leaderboard => "leaderboard",
            SceneTab::Challenges => "challenges",
            SceneTab::Management => "management",
            SceneTab::Help => "help",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            SceneTab::Statistics => "Statistics",
            SceneTab::Achievements => "Achievements",
            SceneTab::Leaderboard => "Leaderboard",
            SceneTab::Challenges => "Challenges",
            SceneTab::Management => "Management",
            SceneTab::Help => "Help",
        }
    }
}

/// Achievement list filter
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum AchievementCategory {
    #[default]
    All,
    Score,
    Play,
    Technique,
    Collection,
    Special,
}

impl AchievementCategory {
    pub const ALL: [AchievementCategory; 6] = [
        AchievementCategory::All,
        AchievementCategory::Score,
        AchievementCategory::Play,
        AchievementCategory::Technique,
        AchievementCategory::Collection,
        AchievementCategory::Special,
    ];

    pub fn id(self) -> &'static str {
        match self {
            AchievementCategory::All => "all",
            AchievementCategory::Score => "score",
            AchievementCategory::Play => "play",
            AchievementCategory::Technique => "technique",
            AchievementCategory::Collection => "collection",
            AchievementCategory::Special => "special",
        }
    }

    pub fn label(self) -> &'static str {
        match self {
            AchievementCategory::All => "All",
            AchievementCategory::Score => "Score",
            AchievementCategory::Play => "Play",
            AchievementCategory::Technique => "Technique",
            AchievementCategory::Collection => "Collection",
            AchievementCategory::Special => "Special",
        }
    }
}

/// Statistics presentation
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum ViewMode {
    #[default]
    Overview,
    Detailed,
}

/// Time window applied to statistics
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum PeriodFilter {
    #[default]
    All,
    Daily,
    Weekly,
    Monthly,
}

/// Cached data bucket held by the scene state
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash)]
pub enum CacheBucket {
    Statistics,
    Achievements,
    User,
}

impl CacheBucket {
    pub const ALL: [CacheBucket; 3] = [
        CacheBucket::Statistics,
        CacheBucket::Achievements,
        CacheBucket::User,
    ];

    /// Bucket name carried by `cache_cleared` notifications
    pub fn name(self) -> &'static str {
        match self {
            CacheBucket::Statistics => "statistics",
            CacheBucket::Achievements => "achievements",
            CacheBucket::User => "user",
        }
    }

    /// State key holding the cached data
    pub fn state_key(self) -> &'static str {
        match self {
            CacheBucket::Statistics => "statistics_data",
            CacheBucket::Achievements => "achievements_data",
            CacheBucket::User => "user_data",
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn tab_ids_match_serde_names() {
        for tab in SceneTab::ALL {
            let json = serde_json::to_value(tab).expect("serialize tab");
            assert_eq!(json, serde_json::Value::from(tab.id()));
        }
        for category in AchievementCategory::ALL {
            let json = serde_json::to_value(category).expect("serialize category");
            assert_eq!(json, serde_json::Value::from(category.id()));
        }
    }

    #[test]
    fn unknown_tab_is_rejected() {
        let parsed = serde_json::from_value::<SceneTab>(serde_json::json!("settings"));
        assert!(parsed.is_err());
    }
}
