//! State - Scene State Store
//!
//! Observable key/value store shared by the components of one screen, with
//! allow-listed preference persistence and a self-clearing error message.

mod path;
mod preferences;
mod scene_state;
mod scheduler;
mod storage;

pub use path::StatePath;
pub use preferences::{
    triggers_auto_save, DisplaySettings, ScenePreferences, AUTO_SAVE_KEYS,
    CURRENT_ACHIEVEMENT_CATEGORY, CURRENT_TAB, DISPLAY_SETTINGS, PERIOD_FILTER, VIEW_MODE,
};
pub use scene_state::{
    ChangeListener, ChangeRecord, ChangeResult, ChangeSubscription, SceneState,
    ACCESSIBILITY_SETTINGS, ACHIEVEMENT_CATEGORIES, DIALOG_DATA, ERROR_MESSAGE, FOCUSED_ELEMENT,
    SCROLL_POSITION, SELECTED_ITEM, SHOWING_DIALOG, TABS,
};
pub use scheduler::{ManualScheduler, Scheduler, TimerHandle, TimerTask, TokioScheduler};
pub use storage::{FileStorage, MemoryStorage, PreferenceStorage};
