//! Scene Constants
//!
//! Centralized defaults shared by the event bus, the state store and the demo scene.

/// Default number of emitted events kept in the bus history
pub const DEFAULT_HISTORY_CAPACITY: usize = 100;

/// Number of history entries included in debug info
pub const DEBUG_HISTORY_TAIL: usize = 10;

/// Default time an error message stays visible
pub const DEFAULT_ERROR_DISPLAY_MS: u64 = 5000;

/// Storage slot holding the persisted scene preferences
pub const PREFERENCES_SLOT: &str = "user_info_scene_preferences";

/// Config file name inside the platform config directory
pub const CONFIG_FILE_NAME: &str = "scene-kit.toml";

/// Platform directory identity
pub const APP_QUALIFIER: &str = "com";
pub const APP_ORGANIZATION: &str = "scene-kit";
pub const APP_NAME: &str = "scene-kit";
