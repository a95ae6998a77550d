//! File System Utilities
//!
//! Platform directories for the scene config file and persisted preferences.

use crate::constants::{APP_NAME, APP_ORGANIZATION, APP_QUALIFIER};
use crate::error::{Error, Result};
use directories::ProjectDirs;
use std::fs;
use std::path::{Path, PathBuf};

fn project_dirs() -> Result<ProjectDirs> {
    ProjectDirs::from(APP_QUALIFIER, APP_ORGANIZATION, APP_NAME).ok_or_else(|| Error::Invalid {
        message: "Could not determine project directories".to_string(),
    })
}

fn ensure_dir(dir: &Path) -> Result<PathBuf> {
    if !dir.exists() {
        fs::create_dir_all(dir)?;
    }
    Ok(dir.to_path_buf())
}

/// Get or create the configuration directory
///
/// Platform-specific locations:
/// - **Linux**: `~/.config/scene-kit/` or `$XDG_CONFIG_HOME/scene-kit/`
/// - **macOS**: `~/Library/Application Support/com.scene-kit.scene-kit/`
/// - **Windows**: `C:\Users\<User>\AppData\Roaming\scene-kit\scene-kit\config\`
pub fn get_or_create_config_dir() -> Result<PathBuf> {
    ensure_dir(project_dirs()?.config_dir())
}

/// Get or create the data directory holding preference slots
///
/// Platform-specific locations:
/// - **Linux**: `~/.local/share/scene-kit/`
/// - **macOS**: `~/Library/Application Support/com.scene-kit.scene-kit/`
/// - **Windows**: `C:\Users\<User>\AppData\Roaming\scene-kit\scene-kit\data\`
pub fn get_or_create_data_dir() -> Result<PathBuf> {
    ensure_dir(project_dirs()?.data_dir())
}

/// Check if running in development mode
pub fn is_development() -> bool {
    cfg!(debug_assertions)
}
