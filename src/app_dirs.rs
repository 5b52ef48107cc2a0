use directories::ProjectDirs;
use std::path::PathBuf;

const APP_NAME: &str = "reso";

/// Centralized application directory resolution
pub struct AppDirs;

impl AppDirs {
    pub fn preferences_path() -> Option<PathBuf> {
        ProjectDirs::from("", "", APP_NAME).map(|proj_dirs| proj_dirs.config_dir().join("preferences.json"))
    }

    pub fn log_path() -> Option<PathBuf> {
        if let Ok(home) = std::env::var("HOME") {
            let state_dir = PathBuf::from(home).join(".local").join("state").join(APP_NAME);
            Some(state_dir.join("reso.log"))
        } else {
            ProjectDirs::from("", "", APP_NAME).map(|proj_dirs| proj_dirs.data_local_dir().join("reso.log"))
        }
    }
}
