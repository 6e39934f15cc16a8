use std::path::PathBuf;

const APP_NAME: &str = "parley";

/// Standardized application directories for Parley.
///
/// - User-level config: `config.toml`, `preferences.toml`, `models.toml`
/// - User-level data: logs and the input draft
pub struct AppPaths;

impl AppPaths {
    fn project_dirs() -> Option<directories::ProjectDirs> {
        directories::ProjectDirs::from("", "", APP_NAME)
    }

    /// Return the user-level config directory (platform-specific)
    pub fn user_config_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|d| d.config_dir().to_path_buf())
    }

    /// Return the user-level data directory (platform-specific)
    pub fn user_data_dir() -> Option<PathBuf> {
        Self::project_dirs().map(|d| d.data_dir().to_path_buf())
    }

    pub fn user_models() -> Option<PathBuf> {
        Self::user_config_dir().map(|d| d.join("models.toml"))
    }

    pub fn log_dir() -> Option<PathBuf> {
        Self::user_data_dir().map(|d| d.join("logs"))
    }

    pub fn drafts_dir() -> Option<PathBuf> {
        Self::user_data_dir().map(|d| d.join("drafts"))
    }
}
