use serde::{Deserialize, Serialize};
use std::path::{Path, PathBuf};

use crate::chat::Visibility;
use crate::error::Error;
use crate::utils::paths::AppPaths;

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct Preferences {
    /// `provider:modelId` or alias of the chat model to preselect.
    pub default_model: Option<String>,

    pub default_image_model: Option<String>,

    #[serde(default)]
    pub default_visibility: Visibility,

    #[serde(default)]
    pub toolkits: ToolkitPreferences,
}

#[derive(Debug, Clone, Serialize, Deserialize, Default, PartialEq)]
pub struct ToolkitPreferences {
    /// Toolkit ids enabled for every new chat, with empty parameters.
    #[serde(default)]
    pub enabled: Vec<String>,
}

impl Preferences {
    /// Get the path to the preferences file
    pub fn config_path() -> Result<PathBuf, Error> {
        AppPaths::user_config_dir()
            .map(|dir| dir.join("preferences.toml"))
            .ok_or_else(|| Error::Configuration("Could not determine config directory".to_string()))
    }

    /// Load preferences from disk, or return defaults if not found
    pub fn load() -> Result<Self, Error> {
        Self::load_from(&Self::config_path()?)
    }

    pub fn load_from(path: &Path) -> Result<Self, Error> {
        if !path.exists() {
            return Ok(Self::default());
        }

        let contents = std::fs::read_to_string(path)?;
        match toml::from_str(&contents) {
            Ok(prefs) => Ok(prefs),
            Err(e) => {
                tracing::warn!(
                    path = %path.display(),
                    error = %e,
                    "Failed to parse preferences file, using defaults"
                );
                Ok(Self::default())
            }
        }
    }

    /// Save preferences to disk
    pub fn save(&self) -> Result<(), Error> {
        self.save_to(&Self::config_path()?)
    }

    pub fn save_to(&self, path: &Path) -> Result<(), Error> {
        if let Some(parent) = path.parent() {
            std::fs::create_dir_all(parent)?;
        }

        let contents = toml::to_string_pretty(self)
            .map_err(|e| Error::Configuration(format!("Failed to serialize preferences: {e}")))?;

        std::fs::write(path, contents)?;
        Ok(())
    }
}
