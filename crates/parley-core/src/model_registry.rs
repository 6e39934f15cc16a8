use std::collections::HashMap;
use std::path::{Path, PathBuf};

use serde::{Deserialize, Serialize};

use crate::config::model::{ImageModel, LanguageModel, ModelId};
use crate::error::Error;
use crate::utils::paths::AppPaths;

const DEFAULT_MODELS_TOML: &str = include_str!("../assets/default_models.toml");

/// Catalog of the chat and image models the service offers.
#[derive(Debug, Clone)]
pub struct ModelRegistry {
    language_models: Vec<LanguageModel>,
    image_models: Vec<ImageModel>,
    /// Map of aliases to ModelIds for alias resolution.
    aliases: HashMap<String, ModelId>,
    default_language_model: Option<ModelId>,
}

/// Root structure for TOML deserialization.
#[derive(Debug, Default, Deserialize, Serialize)]
struct ModelsFile {
    default_language_model: Option<ModelId>,
    #[serde(default)]
    language_models: Vec<LanguageModel>,
    #[serde(default)]
    image_models: Vec<ImageModel>,
}

impl ModelRegistry {
    /// Load the built-in catalog merged with the user's `models.toml`.
    pub fn load() -> Result<Self, Error> {
        Self::load_with_config_dir(AppPaths::user_config_dir().as_deref())
    }

    pub fn load_with_config_dir(config_dir: Option<&Path>) -> Result<Self, Error> {
        let mut models_file: ModelsFile = toml::from_str(DEFAULT_MODELS_TOML)
            .map_err(|e| Error::Configuration(format!("Failed to parse default models: {e}")))?;

        if let Some(dir) = config_dir
            && let Some(user) = Self::load_config_from_path(dir.join("models.toml"))?
        {
            Self::merge_models(&mut models_file, user);
        }

        Ok(Self::from_file(models_file))
    }

    fn from_file(models_file: ModelsFile) -> Self {
        let mut aliases = HashMap::new();
        for model in &models_file.language_models {
            for alias in &model.aliases {
                aliases.insert(alias.clone(), model.id());
            }
        }
        for model in &models_file.image_models {
            for alias in &model.aliases {
                aliases.insert(alias.clone(), model.id());
            }
        }

        Self {
            language_models: models_file.language_models,
            image_models: models_file.image_models,
            aliases,
            default_language_model: models_file.default_language_model,
        }
    }

    fn load_config_from_path(path: PathBuf) -> Result<Option<ModelsFile>, Error> {
        if !path.exists() {
            return Ok(None);
        }

        let content = std::fs::read_to_string(&path)?;
        let models = toml::from_str(&content).map_err(|e| {
            Error::Configuration(format!(
                "Failed to parse models at {}: {}",
                path.display(),
                e
            ))
        })?;

        Ok(Some(models))
    }

    /// User entries replace built-in ones with the same id; aliases accumulate.
    fn merge_models(base: &mut ModelsFile, user: ModelsFile) {
        for user_model in user.language_models {
            match base
                .language_models
                .iter_mut()
                .find(|m| m.id() == user_model.id())
            {
                Some(existing) => {
                    let mut aliases = std::mem::take(&mut existing.aliases);
                    for alias in &user_model.aliases {
                        if !aliases.contains(alias) {
                            aliases.push(alias.clone());
                        }
                    }
                    *existing = LanguageModel {
                        aliases,
                        ..user_model
                    };
                }
                None => base.language_models.push(user_model),
            }
        }

        for user_model in user.image_models {
            match base
                .image_models
                .iter_mut()
                .find(|m| m.id() == user_model.id())
            {
                Some(existing) => *existing = user_model,
                None => base.image_models.push(user_model),
            }
        }

        if user.default_language_model.is_some() {
            base.default_language_model = user.default_language_model;
        }
    }

    pub fn language_models(&self) -> &[LanguageModel] {
        &self.language_models
    }

    pub fn image_models(&self) -> &[ImageModel] {
        &self.image_models
    }

    pub fn language_model(&self, id: &ModelId) -> Option<&LanguageModel> {
        self.language_models.iter().find(|m| m.id() == *id)
    }

    pub fn image_model(&self, id: &ModelId) -> Option<&ImageModel> {
        self.image_models.iter().find(|m| m.id() == *id)
    }

    fn resolve_id(&self, name: &str) -> Option<ModelId> {
        self.aliases
            .get(name)
            .cloned()
            .or_else(|| name.parse().ok())
    }

    /// Resolve a chat model by `provider:modelId` or alias.
    pub fn resolve(&self, name: &str) -> Result<&LanguageModel, Error> {
        self.resolve_id(name)
            .and_then(|id| self.language_model(&id))
            .ok_or_else(|| Error::NotFound(format!("language model '{name}'")))
    }

    /// Resolve an image model by `provider:modelId` or alias.
    pub fn resolve_image(&self, name: &str) -> Result<&ImageModel, Error> {
        self.resolve_id(name)
            .and_then(|id| self.image_model(&id))
            .ok_or_else(|| Error::NotFound(format!("image model '{name}'")))
    }

    /// The configured default, or the first catalog entry when none is set.
    pub fn default_language_model(&self) -> Option<&LanguageModel> {
        self.default_language_model
            .as_ref()
            .and_then(|id| self.language_model(id))
            .or_else(|| self.language_models.first())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::config::model::LanguageModelCapability;
    use tempfile::TempDir;

    #[test]
    fn test_load_builtin_models() {
        let models_file: ModelsFile = toml::from_str(DEFAULT_MODELS_TOML).unwrap();
        assert!(!models_file.language_models.is_empty());
        assert!(!models_file.image_models.is_empty());

        let registry = ModelRegistry::from_file(models_file);
        let default = registry.default_language_model().unwrap();
        assert_eq!(default.id().to_string(), "openai:gpt-4o-mini");
    }

    #[test]
    fn resolves_by_alias_and_qualified_id() {
        let registry = ModelRegistry::load_with_config_dir(None).unwrap();

        let by_alias = registry.resolve("sonnet").unwrap();
        let by_id = registry.resolve("anthropic:claude-sonnet-4-0").unwrap();
        assert_eq!(by_alias, by_id);

        assert!(registry.resolve("nope").is_err());
        assert!(registry.resolve_image("openai:gpt-image-1").is_ok());
        assert!(registry.resolve_image("sonnet").is_err());
    }

    #[test]
    fn user_models_override_and_extend() {
        let dir = TempDir::new().unwrap();
        std::fs::write(
            dir.path().join("models.toml"),
            r#"
default_language_model = "local:llama"

[[language_models]]
provider = "openai"
model_id = "gpt-4o"
name = "GPT-4o (custom)"
capabilities = ["web-search"]
aliases = ["omni"]

[[language_models]]
provider = "local"
model_id = "llama"
name = "Llama"
"#,
        )
        .unwrap();

        let registry = ModelRegistry::load_with_config_dir(Some(dir.path())).unwrap();

        let gpt = registry.resolve("omni").unwrap();
        assert_eq!(gpt.name, "GPT-4o (custom)");
        assert!(gpt.has_capability(LanguageModelCapability::WebSearch));
        assert!(gpt.aliases.contains(&"4o".to_string()));

        assert_eq!(
            registry.default_language_model().unwrap().id().to_string(),
            "local:llama"
        );
    }
}
