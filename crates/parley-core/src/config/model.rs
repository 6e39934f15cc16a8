use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use strum::{Display, EnumString};

use crate::error::Error;

/// Capabilities a chat model may advertise.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize, Display, EnumString)]
#[serde(rename_all = "kebab-case")]
#[strum(serialize_all = "kebab-case")]
pub enum LanguageModelCapability {
    Vision,
    Pdf,
    WebSearch,
    ToolCalling,
    Reasoning,
}

/// A model reference on the wire: `provider:modelId`.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub struct ModelId {
    pub provider: String,
    pub model_id: String,
}

impl ModelId {
    pub fn new(provider: impl Into<String>, model_id: impl Into<String>) -> Self {
        Self {
            provider: provider.into(),
            model_id: model_id.into(),
        }
    }
}

impl fmt::Display for ModelId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}:{}", self.provider, self.model_id)
    }
}

impl FromStr for ModelId {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        // Model ids may themselves contain colons (e.g. `openrouter:meta/llama:free`).
        match s.split_once(':') {
            Some((provider, model_id)) if !provider.is_empty() && !model_id.is_empty() => {
                Ok(Self::new(provider, model_id))
            }
            _ => Err(Error::Configuration(format!(
                "Invalid model id '{s}', expected provider:modelId"
            ))),
        }
    }
}

impl Serialize for ModelId {
    fn serialize<S: serde::Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.collect_str(self)
    }
}

impl<'de> Deserialize<'de> for ModelId {
    fn deserialize<D: serde::Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        raw.parse().map_err(serde::de::Error::custom)
    }
}

/// A chat model the user can select.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct LanguageModel {
    pub provider: String,
    pub model_id: String,
    pub name: String,
    #[serde(default)]
    pub capabilities: Vec<LanguageModelCapability>,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl LanguageModel {
    pub fn id(&self) -> ModelId {
        ModelId::new(&self.provider, &self.model_id)
    }

    pub fn has_capability(&self, capability: LanguageModelCapability) -> bool {
        self.capabilities.contains(&capability)
    }
}

/// An image generation model, selected independently of the chat model.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ImageModel {
    pub provider: String,
    pub model_id: String,
    pub name: String,
    #[serde(default)]
    pub aliases: Vec<String>,
}

impl ImageModel {
    pub fn id(&self) -> ModelId {
        ModelId::new(&self.provider, &self.model_id)
    }
}
