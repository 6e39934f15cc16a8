use std::collections::BTreeMap;

use serde_json::Value;

use crate::error::ToolkitError;
use crate::toolkit::{ToolkitDefinition, ToolkitId, ToolkitSpec};
use crate::toolkits::SpotifyToolkit;

/// Registry of toolkits the client knows how to configure.
#[derive(Debug, Clone, Default)]
pub struct ToolkitRegistry {
    toolkits: BTreeMap<ToolkitId, ToolkitDefinition>,
}

impl ToolkitRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// Registry with every toolkit shipped in this crate.
    pub fn builtin() -> Result<Self, ToolkitError> {
        let mut registry = Self::new();
        registry.register::<SpotifyToolkit>()?;
        Ok(registry)
    }

    pub fn register<T: ToolkitSpec>(&mut self) -> Result<(), ToolkitError> {
        let definition = ToolkitDefinition::from_spec::<T>()?;
        self.toolkits.insert(definition.id().clone(), definition);
        Ok(())
    }

    pub fn get(&self, id: &ToolkitId) -> Option<&ToolkitDefinition> {
        self.toolkits.get(id)
    }

    pub fn all(&self) -> impl Iterator<Item = &ToolkitDefinition> {
        self.toolkits.values()
    }

    pub fn validate(&self, id: &ToolkitId, parameters: &Value) -> Result<Value, ToolkitError> {
        let definition = self
            .get(id)
            .ok_or_else(|| ToolkitError::UnknownToolkit(id.to_string()))?;
        definition.validate_parameters(parameters)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::toolkits::SPOTIFY_TOOLKIT_ID;
    use serde_json::json;

    #[test]
    fn builtin_contains_spotify() {
        let registry = ToolkitRegistry::builtin().unwrap();
        let ids: Vec<_> = registry.all().map(|t| t.id().to_string()).collect();
        assert_eq!(ids, vec![SPOTIFY_TOOLKIT_ID.to_string()]);
    }

    #[test]
    fn unknown_toolkit_is_rejected() {
        let registry = ToolkitRegistry::builtin().unwrap();
        let err = registry
            .validate(&ToolkitId::from("github"), &json!({}))
            .unwrap_err();
        assert_eq!(err, ToolkitError::UnknownToolkit("github".to_string()));
    }
}
