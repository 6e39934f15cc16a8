use parley_toolkits::ToolkitId;
use serde::{Deserialize, Serialize};
use serde_json::Value;

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolkitBinding {
    pub id: ToolkitId,
    pub parameters: Value,
}

/// Enabled toolkits for a chat, unique by id, in the order they were (re-)added.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolkitBindings(Vec<ToolkitBinding>);

impl ToolkitBindings {
    pub fn new() -> Self {
        Self::default()
    }

    /// Replaces any binding with the same id and moves it to the end.
    pub fn add(&mut self, binding: ToolkitBinding) {
        self.0.retain(|existing| existing.id != binding.id);
        self.0.push(binding);
    }

    pub fn remove(&mut self, id: &ToolkitId) -> bool {
        let before = self.0.len();
        self.0.retain(|existing| existing.id != *id);
        self.0.len() != before
    }

    pub fn get(&self, id: &ToolkitId) -> Option<&ToolkitBinding> {
        self.0.iter().find(|binding| binding.id == *id)
    }

    pub fn iter(&self) -> impl Iterator<Item = &ToolkitBinding> {
        self.0.iter()
    }

    pub fn ids(&self) -> Vec<ToolkitId> {
        self.0.iter().map(|binding| binding.id.clone()).collect()
    }

    pub fn len(&self) -> usize {
        self.0.len()
    }

    pub fn is_empty(&self) -> bool {
        self.0.is_empty()
    }

    pub fn as_slice(&self) -> &[ToolkitBinding] {
        &self.0
    }
}
