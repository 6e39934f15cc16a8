use jsonschema::JSONSchema;
use schemars::JsonSchema;
use serde::{Deserialize, Serialize, de::DeserializeOwned};
use serde_json::Value;
use std::fmt;

use crate::error::ToolkitError;
use crate::schema::ToolSchema;

/// Identifier for a toolkit, as sent to the chat endpoint.
#[derive(Debug, Clone, PartialEq, Eq, Hash, PartialOrd, Ord, Serialize, Deserialize)]
#[serde(transparent)]
pub struct ToolkitId(pub String);

impl ToolkitId {
    pub fn as_str(&self) -> &str {
        &self.0
    }
}

impl fmt::Display for ToolkitId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.0)
    }
}

impl From<&str> for ToolkitId {
    fn from(s: &str) -> Self {
        ToolkitId(s.to_string())
    }
}

impl From<String> for ToolkitId {
    fn from(s: String) -> Self {
        ToolkitId(s)
    }
}

/// Static description of a toolkit: its parameter type and the tools it exposes.
pub trait ToolkitSpec {
    type Parameters: Serialize + DeserializeOwned + JsonSchema;

    const ID: &'static str;
    const NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn tools() -> Vec<ToolSchema>;
}

type Normalizer = fn(Value) -> Result<Value, serde_json::Error>;

fn normalize<P: Serialize + DeserializeOwned>(value: Value) -> Result<Value, serde_json::Error> {
    let parsed: P = serde_json::from_value(value)?;
    serde_json::to_value(parsed)
}

/// Type-erased toolkit, held by the registry.
#[derive(Debug, Clone)]
pub struct ToolkitDefinition {
    id: ToolkitId,
    name: &'static str,
    description: &'static str,
    parameters_schema: Value,
    tools: Vec<ToolSchema>,
    normalizer: Normalizer,
}

impl ToolkitDefinition {
    pub fn from_spec<T: ToolkitSpec>() -> Result<Self, ToolkitError> {
        let mut parameters_schema = serde_json::to_value(schemars::schema_for!(T::Parameters))
            .map_err(|e| ToolkitError::Schema {
                toolkit_id: T::ID.to_string(),
                message: e.to_string(),
            })?;

        // The validator picks its draft from `$schema`; pin it to the default instead.
        if let Some(obj) = parameters_schema.as_object_mut() {
            obj.remove("$schema");
        }

        Ok(Self {
            id: ToolkitId::from(T::ID),
            name: T::NAME,
            description: T::DESCRIPTION,
            parameters_schema,
            tools: T::tools(),
            normalizer: normalize::<T::Parameters>,
        })
    }

    pub fn id(&self) -> &ToolkitId {
        &self.id
    }

    pub fn name(&self) -> &str {
        self.name
    }

    pub fn description(&self) -> &str {
        self.description
    }

    pub fn parameters_schema(&self) -> &Value {
        &self.parameters_schema
    }

    pub fn tools(&self) -> &[ToolSchema] {
        &self.tools
    }

    /// Tool names as the model sees them: `<toolkit>_<tool>`.
    pub fn qualified_tool_names(&self) -> Vec<String> {
        self.tools
            .iter()
            .map(|tool| format!("{}_{}", self.id, tool.name))
            .collect()
    }

    /// Validate a parameter payload and return its normalized form.
    ///
    /// Unknown keys are dropped rather than rejected.
    pub fn validate_parameters(&self, parameters: &Value) -> Result<Value, ToolkitError> {
        let compiled =
            JSONSchema::compile(&self.parameters_schema).map_err(|e| ToolkitError::Schema {
                toolkit_id: self.id.to_string(),
                message: e.to_string(),
            })?;

        if let Err(errors) = compiled.validate(parameters) {
            let message = errors
                .map(|error| error.to_string())
                .collect::<Vec<_>>()
                .join("; ");
            tracing::debug!(
                target: "toolkits::validate",
                toolkit_id = %self.id,
                %message,
                "Rejected toolkit parameters"
            );
            return Err(ToolkitError::invalid_parameters(self.id.as_str(), message));
        }

        (self.normalizer)(parameters.clone())
            .map_err(|e| ToolkitError::invalid_parameters(self.id.as_str(), e.to_string()))
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use serde_json::json;

    #[derive(Debug, Serialize, Deserialize, JsonSchema)]
    struct WeatherParameters {
        units: String,
        #[serde(default, skip_serializing_if = "Option::is_none")]
        days: Option<u8>,
    }

    struct WeatherToolkit;

    impl ToolkitSpec for WeatherToolkit {
        type Parameters = WeatherParameters;

        const ID: &'static str = "weather";
        const NAME: &'static str = "Weather";
        const DESCRIPTION: &'static str = "Forecasts";

        fn tools() -> Vec<ToolSchema> {
            vec![]
        }
    }

    fn definition() -> ToolkitDefinition {
        ToolkitDefinition::from_spec::<WeatherToolkit>().unwrap()
    }

    #[test]
    fn accepts_valid_parameters() {
        let normalized = definition()
            .validate_parameters(&json!({ "units": "metric", "days": 3 }))
            .unwrap();
        assert_eq!(normalized, json!({ "units": "metric", "days": 3 }));
    }

    #[test]
    fn rejects_missing_required_field() {
        let err = definition()
            .validate_parameters(&json!({ "days": 3 }))
            .unwrap_err();
        assert!(matches!(err, ToolkitError::InvalidParameters { .. }));
        assert_eq!(err.toolkit_id(), "weather");
    }

    #[test]
    fn rejects_wrong_type() {
        let err = definition()
            .validate_parameters(&json!({ "units": 7 }))
            .unwrap_err();
        assert!(matches!(err, ToolkitError::InvalidParameters { .. }));
    }

    #[test]
    fn drops_unknown_keys() {
        let normalized = definition()
            .validate_parameters(&json!({ "units": "imperial", "extra": true }))
            .unwrap();
        assert_eq!(normalized, json!({ "units": "imperial" }));
    }

    #[test]
    fn schema_has_no_draft_marker() {
        assert!(definition().parameters_schema().get("$schema").is_none());
    }
}
