use schemars::JsonSchema;
use serde::{Deserialize, Serialize};
use serde_json::Value;
use std::collections::BTreeSet;

/// Flattened view of a JSON schema, the shape a chat model expects for tool input.
#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct InputSchema {
    pub properties: serde_json::Map<String, Value>,
    pub required: Vec<String>,
    #[serde(rename = "type")]
    pub schema_type: String,
}

impl InputSchema {
    pub fn for_type<T: JsonSchema>() -> Self {
        schemars::schema_for!(T).into()
    }

    pub fn from_value(schema: &Value) -> Self {
        let mut properties = serde_json::Map::new();
        let mut required = BTreeSet::new();
        collect(schema, &mut properties, &mut required);

        let schema_type = schema
            .get("type")
            .and_then(Value::as_str)
            .unwrap_or("object")
            .to_string();

        Self {
            properties,
            required: required.into_iter().collect(),
            schema_type,
        }
    }
}

impl From<schemars::Schema> for InputSchema {
    fn from(schema: schemars::Schema) -> Self {
        let value = serde_json::to_value(&schema).unwrap_or(Value::Null);
        Self::from_value(&value)
    }
}

// allOf branches are merged into the top level; everything else is taken as-is.
fn collect(
    schema: &Value,
    properties: &mut serde_json::Map<String, Value>,
    required: &mut BTreeSet<String>,
) {
    let Some(obj) = schema.as_object() else {
        return;
    };

    if let Some(props) = obj.get("properties").and_then(Value::as_object) {
        for (key, value) in props {
            properties
                .entry(key.clone())
                .or_insert_with(|| value.clone());
        }
    }

    if let Some(names) = obj.get("required").and_then(Value::as_array) {
        required.extend(names.iter().filter_map(Value::as_str).map(str::to_string));
    }

    if let Some(all_of) = obj.get("allOf").and_then(Value::as_array) {
        for sub in all_of {
            collect(sub, properties, required);
        }
    }
}

#[derive(Debug, Clone, Serialize, Deserialize, PartialEq)]
pub struct ToolSchema {
    pub name: String,
    #[serde(default)]
    pub display_name: String,
    pub description: String,
    pub input_schema: InputSchema,
}

/// A single tool exposed by a toolkit.
pub trait ToolSpec {
    type Params: JsonSchema;

    const NAME: &'static str;
    const DISPLAY_NAME: &'static str;
    const DESCRIPTION: &'static str;

    fn schema() -> ToolSchema {
        ToolSchema {
            name: Self::NAME.to_string(),
            display_name: Self::DISPLAY_NAME.to_string(),
            description: Self::DESCRIPTION.to_string(),
            input_schema: InputSchema::for_type::<Self::Params>(),
        }
    }
}
