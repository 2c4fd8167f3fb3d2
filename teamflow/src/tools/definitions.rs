//! Tool definitions and output envelope.

use crate::errors::ErrorInfo;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Definition of a callable tool.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// The tool name.
    pub name: String,
    /// Description of what the tool does.
    pub description: String,
    /// JSON Schema for the argument object.
    pub input_schema: Value,
}

impl ToolDefinition {
    /// Creates a definition that takes no arguments.
    #[must_use]
    pub fn new(name: impl Into<String>) -> Self {
        Self {
            name: name.into(),
            description: String::new(),
            input_schema: json!({ "type": "object", "properties": {} }),
        }
    }

    /// Sets the description.
    #[must_use]
    pub fn with_description(mut self, desc: impl Into<String>) -> Self {
        self.description = desc.into();
        self
    }

    /// Sets the input schema.
    #[must_use]
    pub fn with_input_schema(mut self, schema: Value) -> Self {
        self.input_schema = schema;
        self
    }

    /// Adds a string property.
    #[must_use]
    pub fn with_string(self, name: &str, description: &str, required: bool) -> Self {
        self.with_property(name, json!({ "type": "string", "description": description }), required)
    }

    /// Adds a property with an explicit schema.
    #[must_use]
    pub fn with_property(mut self, name: &str, schema: Value, required: bool) -> Self {
        if let Some(properties) = self
            .input_schema
            .get_mut("properties")
            .and_then(Value::as_object_mut)
        {
            properties.insert(name.to_string(), schema);
        }
        if required {
            if let Some(schema) = self.input_schema.as_object_mut() {
                let list = schema.entry("required").or_insert_with(|| json!([]));
                if let Some(list) = list.as_array_mut() {
                    list.push(json!(name));
                }
            }
        }
        self
    }

    /// Names of required arguments.
    #[must_use]
    pub fn required(&self) -> Vec<&str> {
        self.input_schema
            .get("required")
            .and_then(Value::as_array)
            .map(|list| list.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }
}

/// Result envelope for transports that need a payload on failure too.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolOutput {
    /// Whether the call succeeded.
    pub success: bool,
    /// Result payload.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
    /// Error details on failure.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub error: Option<ErrorInfo>,
}

impl ToolOutput {
    /// Creates a successful output.
    #[must_use]
    pub fn ok(data: Value) -> Self {
        Self {
            success: true,
            data: Some(data),
            error: None,
        }
    }

    /// Creates a failed output.
    #[must_use]
    pub fn fail(error: ErrorInfo) -> Self {
        Self {
            success: false,
            data: None,
            error: Some(error),
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_definition_builder() {
        let def = ToolDefinition::new("qa_engineer")
            .with_description("Writes tests")
            .with_string("module_name", "Module to test", false)
            .with_string("user_request", "Request text", true);

        assert_eq!(def.required(), vec!["user_request"]);
        assert_eq!(def.input_schema["properties"]["module_name"]["type"], "string");
    }

    #[test]
    fn test_tool_output_serialization() {
        let ok = serde_json::to_value(ToolOutput::ok(json!({ "a": 1 }))).unwrap();
        assert_eq!(ok["success"], true);
        assert!(ok.get("error").is_none());

        let failed = ToolOutput::fail(ErrorInfo::new("UNKNOWN_TOOL", "nope"));
        assert!(!failed.success);
        assert_eq!(failed.error.unwrap().code, "UNKNOWN_TOOL");
    }
}
