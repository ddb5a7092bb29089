//! Tool definitions as advertised to the model.
//!
//! Lives here rather than in the tools crate so the model-backend crate
//! can serialize definitions without depending on tool implementations.

use std::collections::HashMap;

use serde::{Deserialize, Serialize};
use serde_json::Value;

/// JSON-schema-shaped description of a tool's input.
#[derive(Debug, Clone, Default, PartialEq, Serialize, Deserialize)]
pub struct ToolParameterSchema {
    /// Schema type, normally `"object"`.
    #[serde(rename = "type")]
    pub schema_type: String,
    /// Property schemas keyed by parameter name.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub properties: Option<HashMap<String, Value>>,
    /// Required parameter names.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub required: Option<Vec<String>>,
    /// Schema-level description.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
    /// Any further JSON-schema keywords, passed through untouched.
    #[serde(flatten)]
    pub extra: HashMap<String, Value>,
}

impl ToolParameterSchema {
    /// An object schema with no declared properties.
    #[must_use]
    pub fn empty_object() -> Self {
        Self {
            schema_type: "object".to_string(),
            ..Self::default()
        }
    }
}

/// A tool definition: what the model sees, not how it runs.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,
    /// What the tool does, for the model.
    pub description: String,
    /// Input schema.
    pub parameters: ToolParameterSchema,
}
