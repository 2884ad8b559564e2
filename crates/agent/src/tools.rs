use std::collections::HashMap;

use anyhow::Result;
use async_trait::async_trait;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::AgentError;

/// Tool metadata as the external session declares it.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolDescriptor {
    pub name: String,
    #[serde(default)]
    pub description: String,
    #[serde(default)]
    pub parameter_schema: Option<Map<String, Value>>,
}

/// Model-facing tool schema. `parameters` always carries a `required` list.
#[derive(Clone, Debug, PartialEq, Serialize, Deserialize)]
pub struct ToolSchema {
    pub name: String,
    pub description: String,
    pub parameters: Map<String, Value>,
}

impl ToolSchema {
    pub fn required(&self) -> Vec<&str> {
        self.parameters
            .get("required")
            .and_then(Value::as_array)
            .map(|keys| keys.iter().filter_map(Value::as_str).collect())
            .unwrap_or_default()
    }

    pub fn property_type(&self, key: &str) -> Option<&str> {
        self.parameters.get("properties")?.get(key)?.get("type")?.as_str()
    }
}

impl From<ToolSchema> for ToolDescriptor {
    fn from(schema: ToolSchema) -> Self {
        Self {
            name: schema.name,
            description: schema.description,
            parameter_schema: Some(schema.parameters),
        }
    }
}

#[derive(Clone, Copy, Debug, Default)]
pub struct ToolSchemaAdapter;

impl ToolSchemaAdapter {
    /// Order-preserving and pure. A name declared twice is a configuration
    /// error rather than something to merge.
    pub fn convert(descriptors: &[ToolDescriptor]) -> Result<Vec<ToolSchema>, AgentError> {
        let mut schemas = Vec::with_capacity(descriptors.len());
        for descriptor in descriptors {
            if schemas.iter().any(|schema: &ToolSchema| schema.name == descriptor.name) {
                return Err(AgentError::DuplicateTool(descriptor.name.clone()));
            }
            schemas.push(ToolSchema {
                name: descriptor.name.clone(),
                description: descriptor.description.clone(),
                parameters: normalize_parameters(descriptor.parameter_schema.as_ref()),
            });
        }
        Ok(schemas)
    }
}

fn normalize_parameters(schema: Option<&Map<String, Value>>) -> Map<String, Value> {
    match schema.filter(|schema| !schema.is_empty()) {
        Some(schema) => {
            let mut parameters = schema.clone();
            if !parameters.get("required").is_some_and(Value::is_array) {
                parameters.insert("required".to_string(), json!([]));
            }
            parameters
        }
        None => empty_object_schema(),
    }
}

fn empty_object_schema() -> Map<String, Value> {
    let mut parameters = Map::new();
    parameters.insert("type".to_string(), json!("object"));
    parameters.insert("properties".to_string(), json!({}));
    parameters.insert("required".to_string(), json!([]));
    parameters
}

/// Decodes a model's raw argument text. Anything that is not a JSON object
/// becomes an empty mapping.
pub fn parse_arguments(raw_arguments: &str) -> Map<String, Value> {
    match serde_json::from_str::<Value>(raw_arguments) {
        Ok(Value::Object(arguments)) => arguments,
        _ => Map::new(),
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolContent {
    pub text: Option<String>,
}

impl ToolContent {
    pub fn text(text: impl Into<String>) -> Self {
        Self { text: Some(text.into()) }
    }

    pub fn non_text() -> Self {
        Self { text: None }
    }
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct ToolResult {
    pub parts: Vec<ToolContent>,
    pub is_error: bool,
}

impl ToolResult {
    pub fn from_text(text: impl Into<String>) -> Self {
        Self { parts: vec![ToolContent::text(text)], is_error: false }
    }

    /// Concatenates every text-bearing part; parts without text are skipped.
    pub fn text(&self) -> String {
        self.parts.iter().filter_map(|part| part.text.as_deref()).collect()
    }
}

#[async_trait]
pub trait ToolInvoker: Send + Sync {
    async fn invoke(&self, name: &str, arguments: Map<String, Value>) -> Result<ToolResult>;
}

/// Schemas registered for one session, in declaration order.
#[derive(Clone, Debug, Default)]
pub struct ToolRegistry {
    schemas: Vec<ToolSchema>,
    index: HashMap<String, usize>,
}

impl ToolRegistry {
    pub fn register(&mut self, descriptors: &[ToolDescriptor]) -> Result<(), AgentError> {
        let schemas = ToolSchemaAdapter::convert(descriptors)?;
        self.index =
            schemas.iter().enumerate().map(|(position, schema)| (schema.name.clone(), position)).collect();
        self.schemas = schemas;
        Ok(())
    }

    pub fn schemas(&self) -> &[ToolSchema] {
        &self.schemas
    }

    pub fn get(&self, name: &str) -> Option<&ToolSchema> {
        self.index.get(name).and_then(|position| self.schemas.get(*position))
    }

    pub fn len(&self) -> usize {
        self.schemas.len()
    }

    pub fn is_empty(&self) -> bool {
        self.schemas.is_empty()
    }
}
