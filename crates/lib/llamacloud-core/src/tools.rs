//! Published tool metadata.

use std::collections::HashMap;

use serde::Serialize;
use serde_json::{Map, Value, json};
use thiserror::Error;

use crate::spec::ToolDefinition;

const QUERY_DESCRIPTION: &str = "The query used to get information about the index.";

#[derive(Debug, Error, Clone, PartialEq, Eq)]
pub enum RegistryError {
    #[error(
        "indexes {first:?} and {second:?} both map to tool name {tool_name}; rename one of them"
    )]
    DuplicateToolName {
        tool_name: String,
        first: String,
        second: String,
    },
}

impl RegistryError {
    #[must_use]
    pub const fn code(&self) -> &'static str {
        match self {
            Self::DuplicateToolName { .. } => "DUPLICATE_TOOL_NAME",
        }
    }
}

/// Discovery entry for a single tool.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDescriptor {
    pub name: String,
    pub description: String,
    pub input_schema: Map<String, Value>,
}

impl ToolDescriptor {
    fn for_definition(definition: &ToolDefinition) -> Self {
        Self {
            name: definition.tool_name.clone(),
            description: format!(
                "Get information from the {} index. The index contains {}",
                definition.index_name, definition.description
            ),
            input_schema: query_schema(),
        }
    }
}

fn query_schema() -> Map<String, Value> {
    let schema = json!({
        "type": "object",
        "properties": {
            "query": {
                "type": "string",
                "description": QUERY_DESCRIPTION,
            }
        },
        "required": ["query"],
    });
    match schema {
        Value::Object(map) => map,
        _ => Map::new(),
    }
}

/// Read-only set of tool definitions, in command-line order.
///
/// Descriptors are computed once so repeated discovery calls return the same
/// payload.
#[derive(Debug, Clone)]
pub struct ToolRegistry {
    definitions: Vec<ToolDefinition>,
    descriptors: Vec<ToolDescriptor>,
    by_name: HashMap<String, usize>,
}

impl ToolRegistry {
    /// Builds the registry, rejecting definitions that share a tool name.
    ///
    /// # Errors
    /// Returns [`RegistryError::DuplicateToolName`] on the first collision.
    pub fn new(definitions: Vec<ToolDefinition>) -> Result<Self, RegistryError> {
        let mut by_name = HashMap::with_capacity(definitions.len());
        for (position, definition) in definitions.iter().enumerate() {
            if let Some(&existing) = by_name.get(&definition.tool_name) {
                let first: &ToolDefinition = &definitions[existing];
                return Err(RegistryError::DuplicateToolName {
                    tool_name: definition.tool_name.clone(),
                    first: first.index_name.clone(),
                    second: definition.index_name.clone(),
                });
            }
            by_name.insert(definition.tool_name.clone(), position);
        }

        let descriptors = definitions
            .iter()
            .map(ToolDescriptor::for_definition)
            .collect();

        Ok(Self {
            definitions,
            descriptors,
            by_name,
        })
    }

    #[must_use]
    pub fn definitions(&self) -> &[ToolDefinition] {
        &self.definitions
    }

    /// Discovery payload, one descriptor per definition.
    #[must_use]
    pub fn descriptors(&self) -> &[ToolDescriptor] {
        &self.descriptors
    }

    #[must_use]
    pub fn by_name(&self, tool_name: &str) -> Option<&ToolDefinition> {
        self.by_name
            .get(tool_name)
            .map(|&position| &self.definitions[position])
    }

    #[must_use]
    pub const fn len(&self) -> usize {
        self.definitions.len()
    }

    #[must_use]
    pub const fn is_empty(&self) -> bool {
        self.definitions.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn registry() -> ToolRegistry {
        ToolRegistry::new(vec![
            ToolDefinition::new("Docs", "the company handbook", None),
            ToolDefinition::new("Sales Q3", "quarterly sales notes", None),
        ])
        .expect("names are distinct")
    }

    #[test]
    fn descriptors_follow_definition_order() {
        let registry = registry();
        let names: Vec<_> = registry
            .descriptors()
            .iter()
            .map(|descriptor| descriptor.name.as_str())
            .collect();
        assert_eq!(names, ["get_information_docs", "get_information_sales_q3"]);
    }

    #[test]
    fn descriptor_embeds_index_and_description() {
        let registry = registry();
        let descriptor = &registry.descriptors()[0];
        assert_eq!(
            descriptor.description,
            "Get information from the Docs index. The index contains the company handbook"
        );
        assert_eq!(descriptor.input_schema["type"], "object");
        assert_eq!(descriptor.input_schema["required"], json!(["query"]));
        assert_eq!(
            descriptor.input_schema["properties"]["query"]["type"],
            "string"
        );
    }

    #[test]
    fn descriptors_are_stable_across_calls() {
        let registry = registry();
        assert_eq!(registry.descriptors(), registry.descriptors());
        let serialized = serde_json::to_value(registry.descriptors()).expect("serializes");
        assert_eq!(
            serialized,
            serde_json::to_value(registry.descriptors()).expect("serializes")
        );
        assert!(serialized[0].get("inputSchema").is_some());
    }

    #[test]
    fn lookup_by_tool_name() {
        let registry = registry();
        let definition = registry
            .by_name("get_information_sales_q3")
            .expect("tool is registered");
        assert_eq!(definition.index_name, "Sales Q3");
        assert!(registry.by_name("get_information_unknown").is_none());
        assert_eq!(registry.len(), 2);
    }

    #[test]
    fn colliding_slugs_are_rejected() {
        let err = ToolRegistry::new(vec![
            ToolDefinition::new("My Index", "first", None),
            ToolDefinition::new("my-index", "second", None),
        ])
        .unwrap_err();

        assert_eq!(
            err,
            RegistryError::DuplicateToolName {
                tool_name: "get_information_my_index".to_string(),
                first: "My Index".to_string(),
                second: "my-index".to_string(),
            }
        );
        assert_eq!(err.code(), "DUPLICATE_TOOL_NAME");
    }

    #[test]
    fn repeated_index_is_rejected() {
        let err = ToolRegistry::new(vec![
            ToolDefinition::new("Docs", "first", None),
            ToolDefinition::new("Docs", "again", None),
        ])
        .unwrap_err();
        assert!(err.to_string().contains("get_information_docs"));
    }
}
