use std::sync::Arc;

use rmcp::model::{JsonObject, Tool};
use serde_json::{json, Value};

use crate::core::error::RegistryError;
use crate::domain::DEFAULT_MAX_RESULTS;

pub const WEB_SEARCH: &str = "web_search";

/// Static description of one callable tool.
#[derive(Debug, Clone, PartialEq)]
pub struct ToolDescriptor {
    pub name: &'static str,
    pub description: &'static str,
    pub input_schema: JsonObject,
}

impl ToolDescriptor {
    pub fn to_mcp_tool(&self) -> Tool {
        Tool::new(self.name, self.description, Arc::new(self.input_schema.clone()))
    }
}

/// Ordered, name-unique set of tool descriptors advertised on discovery.
#[derive(Debug, Clone, Default)]
pub struct ToolRegistry {
    tools: Arc<Vec<ToolDescriptor>>,
}

impl ToolRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn register(&mut self, tool: ToolDescriptor) -> Result<(), RegistryError> {
        if self.get(tool.name).is_some() {
            return Err(RegistryError::DuplicateTool(tool.name.to_string()));
        }
        Arc::make_mut(&mut self.tools).push(tool);
        Ok(())
    }

    pub fn list_tools(&self) -> &[ToolDescriptor] {
        tracing::info!(count = self.tools.len(), "listing available tools");
        &self.tools
    }

    pub fn get(&self, name: &str) -> Option<&ToolDescriptor> {
        self.tools.iter().find(|t| t.name == name)
    }

    pub fn names(&self) -> Vec<&'static str> {
        self.tools.iter().map(|t| t.name).collect()
    }
}

pub fn web_search_descriptor() -> ToolDescriptor {
    ToolDescriptor {
        name: WEB_SEARCH,
        description: "Search the web using DuckDuckGo. No API key required.",
        input_schema: object_schema(json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Search query string"
                },
                "max_results": {
                    "type": "integer",
                    "description": format!("Maximum number of results to return (default: {DEFAULT_MAX_RESULTS})"),
                    "default": DEFAULT_MAX_RESULTS,
                    "minimum": 1
                }
            },
            "required": ["query"]
        })),
    }
}

/// The registry served by default: just `web_search`.
pub fn build_registry() -> ToolRegistry {
    ToolRegistry {
        tools: Arc::new(vec![web_search_descriptor()]),
    }
}

fn object_schema(v: Value) -> JsonObject {
    match v {
        Value::Object(map) => map,
        _ => JsonObject::new(),
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn default_registry_lists_only_web_search() {
        let reg = build_registry();
        let tools = reg.list_tools();
        assert_eq!(tools.len(), 1);
        assert_eq!(tools[0].name, "web_search");
        assert_eq!(tools[0].input_schema["required"], json!(["query"]));
        assert_eq!(tools[0].input_schema["properties"]["max_results"]["default"], 5);
    }

    #[test]
    fn alias_is_not_advertised() {
        assert!(build_registry().get("search").is_none());
    }

    #[test]
    fn register_appends_and_rejects_duplicates() {
        let mut reg = build_registry();
        reg.register(ToolDescriptor {
            name: "news_search",
            description: "news",
            input_schema: JsonObject::new(),
        })
        .unwrap();
        assert_eq!(reg.names(), vec!["web_search", "news_search"]);

        let err = reg.register(web_search_descriptor()).unwrap_err();
        assert_eq!(err, RegistryError::DuplicateTool("web_search".into()));
    }

    #[test]
    fn mcp_tool_serializes_with_input_schema() {
        let tool = web_search_descriptor().to_mcp_tool();
        let v = serde_json::to_value(&tool).unwrap();
        assert_eq!(v["name"], "web_search");
        assert_eq!(v["inputSchema"]["type"], "object");
        assert_eq!(v["inputSchema"]["properties"]["query"]["type"], "string");
    }
}
