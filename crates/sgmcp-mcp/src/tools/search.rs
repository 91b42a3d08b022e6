use super::ToolDefinition;
use serde_json::json;

pub const NAME: &str = "search";

pub fn definition(description: &str) -> ToolDefinition {
    ToolDefinition {
        name: NAME.into(),
        description: description.into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "query": {
                    "type": "string",
                    "description": "Sourcegraph search query, e.g. \"repo:github.com/acme/widget lang:go TODO\""
                }
            },
            "required": ["query"]
        }),
    }
}
