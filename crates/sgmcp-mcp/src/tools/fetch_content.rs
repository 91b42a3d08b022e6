use super::ToolDefinition;
use serde_json::json;

pub const NAME: &str = "fetch_content";

pub fn definition(description: &str) -> ToolDefinition {
    ToolDefinition {
        name: NAME.into(),
        description: description.into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "repo": {
                    "type": "string",
                    "description": "Repository name, e.g. \"github.com/acme/widget\""
                },
                "path": {
                    "type": "string",
                    "description": "File or directory path inside the repository. Empty for the repository root."
                }
            },
            "required": ["repo"]
        }),
    }
}
