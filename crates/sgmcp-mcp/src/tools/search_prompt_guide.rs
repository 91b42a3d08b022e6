use super::ToolDefinition;
use serde_json::json;

pub const NAME: &str = "search_prompt_guide";

pub fn definition(description: &str) -> ToolDefinition {
    ToolDefinition {
        name: NAME.into(),
        description: description.into(),
        input_schema: json!({
            "type": "object",
            "properties": {
                "objective": {
                    "type": "string",
                    "description": "What the search should find, in plain language"
                }
            },
            "required": ["objective"]
        }),
    }
}
