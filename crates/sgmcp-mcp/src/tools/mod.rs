pub mod fetch_content;
pub mod search;
pub mod search_prompt_guide;

use serde::{Deserialize, Serialize};
use sgmcp_core::prompts::PromptCatalog;

/// MCP tool definition for tools/list response.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ToolDefinition {
    pub name: String,
    pub description: String,
    #[serde(rename = "inputSchema")]
    pub input_schema: serde_json::Value,
}

/// Return all tool definitions, described from the prompt catalogue.
pub fn list_tools(prompts: &PromptCatalog) -> Vec<ToolDefinition> {
    vec![
        search::definition(&prompts.search_description),
        fetch_content::definition(&prompts.fetch_content_description),
        search_prompt_guide::definition(&prompts.search_prompt_guide_description),
    ]
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn lists_three_tools_with_catalogue_descriptions() {
        let prompts = PromptCatalog::builtin().unwrap();
        let tools = list_tools(&prompts);
        let names: Vec<&str> = tools.iter().map(|t| t.name.as_str()).collect();
        assert_eq!(names, vec!["search", "fetch_content", "search_prompt_guide"]);
        assert_eq!(tools[0].description, prompts.search_description);
        assert_eq!(tools[1].description, prompts.fetch_content_description);
        assert_eq!(
            tools[2].description,
            prompts.search_prompt_guide_description
        );
    }

    #[test]
    fn every_schema_is_an_object_with_required_fields() {
        let prompts = PromptCatalog::builtin().unwrap();
        for tool in list_tools(&prompts) {
            assert_eq!(tool.input_schema["type"], "object", "{}", tool.name);
            let required = tool.input_schema["required"].as_array().unwrap();
            assert!(!required.is_empty(), "{} has no required args", tool.name);
            for field in required {
                let field = field.as_str().unwrap();
                assert!(
                    tool.input_schema["properties"].get(field).is_some(),
                    "{} requires undeclared {}",
                    tool.name,
                    field
                );
            }
        }
    }
}
