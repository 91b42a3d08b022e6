//! Tool descriptions and query-writing guides.
//!
//! The catalogue is a TOML document with a `[guides]` table (`codesearch_guide`,
//! optional `org_guide`) and a `[tools]` table holding one description per tool.

use crate::config::PromptsConfig;
use crate::error::ConfigError;
use serde::Deserialize;
use std::path::Path;
use tracing::debug;

const BUILTIN_PROMPTS: &str = include_str!("../prompts/prompts.toml");

#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PromptCatalog {
    pub codesearch_guide: String,
    pub org_guide: Option<String>,
    pub search_description: String,
    pub fetch_content_description: String,
    pub search_prompt_guide_description: String,
}

#[derive(Debug, Default, Deserialize)]
struct RawCatalog {
    #[serde(default)]
    guides: RawGuides,
    #[serde(default)]
    tools: RawTools,
}

#[derive(Debug, Default, Deserialize)]
struct RawGuides {
    codesearch_guide: Option<String>,
    org_guide: Option<String>,
}

#[derive(Debug, Default, Deserialize)]
struct RawTools {
    search: Option<String>,
    fetch_content: Option<String>,
    search_prompt_guide: Option<String>,
}

impl PromptCatalog {
    /// The catalogue compiled into the binary.
    pub fn builtin() -> Result<Self, ConfigError> {
        Self::from_toml_str(BUILTIN_PROMPTS, "built-in prompts")
    }

    pub fn load(path: &Path) -> Result<Self, ConfigError> {
        if !path.exists() {
            return Err(ConfigError::NotFound {
                path: path.display().to_string(),
            });
        }
        let content = std::fs::read_to_string(path)?;
        Self::from_toml_str(&content, &path.display().to_string())
    }

    pub fn from_toml_str(content: &str, source: &str) -> Result<Self, ConfigError> {
        let raw: RawCatalog = toml::from_str(content)
            .map_err(|e| ConfigError::ParseError(format!("{}: {}", source, e)))?;

        let required = |value: Option<String>, key: &str| {
            non_blank(value)
                .ok_or_else(|| ConfigError::MissingRequired(format!("{} in {}", key, source)))
        };

        Ok(Self {
            codesearch_guide: required(raw.guides.codesearch_guide, "guides.codesearch_guide")?,
            org_guide: non_blank(raw.guides.org_guide),
            search_description: required(raw.tools.search, "tools.search")?,
            fetch_content_description: required(raw.tools.fetch_content, "tools.fetch_content")?,
            search_prompt_guide_description: required(
                raw.tools.search_prompt_guide,
                "tools.search_prompt_guide",
            )?,
        })
    }

    /// Resolve the catalogue for a server: the configured file (or the built-in
    /// catalogue), with the organization guide overridden from config if set.
    pub fn resolve(config: &PromptsConfig) -> Result<Self, ConfigError> {
        let mut catalog = match config.file.as_deref() {
            Some(file) => {
                debug!(path = file, "Loading prompt catalogue");
                Self::load(Path::new(file))?
            }
            None => Self::builtin()?,
        };

        if let Some(text) = non_blank(config.org_guide.clone()) {
            catalog.org_guide = Some(text);
        } else if let Some(file) = config.org_guide_file.as_deref() {
            let path = Path::new(file);
            if !path.exists() {
                return Err(ConfigError::NotFound {
                    path: file.to_string(),
                });
            }
            catalog.org_guide = non_blank(Some(std::fs::read_to_string(path)?));
        }

        Ok(catalog)
    }

    /// Build the query-writing instructions for `objective`: the organization
    /// guide (if any), the codesearch guide, then the objective sentence.
    pub fn search_prompt_guide(&self, objective: &str) -> String {
        let mut prompt = String::new();
        if let Some(org_guide) = &self.org_guide {
            prompt.push_str(org_guide);
            prompt.push_str("\n\n");
        }
        prompt.push_str(&self.codesearch_guide);
        prompt.push_str(&format!(
            "\nGiven this guide create a Sourcegraph query for {} and call the search tool accordingly.",
            objective
        ));
        prompt
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value.filter(|v| !v.trim().is_empty())
}
