use anyhow::{Context, Result};
use sgmcp_core::config::Config;
use sgmcp_core::prompts::PromptCatalog;

pub fn run(config: &Config, objective: &str) -> Result<()> {
    let prompts =
        PromptCatalog::resolve(&config.prompts).context("Failed to load prompt catalogue")?;
    println!("{}", prompts.search_prompt_guide(objective));
    Ok(())
}
