use anyhow::{Context, Result};
use sgmcp_backends::{SearchClient, SourcegraphClient};
use sgmcp_core::config::Config;

pub fn run(config: &Config, query: &str, limit: usize) -> Result<()> {
    config.validate()?;
    let client = SourcegraphClient::new(
        config.endpoint(),
        config.upstream.token.as_deref(),
        config.timeout(),
    )?;

    let raw = client
        .search(query, limit)
        .map_err(|e| anyhow::anyhow!("Search failed: {}", e))?;
    let results = client
        .format_results(&raw, limit)
        .map_err(|e| anyhow::anyhow!("Search failed: {}", e))?;

    if results.is_empty() {
        eprintln!("No results found.");
    }
    let rendered =
        serde_json::to_string_pretty(&results).context("Failed to render search results")?;
    println!("{}", rendered);
    Ok(())
}
