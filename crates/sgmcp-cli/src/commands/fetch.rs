use anyhow::Result;
use sgmcp_backends::{ContentFetcher, SourcegraphContentFetcher};
use sgmcp_core::config::Config;
use sgmcp_core::error::FetchError;
use sgmcp_core::types::ContentRequest;

pub fn run(config: &Config, repo: &str, path: &str, depth: usize, r#ref: &str) -> Result<()> {
    config.validate()?;
    let fetcher = SourcegraphContentFetcher::new(
        config.endpoint(),
        config.upstream.token.as_deref(),
        config.timeout(),
    )?;

    let request = ContentRequest::new(repo)
        .with_path(path)
        .with_depth(depth)
        .with_ref(r#ref);
    let content = fetcher.get_content(&request).map_err(|e| match e {
        FetchError::NotFound { .. } => anyhow::anyhow!("{}. Check the repository name, path and ref.", e),
        other => anyhow::anyhow!("Fetch failed: {}", other),
    })?;

    print!("{}", content);
    if !content.ends_with('\n') {
        println!();
    }
    Ok(())
}
