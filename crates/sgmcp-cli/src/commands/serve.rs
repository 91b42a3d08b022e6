use anyhow::{Context, Result};
use clap::Args;
use sgmcp_backends::{SourcegraphClient, SourcegraphContentFetcher};
use sgmcp_core::config::Config;
use sgmcp_core::prompts::PromptCatalog;
use sgmcp_mcp::{Lifecycle, McpServer};
use std::sync::Arc;
use tracing::info;

/// Flags that override the loaded configuration for this run.
#[derive(Args, Debug, Default)]
pub struct ServeArgs {
    /// Sourcegraph instance URL (overrides SRC_ENDPOINT)
    #[arg(long)]
    pub endpoint: Option<String>,

    /// Sourcegraph access token (overrides SRC_ACCESS_TOKEN)
    #[arg(long)]
    pub token: Option<String>,

    /// Port for the SSE transport
    #[arg(long)]
    pub sse_port: Option<u16>,

    /// Port for the streamable HTTP transport
    #[arg(long)]
    pub http_port: Option<u16>,

    /// Bind address for both listeners
    #[arg(long)]
    pub bind: Option<String>,

    /// Prompt catalogue TOML replacing the built-in one
    #[arg(long)]
    pub prompts: Option<String>,
}

impl ServeArgs {
    fn apply(self, config: &mut Config) {
        if let Some(endpoint) = self.endpoint {
            config.upstream.endpoint = endpoint;
        }
        if let Some(token) = self.token.filter(|t| !t.trim().is_empty()) {
            config.upstream.token = Some(token);
        }
        if let Some(port) = self.sse_port {
            config.server.sse_port = port;
        }
        if let Some(port) = self.http_port {
            config.server.streamable_http_port = port;
        }
        if let Some(bind) = self.bind {
            config.server.bind = bind;
        }
        if let Some(prompts) = self.prompts {
            config.prompts.file = Some(prompts);
        }
    }
}

/// Start both MCP transports and block until a listener fails.
pub fn run(mut config: Config, args: ServeArgs) -> Result<()> {
    args.apply(&mut config);
    config.validate()?;

    let prompts =
        PromptCatalog::resolve(&config.prompts).context("Failed to load prompt catalogue")?;
    let token = config.upstream.token.as_deref();
    let search = SourcegraphClient::new(config.endpoint(), token, config.timeout())?;
    let content = SourcegraphContentFetcher::new(config.endpoint(), token, config.timeout())?;

    // Backends use a blocking HTTP client; keep the last handle outside the runtime.
    let server = Arc::new(McpServer::new(
        Arc::new(search),
        Arc::new(content),
        prompts,
        Arc::new(Lifecycle::new()),
    ));

    info!(
        endpoint = config.endpoint(),
        authenticated = config.upstream.token.is_some(),
        "Starting Sourcegraph MCP server"
    );

    let rt = tokio::runtime::Runtime::new().context("Failed to create tokio runtime")?;
    let result = rt.block_on(sgmcp_mcp::run_servers(&config.server, Arc::clone(&server)));
    drop(rt);
    drop(server);

    result.map_err(|e| anyhow::anyhow!("MCP server error: {}", e))
}
