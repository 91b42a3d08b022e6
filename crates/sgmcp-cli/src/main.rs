mod commands;

use clap::{Parser, Subcommand};
use sgmcp_core::config::Config;
use sgmcp_core::constants;
use std::path::{Path, PathBuf};
use tracing::debug;
use tracing_subscriber::EnvFilter;

#[derive(Parser)]
#[command(
    name = "sgmcp",
    version,
    about = "Sourcegraph code search as MCP tools for AI agents",
    long_about = "sgmcp exposes a Sourcegraph instance to AI agents as three MCP tools:\n\
        search, fetch_content and search_prompt_guide.\n\n\
        Quick start:\n  \
        export SRC_ENDPOINT=https://sourcegraph.example.com\n  \
        export SRC_ACCESS_TOKEN=sgp_...\n  \
        sgmcp serve\n  \
        sgmcp search \"repo:github.com/acme/widget lang:go TODO\""
)]
struct Cli {
    /// Enable verbose logging (set log level to debug)
    #[arg(short, long, global = true)]
    verbose: bool,

    /// Path to config file (default: ~/.sgmcp/config.toml)
    #[arg(long, global = true)]
    config: Option<String>,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Run the MCP server (SSE and streamable HTTP transports)
    ///
    /// SIGINT/SIGTERM switch the server to draining: new searches are
    /// declined while the listeners stay up until the process is stopped.
    ///
    /// Example: sgmcp serve --endpoint https://sourcegraph.example.com
    Serve(commands::serve::ServeArgs),
    /// Run a single search and print the formatted results as JSON
    ///
    /// Example: sgmcp search "repo:github.com/acme/widget lang:go TODO"
    Search {
        /// Sourcegraph query
        query: String,

        /// Max files to return
        #[arg(short, long, default_value_t = constants::SEARCH_RESULT_LIMIT)]
        limit: usize,
    },
    /// Print a file, or a directory listing, from a repository
    ///
    /// Examples:
    ///   sgmcp fetch github.com/acme/widget go.mod
    ///   sgmcp fetch github.com/acme/widget cmd --depth 3
    Fetch {
        /// Repository name, e.g. github.com/acme/widget
        repo: String,

        /// Path inside the repository (default: repository root)
        #[arg(default_value = "")]
        path: String,

        /// Directory listing depth
        #[arg(long, default_value_t = constants::DEFAULT_TREE_DEPTH)]
        depth: usize,

        /// Revision to read from
        #[arg(long, default_value = constants::DEFAULT_REF)]
        r#ref: String,
    },
    /// Print the query-writing guide for an objective
    ///
    /// Example: sgmcp guide "find auth middleware"
    Guide {
        /// What the search should find
        objective: String,
    },
}

/// Load a `.env` file (the nearest one up from the working directory when
/// `path` is `None`). Variables already set in the environment win.
fn load_env_file(path: Option<&Path>) -> Option<PathBuf> {
    match path {
        Some(path) => dotenvy::from_path(path).ok().map(|()| path.to_path_buf()),
        None => dotenvy::dotenv().ok(),
    }
}

fn main() -> anyhow::Result<()> {
    let env_file = load_env_file(None);
    let cli = Cli::parse();

    let config_file = cli.config.as_deref().map(Path::new);
    let config = Config::load_with_file(config_file)?;

    // Set up tracing
    let filter = if cli.verbose {
        "debug"
    } else {
        config.logging.level.as_str()
    };
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(filter)),
        )
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
    if let Some(path) = env_file {
        debug!(path = %path.display(), "Loaded environment file");
    }

    match cli.command {
        Commands::Serve(args) => commands::serve::run(config, args)?,
        Commands::Search { query, limit } => commands::search::run(&config, &query, limit)?,
        Commands::Fetch {
            repo,
            path,
            depth,
            r#ref,
        } => commands::fetch::run(&config, &repo, &path, depth, &r#ref)?,
        Commands::Guide { objective } => commands::guide::run(&config, &objective)?,
    }

    Ok(())
}
