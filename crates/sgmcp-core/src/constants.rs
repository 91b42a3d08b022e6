/// Result cap for the `search` tool. Not caller-configurable.
pub const SEARCH_RESULT_LIMIT: usize = 30;

/// Character ceiling for file content and tree listings returned by `fetch_content`.
pub const MAX_FILE_SIZE: usize = 100_000;

/// Default tree depth for directory listings.
pub const DEFAULT_TREE_DEPTH: usize = 2;

/// Revision used when the caller does not name one.
pub const DEFAULT_REF: &str = "HEAD";

/// Path of the GraphQL API below the Sourcegraph endpoint.
pub const GRAPHQL_API_PATH: &str = "/.api/graphql";

/// Default port for the SSE transport.
pub const DEFAULT_SSE_PORT: u16 = 8000;

/// Default port for the streamable HTTP transport.
pub const DEFAULT_STREAMABLE_HTTP_PORT: u16 = 8080;

/// Route of the streamable HTTP MCP endpoint.
pub const DEFAULT_MCP_PATH: &str = "/sourcegraph/mcp";

/// Default bind address for both transports.
pub const DEFAULT_BIND_ADDR: &str = "0.0.0.0";

/// Upstream request timeout.
pub const DEFAULT_HTTP_TIMEOUT_SECS: u64 = 30;

/// Default data directory name under home.
pub const DEFAULT_DATA_DIR: &str = ".sgmcp";

/// Global config file name inside the data directory.
pub const CONFIG_FILE_NAME: &str = "config.toml";

/// MCP protocol revision announced when the client does not send one.
pub const MCP_PROTOCOL_VERSION: &str = "2025-03-26";

/// Server name reported in `initialize`.
pub const SERVER_NAME: &str = "sourcegraph-mcp";
