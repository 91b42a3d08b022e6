use serde_json::Value;
use sgmcp_core::error::{FetchError, SearchError};
use sgmcp_core::types::{ContentRequest, FormattedResult};

/// Search capability: run a query, then shape the raw response.
pub trait SearchClient: Send + Sync {
    /// Execute `query` asking the upstream for at most `limit` results and
    /// return its response unmodified.
    fn search(&self, query: &str, limit: usize) -> Result<Value, SearchError>;

    /// Reduce a raw response from [`SearchClient::search`] to at most `limit`
    /// results, one per file with at least one match, in upstream order.
    fn format_results(&self, raw: &Value, limit: usize)
    -> Result<Vec<FormattedResult>, SearchError>;
}

/// Content capability: read a file or list a directory.
pub trait ContentFetcher: Send + Sync {
    /// File content if `request.path` is a file, a tree listing if it is a
    /// directory. Fails with [`FetchError::NotFound`] when the repository,
    /// revision or path does not resolve.
    fn get_content(&self, request: &ContentRequest) -> Result<String, FetchError>;
}
