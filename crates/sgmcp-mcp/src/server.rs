use crate::lifecycle::Lifecycle;
use crate::protocol::{self, JsonRpcRequest, JsonRpcResponse};
use crate::tools;
use serde_json::{Value, json};
use sgmcp_backends::{ContentFetcher, SearchClient};
use sgmcp_core::constants;
use sgmcp_core::error::{FetchError, SearchError, ToolError};
use sgmcp_core::prompts::PromptCatalog;
use sgmcp_core::types::{ContentRequest, FormattedResult};
use std::sync::Arc;
use std::time::{Duration, Instant};
use tracing::{debug, error, info, warn};

use self::tool_calls::handle_tool_call;

/// Longest slice of an upstream query error surfaced to callers.
const MAX_QUERY_ERROR_CHARS: usize = 200;

/// Tool dispatcher shared by every transport.
///
/// Holds only immutable state plus the lifecycle flag, so one instance behind
/// an `Arc` serves both listeners.
pub struct McpServer {
    search: Arc<dyn SearchClient>,
    content: Arc<dyn ContentFetcher>,
    prompts: PromptCatalog,
    lifecycle: Arc<Lifecycle>,
    started: Instant,
}

impl McpServer {
    pub fn new(
        search: Arc<dyn SearchClient>,
        content: Arc<dyn ContentFetcher>,
        prompts: PromptCatalog,
        lifecycle: Arc<Lifecycle>,
    ) -> Self {
        Self {
            search,
            content,
            prompts,
            lifecycle,
            started: Instant::now(),
        }
    }

    pub fn lifecycle(&self) -> &Arc<Lifecycle> {
        &self.lifecycle
    }

    pub fn uptime(&self) -> Duration {
        self.started.elapsed()
    }

    /// Dispatch one JSON-RPC message. Notifications get no response.
    pub fn handle_request(&self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        if request.is_notification() {
            debug!(method = %request.method, "Notification received");
            return None;
        }

        let response = match request.method.as_str() {
            "initialize" => {
                let protocol_version = request
                    .params
                    .get("protocolVersion")
                    .and_then(Value::as_str)
                    .unwrap_or(constants::MCP_PROTOCOL_VERSION);
                JsonRpcResponse::success(
                    request.id.clone(),
                    json!({
                        "protocolVersion": protocol_version,
                        "capabilities": {
                            "tools": {}
                        },
                        "serverInfo": {
                            "name": constants::SERVER_NAME,
                            "version": env!("CARGO_PKG_VERSION")
                        }
                    }),
                )
            }
            "ping" => JsonRpcResponse::success(request.id.clone(), json!({})),
            "tools/list" => {
                let tools = tools::list_tools(&self.prompts);
                JsonRpcResponse::success(request.id.clone(), json!({ "tools": tools }))
            }
            "tools/call" => {
                let Some(tool_name) = request.params.get("name").and_then(Value::as_str) else {
                    return Some(JsonRpcResponse::error(
                        request.id.clone(),
                        protocol::INVALID_PARAMS,
                        "Missing tool name".into(),
                    ));
                };
                let arguments = request
                    .params
                    .get("arguments")
                    .cloned()
                    .unwrap_or(json!({}));
                handle_tool_call(self, request.id.clone(), tool_name, &arguments)
            }
            _ => JsonRpcResponse::error(
                request.id.clone(),
                protocol::METHOD_NOT_FOUND,
                format!("Method not found: {}", request.method),
            ),
        };
        Some(response)
    }

    /// Outcome of a tool call that arrives while draining, decided before
    /// any argument is read. `None` while accepting.
    pub(crate) fn drain_outcome(&self, tool: &str) -> Option<Result<String, ToolError>> {
        if !self.lifecycle.is_draining() {
            return None;
        }
        info!(tool, "Shutdown in progress, declining request");
        if tool == tools::fetch_content::NAME {
            Some(Ok(String::new()))
        } else {
            Some(Err(ToolError::ServiceUnavailable))
        }
    }

    /// Run a code search with the fixed result cap.
    pub fn search(&self, query: &str) -> Result<Vec<FormattedResult>, ToolError> {
        if let Some(Err(err)) = self.drain_outcome(tools::search::NAME) {
            return Err(err);
        }

        let limit = constants::SEARCH_RESULT_LIMIT;
        let raw = self
            .search
            .search(query, limit)
            .map_err(|e| map_search_error(query, e))?;
        let results = self
            .search
            .format_results(&raw, limit)
            .map_err(|e| map_search_error(query, e))?;
        debug!(query, results = results.len(), "Search complete");
        Ok(results)
    }

    /// Fetch a file or directory listing. Empty text while draining.
    pub fn fetch_content(&self, repo: &str, path: &str) -> Result<String, ToolError> {
        if let Some(outcome) = self.drain_outcome(tools::fetch_content::NAME) {
            return outcome;
        }

        let request = ContentRequest::new(repo).with_path(path);
        self.content
            .get_content(&request)
            .map_err(|e| map_fetch_error(repo, e))
    }

    pub fn search_prompt_guide(&self, objective: &str) -> Result<String, ToolError> {
        if let Some(outcome) = self.drain_outcome(tools::search_prompt_guide::NAME) {
            return outcome;
        }
        Ok(self.prompts.search_prompt_guide(objective))
    }
}

/// Client faults are logged at `warn`, everything else at `error`.
fn log_tool_error(tool: &str, subject: &str, err: &ToolError, detail: &str) {
    if err.is_client_fault() {
        warn!(tool, subject, code = %err.code(), error = %detail, "Tool call rejected");
    } else {
        error!(tool, subject, code = %err.code(), error = %detail, "Tool call failed");
    }
}

fn map_search_error(query: &str, err: SearchError) -> ToolError {
    let (mapped, detail) = match err {
        SearchError::InvalidQuery(detail) => {
            let summary: String = detail
                .lines()
                .next()
                .unwrap_or_default()
                .chars()
                .take(MAX_QUERY_ERROR_CHARS)
                .collect();
            (
                ToolError::InvalidQuery(format!("Invalid query: {}", summary)),
                detail,
            )
        }
        SearchError::Upstream(detail) => (
            ToolError::Upstream("Search failed: upstream error".into()),
            detail,
        ),
        SearchError::Malformed(detail) => (
            ToolError::Internal("Search failed: unexpected response".into()),
            detail,
        ),
    };
    log_tool_error(tools::search::NAME, query, &mapped, &detail);
    mapped
}

fn map_fetch_error(repo: &str, err: FetchError) -> ToolError {
    let detail = err.to_string();
    let mapped = match err {
        FetchError::NotFound { .. } => ToolError::InvalidArguments(
            "Invalid arguments: path or repository does not exist".into(),
        ),
        FetchError::Upstream(_) => ToolError::Upstream("Error fetching content".into()),
        FetchError::Malformed(_) => ToolError::Internal("Error fetching content".into()),
    };
    log_tool_error(tools::fetch_content::NAME, repo, &mapped, &detail);
    mapped
}

mod tool_calls;
