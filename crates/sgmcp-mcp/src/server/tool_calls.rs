use super::*;

type ToolRunner = fn(&McpServer, &Value) -> Result<String, ToolError>;

pub(super) fn handle_tool_call(
    server: &McpServer,
    id: Option<Value>,
    tool_name: &str,
    arguments: &Value,
) -> JsonRpcResponse {
    debug!(tool = tool_name, "Tool call");
    let Some(run) = tool_runner(tool_name) else {
        return JsonRpcResponse::error(
            id,
            protocol::INVALID_PARAMS,
            format!("Unknown tool: {}", tool_name),
        );
    };

    let outcome = server
        .drain_outcome(tool_name)
        .unwrap_or_else(|| run(server, arguments));
    match outcome {
        Ok(text) => tool_text_response(id, text),
        Err(err) => tool_error_response(id, &err),
    }
}

fn tool_runner(tool_name: &str) -> Option<ToolRunner> {
    let run: ToolRunner = match tool_name {
        tools::search::NAME => run_search,
        tools::fetch_content::NAME => run_fetch_content,
        tools::search_prompt_guide::NAME => run_search_prompt_guide,
        _ => return None,
    };
    Some(run)
}

fn run_search(server: &McpServer, arguments: &Value) -> Result<String, ToolError> {
    let query = required_str(arguments, "query")?;
    let results = server.search(query)?;
    serde_json::to_string(&results).map_err(|e| ToolError::Internal(e.to_string()))
}

fn run_fetch_content(server: &McpServer, arguments: &Value) -> Result<String, ToolError> {
    let repo = required_str(arguments, "repo")?;
    let path = optional_str(arguments, "path")?.unwrap_or_default();
    server.fetch_content(repo, path)
}

fn run_search_prompt_guide(server: &McpServer, arguments: &Value) -> Result<String, ToolError> {
    let objective = required_str(arguments, "objective")?;
    server.search_prompt_guide(objective)
}

fn required_str<'a>(arguments: &'a Value, key: &str) -> Result<&'a str, ToolError> {
    match arguments.get(key) {
        Some(Value::String(s)) => Ok(s.as_str()),
        Some(_) => Err(ToolError::InvalidInput(format!("'{}' must be a string", key))),
        None => Err(ToolError::InvalidInput(format!(
            "missing required argument '{}'",
            key
        ))),
    }
}

fn optional_str<'a>(arguments: &'a Value, key: &str) -> Result<Option<&'a str>, ToolError> {
    match arguments.get(key) {
        None | Some(Value::Null) => Ok(None),
        Some(Value::String(s)) => Ok(Some(s.as_str())),
        Some(_) => Err(ToolError::InvalidInput(format!("'{}' must be a string", key))),
    }
}

/// Helper: wrap tool output as MCP text content.
fn tool_text_response(id: Option<Value>, text: String) -> JsonRpcResponse {
    JsonRpcResponse::success(
        id,
        json!({
            "content": [{"type": "text", "text": text}]
        }),
    )
}

fn tool_error_response(id: Option<Value>, err: &ToolError) -> JsonRpcResponse {
    let payload = json!({
        "error": {
            "code": err.code().as_str(),
            "message": err.to_string(),
        }
    });
    JsonRpcResponse::success(
        id,
        json!({
            "content": [{"type": "text", "text": payload.to_string()}],
            "isError": true
        }),
    )
}
