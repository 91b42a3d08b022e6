//! HTTP transports for the MCP server.
//!
//! Two listeners share one [`McpServer`]:
//! - streamable HTTP: `POST {mcp_path}` answers each JSON-RPC message inline
//! - SSE: `GET /sse` opens an event stream, `POST /messages/?session_id=..`
//!   dispatches and pushes the response onto that stream
//!
//! Both expose `GET /health`.

use crate::lifecycle;
use crate::protocol::{self, JsonRpcRequest, JsonRpcResponse};
use crate::server::McpServer;
use axum::body::Bytes;
use axum::extract::{Query, State};
use axum::http::StatusCode;
use axum::response::sse::{Event, KeepAlive, Sse};
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use futures::stream::{self, Stream, StreamExt};
use serde::Deserialize;
use serde_json::{Value, json};
use sgmcp_core::config::ServerConfig;
use std::collections::HashMap;
use std::convert::Infallible;
use std::sync::{Arc, Mutex, MutexGuard};
use thiserror::Error;
use tokio::net::TcpListener;
use tokio::sync::mpsc;
use tracing::{debug, info, warn};
use uuid::Uuid;

/// Buffered responses per SSE session before a POST waits for the client.
const SESSION_CHANNEL_CAPACITY: usize = 32;

#[derive(Error, Debug)]
pub enum TransportError {
    #[error("failed to bind {addr}: {source}")]
    Bind {
        addr: String,
        source: std::io::Error,
    },

    #[error("server error: {0}")]
    Serve(#[from] std::io::Error),
}

/// Shared state for both HTTP transports.
pub struct HttpState {
    server: Arc<McpServer>,
    sessions: Mutex<HashMap<String, mpsc::Sender<String>>>,
}

impl HttpState {
    pub fn new(server: Arc<McpServer>) -> Self {
        Self {
            server,
            sessions: Mutex::new(HashMap::new()),
        }
    }

    fn sessions(&self) -> MutexGuard<'_, HashMap<String, mpsc::Sender<String>>> {
        self.sessions
            .lock()
            .unwrap_or_else(|poisoned| poisoned.into_inner())
    }

    fn session_sender(&self, session_id: &str) -> Option<mpsc::Sender<String>> {
        self.sessions().get(session_id).cloned()
    }
}

/// Bind both listeners, start the signal watcher, and serve until either
/// listener fails.
pub async fn run_servers(
    config: &ServerConfig,
    server: Arc<McpServer>,
) -> Result<(), TransportError> {
    let sse_addr = format!("{}:{}", config.bind, config.sse_port);
    let http_addr = format!("{}:{}", config.bind, config.streamable_http_port);
    let sse_listener = bind(&sse_addr).await?;
    let http_listener = bind(&http_addr).await?;

    tokio::spawn(lifecycle::watch_signals(Arc::clone(server.lifecycle())));

    let state = Arc::new(HttpState::new(server));
    let sse_app = sse_router(Arc::clone(&state));
    let http_app = streamable_router(state, &config.mcp_path);

    info!(addr = %sse_addr, "SSE transport listening");
    info!(addr = %http_addr, path = %config.mcp_path, "Streamable HTTP transport listening");

    tokio::try_join!(
        async { axum::serve(sse_listener, sse_app).await },
        async { axum::serve(http_listener, http_app).await },
    )?;
    Ok(())
}

async fn bind(addr: &str) -> Result<TcpListener, TransportError> {
    TcpListener::bind(addr)
        .await
        .map_err(|source| TransportError::Bind {
            addr: addr.to_string(),
            source,
        })
}

pub fn streamable_router(state: Arc<HttpState>, mcp_path: &str) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route(mcp_path, post(streamable_handler))
        .with_state(state)
}

pub fn sse_router(state: Arc<HttpState>) -> Router {
    Router::new()
        .route("/health", get(health_handler))
        .route("/sse", get(sse_handler))
        .route("/messages/", post(messages_handler))
        .with_state(state)
}

/// GET /health
async fn health_handler(State(state): State<Arc<HttpState>>) -> Json<Value> {
    Json(json!({
        "status": state.server.lifecycle().status_label(),
        "version": env!("CARGO_PKG_VERSION"),
        "uptime_seconds": state.server.uptime().as_secs(),
    }))
}

/// POST {mcp_path}
async fn streamable_handler(State(state): State<Arc<HttpState>>, body: Bytes) -> Response {
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    match dispatch(&state, request).await {
        Ok(Some(response)) => Json(response).into_response(),
        Ok(None) => StatusCode::ACCEPTED.into_response(),
        Err(response) => Json(response).into_response(),
    }
}

/// GET /sse
async fn sse_handler(
    State(state): State<Arc<HttpState>>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session_id = Uuid::new_v4().simple().to_string();
    let (tx, rx) = mpsc::channel::<String>(SESSION_CHANNEL_CAPACITY);
    state.sessions().insert(session_id.clone(), tx);
    debug!(session_id = %session_id, "SSE session opened");

    let endpoint = Event::default()
        .event("endpoint")
        .data(format!("/messages/?session_id={}", session_id));
    let guard = SessionGuard {
        state: Arc::clone(&state),
        session_id,
    };

    let messages = stream::unfold((rx, guard), |(mut rx, guard)| async move {
        let message = rx.recv().await?;
        let event = Event::default().event("message").data(message);
        Some((Ok(event), (rx, guard)))
    });

    Sse::new(stream::once(async move { Ok(endpoint) }).chain(messages))
        .keep_alive(KeepAlive::default())
}

/// Drops the session from the table when its event stream goes away.
struct SessionGuard {
    state: Arc<HttpState>,
    session_id: String,
}

impl Drop for SessionGuard {
    fn drop(&mut self) {
        self.state.sessions().remove(&self.session_id);
        debug!(session_id = %self.session_id, "SSE session closed");
    }
}

#[derive(Debug, Deserialize)]
struct SessionQuery {
    session_id: String,
}

/// POST /messages/?session_id=..
///
/// Acknowledges with 202 once the message parses; the response is pushed onto
/// the session's event stream when dispatch finishes.
async fn messages_handler(
    State(state): State<Arc<HttpState>>,
    Query(query): Query<SessionQuery>,
    body: Bytes,
) -> Response {
    let Some(sender) = state.session_sender(&query.session_id) else {
        return (StatusCode::NOT_FOUND, "Could not find session").into_response();
    };
    let request = match parse_request(&body) {
        Ok(request) => request,
        Err(response) => return response,
    };

    let session_id = query.session_id;
    tokio::spawn(async move {
        let response = match dispatch(&state, request).await {
            Ok(Some(response)) | Err(response) => response,
            Ok(None) => return,
        };
        push_response(&sender, &session_id, &response).await;
    });
    (StatusCode::ACCEPTED, "Accepted").into_response()
}

async fn push_response(
    sender: &mpsc::Sender<String>,
    session_id: &str,
    response: &JsonRpcResponse,
) {
    let text = match serde_json::to_string(response) {
        Ok(text) => text,
        Err(e) => {
            warn!(error = %e, "Failed to serialize response");
            return;
        }
    };
    if sender.send(text).await.is_err() {
        warn!(session_id, "SSE stream closed before response");
    }
}

fn parse_request(body: &[u8]) -> Result<JsonRpcRequest, Response> {
    serde_json::from_slice(body).map_err(|e| {
        let response =
            JsonRpcResponse::error(None, protocol::PARSE_ERROR, format!("Parse error: {}", e));
        (StatusCode::BAD_REQUEST, Json(response)).into_response()
    })
}

/// Run the dispatcher off the async workers. `Err` carries an internal-error
/// response when the blocking task itself failed.
async fn dispatch(
    state: &Arc<HttpState>,
    request: JsonRpcRequest,
) -> Result<Option<JsonRpcResponse>, JsonRpcResponse> {
    let id = request.id.clone();
    let server = Arc::clone(&state.server);
    tokio::task::spawn_blocking(move || server.handle_request(&request))
        .await
        .map_err(|e| {
            JsonRpcResponse::error(
                id,
                protocol::INTERNAL_ERROR,
                format!("Internal error: {}", e),
            )
        })
}
