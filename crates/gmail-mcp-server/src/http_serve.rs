//! HTTP transports for the MCP server.
//!
//! Two bindings share one [`McpHttpState`] and therefore one tool registry and
//! one session store.
//!
//! # Streaming channel (HTTP+SSE)
//!
//! ```text
//! Client                                 Server
//!   │                                      │
//!   │── GET /sse[?sessionId=x] ───────────►│ (open SSE stream)
//!   │◄── SSE: endpoint event ──────────────│ (/sse/message?sessionId=x)
//!   │                                      │
//!   │── POST /sse/message?sessionId=x ────►│ (JSON-RPC request, 202)
//!   │◄── SSE: message event ───────────────│ (JSON-RPC response)
//! ```
//!
//! # Single exchange
//!
//! ```text
//!   │── POST /mcp (Mcp-Session-Id: x) ────►│
//!   │◄── 200 JSON-RPC response ────────────│
//! ```
//!
//! `/` behaves like `/mcp`. Every other path answers 404.

use crate::error::McpError;
use crate::protocol::{
    error_codes, CallToolParams, InitializeResult, JsonRpcRequest, JsonRpcResponse,
    ListToolsResult, ServerCapabilities, ServerInfo, ToolsCapability, PROTOCOL_VERSION,
};
use crate::serve::{McpToolContext, ToolRegistry};
use crate::session::{Session, SessionStore};
use axum::{
    body::Bytes,
    extract::{Query, State},
    http::{HeaderMap, StatusCode},
    response::{
        sse::{Event, KeepAlive, Sse},
        IntoResponse, Json, Response,
    },
    routing::{get, post},
    Router,
};
use futures::stream::Stream;
use serde::Deserialize;
use serde_json::Value;
use std::collections::{HashMap, HashSet};
use std::convert::Infallible;
use std::sync::Arc;
use std::time::Duration;
use tokio::sync::{mpsc, RwLock};
use tower_http::cors::{Any, CorsLayer};
use tower_http::trace::TraceLayer;
use tracing::{debug, info, warn};

/// Header carrying the session identity on the single-exchange binding.
pub const SESSION_HEADER: &str = "mcp-session-id";

/// Path of the SSE message endpoint announced in the `endpoint` event.
pub const SSE_MESSAGE_PATH: &str = "/sse/message";

/// Shared state for both transport bindings.
#[derive(Clone)]
pub struct McpHttpState {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
    /// Registered tools.
    pub tools: Arc<ToolRegistry>,
    /// Session instances, keyed by identity.
    sessions: SessionStore,
    /// Open SSE streams (identity -> response channel).
    streams: Arc<RwLock<HashMap<String, mpsc::UnboundedSender<JsonRpcResponse>>>>,
}

impl McpHttpState {
    /// Create a new MCP HTTP state.
    pub fn new(name: impl Into<String>, version: impl Into<String>, tools: ToolRegistry) -> Self {
        Self {
            name: name.into(),
            version: version.into(),
            tools: Arc::new(tools),
            sessions: SessionStore::new(),
            streams: Arc::new(RwLock::new(HashMap::new())),
        }
    }

    /// The session store shared by both bindings.
    pub fn sessions(&self) -> &SessionStore {
        &self.sessions
    }

    /// Register the SSE stream for an identity, replacing any previous one.
    async fn register_stream(
        &self,
        session_id: String,
        tx: mpsc::UnboundedSender<JsonRpcResponse>,
    ) {
        let mut streams = self.streams.write().await;
        if streams.insert(session_id.clone(), tx).is_some() {
            debug!(session_id = %session_id, "Replaced existing SSE stream");
        }
        info!(session_id = %session_id, "SSE stream registered");
    }

    /// Unregister the SSE stream for an identity, if `tx` is still the current one.
    async fn unregister_stream(
        &self,
        session_id: &str,
        tx: &mpsc::UnboundedSender<JsonRpcResponse>,
    ) {
        let mut streams = self.streams.write().await;
        if streams
            .get(session_id)
            .is_some_and(|current| current.same_channel(tx))
        {
            streams.remove(session_id);
            info!(session_id = %session_id, "SSE stream unregistered");
        }
    }

    /// Whether an SSE stream is open for the identity.
    pub async fn has_stream(&self, session_id: &str) -> bool {
        self.streams.read().await.contains_key(session_id)
    }

    /// Send a response to the identity's SSE stream.
    async fn send_response(
        &self,
        session_id: &str,
        response: JsonRpcResponse,
    ) -> Result<(), McpError> {
        let streams = self.streams.read().await;
        match streams.get(session_id) {
            Some(tx) => tx
                .send(response)
                .map_err(|_| McpError::SessionNotFound(session_id.to_string())),
            None => Err(McpError::SessionNotFound(session_id.to_string())),
        }
    }

    /// Drop the session and any stream attached to it.
    pub async fn terminate(&self, session_id: &str) -> bool {
        self.streams.write().await.remove(session_id);
        self.sessions.remove(session_id).await
    }

    /// Reclaim sessions idle for `max_idle` that have no open stream.
    pub async fn reap_idle(&self, max_idle: Duration) -> usize {
        let open: HashSet<String> = self.streams.read().await.keys().cloned().collect();
        self.sessions
            .reap_idle(max_idle, |id| open.contains(id))
            .await
    }

    /// Periodically reclaim idle sessions.
    pub fn spawn_reaper(&self, max_idle: Duration) -> tokio::task::JoinHandle<()> {
        let state = self.clone();
        let period = (max_idle / 4).max(Duration::from_secs(1));
        tokio::spawn(async move {
            let mut ticker = tokio::time::interval(period);
            loop {
                ticker.tick().await;
                state.reap_idle(max_idle).await;
            }
        })
    }

    /// Handle a JSON-RPC request on behalf of `session`.
    pub async fn handle_request(
        &self,
        session: &Session,
        request: JsonRpcRequest,
    ) -> Option<JsonRpcResponse> {
        debug!(
            method = %request.method,
            id = ?request.id,
            session_id = %session.id(),
            "Handling MCP request"
        );
        session.touch();

        // Notifications (no id) don't expect a response
        let Some(id) = request.id else {
            match request.method.as_str() {
                "notifications/initialized" => debug!("Received initialized notification"),
                _ => debug!(method = %request.method, "Received unknown notification"),
            }
            return None;
        };

        let response = match request.method.as_str() {
            "initialize" => self.handle_initialize(id),
            "ping" => JsonRpcResponse::success(id, serde_json::json!({})),
            "tools/list" => self.handle_list_tools(id),
            "tools/call" => self.handle_call_tool(id, request.params, session).await,
            _ => JsonRpcResponse::error(id, error_codes::METHOD_NOT_FOUND, "Method not found"),
        };
        Some(response)
    }

    /// Handle the initialize request.
    fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        info!(name = %self.name, version = %self.version, "Initializing MCP session");

        let result = InitializeResult {
            protocol_version: PROTOCOL_VERSION.to_string(),
            capabilities: ServerCapabilities {
                tools: Some(ToolsCapability {
                    list_changed: false,
                }),
            },
            server_info: ServerInfo {
                name: self.name.clone(),
                version: Some(self.version.clone()),
            },
        };

        to_response(id, &result)
    }

    /// Handle the tools/list request.
    fn handle_list_tools(&self, id: Value) -> JsonRpcResponse {
        debug!(count = self.tools.len(), "Listing MCP tools");
        let result = ListToolsResult {
            tools: self.tools.definitions(),
        };
        to_response(id, &result)
    }

    /// Handle the tools/call request.
    async fn handle_call_tool(
        &self,
        id: Value,
        params: Option<Value>,
        session: &Session,
    ) -> JsonRpcResponse {
        let params: CallToolParams = match params {
            Some(p) => match serde_json::from_value(p) {
                Ok(params) => params,
                Err(e) => {
                    return JsonRpcResponse::error(
                        id,
                        error_codes::INVALID_PARAMS,
                        format!("Invalid params: {e}"),
                    );
                }
            },
            None => {
                return JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, "Missing params");
            }
        };

        debug!(tool = %params.name, session_id = %session.id(), "Calling MCP tool");

        let _turn = session.lock().await;
        let ctx = McpToolContext::for_session(session);
        match self.tools.dispatch(&params.name, params.arguments, &ctx).await {
            Ok(result) => to_response(id, &result),
            Err(e @ (McpError::UnknownTool(_) | McpError::InvalidArguments { .. })) => {
                warn!(tool = %params.name, error = %e, "Rejected tool call");
                JsonRpcResponse::error(id, error_codes::INVALID_PARAMS, e.to_string())
            }
            Err(e) => JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, e.to_string()),
        }
    }
}

/// Serialize `result` into a success response.
fn to_response<T: serde::Serialize>(id: Value, result: &T) -> JsonRpcResponse {
    match serde_json::to_value(result) {
        Ok(value) => JsonRpcResponse::success(id, value),
        Err(e) => {
            JsonRpcResponse::error(id, error_codes::INTERNAL_ERROR, McpError::from(e).to_string())
        }
    }
}

// ============================================================================
// Router
// ============================================================================

/// Create the MCP HTTP router with both bindings and a 404 fallback.
pub fn create_mcp_router(state: McpHttpState) -> Router {
    let cors = CorsLayer::new()
        .allow_origin(Any)
        .allow_methods(Any)
        .allow_headers(Any)
        .expose_headers(Any);

    Router::new()
        .route("/sse", get(mcp_sse))
        .route(SSE_MESSAGE_PATH, post(mcp_message))
        .route("/mcp", post(mcp_exchange).delete(mcp_terminate))
        .route("/", post(mcp_exchange).delete(mcp_terminate))
        .fallback(not_found)
        .layer(cors)
        .layer(TraceLayer::new_for_http())
        .with_state(state)
}

async fn not_found() -> (StatusCode, &'static str) {
    (StatusCode::NOT_FOUND, "Not found")
}

// ============================================================================
// Streaming channel
// ============================================================================

/// Query parameters for the SSE endpoint.
#[derive(Deserialize)]
struct SseQuery {
    #[serde(rename = "sessionId")]
    session_id: Option<String>,
}

/// Unregisters an SSE stream when the client goes away.
struct StreamGuard {
    state: McpHttpState,
    session_id: String,
    tx: mpsc::UnboundedSender<JsonRpcResponse>,
}

impl Drop for StreamGuard {
    fn drop(&mut self) {
        let state = self.state.clone();
        let session_id = std::mem::take(&mut self.session_id);
        let tx = self.tx.clone();
        if let Ok(handle) = tokio::runtime::Handle::try_current() {
            handle.spawn(async move {
                state.unregister_stream(&session_id, &tx).await;
            });
        }
    }
}

/// SSE connection handler.
async fn mcp_sse(
    State(state): State<McpHttpState>,
    Query(query): Query<SseQuery>,
) -> Sse<impl Stream<Item = Result<Event, Infallible>>> {
    let session = match query.session_id {
        Some(id) => state.sessions.resolve(&id).await,
        None => state.sessions.create().await,
    };
    let session_id = session.id().to_string();

    let (tx, mut rx) = mpsc::unbounded_channel::<JsonRpcResponse>();
    state.register_stream(session_id.clone(), tx.clone()).await;

    let message_url = format!("{SSE_MESSAGE_PATH}?sessionId={session_id}");
    info!(
        session_id = %session_id,
        message_url = %message_url,
        "MCP SSE connection established"
    );

    let guard = StreamGuard {
        state,
        session_id,
        tx,
    };

    let stream = async_stream::stream! {
        let _guard = guard;

        // The HTTP+SSE transport (2024-11-05) expects just the URL as the data
        yield Ok(Event::default().event("endpoint").data(message_url));

        while let Some(response) = rx.recv().await {
            if let Ok(data) = serde_json::to_string(&response) {
                yield Ok(Event::default().event("message").data(data));
            }
        }
    };

    Sse::new(stream).keep_alive(
        KeepAlive::new()
            .interval(Duration::from_secs(15))
            .text("ping"),
    )
}

/// Query parameters for the message endpoint.
#[derive(Deserialize)]
struct MessageQuery {
    #[serde(rename = "sessionId")]
    session_id: String,
}

/// Message endpoint handler.
async fn mcp_message(
    State(state): State<McpHttpState>,
    Query(query): Query<MessageQuery>,
    Json(request): Json<JsonRpcRequest>,
) -> impl IntoResponse {
    debug!(
        session_id = %query.session_id,
        method = %request.method,
        "Received MCP message"
    );

    if !state.has_stream(&query.session_id).await {
        warn!(session_id = %query.session_id, "Message for unknown SSE session");
        return (
            StatusCode::NOT_FOUND,
            Json(serde_json::json!({ "error": "Session not found" })),
        );
    }

    let session = state.sessions.resolve(&query.session_id).await;
    if let Some(response) = state.handle_request(&session, request).await {
        if let Err(e) = state.send_response(&query.session_id, response).await {
            warn!(session_id = %query.session_id, error = %e, "Failed to send response");
            return (
                StatusCode::NOT_FOUND,
                Json(serde_json::json!({ "error": "Session not found" })),
            );
        }
    }

    (
        StatusCode::ACCEPTED,
        Json(serde_json::json!({ "status": "ok" })),
    )
}

// ============================================================================
// Single exchange
// ============================================================================

fn session_header(headers: &HeaderMap) -> Option<String> {
    headers
        .get(SESSION_HEADER)
        .and_then(|v| v.to_str().ok())
        .map(str::trim)
        .filter(|v| !v.is_empty())
        .map(str::to_string)
}

/// Single request/response handler.
async fn mcp_exchange(
    State(state): State<McpHttpState>,
    headers: HeaderMap,
    body: Bytes,
) -> Response {
    let value: Value = match serde_json::from_slice(&body) {
        Ok(value) => value,
        Err(e) => {
            warn!(error = %e, "Unparseable MCP request body");
            let response = JsonRpcResponse::error(
                Value::Null,
                error_codes::PARSE_ERROR,
                format!("Parse error: {e}"),
            );
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    let request: JsonRpcRequest = match serde_json::from_value(value) {
        Ok(request) => request,
        Err(e) => {
            let response = JsonRpcResponse::error(
                Value::Null,
                error_codes::INVALID_REQUEST,
                McpError::protocol_error(format!("Invalid request: {e}")).to_string(),
            );
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };

    let session = match session_header(&headers) {
        Some(id) => state.sessions.resolve(&id).await,
        None if request.method == "initialize" => state.sessions.create().await,
        None => {
            let response = JsonRpcResponse::error(
                request.id.unwrap_or(Value::Null),
                error_codes::INVALID_REQUEST,
                McpError::protocol_error("Mcp-Session-Id header is required").to_string(),
            );
            return (StatusCode::BAD_REQUEST, Json(response)).into_response();
        }
    };
    let session_id = session.id().to_string();

    match state.handle_request(&session, request).await {
        Some(response) => (
            StatusCode::OK,
            [(SESSION_HEADER, session_id)],
            Json(response),
        )
            .into_response(),
        None => (StatusCode::ACCEPTED, [(SESSION_HEADER, session_id)]).into_response(),
    }
}

/// Session termination handler.
async fn mcp_terminate(State(state): State<McpHttpState>, headers: HeaderMap) -> StatusCode {
    let Some(session_id) = session_header(&headers) else {
        return StatusCode::BAD_REQUEST;
    };

    if state.terminate(&session_id).await {
        StatusCode::NO_CONTENT
    } else {
        StatusCode::NOT_FOUND
    }
}
