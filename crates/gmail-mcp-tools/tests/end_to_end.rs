//! End-to-end tests: both transports, the real tool table and a mock backend.

use axum::body::Body;
use axum::http::{Request, Response, StatusCode};
use axum::Router;
use futures::StreamExt;
use gmail_mcp_core::{Config, ProxyClient};
use gmail_mcp_server::{create_mcp_router, McpHttpState, SESSION_HEADER};
use serde_json::{json, Value};
use std::time::Duration;
use tower::ServiceExt;
use wiremock::matchers::{header, method, path};
use wiremock::{Mock, MockServer, ResponseTemplate};

fn app(backend: &MockServer) -> Router {
    let config = Config {
        backend_url: backend.uri(),
        ..Config::default()
    };
    let proxy = ProxyClient::new(&config.backend_url, Duration::from_secs(5)).unwrap();
    let registry = gmail_mcp_tools::build_registry(&config, proxy).unwrap();
    create_mcp_router(McpHttpState::new("Gmail MCP", "0.1.0", registry))
}

fn rpc(uri: &str, session: Option<&str>, body: Value) -> Request<Body> {
    let mut builder = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json");
    if let Some(id) = session {
        builder = builder.header(SESSION_HEADER, id);
    }
    builder.body(Body::from(body.to_string())).unwrap()
}

fn call(id: u64, name: &str, arguments: Value) -> Value {
    json!({
        "jsonrpc": "2.0",
        "id": id,
        "method": "tools/call",
        "params": { "name": name, "arguments": arguments }
    })
}

async fn json_body(response: Response<Body>) -> Value {
    let bytes = axum::body::to_bytes(response.into_body(), usize::MAX)
        .await
        .unwrap();
    serde_json::from_slice(&bytes).unwrap()
}

fn result_text(response: &Value) -> &str {
    response["result"]["content"][0]["text"].as_str().unwrap()
}

/// Call a tool over the single-exchange binding and return the JSON-RPC reply.
async fn exchange(app: &Router, session: &str, body: Value) -> Value {
    let response = app
        .clone()
        .oneshot(rpc("/mcp", Some(session), body))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::OK);
    json_body(response).await
}

#[tokio::test]
async fn test_initialize_and_list_tools() {
    let backend = MockServer::start().await;
    let app = app(&backend);

    let response = app
        .clone()
        .oneshot(rpc(
            "/mcp",
            None,
            json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
        ))
        .await
        .unwrap();
    let session = response.headers()[SESSION_HEADER]
        .to_str()
        .unwrap()
        .to_string();
    let body = json_body(response).await;
    assert_eq!(body["result"]["serverInfo"]["name"], "Gmail MCP");
    assert_eq!(body["result"]["protocolVersion"], "2024-11-05");

    let body = exchange(
        &app,
        &session,
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
    )
    .await;
    let tools = body["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 8);
    let search = tools.iter().find(|t| t["name"] == "search_emails").unwrap();
    assert_eq!(search["inputSchema"]["required"], json!(["query"]));
}

#[tokio::test]
async fn test_unauthenticated_call_returns_guidance() {
    let backend = MockServer::start().await;
    let app = app(&backend);

    let body = exchange(&app, "anon", call(1, "list_labels", json!({}))).await;
    let text = result_text(&body);
    assert!(text.starts_with("Error: Authentication required."));
    assert!(text.contains("authenticate"));
    assert!(backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_missing_required_argument_is_rejected_before_the_backend() {
    let backend = MockServer::start().await;
    let app = app(&backend);

    exchange(&app, "s", call(1, "authenticate", json!({"token": "T"}))).await;
    let body = exchange(&app, "s", call(2, "search_emails", json!({}))).await;

    assert_eq!(body["error"]["code"], -32602);
    assert!(body["error"]["message"]
        .as_str()
        .unwrap()
        .contains("query"));
    assert!(backend.received_requests().await.unwrap().is_empty());
}

#[tokio::test]
async fn test_unknown_tool_is_rejected() {
    let backend = MockServer::start().await;
    let app = app(&backend);

    let body = exchange(&app, "s", call(1, "send_email", json!({}))).await;
    assert_eq!(body["error"]["message"], "Unknown tool: send_email");
}

#[tokio::test]
async fn test_upstream_error_becomes_error_text() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/labels"))
        .respond_with(ResponseTemplate::new(500).set_body_string("boom"))
        .mount(&backend)
        .await;
    let app = app(&backend);

    exchange(&app, "s", call(1, "authenticate", json!({"token": "T"}))).await;
    let body = exchange(&app, "s", call(2, "list_labels", json!({}))).await;

    assert!(body.get("error").is_none());
    assert_eq!(
        result_text(&body),
        "Error: API request failed (500): Internal Server Error. boom"
    );
}

#[tokio::test]
async fn test_sessions_do_not_share_tokens() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/labels"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({"labels": []})))
        .mount(&backend)
        .await;
    let app = app(&backend);

    exchange(&app, "alice", call(1, "authenticate", json!({"token": "A"}))).await;
    let body = exchange(&app, "bob", call(2, "list_labels", json!({}))).await;
    assert!(result_text(&body).starts_with("Error:"));

    let body = exchange(&app, "alice", call(3, "list_labels", json!({}))).await;
    assert_eq!(result_text(&body), "No labels found.");
}

#[tokio::test]
async fn test_authenticate_over_sse_then_call_over_exchange() {
    let backend = MockServer::start().await;
    Mock::given(method("GET"))
        .and(path("/gmail/labels"))
        .and(header("authorization", "Bearer T"))
        .respond_with(ResponseTemplate::new(200).set_body_json(json!({
            "labels": [
                {"name": "INBOX", "id": "INBOX", "type": "system"},
                {"name": "Receipts", "id": "Label_7", "type": "user"}
            ]
        })))
        .expect(2)
        .mount(&backend)
        .await;
    let app = app(&backend);

    // Open the stream and read the endpoint event.
    let stream = app
        .clone()
        .oneshot(
            Request::builder()
                .uri("/sse?sessionId=shared")
                .body(Body::empty())
                .unwrap(),
        )
        .await
        .unwrap();
    assert_eq!(stream.status(), StatusCode::OK);
    let mut events = stream.into_body().into_data_stream();

    let mut received = String::new();
    while !received.contains("\n\n") {
        let chunk = events.next().await.unwrap().unwrap();
        received.push_str(&String::from_utf8_lossy(&chunk));
    }
    assert!(received.contains("event: endpoint"));
    assert!(received.contains("data: /sse/message?sessionId=shared"));

    // Authenticate through the streaming binding.
    let response = app
        .clone()
        .oneshot(rpc(
            "/sse/message?sessionId=shared",
            None,
            call(1, "authenticate", json!({"token": "T"})),
        ))
        .await
        .unwrap();
    assert_eq!(response.status(), StatusCode::ACCEPTED);

    received.clear();
    while !received.contains("Authentication successful") {
        let chunk = tokio::time::timeout(Duration::from_secs(5), events.next())
            .await
            .unwrap()
            .unwrap()
            .unwrap();
        received.push_str(&String::from_utf8_lossy(&chunk));
    }
    assert!(received.contains("event: message"));

    // The token is visible over the single-exchange binding.
    let first = exchange(&app, "shared", call(2, "list_labels", json!({}))).await;
    let second = exchange(&app, "shared", call(3, "list_labels", json!({}))).await;
    assert_eq!(
        result_text(&first),
        "Gmail Labels:\n\nINBOX (INBOX) - system\nReceipts (Label_7) - user"
    );
    assert_eq!(result_text(&first), result_text(&second));
}

#[tokio::test]
async fn test_unrecognized_paths_are_not_found() {
    let backend = MockServer::start().await;
    let app = app(&backend);

    for uri in ["/favicon.ico", "/mcp/tools", "/sse/other"] {
        let response = app
            .clone()
            .oneshot(rpc(uri, None, json!({"jsonrpc": "2.0", "id": 1, "method": "ping"})))
            .await
            .unwrap();
        assert_eq!(response.status(), StatusCode::NOT_FOUND, "{uri}");
    }
}
