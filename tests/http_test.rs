mod common;

use std::sync::Arc;

use axum::body::{to_bytes, Body};
use axum::http::{Request, StatusCode};
use axum::Router;
use common::*;
use open_gemdocs::mcp::{router, McpServer, MAX_BODY_BYTES};
use serde_json::{json, Value};
use tower::ServiceExt;

fn app() -> Router {
    router(Arc::new(McpServer::new(
        harness(FakeDocServer::stopped()).tools,
    )))
}

async fn post(app: Router, uri: &str, body: impl Into<Body>) -> (StatusCode, Vec<u8>) {
    let request = Request::builder()
        .method("POST")
        .uri(uri)
        .header("content-type", "application/json")
        .body(body.into())
        .unwrap();
    let response = app.oneshot(request).await.unwrap();
    let status = response.status();
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    (status, bytes.to_vec())
}

#[tokio::test]
async fn test_post_tools_list() {
    let body = json!({"jsonrpc": "2.0", "id": 1, "method": "tools/list"}).to_string();
    let (status, bytes) = post(app(), "/", body).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["tools"].as_array().unwrap().len(), 7);
}

#[tokio::test]
async fn test_any_path_is_served() {
    for uri in ["/rpc", "/some/nested/path?x=1"] {
        let body = json!({"jsonrpc": "2.0", "id": 3, "method": "ping"}).to_string();
        let (status, bytes) = post(app(), uri, body).await;
        assert_eq!(status, StatusCode::OK);
        let response: Value = serde_json::from_slice(&bytes).unwrap();
        assert_eq!(response["result"], json!({}));
    }
}

#[tokio::test]
async fn test_oversized_body_is_parse_error() {
    let (status, bytes) = post(app(), "/", vec![b' '; MAX_BODY_BYTES + 1]).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(response["error"]["code"], -32700);
    assert_eq!(response["id"], Value::Null);
}

#[tokio::test]
async fn test_large_integer_id_round_trips_over_http() {
    let body = r#"{"jsonrpc":"2.0","id":123456789012345678901234,"method":"ping"}"#;
    let (_, bytes) = post(app(), "/", body).await;
    let text = String::from_utf8(bytes).unwrap();
    assert!(text.contains(r#""id":123456789012345678901234"#), "{}", text);
}

#[tokio::test]
async fn test_panicking_tool_is_internal_error_over_http() {
    let harness =
        harness_with_packages(FakeDocServer::stopped(), Arc::new(PanickingPackageManager));
    let app = router(Arc::new(McpServer::new(harness.tools)));
    let body = json!({
        "jsonrpc": "2.0",
        "id": 11,
        "method": "tools/call",
        "params": {"name": "search_gems", "arguments": {"query": "rake"}}
    })
    .to_string();
    let (status, bytes) = post(app, "/", body).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(response["id"], 11);
    assert_eq!(response["error"]["code"], -32603);
}

#[tokio::test]
async fn test_mcp_path_is_served_too() {
    let body = json!({"jsonrpc": "2.0", "id": "a", "method": "ping"}).to_string();
    let (status, bytes) = post(app(), "/mcp", body).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(response, json!({"jsonrpc": "2.0", "id": "a", "result": {}}));
}

#[tokio::test]
async fn test_malformed_json_is_parse_error_with_http_200() {
    let (status, bytes) = post(app(), "/", "{\"jsonrpc\": ").await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&bytes).unwrap();
    assert_eq!(response["id"], Value::Null);
    assert_eq!(response["error"]["code"], -32700);
    assert_eq!(response["error"]["message"], "Parse error");
}

#[tokio::test]
async fn test_notification_gets_null_body() {
    let body = json!({"jsonrpc": "2.0", "method": "notifications/initialized"}).to_string();
    let (status, bytes) = post(app(), "/", body).await;
    assert_eq!(status, StatusCode::OK);
    let response: Value = serde_json::from_slice(&bytes).unwrap();
    assert!(response.is_null());
}

#[tokio::test]
async fn test_get_is_method_not_allowed() {
    let request = Request::builder()
        .method("GET")
        .uri("/")
        .body(Body::empty())
        .unwrap();
    let response = app().oneshot(request).await.unwrap();
    assert_eq!(response.status(), StatusCode::METHOD_NOT_ALLOWED);
    let bytes = to_bytes(response.into_body(), usize::MAX).await.unwrap();
    assert_eq!(&bytes[..], b"Method not allowed");
}
