mod common;

use common::*;
use open_gemdocs::mcp::McpServer;
use serde_json::{json, Value};

fn server() -> McpServer {
    McpServer::new(harness(FakeDocServer::stopped()).tools)
}

fn call(server: &McpServer, body: Value) -> Value {
    let response = server.handle_value(body).expect("expected a response");
    serde_json::to_value(response).unwrap()
}

#[test]
fn test_initialize_announces_tools_capability() {
    let server = server();
    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 1, "method": "initialize", "params": {}}),
    );
    assert_eq!(response["id"], 1);
    assert_eq!(response["result"]["protocolVersion"], "2024-11-05");
    assert!(response["result"]["capabilities"]["tools"].is_object());
    assert_eq!(response["result"]["serverInfo"]["name"], "open_gemdocs_mcp");
    assert!(response.get("error").is_none());
}

#[test]
fn test_initialized_notification_has_no_response() {
    let server = server();
    for method in ["initialized", "notifications/initialized"] {
        assert!(server
            .handle_value(json!({"jsonrpc": "2.0", "method": method}))
            .is_none());
    }
}

#[test]
fn test_ids_are_echoed_verbatim() {
    let server = server();
    for id in [json!("req-7"), json!(42), json!(null)] {
        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": id.clone(), "method": "ping"}),
        );
        assert_eq!(response["id"], id);
        assert_eq!(response["result"], json!({}));
    }
}

#[test]
fn test_tools_list() {
    let server = server();
    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 2, "method": "tools/list"}),
    );
    let tools = response["result"]["tools"].as_array().unwrap();
    assert_eq!(tools.len(), 7);
    assert_eq!(tools[0]["name"], "search_gems");
    assert!(tools[0]["inputSchema"]["properties"]["query"].is_object());
}

#[test]
fn test_unknown_method() {
    let server = server();
    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 3, "method": "resources/list"}),
    );
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Method not found: resources/list");
    assert!(response.get("result").is_none());
}

#[test]
fn test_request_without_method_is_method_not_found() {
    let server = server();
    let response = call(&server, json!({"jsonrpc": "2.0", "id": 4}));
    assert_eq!(response["error"]["code"], -32601);
    assert_eq!(response["error"]["message"], "Method not found: ");
    assert_eq!(response["id"], 4);
}

#[test]
fn test_undecodable_request_is_internal_error() {
    let server = server();

    let response = call(&server, json!([1, 2, 3]));
    assert_eq!(response["error"]["code"], -32603);
    assert_eq!(response["error"]["message"], "Internal error");
    assert!(response["error"]["data"].is_string());
    assert_eq!(response["id"], Value::Null);

    let response = call(&server, json!({"jsonrpc": "2.0", "id": 5, "method": 17}));
    assert_eq!(response["error"]["code"], -32603);
    assert_eq!(response["id"], 5);
}

#[test]
fn test_other_jsonrpc_versions_are_still_answered() {
    let server = server();
    let response = call(
        &server,
        json!({"jsonrpc": "1.0", "id": 5, "method": "ping"}),
    );
    assert_eq!(response["result"], json!({}));
}

#[test]
fn test_large_integer_id_keeps_its_digits() {
    let server = server();
    let body: Value = serde_json::from_str(
        r#"{"jsonrpc":"2.0","id":123456789012345678901234,"method":"ping"}"#,
    )
    .unwrap();
    let response = server.handle_value(body).unwrap();
    let text = serde_json::to_string(&response).unwrap();
    assert!(text.contains(r#""id":123456789012345678901234"#), "{}", text);
}

#[test]
fn test_tools_call_wraps_result_envelope() {
    let server = server();
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 6,
            "method": "tools/call",
            "params": {"name": "search_gems", "arguments": {"query": "rake"}}
        }),
    );
    assert_eq!(
        response["result"],
        json!({"content": [{"type": "text", "text": "Found 1 gem(s):\n• rake (13.0.6, 12.3.3)"}]})
    );
}

#[test]
fn test_tool_failures_stay_inside_the_envelope() {
    let server = server();
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": 7,
            "method": "tools/call",
            "params": {"name": "does_not_exist"}
        }),
    );
    assert!(response.get("error").is_none());
    assert_eq!(response["result"]["isError"], true);
    assert_eq!(
        response["result"]["content"][0]["text"],
        "Unknown tool: does_not_exist"
    );
}

#[test]
fn test_tools_call_without_name_is_unknown_tool() {
    let server = server();
    for params in [json!({}), json!({"arguments": {"query": "rake"}}), json!(null)] {
        let response = call(
            &server,
            json!({"jsonrpc": "2.0", "id": 8, "method": "tools/call", "params": params}),
        );
        assert!(response.get("error").is_none());
        assert_eq!(response["id"], 8);
        assert_eq!(response["result"]["isError"], true);
        assert_eq!(response["result"]["content"][0]["text"], "Unknown tool: ");
    }
}

#[test]
fn test_panicking_tool_is_internal_error() {
    let harness = harness_with_packages(
        FakeDocServer::stopped(),
        std::sync::Arc::new(PanickingPackageManager),
    );
    let server = McpServer::new(harness.tools);
    let response = call(
        &server,
        json!({
            "jsonrpc": "2.0",
            "id": "boom-1",
            "method": "tools/call",
            "params": {"name": "search_gems", "arguments": {"query": "rake"}}
        }),
    );
    assert_eq!(response["id"], "boom-1");
    assert_eq!(response["error"]["code"], -32603);
    assert_eq!(
        response["error"]["message"],
        "Tool execution error: gem index is corrupt"
    );
    assert!(response.get("result").is_none());

    // The dispatcher keeps serving after a panic.
    let response = call(
        &server,
        json!({"jsonrpc": "2.0", "id": 9, "method": "ping"}),
    );
    assert_eq!(response["result"], json!({}));
}
