//! JSON-RPC method handling for the MCP server.
//!
//! `McpServer` maps one decoded request to at most one response. It keeps no
//! protocol state between requests; only counters for the shutdown log.

use std::panic::{self, AssertUnwindSafe};
use std::sync::atomic::{AtomicU64, Ordering};
use std::time::Instant;

use serde_json::{json, Value};
use tracing::{debug, error, info, warn};

use super::tools::{get_tool_definitions, GemdocsTools};
use super::transport::{ErrorCode, JsonRpcRequest, JsonRpcResponse, JSONRPC_VERSION};

/// MCP protocol revision announced in `initialize`.
pub const PROTOCOL_VERSION: &str = "2024-11-05";

/// Name announced in `serverInfo`.
pub const SERVER_NAME: &str = "open_gemdocs_mcp";

/// The RPC methods the server understands.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum RpcMethod {
    Initialize,
    /// Client notification that the handshake finished; never answered.
    Initialized,
    ToolsList,
    ToolsCall,
    Ping,
}

impl RpcMethod {
    pub fn parse(method: &str) -> Option<Self> {
        match method {
            "initialize" => Some(Self::Initialize),
            "initialized" | "notifications/initialized" => Some(Self::Initialized),
            "tools/list" => Some(Self::ToolsList),
            "tools/call" => Some(Self::ToolsCall),
            "ping" => Some(Self::Ping),
            _ => None,
        }
    }
}

/// Runtime statistics for the MCP server.
struct ServerStats {
    started_at: Instant,
    total_requests: AtomicU64,
    tool_calls: AtomicU64,
    errors: AtomicU64,
}

impl ServerStats {
    fn new() -> Self {
        Self {
            started_at: Instant::now(),
            total_requests: AtomicU64::new(0),
            tool_calls: AtomicU64::new(0),
            errors: AtomicU64::new(0),
        }
    }
}

/// The MCP request handler wrapping the tool dispatcher.
pub struct McpServer {
    tools: GemdocsTools,
    stats: ServerStats,
}

impl McpServer {
    pub fn new(tools: GemdocsTools) -> Self {
        Self {
            tools,
            stats: ServerStats::new(),
        }
    }

    /// Handles an already-parsed JSON body.
    ///
    /// A body that cannot be read as a request is an internal error carrying
    /// the decoder message, echoing the `id` when one can be found.
    pub fn handle_value(&self, body: Value) -> Option<JsonRpcResponse> {
        let id = body.get("id").cloned().unwrap_or(Value::Null);
        match serde_json::from_value::<JsonRpcRequest>(body) {
            Ok(request) => self.handle_request(&request),
            Err(e) => {
                self.stats.errors.fetch_add(1, Ordering::Relaxed);
                warn!(error = %e, "undecodable rpc request");
                Some(JsonRpcResponse::error_with_data(
                    id,
                    ErrorCode::InternalError,
                    e.to_string(),
                ))
            }
        }
    }

    /// Dispatches a parsed JSON-RPC request to the appropriate handler.
    ///
    /// Returns `None` for the `initialized` notification.
    pub fn handle_request(&self, request: &JsonRpcRequest) -> Option<JsonRpcResponse> {
        self.stats.total_requests.fetch_add(1, Ordering::Relaxed);
        let id = request.id.clone();
        debug!(method = %request.method, %id, "rpc request");

        if request.jsonrpc != JSONRPC_VERSION {
            warn!(jsonrpc = %request.jsonrpc, "unexpected jsonrpc version");
        }

        let response = match RpcMethod::parse(&request.method) {
            Some(RpcMethod::Initialize) => Some(self.handle_initialize(id)),
            Some(RpcMethod::Initialized) => None,
            Some(RpcMethod::ToolsList) => Some(self.handle_tools_list(id)),
            Some(RpcMethod::ToolsCall) => Some(self.handle_tools_call(id, &request.params)),
            Some(RpcMethod::Ping) => Some(JsonRpcResponse::success(id, json!({}))),
            None => {
                warn!(method = %request.method, "unknown rpc method");
                Some(JsonRpcResponse::error(
                    id,
                    ErrorCode::MethodNotFound,
                    format!("Method not found: {}", request.method),
                ))
            }
        };

        if response.as_ref().is_some_and(JsonRpcResponse::is_error) {
            self.stats.errors.fetch_add(1, Ordering::Relaxed);
        }
        response
    }

    /// Handles the `initialize` method, returning server capabilities.
    fn handle_initialize(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(
            id,
            json!({
                "protocolVersion": PROTOCOL_VERSION,
                "capabilities": {
                    "tools": {},
                    "resources": {}
                },
                "serverInfo": {
                    "name": SERVER_NAME,
                    "version": env!("CARGO_PKG_VERSION")
                }
            }),
        )
    }

    fn handle_tools_list(&self, id: Value) -> JsonRpcResponse {
        JsonRpcResponse::success(id, json!({ "tools": get_tool_definitions() }))
    }

    /// Handles `tools/call`. Tool failures, including a missing tool name,
    /// come back inside the result envelope; only a panic in the dispatcher
    /// becomes a JSON-RPC error.
    fn handle_tools_call(&self, id: Value, params: &Option<Value>) -> JsonRpcResponse {
        let tool_name = params
            .as_ref()
            .and_then(|p| p.get("name"))
            .and_then(Value::as_str)
            .unwrap_or_default();

        let arguments = params
            .as_ref()
            .and_then(|p| p.get("arguments"))
            .filter(|a| !a.is_null())
            .cloned()
            .unwrap_or_else(|| json!({}));

        self.stats.tool_calls.fetch_add(1, Ordering::Relaxed);

        let outcome = panic::catch_unwind(AssertUnwindSafe(|| {
            self.tools.call(tool_name, &arguments)
        }));

        match outcome {
            Ok(result) => match serde_json::to_value(&result) {
                Ok(value) => JsonRpcResponse::success(id, value),
                Err(e) => JsonRpcResponse::error(
                    id,
                    ErrorCode::InternalError,
                    format!("Tool execution error: {}", e),
                ),
            },
            Err(payload) => {
                let message = panic_message(payload.as_ref());
                error!(tool = tool_name, %message, "tool panicked");
                JsonRpcResponse::error(
                    id,
                    ErrorCode::InternalError,
                    format!("Tool execution error: {}", message),
                )
            }
        }
    }

    /// Stops the documentation daemon and logs request statistics.
    pub fn shutdown(&self) {
        let yard = self.tools.yard();
        if yard.is_running() {
            match yard.stop() {
                Ok(pids) => info!(?pids, "stopped yard server"),
                Err(e) => warn!(error = %e, "failed to stop yard server"),
            }
        }
        info!(
            uptime_secs = self.stats.started_at.elapsed().as_secs(),
            total_requests = self.stats.total_requests.load(Ordering::Relaxed),
            tool_calls = self.stats.tool_calls.load(Ordering::Relaxed),
            errors = self.stats.errors.load(Ordering::Relaxed),
            "MCP server stopped"
        );
    }
}

fn panic_message(payload: &(dyn std::any::Any + Send)) -> String {
    if let Some(s) = payload.downcast_ref::<&str>() {
        (*s).to_string()
    } else if let Some(s) = payload.downcast_ref::<String>() {
        s.clone()
    } else {
        "unknown panic".to_string()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_method_parse() {
        assert_eq!(RpcMethod::parse("tools/call"), Some(RpcMethod::ToolsCall));
        assert_eq!(
            RpcMethod::parse("notifications/initialized"),
            Some(RpcMethod::Initialized)
        );
        assert_eq!(RpcMethod::parse("resources/list"), None);
    }

    #[test]
    fn test_panic_message() {
        let payload: Box<dyn std::any::Any + Send> = Box::new("boom");
        assert_eq!(panic_message(payload.as_ref()), "boom");
        let payload: Box<dyn std::any::Any + Send> = Box::new(String::from("bang"));
        assert_eq!(panic_message(payload.as_ref()), "bang");
    }
}
