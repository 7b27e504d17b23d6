//! MCP (Model Context Protocol) server for installed gem documentation.
//!
//! Provides a JSON-RPC 2.0 interface over HTTP POST so that AI assistants can
//! search installed gems, read their metadata, manage the yard documentation
//! daemon and fetch structured API docs.

/// HTTP transport.
pub mod http;

/// JSON-RPC method handling.
pub mod server;

/// Tool definitions and dispatch.
pub mod tools;

/// JSON-RPC 2.0 message types.
pub mod transport;

pub use http::{router, serve, MAX_BODY_BYTES};
pub use server::{McpServer, RpcMethod};
pub use tools::{get_tool_definitions, GemdocsTools, Tool, ToolDefinition, ToolResult};
pub use transport::{ErrorCode, JsonRpcError, JsonRpcRequest, JsonRpcResponse};
