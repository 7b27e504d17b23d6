//! HTTP transport for the MCP server.
//!
//! One POST carries one JSON-RPC message, on any path. Every POST is answered
//! with HTTP 200 and a JSON body; protocol errors live inside the JSON-RPC
//! envelope. Other HTTP methods get a plain-text 405.

use std::net::SocketAddr;
use std::sync::Arc;

use axum::body::Bytes;
use axum::extract::rejection::BytesRejection;
use axum::extract::{DefaultBodyLimit, State};
use axum::http::{Method, StatusCode};
use axum::response::{IntoResponse, Response};
use axum::{Json, Router};
use serde_json::Value;
use tracing::{error, info, warn};

use crate::errors::Result;

use super::server::McpServer;
use super::transport::{ErrorCode, JsonRpcResponse};

/// Largest request body accepted; bigger bodies are answered as parse errors.
pub const MAX_BODY_BYTES: usize = 4 * 1024 * 1024;

/// Builds the router serving the JSON-RPC endpoint on every path.
pub fn router(server: Arc<McpServer>) -> Router {
    Router::new()
        .fallback(handle_rpc)
        .layer(DefaultBodyLimit::max(MAX_BODY_BYTES))
        .with_state(server)
}

/// Serves the MCP endpoint on `127.0.0.1:<port>` until Ctrl-C.
///
/// On interrupt the yard daemon is stopped before the listener closes.
pub async fn serve(server: Arc<McpServer>, port: u16) -> Result<()> {
    let addr = SocketAddr::from(([127, 0, 0, 1], port));
    let listener = tokio::net::TcpListener::bind(addr).await?;
    info!(%addr, "MCP server started; press Ctrl+C to stop");

    axum::serve(listener, router(server.clone()))
        .with_graceful_shutdown(shutdown_signal(server))
        .await?;
    Ok(())
}

async fn shutdown_signal(server: Arc<McpServer>) {
    if let Err(e) = tokio::signal::ctrl_c().await {
        error!(error = %e, "failed to listen for Ctrl+C; shutdown must be forced");
        std::future::pending::<()>().await;
    }

    info!("shutting down MCP server");
    if let Err(e) = tokio::task::spawn_blocking(move || server.shutdown()).await {
        warn!(error = %e, "shutdown task failed");
    }
}

async fn handle_rpc(
    State(server): State<Arc<McpServer>>,
    method: Method,
    body: std::result::Result<Bytes, BytesRejection>,
) -> Response {
    if method != Method::POST {
        return (StatusCode::METHOD_NOT_ALLOWED, "Method not allowed").into_response();
    }

    let parsed = body
        .map_err(|e| e.body_text())
        .and_then(|bytes| serde_json::from_slice::<Value>(&bytes).map_err(|e| e.to_string()));
    let value = match parsed {
        Ok(value) => value,
        Err(message) => {
            warn!(error = %message, "rejecting unreadable request body");
            return Json(JsonRpcResponse::error_with_data(
                Value::Null,
                ErrorCode::ParseError,
                message,
            ))
            .into_response();
        }
    };

    let id = value.get("id").cloned().unwrap_or(Value::Null);
    match tokio::task::spawn_blocking(move || server.handle_value(value)).await {
        Ok(Some(response)) => Json(response).into_response(),
        Ok(None) => Json(Value::Null).into_response(),
        Err(e) => {
            error!(error = %e, "request handler failed");
            Json(JsonRpcResponse::error_with_data(
                id,
                ErrorCode::InternalError,
                e.to_string(),
            ))
            .into_response()
        }
    }
}
