//! HTTP transport for the MCP server.
//!
//! Serves the same dispatcher as the stdio transport:
//!
//! - `POST /mcp` accepts one JSON-RPC message per request body and returns
//!   the JSON-RPC reply (HTTP 202 for notifications, which have none)
//! - `GET /health` reports server identity and registry counts
//! - `GET /tools`, `GET /tools/{name}`, `POST /tools/{name}/call`,
//!   `GET /resources` and `GET /prompts` are REST conveniences over the
//!   same dispatcher methods
//!
//! Unlike stdio, a malformed `POST /mcp` body is answered: the JSON-RPC
//! error object comes back with HTTP 200, keeping the JSON-RPC layer the
//! single source of error semantics.

use std::io;
use std::sync::Arc;

use axum::extract::{Path, State};
use axum::http::StatusCode;
use axum::response::{IntoResponse, Response};
use axum::routing::{get, post};
use axum::{Json, Router};
use serde_json::{json, Map, Value};

use crate::mcp::protocol::{parse_message, JsonRpcReply};
use crate::mcp::server::McpServer;
use crate::registry::{RegisteredPrompt, RegisteredResource, RegisteredTool};

/// Builds the router serving the MCP and REST endpoints.
#[must_use]
pub fn make_app(server: Arc<McpServer>) -> Router {
    Router::new()
        .route("/mcp", post(post_mcp))
        .route("/health", get(get_health))
        .route("/tools", get(get_tools))
        .route("/tools/{name}", get(get_tool))
        .route("/tools/{name}/call", post(post_tool_call))
        .route("/resources", get(get_resources))
        .route("/prompts", get(get_prompts))
        .with_state(server)
}

/// Binds the listener and serves until a shutdown signal arrives.
///
/// # Errors
///
/// Returns an error if binding or serving fails.
pub async fn serve_http(bind: &str, server: Arc<McpServer>) -> io::Result<()> {
    let app = make_app(server);
    let listener = tokio::net::TcpListener::bind(bind).await?;
    let addr = listener.local_addr()?;
    tracing::info!(%addr, "HTTP transport listening");

    axum::serve(listener, app)
        .with_graceful_shutdown(shutdown_signal())
        .await
}

/// Resolves when the process receives a termination signal.
#[cfg(unix)]
async fn shutdown_signal() {
    use tokio::signal::unix::{signal, SignalKind};

    let Ok(mut sigint) = signal(SignalKind::interrupt()) else {
        return std::future::pending().await;
    };
    let Ok(mut sigterm) = signal(SignalKind::terminate()) else {
        return std::future::pending().await;
    };

    tokio::select! {
        _ = sigint.recv() => tracing::info!("Received SIGINT, shutting down HTTP transport"),
        _ = sigterm.recv() => tracing::info!("Received SIGTERM, shutting down HTTP transport"),
    }
}

/// Resolves when the process receives Ctrl+C.
#[cfg(windows)]
async fn shutdown_signal() {
    if tokio::signal::ctrl_c().await.is_ok() {
        tracing::info!("Received Ctrl+C, shutting down HTTP transport");
    }
}

/// `POST /mcp`: one JSON-RPC message in, one reply out.
async fn post_mcp(State(server): State<Arc<McpServer>>, body: String) -> Response {
    let msg = match parse_message(&body) {
        Ok(msg) => msg,
        Err(error) => return Json(JsonRpcReply::from(error)).into_response(),
    };

    match server.handle_message(msg).await {
        Some(reply) => Json(reply).into_response(),
        None => (StatusCode::ACCEPTED, Json(json!({ "status": "accepted" }))).into_response(),
    }
}

/// `GET /health`: identity plus registry counts.
async fn get_health(State(server): State<Arc<McpServer>>) -> Json<Value> {
    Json(server.health())
}

/// `GET /tools`: every registered tool definition.
async fn get_tools(State(server): State<Arc<McpServer>>) -> Json<Value> {
    let tools: Vec<_> = server
        .registry()
        .tools()
        .map(RegisteredTool::definition)
        .collect();
    Json(json!({ "tools": tools }))
}

/// `GET /tools/{name}`: one tool definition, or 404.
async fn get_tool(State(server): State<Arc<McpServer>>, Path(name): Path<String>) -> Response {
    match server.registry().get(&name) {
        Some(tool) => Json(tool.definition()).into_response(),
        None => StatusCode::NOT_FOUND.into_response(),
    }
}

/// `POST /tools/{name}/call`: runs the full dispatch pipeline.
///
/// Tool failures come back as HTTP 200 with an `isError` body, matching
/// the `tools/call` convention.
async fn post_tool_call(
    State(server): State<Arc<McpServer>>,
    Path(name): Path<String>,
    Json(arguments): Json<Value>,
) -> Response {
    let arguments = match arguments {
        Value::Null => Map::new(),
        Value::Object(map) => map,
        _ => {
            return (
                StatusCode::BAD_REQUEST,
                Json(json!({ "error": "arguments must be a JSON object" })),
            )
                .into_response()
        }
    };

    Json(server.call_tool(&name, arguments).await).into_response()
}

/// `GET /resources`: every registered resource definition.
async fn get_resources(State(server): State<Arc<McpServer>>) -> Json<Value> {
    let resources: Vec<_> = server
        .registry()
        .resources()
        .map(RegisteredResource::definition)
        .collect();
    Json(json!({ "resources": resources }))
}

/// `GET /prompts`: every registered prompt definition.
async fn get_prompts(State(server): State<Arc<McpServer>>) -> Json<Value> {
    let prompts: Vec<_> = server
        .registry()
        .prompts()
        .map(RegisteredPrompt::definition)
        .collect();
    Json(json!({ "prompts": prompts }))
}
