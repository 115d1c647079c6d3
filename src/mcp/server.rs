//! MCP request dispatcher.
//!
//! This module implements the MCP server lifecycle:
//!
//! 1. **Initialisation**: Capability negotiation and version agreement
//! 2. **Operation**: Handling tool calls, resource reads and prompt renders
//! 3. **Shutdown**: Driven by the transports, not the dispatcher
//!
//! # Architecture
//!
//! [`McpServer`] owns the registry, rate limiter and timeout budgets and
//! implements the JSON-RPC method table. It is transport-agnostic: stdio
//! and HTTP both feed parsed messages into [`McpServer::handle_message`]
//! and forward whatever reply comes back, which lets both transports serve
//! identical behaviour from one shared instance.

use std::collections::HashMap;
use std::sync::atomic::{AtomicBool, AtomicU64, Ordering};
use std::sync::Arc;
use std::time::Duration;

use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use serde_json::{json, Map, Value};

use crate::error::{FieldError, ToolError};
use crate::mcp::protocol::{
    is_false, IncomingMessage, JsonRpcError, JsonRpcNotification, JsonRpcReply, JsonRpcRequest,
    JsonRpcResponse, PromptMessage, ToolCallResult, MCP_PROTOCOL_VERSION, SERVER_NAME,
};
use crate::rate_limit::RateLimiter;
use crate::registry::{RegisteredPrompt, RegisteredResource, RegisteredTool, Registry};
use crate::validator::validate_arguments;

/// Server capabilities advertised during initialisation.
///
/// Each key is present only when at least one item of that kind is
/// registered.
#[derive(Debug, Clone, Serialize)]
pub struct ServerCapabilities {
    /// Tool-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub tools: Option<ToolCapabilities>,
    /// Resource-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub resources: Option<ResourceCapabilities>,
    /// Prompt-related capabilities.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub prompts: Option<PromptCapabilities>,
}

/// Tool-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ToolCapabilities {
    /// Whether the tool list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

/// Resource-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct ResourceCapabilities {
    /// Whether the resource list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

/// Prompt-specific capabilities.
#[derive(Debug, Clone, Default, Serialize)]
pub struct PromptCapabilities {
    /// Whether the prompt list can change during the session.
    #[serde(rename = "listChanged", skip_serializing_if = "is_false")]
    pub list_changed: bool,
}

/// Server information for initialisation response.
#[derive(Debug, Clone, Serialize)]
pub struct ServerInfo {
    /// Server name.
    pub name: String,
    /// Server version.
    pub version: String,
}

impl Default for ServerInfo {
    fn default() -> Self {
        Self {
            name: SERVER_NAME.to_string(),
            version: env!("CARGO_PKG_VERSION").to_string(),
        }
    }
}

/// Client information received during initialisation.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ClientInfo {
    /// Client name.
    pub name: String,
    /// Client version.
    #[serde(default)]
    pub version: Option<String>,
}

/// Parameters for the initialize request.
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct InitializeParams {
    /// Protocol version requested by client.
    pub protocol_version: String,
    /// Client capabilities.
    #[serde(default)]
    pub capabilities: Value,
    /// Client information.
    #[serde(default)]
    pub client_info: Option<ClientInfo>,
}

/// Parameters for tools/call request.
#[derive(Debug, Clone, Deserialize)]
pub struct ToolCallParams {
    /// Name of the tool to call.
    pub name: String,
    /// Arguments for the tool.
    #[serde(default)]
    pub arguments: Value,
}

/// Parameters for resources/read request.
#[derive(Debug, Clone, Deserialize)]
pub struct ResourceReadParams {
    /// URI of the resource to read.
    pub uri: String,
}

/// Parameters for prompts/get request.
#[derive(Debug, Clone, Deserialize)]
pub struct PromptGetParams {
    /// Name of the prompt to render.
    pub name: String,
    /// Arguments substituted into the template.
    #[serde(default)]
    pub arguments: Map<String, Value>,
}

/// Execution budgets applied around tool handlers.
#[derive(Debug, Clone)]
pub struct TimeoutConfig {
    /// Budget in seconds for tools without an override. Zero disables the
    /// deadline.
    pub default_seconds: f64,
    /// Per-tool overrides, keyed by tool name.
    pub per_tool: HashMap<String, f64>,
}

impl Default for TimeoutConfig {
    fn default() -> Self {
        Self {
            default_seconds: 30.0,
            per_tool: HashMap::new(),
        }
    }
}

impl TimeoutConfig {
    /// Effective budget for a tool, in seconds.
    #[must_use]
    pub fn seconds_for(&self, tool: &str) -> f64 {
        self.per_tool
            .get(tool)
            .copied()
            .unwrap_or(self.default_seconds)
    }
}

/// The MCP dispatcher shared by every transport.
pub struct McpServer {
    /// Registered tools, resources and prompts.
    registry: Arc<Registry>,
    /// Admission control for tool calls.
    rate_limiter: RateLimiter,
    /// Execution budgets for tool calls.
    timeouts: TimeoutConfig,
    /// Identity reported by initialize and the health endpoint.
    info: ServerInfo,
    /// Whether the client sent notifications/initialized.
    initialized: AtomicBool,
    /// Number of JSON-RPC requests handled (notifications excluded).
    requests_handled: AtomicU64,
}

impl McpServer {
    /// Creates a dispatcher over the given registry.
    #[must_use]
    pub fn new(
        registry: Arc<Registry>,
        rate_limiter: RateLimiter,
        timeouts: TimeoutConfig,
        info: ServerInfo,
    ) -> Self {
        Self {
            registry,
            rate_limiter,
            timeouts,
            info,
            initialized: AtomicBool::new(false),
            requests_handled: AtomicU64::new(0),
        }
    }

    /// Creates a dispatcher with default limits, budgets and identity.
    #[must_use]
    pub fn with_defaults(registry: Arc<Registry>) -> Self {
        Self::new(
            registry,
            RateLimiter::default(),
            TimeoutConfig::default(),
            ServerInfo::default(),
        )
    }

    /// The registry behind this dispatcher.
    #[must_use]
    pub fn registry(&self) -> &Registry {
        &self.registry
    }

    /// Whether the client has completed the initialize handshake.
    #[must_use]
    pub fn initialized(&self) -> bool {
        self.initialized.load(Ordering::Relaxed)
    }

    /// Number of JSON-RPC requests handled so far.
    #[must_use]
    pub fn requests_handled(&self) -> u64 {
        self.requests_handled.load(Ordering::Relaxed)
    }

    /// Handles one parsed message.
    ///
    /// Requests always produce a reply; notifications never do.
    pub async fn handle_message(&self, msg: IncomingMessage) -> Option<JsonRpcReply> {
        match msg {
            IncomingMessage::Request(req) => Some(self.handle_request(req).await),
            IncomingMessage::Notification(ref notif) => {
                self.handle_notification(notif);
                None
            }
        }
    }

    /// Handles an incoming request.
    async fn handle_request(&self, req: JsonRpcRequest) -> JsonRpcReply {
        self.requests_handled.fetch_add(1, Ordering::Relaxed);
        tracing::debug!(method = %req.method, id = %req.id, "Handling request");

        let outcome = match req.method.as_str() {
            "initialize" => self.handle_initialize(&req),
            "ping" => Ok(Self::handle_ping(&req)),
            "tools/list" => Ok(self.handle_tools_list(&req)),
            "tools/call" => self.handle_tools_call(&req).await,
            "resources/list" => Ok(self.handle_resources_list(&req)),
            "resources/read" => self.handle_resources_read(&req),
            "prompts/list" => Ok(self.handle_prompts_list(&req)),
            "prompts/get" => self.handle_prompts_get(&req),
            _ => Err(JsonRpcError::internal(
                Some(req.id.clone()),
                format!("Unknown method: {}", req.method),
            )),
        };

        match outcome {
            Ok(response) => JsonRpcReply::from(response),
            Err(error) => JsonRpcReply::from(error),
        }
    }

    /// Handles an incoming notification.
    fn handle_notification(&self, notif: &JsonRpcNotification) {
        if notif.method == "notifications/initialized" {
            self.initialized.store(true, Ordering::Relaxed);
            tracing::debug!("Client reported initialised");
        } else {
            tracing::debug!(method = %notif.method, "Ignoring notification");
        }
    }

    /// Decodes typed request params, mapping both failure shapes.
    fn decode_params<T: DeserializeOwned>(
        req: &JsonRpcRequest,
        method: &str,
    ) -> Result<T, JsonRpcError> {
        req.params
            .as_ref()
            .map(|p| serde_json::from_value(p.clone()))
            .transpose()
            .map_err(|e| {
                JsonRpcError::internal(
                    Some(req.id.clone()),
                    format!("Invalid {method} params: {e}"),
                )
            })?
            .ok_or_else(|| {
                JsonRpcError::internal(Some(req.id.clone()), format!("Missing {method} params"))
            })
    }

    /// Handles the initialize request.
    ///
    /// Initialisation is repeatable; there is no state machine gating the
    /// other methods on it.
    fn handle_initialize(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: InitializeParams = Self::decode_params(req, "initialize")?;

        if let Some(client) = &params.client_info {
            tracing::info!(
                client = %client.name,
                version = client.version.as_deref().unwrap_or("unknown"),
                "Client connected"
            );
        }
        tracing::debug!(requested = %params.protocol_version, "Negotiating protocol version");

        let result = json!({
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "capabilities": self.capabilities(),
            "serverInfo": self.info,
        });

        Ok(JsonRpcResponse::success(req.id.clone(), result))
    }

    /// Capabilities derived from what the registry holds.
    fn capabilities(&self) -> ServerCapabilities {
        ServerCapabilities {
            tools: (self.registry.tool_count() > 0).then(ToolCapabilities::default),
            resources: (self.registry.resource_count() > 0).then(ResourceCapabilities::default),
            prompts: (self.registry.prompt_count() > 0).then(PromptCapabilities::default),
        }
    }

    /// Handles a ping request.
    fn handle_ping(req: &JsonRpcRequest) -> JsonRpcResponse {
        JsonRpcResponse::success(req.id.clone(), json!({}))
    }

    /// Handles the tools/list request.
    fn handle_tools_list(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let tools: Vec<_> = self
            .registry
            .tools()
            .map(RegisteredTool::definition)
            .collect();
        JsonRpcResponse::success(req.id.clone(), json!({ "tools": tools }))
    }

    /// Handles the tools/call request.
    async fn handle_tools_call(
        &self,
        req: &JsonRpcRequest,
    ) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: ToolCallParams = Self::decode_params(req, "tools/call")?;

        let arguments = match params.arguments {
            Value::Null => Map::new(),
            Value::Object(map) => map,
            _ => {
                return Err(JsonRpcError::internal(
                    Some(req.id.clone()),
                    "tool arguments must be an object",
                ))
            }
        };

        let result = self.dispatch_tool_call(&params.name, arguments).await;
        let body = serde_json::to_value(result).map_err(|e| {
            JsonRpcError::internal(
                Some(req.id.clone()),
                format!("Failed to serialise tool result: {e}"),
            )
        })?;

        Ok(JsonRpcResponse::success(req.id.clone(), body))
    }

    /// Runs a tool call for the REST surface, returning the result body.
    pub async fn call_tool(&self, name: &str, arguments: Map<String, Value>) -> ToolCallResult {
        self.dispatch_tool_call(name, arguments).await
    }

    /// The tool call pipeline: lookup, admission, validation, execution.
    ///
    /// Failures never escape as JSON-RPC errors; every one becomes an
    /// `isError` result body.
    async fn dispatch_tool_call(
        &self,
        name: &str,
        arguments: Map<String, Value>,
    ) -> ToolCallResult {
        let Some(tool) = self.registry.get(name) else {
            return Self::report_failure(&ToolError::not_found(name));
        };

        if !self.rate_limiter.allow(name) {
            return Self::report_failure(&ToolError::rate_limited(name));
        }

        let report = validate_arguments(&arguments, &tool.input_schema, true);
        if !report.is_valid() {
            let field_errors = report
                .errors
                .iter()
                .map(String::as_str)
                .map(FieldError::from_message)
                .collect();
            let mut error = ToolError::validation(
                name,
                format!("Invalid arguments for tool '{name}'"),
                field_errors,
            );
            error.module = tool.module.clone();
            return Self::report_failure(&error);
        }

        let seconds = self.timeouts.seconds_for(name);
        // Budgets too large for Duration behave as no deadline.
        let budget = if seconds > 0.0 {
            Duration::try_from_secs_f64(seconds).ok()
        } else {
            None
        };
        let execution = self.registry.execute(name, report.args);
        let outcome = if let Some(budget) = budget {
            match tokio::time::timeout(budget, execution).await {
                Ok(outcome) => outcome,
                Err(_) => {
                    // Only the wait is dropped; the spawned handler task
                    // keeps running to completion in the background.
                    return Self::report_failure(&ToolError::timeout(name, seconds));
                }
            }
        } else {
            execution.await
        };

        match outcome {
            Ok(value) => {
                let text = value.to_string();
                if tool.output_schema.is_some() {
                    ToolCallResult::structured(text, value)
                } else {
                    ToolCallResult::text(text)
                }
            }
            Err(error) => Self::report_failure(&error),
        }
    }

    /// Logs a tool failure and wraps it in the wire envelope.
    fn report_failure(error: &ToolError) -> ToolCallResult {
        tracing::warn!(
            code = error.code.as_str(),
            tool = %error.tool_name,
            correlation_id = %error.correlation_id,
            "Tool call failed: {}",
            error.message
        );
        ToolCallResult::failure(error)
    }

    /// Handles the resources/list request.
    fn handle_resources_list(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let resources: Vec<_> = self
            .registry
            .resources()
            .map(RegisteredResource::definition)
            .collect();
        JsonRpcResponse::success(req.id.clone(), json!({ "resources": resources }))
    }

    /// Handles the resources/read request.
    ///
    /// The provider runs lazily on every read, never at registration time.
    fn handle_resources_read(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: ResourceReadParams = Self::decode_params(req, "resources/read")?;

        let Some(resource) = self.registry.resource(&params.uri) else {
            return Err(JsonRpcError::internal(
                Some(req.id.clone()),
                format!("Unknown resource: {}", params.uri),
            ));
        };

        let body = (resource.provider)().map_err(|e| {
            tracing::warn!(
                uri = %params.uri,
                correlation_id = %e.correlation_id,
                "Resource provider failed: {}",
                e.message
            );
            JsonRpcError::internal(Some(req.id.clone()), e.message)
        })?;

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "contents": [{
                    "uri": resource.uri,
                    "mimeType": resource.mime_type,
                    "text": body,
                }]
            }),
        ))
    }

    /// Handles the prompts/list request.
    fn handle_prompts_list(&self, req: &JsonRpcRequest) -> JsonRpcResponse {
        let prompts: Vec<_> = self
            .registry
            .prompts()
            .map(RegisteredPrompt::definition)
            .collect();
        JsonRpcResponse::success(req.id.clone(), json!({ "prompts": prompts }))
    }

    /// Handles the prompts/get request.
    fn handle_prompts_get(&self, req: &JsonRpcRequest) -> Result<JsonRpcResponse, JsonRpcError> {
        let params: PromptGetParams = Self::decode_params(req, "prompts/get")?;

        let Some(prompt) = self.registry.prompt(&params.name) else {
            return Err(JsonRpcError::internal(
                Some(req.id.clone()),
                format!("Unknown prompt: {}", params.name),
            ));
        };

        let text = prompt.render(&params.arguments);

        Ok(JsonRpcResponse::success(
            req.id.clone(),
            json!({
                "description": prompt.description,
                "messages": [PromptMessage::user(text)],
            }),
        ))
    }

    /// Snapshot served by the HTTP health endpoint.
    #[must_use]
    pub fn health(&self) -> Value {
        json!({
            "name": self.info.name,
            "version": self.info.version,
            "protocolVersion": MCP_PROTOCOL_VERSION,
            "initialized": self.initialized(),
            "tools": self.registry.tool_count(),
            "resources": self.registry.resource_count(),
            "prompts": self.registry.prompt_count(),
            "requestsHandled": self.requests_handled(),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::mcp::protocol::{parse_message, INTERNAL_ERROR_CODE};

    fn demo_registry() -> Registry {
        let mut registry = Registry::new();
        registry.register(
            RegisteredTool::builder("greet")
                .description("Greets the caller")
                .input_schema(json!({
                    "type": "object",
                    "properties": { "name": { "type": "string" } },
                    "required": ["name"]
                }))
                .build(|args| async move {
                    let name = args.get("name").and_then(Value::as_str).unwrap_or("world");
                    Ok(json!({ "greeting": format!("hello {name}") }))
                }),
        );
        registry.register_resource(
            RegisteredResource::builder("about://demo", "About")
                .description("Demo resource")
                .build(|| Ok("demo body".to_string())),
        );
        registry
    }

    fn demo_server() -> McpServer {
        McpServer::with_defaults(Arc::new(demo_registry()))
    }

    async fn roundtrip(server: &McpServer, raw: &str) -> Option<Value> {
        let msg = parse_message(raw).unwrap();
        let reply = server.handle_message(msg).await?;
        Some(serde_json::to_value(reply).unwrap())
    }

    #[tokio::test]
    async fn initialize_reports_registered_kinds() {
        let server = demo_server();
        let raw = r#"{"jsonrpc":"2.0","id":1,"method":"initialize","params":{"protocolVersion":"2024-11-05","capabilities":{},"clientInfo":{"name":"test-client"}}}"#;
        let reply = roundtrip(&server, raw).await.unwrap();

        let result = &reply["result"];
        assert_eq!(result["protocolVersion"], MCP_PROTOCOL_VERSION);
        assert_eq!(result["serverInfo"]["name"], SERVER_NAME);
        assert!(result["capabilities"].get("tools").is_some());
        assert!(result["capabilities"].get("resources").is_some());
        assert!(result["capabilities"].get("prompts").is_none());
    }

    #[tokio::test]
    async fn ping_returns_empty_object() {
        let server = demo_server();
        let reply = roundtrip(&server, r#"{"jsonrpc":"2.0","id":2,"method":"ping"}"#)
            .await
            .unwrap();
        assert_eq!(reply["result"], json!({}));
        assert_eq!(reply["id"], 2);
    }

    #[tokio::test]
    async fn unknown_method_uses_the_internal_code() {
        let server = demo_server();
        let reply = roundtrip(&server, r#"{"jsonrpc":"2.0","id":3,"method":"bogus/method"}"#)
            .await
            .unwrap();
        assert_eq!(reply["error"]["code"], INTERNAL_ERROR_CODE);
        assert!(reply["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Unknown method: bogus/method"));
        assert_eq!(reply["id"], 3);
    }

    #[tokio::test]
    async fn initialized_notification_flips_flag_without_reply() {
        let server = demo_server();
        assert!(!server.initialized());

        let reply = roundtrip(
            &server,
            r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#,
        )
        .await;
        assert!(reply.is_none());
        assert!(server.initialized());
        assert_eq!(server.requests_handled(), 0);
    }

    #[tokio::test]
    async fn request_counter_ignores_notifications() {
        let server = demo_server();
        roundtrip(&server, r#"{"jsonrpc":"2.0","id":1,"method":"ping"}"#).await;
        roundtrip(&server, r#"{"jsonrpc":"2.0","method":"notifications/initialized"}"#).await;
        assert_eq!(server.requests_handled(), 1);
    }

    #[tokio::test]
    async fn tools_call_success_carries_encoded_value() {
        let server = demo_server();
        let raw = r#"{"jsonrpc":"2.0","id":5,"method":"tools/call","params":{"name":"greet","arguments":{"name":"Ada"}}}"#;
        let reply = roundtrip(&server, raw).await.unwrap();

        let result = &reply["result"];
        assert!(result.get("isError").is_none());
        let text = result["content"][0]["text"].as_str().unwrap();
        let value: Value = serde_json::from_str(text).unwrap();
        assert_eq!(value["greeting"], "hello Ada");
    }

    #[tokio::test]
    async fn tools_call_text_encodes_bare_string_values() {
        let mut registry = Registry::new();
        registry.register(
            RegisteredTool::builder("echo")
                .input_schema(json!({
                    "type": "object",
                    "properties": { "msg": { "type": "string" } },
                    "required": ["msg"]
                }))
                .build(|args| async move { Ok(args.get("msg").cloned().unwrap_or(Value::Null)) }),
        );
        let server = McpServer::with_defaults(Arc::new(registry));

        let raw = r#"{"jsonrpc":"2.0","id":8,"method":"tools/call","params":{"name":"echo","arguments":{"msg":"hi"}}}"#;
        let reply = roundtrip(&server, raw).await.unwrap();

        let text = reply["result"]["content"][0]["text"].as_str().unwrap();
        assert_eq!(text, r#""hi""#);
        let value: Value = serde_json::from_str(text).unwrap();
        assert_eq!(value, "hi");
    }

    #[tokio::test]
    async fn tools_call_without_params_is_rejected() {
        let server = demo_server();
        let reply = roundtrip(&server, r#"{"jsonrpc":"2.0","id":6,"method":"tools/call"}"#)
            .await
            .unwrap();
        assert_eq!(reply["error"]["code"], INTERNAL_ERROR_CODE);
        assert!(reply["error"]["message"]
            .as_str()
            .unwrap()
            .contains("Missing tools/call params"));
    }

    #[tokio::test]
    async fn tools_call_rejects_non_object_arguments() {
        let server = demo_server();
        let raw = r#"{"jsonrpc":"2.0","id":7,"method":"tools/call","params":{"name":"greet","arguments":[1,2]}}"#;
        let reply = roundtrip(&server, raw).await.unwrap();
        assert_eq!(reply["error"]["code"], INTERNAL_ERROR_CODE);
        assert_eq!(reply["error"]["message"], "tool arguments must be an object");
    }

    #[tokio::test]
    async fn health_reports_counts() {
        let server = demo_server();
        let health = server.health();
        assert_eq!(health["name"], SERVER_NAME);
        assert_eq!(health["tools"], 1);
        assert_eq!(health["resources"], 1);
        assert_eq!(health["prompts"], 0);
        assert_eq!(health["initialized"], false);
        assert_eq!(health["requestsHandled"], 0);
    }
}
