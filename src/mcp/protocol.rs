//! JSON-RPC 2.0 message types for the MCP wire protocol.
//!
//! All messages follow JSON-RPC 2.0 framing with MCP-specific payload
//! shapes layered on top.
//!
//! # Message Types
//!
//! - **Request**: a message expecting a response (carries an `id` key)
//! - **Response**: a reply to a request (success `result` or `error`)
//! - **Notification**: a one-way message (no `id` key, no response)
//!
//! A literal `"id": null` still counts as a request and is answered with a
//! matching `null` id; only a *missing* `id` key makes a notification.
//! Every protocol-level failure is reported with the single code
//! [`INTERNAL_ERROR_CODE`].

use serde::{Deserialize, Serialize};
use serde_json::Value;

use crate::error::ToolError;

/// The MCP protocol version this implementation supports.
pub const MCP_PROTOCOL_VERSION: &str = "2024-11-05";

/// Server name for capability negotiation.
pub const SERVER_NAME: &str = "toolhost-mcp";

/// JSON-RPC error code used for every protocol-level failure.
///
/// Unknown methods, undecodable params and malformed messages all map to
/// this one code; the `message` text carries the detail. Tool failures
/// never reach it, they travel inside a successful response (see
/// [`ToolError::to_wire`]).
pub const INTERNAL_ERROR_CODE: i32 = -32603;

/// A JSON-RPC 2.0 request ID.
///
/// IDs may be integers, strings, or a literal `null`.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RequestId {
    /// Numeric request ID.
    Number(i64),
    /// String request ID.
    String(String),
    /// A literal `null` ID. Unusual, but still a request.
    Null,
}

impl std::fmt::Display for RequestId {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        match self {
            Self::Number(n) => write!(f, "{n}"),
            Self::String(s) => write!(f, "{s}"),
            Self::Null => write!(f, "null"),
        }
    }
}

/// A JSON-RPC 2.0 request message.
///
/// Requests expect a response from the server.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcRequest {
    /// Must be "2.0".
    pub jsonrpc: String,

    /// Request identifier, echoed back in the response.
    pub id: RequestId,

    /// The method to invoke.
    pub method: String,

    /// Optional parameters for the method.
    #[serde(default)]
    pub params: Option<Value>,
}

impl JsonRpcRequest {
    /// Validates that this is a well-formed JSON-RPC 2.0 request.
    ///
    /// Returns an error message if validation fails.
    #[must_use]
    pub fn validate(&self) -> Option<&'static str> {
        if self.jsonrpc != "2.0" {
            return Some("jsonrpc field must be \"2.0\"");
        }
        if self.method.is_empty() {
            return Some("method field cannot be empty");
        }
        None
    }
}

/// A JSON-RPC 2.0 notification message (incoming).
///
/// Notifications do not have an ID and do not expect a response.
#[derive(Debug, Clone, Deserialize)]
pub struct JsonRpcNotification {
    /// Must be "2.0".
    pub jsonrpc: String,

    /// The notification method.
    pub method: String,

    /// Optional parameters for the notification.
    #[serde(default)]
    pub params: Option<Value>,
}

/// A successful JSON-RPC 2.0 response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcResponse {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this response corresponds to.
    pub id: RequestId,

    /// The result of the method call.
    pub result: Value,
}

impl JsonRpcResponse {
    /// Creates a new success response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Value is not const-compatible
    pub fn success(id: RequestId, result: Value) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            result,
        }
    }
}

/// A JSON-RPC 2.0 error object.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcErrorData {
    /// The error code.
    pub code: i32,

    /// A short description of the error.
    pub message: String,

    /// Additional information about the error.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub data: Option<Value>,
}

impl JsonRpcErrorData {
    /// Creates an error carrying [`INTERNAL_ERROR_CODE`].
    #[must_use]
    pub fn internal(message: impl Into<String>) -> Self {
        Self {
            code: INTERNAL_ERROR_CODE,
            message: message.into(),
            data: None,
        }
    }
}

/// A JSON-RPC 2.0 error response.
#[derive(Debug, Clone, Serialize)]
pub struct JsonRpcError {
    /// Always "2.0".
    pub jsonrpc: &'static str,

    /// The request ID this error corresponds to (if known).
    #[serde(skip_serializing_if = "Option::is_none")]
    pub id: Option<RequestId>,

    /// The error details.
    pub error: JsonRpcErrorData,
}

impl JsonRpcError {
    /// Creates a new error response.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // JsonRpcErrorData contains String
    pub fn new(id: Option<RequestId>, error: JsonRpcErrorData) -> Self {
        Self {
            jsonrpc: "2.0",
            id,
            error,
        }
    }

    /// Creates an internal error response.
    #[must_use]
    pub fn internal(id: Option<RequestId>, message: impl Into<String>) -> Self {
        Self::new(id, JsonRpcErrorData::internal(message))
    }
}

/// Either kind of outgoing reply to a single request.
#[derive(Debug, Clone, Serialize)]
#[serde(untagged)]
pub enum JsonRpcReply {
    /// A success response with a `result` body.
    Result(JsonRpcResponse),
    /// An error response with an `error` body.
    Error(JsonRpcError),
}

impl From<JsonRpcResponse> for JsonRpcReply {
    fn from(response: JsonRpcResponse) -> Self {
        Self::Result(response)
    }
}

impl From<JsonRpcError> for JsonRpcReply {
    fn from(error: JsonRpcError) -> Self {
        Self::Error(error)
    }
}

/// An incoming message that could be either a request or notification.
#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
pub enum IncomingMessage {
    /// A request expecting a response.
    Request(JsonRpcRequest),
    /// A notification (no response expected).
    Notification(JsonRpcNotification),
}

impl IncomingMessage {
    /// Returns the method name of this message.
    #[must_use]
    pub fn method(&self) -> &str {
        match self {
            Self::Request(req) => &req.method,
            Self::Notification(notif) => &notif.method,
        }
    }

    /// Returns the parameters of this message.
    #[must_use]
    #[allow(clippy::missing_const_for_fn)] // Option::as_ref is not const
    pub fn params(&self) -> Option<&Value> {
        match self {
            Self::Request(req) => req.params.as_ref(),
            Self::Notification(notif) => notif.params.as_ref(),
        }
    }

    /// Returns the request ID if this is a request.
    #[must_use]
    pub const fn id(&self) -> Option<&RequestId> {
        match self {
            Self::Request(req) => Some(&req.id),
            Self::Notification(_) => None,
        }
    }
}

/// Parses a JSON string into an incoming message.
///
/// # Errors
///
/// Returns a `JsonRpcError` (always [`INTERNAL_ERROR_CODE`]) if the JSON
/// is malformed or not a valid message.
pub fn parse_message(json: &str) -> Result<IncomingMessage, JsonRpcError> {
    let value: Value = serde_json::from_str(json)
        .map_err(|e| JsonRpcError::internal(None, format!("Invalid JSON: {e}")))?;

    let obj = value
        .as_object()
        .ok_or_else(|| JsonRpcError::internal(None, "Message must be a JSON object"))?;

    let jsonrpc = obj
        .get("jsonrpc")
        .and_then(Value::as_str)
        .ok_or_else(|| JsonRpcError::internal(None, "Missing jsonrpc field"))?;

    if jsonrpc != "2.0" {
        return Err(JsonRpcError::internal(None, "jsonrpc field must be \"2.0\""));
    }

    // The id key decides: present (even null) means request, absent means
    // notification.
    if obj.contains_key("id") {
        let request: JsonRpcRequest = serde_json::from_value(value)
            .map_err(|e| JsonRpcError::internal(None, format!("Invalid request: {e}")))?;

        if let Some(reason) = request.validate() {
            return Err(JsonRpcError::internal(Some(request.id), reason));
        }

        Ok(IncomingMessage::Request(request))
    } else {
        let notification: JsonRpcNotification = serde_json::from_value(value)
            .map_err(|e| JsonRpcError::internal(None, format!("Invalid notification: {e}")))?;

        Ok(IncomingMessage::Notification(notification))
    }
}

/// Helper for serde `skip_serializing_if`.
#[allow(clippy::trivially_copy_pass_by_ref)]
pub(crate) const fn is_false(value: &bool) -> bool {
    !*value
}

/// A tool description as served by `tools/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolDefinition {
    /// Unique tool name.
    pub name: String,

    /// Optional display title.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub title: Option<String>,

    /// Human-readable description.
    pub description: String,

    /// JSON Schema describing the tool's arguments.
    pub input_schema: Value,

    /// JSON Schema describing the tool's return value, when declared.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub output_schema: Option<Value>,
}

/// A piece of content in a tool result.
#[derive(Debug, Clone, Serialize)]
#[serde(tag = "type", rename_all = "lowercase")]
pub enum ToolContent {
    /// Plain text content.
    Text {
        /// The text payload.
        text: String,
    },
}

/// The result body of a `tools/call` response.
///
/// Tool failures travel in this shape too, flagged with `isError` and
/// never as a JSON-RPC `error` object.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ToolCallResult {
    /// Content blocks (always a single text block here).
    pub content: Vec<ToolContent>,

    /// Set when the body carries a serialized tool error.
    #[serde(skip_serializing_if = "is_false")]
    pub is_error: bool,

    /// Raw return value, present when the tool declares an output schema.
    #[serde(skip_serializing_if = "Option::is_none")]
    pub structured_content: Option<Value>,
}

impl ToolCallResult {
    /// A successful result carrying only text.
    #[must_use]
    pub fn text(text: impl Into<String>) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
            structured_content: None,
        }
    }

    /// A successful result carrying text plus the raw value.
    #[must_use]
    pub fn structured(text: impl Into<String>, value: Value) -> Self {
        Self {
            content: vec![ToolContent::Text { text: text.into() }],
            is_error: false,
            structured_content: Some(value),
        }
    }

    /// A failed result wrapping the error's JSON encoding.
    ///
    /// Produces exactly the envelope of [`ToolError::to_wire`].
    #[must_use]
    pub fn failure(error: &ToolError) -> Self {
        Self {
            content: vec![ToolContent::Text {
                text: error.to_value().to_string(),
            }],
            is_error: true,
            structured_content: None,
        }
    }
}

/// A resource description as served by `resources/list`.
#[derive(Debug, Clone, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct ResourceDefinition {
    /// Unique resource URI.
    pub uri: String,

    /// Human-readable name.
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// MIME type of the resource body.
    pub mime_type: String,
}

/// A declared prompt argument.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct PromptArgument {
    /// Argument name, matching a `{name}` placeholder in the template.
    pub name: String,

    /// Human-readable description.
    #[serde(default)]
    pub description: String,

    /// Whether callers are expected to supply this argument.
    #[serde(default)]
    pub required: bool,
}

/// A prompt description as served by `prompts/list`.
#[derive(Debug, Clone, Serialize)]
pub struct PromptDefinition {
    /// Unique prompt name.
    pub name: String,

    /// Human-readable description.
    pub description: String,

    /// Declared arguments.
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub arguments: Vec<PromptArgument>,
}

/// A rendered prompt message as served by `prompts/get`.
#[derive(Debug, Clone, Serialize)]
pub struct PromptMessage {
    /// Message role, typically "user".
    pub role: String,

    /// Message content.
    pub content: ToolContent,
}

impl PromptMessage {
    /// A user-role message carrying rendered text.
    #[must_use]
    pub fn user(text: impl Into<String>) -> Self {
        Self {
            role: "user".to_string(),
            content: ToolContent::Text { text: text.into() },
        }
    }
}
