//! Error types for toolhost-mcp.
//!
//! Two layers live here. [`ConfigError`] covers startup problems loading the
//! configuration file. [`ToolError`] is the structured envelope for tool call
//! failures: it carries a stable code from a closed taxonomy, optional
//! per-field detail, and a correlation ID, and it round-trips through JSON so
//! a client-side proxy can rebuild it field-for-field.

use std::path::PathBuf;

use serde::{Deserialize, Serialize};
use serde_json::{json, Value};
use thiserror::Error;

/// Stable error codes for tool call failures.
///
/// The set is closed: clients switch on these strings, so new codes are an
/// API change. `CircuitOpen` and `DependencyMissing` are reserved for
/// registries that layer breakers or optional backends on top; nothing in
/// this crate produces them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum ToolErrorCode {
    /// Arguments failed schema validation.
    ValidationError,
    /// The tool handler returned an error or panicked.
    ExecutionError,
    /// The tool exceeded its execution budget.
    Timeout,
    /// No tool is registered under the requested name.
    NotFound,
    /// The token bucket refused the call.
    RateLimited,
    /// Reserved: a circuit breaker is open for this tool.
    CircuitOpen,
    /// Reserved: an optional backend the tool needs is not installed.
    DependencyMissing,
    /// Anything that does not fit the categories above.
    Internal,
}

impl ToolErrorCode {
    /// Returns the wire spelling of this code.
    #[must_use]
    pub const fn as_str(self) -> &'static str {
        match self {
            Self::ValidationError => "VALIDATION_ERROR",
            Self::ExecutionError => "EXECUTION_ERROR",
            Self::Timeout => "TIMEOUT",
            Self::NotFound => "NOT_FOUND",
            Self::RateLimited => "RATE_LIMITED",
            Self::CircuitOpen => "CIRCUIT_OPEN",
            Self::DependencyMissing => "DEPENDENCY_MISSING",
            Self::Internal => "INTERNAL",
        }
    }
}

impl std::fmt::Display for ToolErrorCode {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// One validation failure tied to a specific argument.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct FieldError {
    /// The argument name.
    pub field: String,
    /// What the argument violated.
    pub constraint: String,
    /// The offending value, when it is worth echoing back.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub value: Option<Value>,
}

impl FieldError {
    /// Creates a field error without an echoed value.
    #[must_use]
    pub fn new(field: impl Into<String>, constraint: impl Into<String>) -> Self {
        Self {
            field: field.into(),
            constraint: constraint.into(),
            value: None,
        }
    }

    /// Splits a `"<field>: <reason>"` validator message into a field error.
    ///
    /// Messages without a colon become a constraint with an empty field name.
    #[must_use]
    pub fn from_message(message: &str) -> Self {
        message.split_once(':').map_or_else(
            || Self::new("", message.trim()),
            |(field, reason)| Self::new(field.trim(), reason.trim()),
        )
    }
}

/// A structured tool call failure.
///
/// Every failed `tools/call` produces one of these. The envelope crosses the
/// wire JSON-encoded inside the result body (see [`ToolError::to_wire`]), so
/// callers on the other side can decode it back into the same fields.
#[derive(Debug, Clone, Error, Serialize, Deserialize)]
#[error("[{code}] {tool_name}: {message}")]
pub struct ToolError {
    /// Stable error code.
    pub code: ToolErrorCode,
    /// Human-readable description.
    pub message: String,
    /// Name of the tool the call targeted.
    pub tool_name: String,
    /// Module the tool was registered from, when known.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub module: Option<String>,
    /// Per-argument validation failures.
    #[serde(default, skip_serializing_if = "Vec::is_empty")]
    pub field_errors: Vec<FieldError>,
    /// A hint for the caller on how to recover.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub suggestion: Option<String>,
    /// Opaque ID joining this error to the server-side log line.
    ///
    /// Regenerated on decode when the source envelope lacks one.
    #[serde(default = "new_correlation_id")]
    pub correlation_id: String,
}

fn new_correlation_id() -> String {
    uuid::Uuid::new_v4().to_string()
}

impl ToolError {
    fn base(code: ToolErrorCode, tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self {
            code,
            message: message.into(),
            tool_name: tool_name.into(),
            module: None,
            field_errors: Vec::new(),
            suggestion: None,
            correlation_id: new_correlation_id(),
        }
    }

    /// Arguments failed validation; one entry per violated constraint.
    #[must_use]
    pub fn validation(
        tool_name: impl Into<String>,
        message: impl Into<String>,
        field_errors: Vec<FieldError>,
    ) -> Self {
        let mut error = Self::base(ToolErrorCode::ValidationError, tool_name, message);
        error.field_errors = field_errors;
        error
    }

    /// No tool is registered under `tool_name`.
    #[must_use]
    pub fn not_found(tool_name: impl Into<String>) -> Self {
        let tool_name = tool_name.into();
        let message = format!("Tool '{tool_name}' is not registered");
        let mut error = Self::base(ToolErrorCode::NotFound, tool_name, message);
        error.suggestion = Some("Call tools/list to see the registered tool names".to_string());
        error
    }

    /// The tool ran past its execution budget.
    #[must_use]
    pub fn timeout(tool_name: impl Into<String>, seconds: f64) -> Self {
        let tool_name = tool_name.into();
        let message = format!("Tool '{tool_name}' timed out after {seconds}s");
        Self::base(ToolErrorCode::Timeout, tool_name, message)
    }

    /// The tool handler failed or panicked.
    #[must_use]
    pub fn execution(
        tool_name: impl Into<String>,
        cause: impl Into<String>,
        module: Option<String>,
        suggestion: Option<String>,
    ) -> Self {
        let mut error = Self::base(ToolErrorCode::ExecutionError, tool_name, cause);
        error.module = module;
        error.suggestion = suggestion;
        error
    }

    /// The token bucket refused the call.
    #[must_use]
    pub fn rate_limited(tool_name: impl Into<String>) -> Self {
        let tool_name = tool_name.into();
        let message = format!("Rate limit exceeded for tool '{tool_name}'");
        let mut error = Self::base(ToolErrorCode::RateLimited, tool_name, message);
        error.suggestion = Some("Slow down and retry shortly".to_string());
        error
    }

    /// A failure that fits no other category.
    #[must_use]
    pub fn internal(tool_name: impl Into<String>, message: impl Into<String>) -> Self {
        Self::base(ToolErrorCode::Internal, tool_name, message)
    }

    /// Encodes this error as a plain JSON object.
    ///
    /// [`ToolError::from_value`] decodes the result back into an identical
    /// error, correlation ID included.
    #[must_use]
    pub fn to_value(&self) -> Value {
        // Serialisation of own types cannot fail; fall back to a bare
        // message object rather than propagating.
        serde_json::to_value(self).unwrap_or_else(|_| json!({ "message": self.message }))
    }

    /// Decodes an error from the object form produced by [`ToolError::to_value`].
    ///
    /// Returns `None` when the value does not have the envelope shape. A
    /// missing `correlation_id` is replaced with a fresh one.
    #[must_use]
    pub fn from_value(value: &Value) -> Option<Self> {
        serde_json::from_value(value.clone()).ok()
    }

    /// Wraps this error in the wire result body used by `tools/call`.
    ///
    /// The envelope is JSON-encoded a second time into the text content
    /// block, so the bytes survive transports that only pass content through.
    #[must_use]
    pub fn to_wire(&self) -> Value {
        json!({
            "content": [{ "type": "text", "text": self.to_value().to_string() }],
            "isError": true,
        })
    }

    /// Recovers a structured error from a `tools/call` result body.
    ///
    /// Returns `None` for successful results. Error results whose text does
    /// not decode as an envelope come back as a [`ToolErrorCode::Internal`]
    /// error wrapping the raw text, so older text-only errors stay readable.
    #[must_use]
    pub fn from_wire(result: &Value) -> Option<Self> {
        if !result
            .get("isError")
            .and_then(Value::as_bool)
            .unwrap_or(false)
        {
            return None;
        }

        let text = result
            .get("content")
            .and_then(Value::as_array)
            .and_then(|content| content.first())
            .and_then(|item| item.get("text"))
            .and_then(Value::as_str)?;

        Some(serde_json::from_str(text).unwrap_or_else(|_| Self::legacy(text)))
    }

    /// Wraps a non-envelope error text from an older peer.
    fn legacy(text: &str) -> Self {
        Self::base(ToolErrorCode::Internal, "unknown", text)
    }
}

/// Errors that can occur during configuration operations.
#[derive(Error, Debug)]
pub enum ConfigError {
    /// Configuration file could not be read.
    #[error("failed to read configuration file: {path}")]
    ReadError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying IO error.
        #[source]
        source: std::io::Error,
    },

    /// Configuration file could not be parsed.
    #[error("failed to parse configuration file: {path}")]
    ParseError {
        /// Path to the configuration file.
        path: PathBuf,
        /// The underlying JSON error.
        #[source]
        source: serde_json::Error,
    },

    /// Configuration file not found.
    #[error("configuration file not found: {path}")]
    NotFound {
        /// Path where the configuration file was expected.
        path: PathBuf,
    },

    /// Configuration validation failed.
    #[error("configuration validation failed: {message}")]
    ValidationError {
        /// Description of the validation failure.
        message: String,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn config_error_display() {
        let error = ConfigError::NotFound {
            path: PathBuf::from("/path/to/config.json"),
        };
        let msg = error.to_string();
        assert!(msg.contains("not found"));
        assert!(msg.contains("config.json"));
    }

    #[test]
    fn tool_error_display() {
        let error = ToolError::not_found("echo");
        let msg = error.to_string();
        assert!(msg.contains("NOT_FOUND"));
        assert!(msg.contains("echo"));
    }

    #[test]
    fn code_wire_spelling() {
        assert_eq!(ToolErrorCode::ValidationError.as_str(), "VALIDATION_ERROR");
        assert_eq!(
            serde_json::to_value(ToolErrorCode::RateLimited).unwrap(),
            json!("RATE_LIMITED")
        );
    }

    #[test]
    fn value_round_trip_is_exact() {
        let error = ToolError::validation(
            "echo",
            "Invalid arguments for tool 'echo'",
            vec![FieldError::new("message", "required field is missing")],
        );

        let value = error.to_value();
        let decoded = ToolError::from_value(&value).unwrap();

        assert_eq!(decoded.code, error.code);
        assert_eq!(decoded.message, error.message);
        assert_eq!(decoded.tool_name, error.tool_name);
        assert_eq!(decoded.field_errors, error.field_errors);
        assert_eq!(decoded.suggestion, error.suggestion);
        assert_eq!(decoded.correlation_id, error.correlation_id);
    }

    #[test]
    fn missing_correlation_id_gets_fresh_one() {
        let value = json!({
            "code": "TIMEOUT",
            "message": "Tool 'slow' timed out after 5s",
            "tool_name": "slow"
        });

        let decoded = ToolError::from_value(&value).unwrap();
        assert_eq!(decoded.code, ToolErrorCode::Timeout);
        assert!(!decoded.correlation_id.is_empty());
    }

    #[test]
    fn wire_envelope_double_encodes() {
        let error = ToolError::timeout("slow", 0.05);
        let wire = error.to_wire();

        assert_eq!(wire["isError"], json!(true));
        let text = wire["content"][0]["text"].as_str().unwrap();
        // The inner text is the JSON encoding of the object form, bit for bit.
        assert_eq!(text, error.to_value().to_string());

        let inner: Value = serde_json::from_str(text).unwrap();
        assert_eq!(inner["code"], json!("TIMEOUT"));
    }

    #[test]
    fn wire_round_trip() {
        let error = ToolError::execution(
            "deploy",
            "backend unreachable",
            Some("infra".to_string()),
            Some("Check the backend service".to_string()),
        );

        let decoded = ToolError::from_wire(&error.to_wire()).unwrap();
        assert_eq!(decoded.code, ToolErrorCode::ExecutionError);
        assert_eq!(decoded.module.as_deref(), Some("infra"));
        assert_eq!(decoded.correlation_id, error.correlation_id);
    }

    #[test]
    fn from_wire_ignores_success() {
        let success = json!({ "content": [{ "type": "text", "text": "\"ok\"" }] });
        assert!(ToolError::from_wire(&success).is_none());

        let explicit = json!({ "content": [], "isError": false });
        assert!(ToolError::from_wire(&explicit).is_none());
    }

    #[test]
    fn from_wire_wraps_plain_text_errors() {
        let legacy = json!({
            "content": [{ "type": "text", "text": "something broke" }],
            "isError": true
        });

        let decoded = ToolError::from_wire(&legacy).unwrap();
        assert_eq!(decoded.code, ToolErrorCode::Internal);
        assert_eq!(decoded.message, "something broke");
    }

    #[test]
    fn field_error_from_message_splits_on_first_colon() {
        let fe = FieldError::from_message("count: value 0 is below minimum 1");
        assert_eq!(fe.field, "count");
        assert_eq!(fe.constraint, "value 0 is below minimum 1");

        let odd = FieldError::from_message("no colon here");
        assert_eq!(odd.field, "");
        assert_eq!(odd.constraint, "no colon here");
    }

    #[test]
    fn fresh_errors_have_distinct_correlation_ids() {
        let a = ToolError::not_found("x");
        let b = ToolError::not_found("x");
        assert_ne!(a.correlation_id, b.correlation_id);
    }
}
