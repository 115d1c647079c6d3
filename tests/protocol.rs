//! Integration tests for MCP protocol handling.
//!
//! These tests verify the JSON-RPC 2.0 message layer: request and
//! notification classification, malformed input handling, and the tool
//! error envelope.

use toolhost_mcp::error::{FieldError, ToolError, ToolErrorCode};
use toolhost_mcp::mcp::protocol::{
    parse_message, IncomingMessage, RequestId, ToolCallResult, INTERNAL_ERROR_CODE,
};

// =============================================================================
// Protocol Parsing Tests
// =============================================================================

#[test]
fn test_parse_initialize_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 1,
        "method": "initialize",
        "params": {
            "protocolVersion": "2024-11-05",
            "capabilities": {},
            "clientInfo": {
                "name": "test-client",
                "version": "1.0.0"
            }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "initialize");
        assert_eq!(req.id, RequestId::Number(1));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_tools_call_request() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": "call-7",
        "method": "tools/call",
        "params": {
            "name": "echo",
            "arguments": { "message": "hello" }
        }
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "tools/call");
        assert_eq!(req.id, RequestId::String("call-7".to_string()));
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_notification() {
    let json = r#"{
        "jsonrpc": "2.0",
        "method": "notifications/initialized"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Notification(notif) = result.unwrap() {
        assert_eq!(notif.method, "notifications/initialized");
    } else {
        panic!("Expected Notification");
    }
}

#[test]
fn test_parse_null_id_is_a_request() {
    // A literal null id is still an id, so this is a request.
    let json = r#"{
        "jsonrpc": "2.0",
        "id": null,
        "method": "ping"
    }"#;

    let result = parse_message(json);
    assert!(result.is_ok());

    if let IncomingMessage::Request(req) = result.unwrap() {
        assert_eq!(req.method, "ping");
        assert_eq!(req.id, RequestId::Null);
    } else {
        panic!("Expected Request");
    }
}

#[test]
fn test_parse_invalid_json() {
    let json = "not valid json";

    let result = parse_message(json);
    assert!(result.is_err());
}

#[test]
fn test_parse_missing_jsonrpc_version() {
    let json = r#"{
        "id": 1,
        "method": "test"
    }"#;

    let result = parse_message(json);
    assert!(result.is_err());
}

#[test]
fn test_parse_wrong_jsonrpc_version() {
    let json = r#"{
        "jsonrpc": "1.0",
        "id": 1,
        "method": "test"
    }"#;

    let error = parse_message(json).unwrap_err();
    assert_eq!(error.error.code, INTERNAL_ERROR_CODE);
}

#[test]
fn test_parse_empty_method_keeps_request_id() {
    let json = r#"{
        "jsonrpc": "2.0",
        "id": 7,
        "method": ""
    }"#;

    let error = parse_message(json).unwrap_err();
    assert_eq!(error.id, Some(RequestId::Number(7)));
    assert_eq!(error.error.code, INTERNAL_ERROR_CODE);
}

// =============================================================================
// Tool Error Envelope Tests
// =============================================================================

#[test]
fn test_error_envelope_round_trip() {
    let error = ToolError::validation(
        "echo",
        "Arguments failed schema validation",
        vec![FieldError::from_message("message: required field is missing")],
    );

    let decoded = ToolError::from_value(&error.to_value()).unwrap();
    assert_eq!(decoded.code, ToolErrorCode::ValidationError);
    assert_eq!(decoded.tool_name, "echo");
    assert_eq!(decoded.correlation_id, error.correlation_id);
    assert_eq!(decoded.field_errors.len(), 1);
    assert_eq!(decoded.field_errors[0].field, "message");
}

#[test]
fn test_wire_envelope_is_double_encoded() {
    let error = ToolError::not_found("missing_tool");
    let wire = error.to_wire();

    assert_eq!(wire["isError"], true);
    let text = wire["content"][0]["text"].as_str().unwrap();
    // The text block holds the JSON-encoded error object byte for byte.
    assert_eq!(text, error.to_value().to_string());

    let decoded = ToolError::from_wire(&wire).unwrap();
    assert_eq!(decoded.code, ToolErrorCode::NotFound);
    assert_eq!(decoded.tool_name, "missing_tool");
}

#[test]
fn test_failure_result_matches_wire_envelope() {
    let error = ToolError::rate_limited("echo");
    let result = ToolCallResult::failure(&error);

    let encoded = serde_json::to_value(&result).unwrap();
    assert_eq!(encoded, error.to_wire());
}
