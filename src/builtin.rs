//! Built-in tools, resources, and prompts.
//!
//! These ship with the server so a fresh install has something to list
//! and call. Host applications register their own entries alongside them.

use serde_json::{json, Map, Value};

use crate::error::ToolError;
use crate::mcp::protocol::SERVER_NAME;
use crate::registry::{RegisteredPrompt, RegisteredResource, RegisteredTool, Registry};

const MODULE: &str = "builtin";

/// Registers the built-in tools, resources, and prompts.
pub fn register_builtins(registry: &mut Registry) {
    registry.register(echo_tool());
    registry.register(add_tool());
    registry.register(sleep_tool());
    registry.register_resource(about_resource());
    registry.register_prompt(summarize_prompt());
}

/// Echoes a message back, optionally repeated.
fn echo_tool() -> RegisteredTool {
    RegisteredTool::builder("echo")
        .description("Echo a message back to the caller")
        .input_schema(json!({
            "type": "object",
            "properties": {
                "message": {
                    "type": "string",
                    "description": "Text to echo back"
                },
                "repeat": {
                    "type": "integer",
                    "description": "How many times to repeat the message",
                    "minimum": 1,
                    "maximum": 10
                }
            },
            "required": ["message"]
        }))
        .module(MODULE)
        .build(|args: Map<String, Value>| async move {
            let message = args
                .get("message")
                .and_then(Value::as_str)
                .unwrap_or_default()
                .to_string();
            let repeat = args
                .get("repeat")
                .and_then(Value::as_u64)
                .and_then(|n| usize::try_from(n).ok())
                .unwrap_or(1);
            let echoed = vec![message; repeat].join(" ");
            Ok(json!({ "echo": echoed }))
        })
}

/// Adds two numbers and reports the sum as structured content.
fn add_tool() -> RegisteredTool {
    RegisteredTool::builder("add")
        .description("Add two numbers and return the sum")
        .input_schema(json!({
            "type": "object",
            "properties": {
                "a": { "type": "number", "description": "First addend" },
                "b": { "type": "number", "description": "Second addend" }
            },
            "required": ["a", "b"]
        }))
        .output_schema(json!({
            "type": "object",
            "properties": {
                "sum": { "type": "number" }
            },
            "required": ["sum"]
        }))
        .module(MODULE)
        .build(|args: Map<String, Value>| async move {
            let a = number_arg("add", &args, "a")?;
            let b = number_arg("add", &args, "b")?;
            Ok(json!({ "sum": a + b }))
        })
}

/// Sleeps for the requested number of seconds.
fn sleep_tool() -> RegisteredTool {
    RegisteredTool::builder("sleep")
        .description("Pause for a number of seconds, useful for exercising timeouts")
        .input_schema(json!({
            "type": "object",
            "properties": {
                "seconds": {
                    "type": "number",
                    "description": "How long to sleep",
                    "minimum": 0,
                    "maximum": 60
                }
            },
            "required": ["seconds"]
        }))
        .module(MODULE)
        .build(|args: Map<String, Value>| async move {
            // from_secs_f64 panics on negative input.
            let seconds = number_arg("sleep", &args, "seconds")?.clamp(0.0, 60.0);
            tokio::time::sleep(std::time::Duration::from_secs_f64(seconds)).await;
            Ok(json!({ "slept": seconds }))
        })
}

/// Extracts a numeric argument, rejecting anything else.
fn number_arg(tool: &str, args: &Map<String, Value>, name: &str) -> Result<f64, ToolError> {
    args.get(name).and_then(Value::as_f64).ok_or_else(|| {
        ToolError::execution(
            tool,
            format!("argument '{name}' must be a number"),
            Some(MODULE.to_string()),
            None,
        )
    })
}

/// Describes the running server.
fn about_resource() -> RegisteredResource {
    RegisteredResource::builder("about://server", "About this server")
        .description("Server name and version")
        .mime_type("text/plain")
        .build(|| Ok(format!("{SERVER_NAME} {}", env!("CARGO_PKG_VERSION"))))
}

/// Prompt template for summarising text.
fn summarize_prompt() -> RegisteredPrompt {
    RegisteredPrompt::builder("summarize")
        .description("Summarise a block of text")
        .argument("text", "The text to summarise", true)
        .argument("style", "Tone of the summary, e.g. formal or casual", false)
        .template("Summarise the following text in a {style} style:\n\n{text}")
        .build()
}
