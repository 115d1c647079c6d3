//! Model Context Protocol (MCP) server implementation.
//!
//! This module implements the MCP wire protocol for exposing registered
//! tools, resources and prompts to AI assistants. One dispatcher serves
//! two transports: newline-delimited JSON-RPC 2.0 over stdio, and HTTP.
//!
//! # Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                         MCP Server                          │
//! │                                                             │
//! │   ┌─────────────┐    ┌─────────────┐    ┌─────────────┐    │
//! │   │ Transports  │───▶│   Server    │───▶│  Registry   │    │
//! │   │ (stdio/http)│    │ (dispatch)  │    │ (handlers)  │    │
//! │   └─────────────┘    └─────────────┘    └─────────────┘    │
//! │          │                  │                  │            │
//! │          ▼                  ▼                  ▼            │
//! │   ┌─────────────────────────────────────────────────┐      │
//! │   │              JSON-RPC Messages                  │      │
//! │   └─────────────────────────────────────────────────┘      │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! # Protocol Version
//!
//! This implementation targets MCP protocol version 2024-11-05.

pub mod http;
pub mod protocol;
pub mod server;
pub mod transport;

pub use protocol::{JsonRpcError, JsonRpcRequest, JsonRpcResponse, MCP_PROTOCOL_VERSION};
pub use server::{McpServer, ServerInfo, TimeoutConfig};
pub use transport::StdioTransport;
