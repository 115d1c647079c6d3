//! toolhost-mcp: capability discovery and remote tool invocation over MCP
//!
//! This library hosts a registry of tools, resources, and prompt templates
//! behind the Model Context Protocol, speaking JSON-RPC 2.0 over stdio or
//! HTTP.
//!
//! # Architecture
//!
//! The server owns policy; registered handlers own behaviour:
//!
//! - **Discovery**: `tools/list`, `resources/list`, `prompts/list` expose
//!   what the registry holds
//! - **Invocation**: `tools/call` validates arguments against the declared
//!   schema, applies rate limits and timeouts, then runs the handler
//! - **Failure envelope**: tool failures travel as structured errors inside
//!   successful JSON-RPC responses, so clients always get the taxonomy
//!
//! # Modules
//!
//! - [`builtin`] — Tools, resources, and prompts shipped with the server
//! - [`config`] — Configuration loading and validation
//! - [`error`] — Error taxonomy and wire envelope
//! - [`mcp`] — Protocol types, dispatch, and transports
//! - [`rate_limit`] — Token-bucket admission control
//! - [`registry`] — Tool, resource, and prompt registrations
//! - [`validator`] — JSON Schema argument validation with coercion

pub mod builtin;
pub mod config;
pub mod error;
pub mod mcp;
pub mod rate_limit;
pub mod registry;
pub mod validator;
