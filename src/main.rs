//! toolhost-mcp: capability discovery and remote tool invocation over MCP
//!
//! Hosts a registry of tools, resources, and prompt templates behind the
//! Model Context Protocol, speaking JSON-RPC 2.0 over stdio or HTTP.

use std::path::PathBuf;
use std::process::ExitCode;
use std::sync::Arc;

use clap::Parser;
use tracing::{error, info, Level};
use tracing_subscriber::EnvFilter;

use toolhost_mcp::builtin;
use toolhost_mcp::config;
use toolhost_mcp::mcp::http::serve_http;
use toolhost_mcp::mcp::server::{McpServer, ServerInfo, TimeoutConfig};
use toolhost_mcp::mcp::transport::serve_stdio;
use toolhost_mcp::rate_limit::{RateLimitConfig, RateLimiter};
use toolhost_mcp::registry::Registry;

/// MCP server for capability discovery and remote tool invocation.
///
/// Hosts a registry of tools, resources, and prompt templates that MCP
/// clients discover and call over stdio or HTTP.
#[derive(Parser, Debug)]
#[command(name = "toolhost-mcp")]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Path to configuration file
    #[arg(value_name = "CONFIG_FILE")]
    config: Option<PathBuf>,

    /// Serve over HTTP instead of stdio
    #[arg(long)]
    http: bool,

    /// Bind address for the HTTP transport (implies --http)
    #[arg(long, value_name = "ADDR")]
    bind: Option<String>,

    /// Increase logging verbosity (-v for info, -vv for debug, -vvv for trace)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Decrease logging verbosity (only show errors)
    #[arg(short, long)]
    quiet: bool,
}

/// Determines the log level from CLI arguments.
#[allow(clippy::match_same_arms)] // Explicit "warn" arm for clarity
fn get_log_level(verbose: u8, quiet: bool, config_level: &str) -> Level {
    if quiet {
        return Level::ERROR;
    }

    match verbose {
        0 => match config_level.to_lowercase().as_str() {
            "trace" => Level::TRACE,
            "debug" => Level::DEBUG,
            "info" => Level::INFO,
            "warn" => Level::WARN,
            "error" => Level::ERROR,
            _ => Level::WARN, // Default to warn for unknown levels
        },
        1 => Level::INFO,
        2 => Level::DEBUG,
        _ => Level::TRACE,
    }
}

/// Initialises the tracing subscriber for logging.
fn init_tracing(level: Level) {
    let filter = EnvFilter::from_default_env().add_directive(level.into());

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_writer(std::io::stderr)
        .init();
}

/// Entry point for the toolhost-mcp server.
fn main() -> ExitCode {
    let args = Args::parse();

    // Load configuration
    let config_path = args.config.as_deref();
    let cfg = match config::load_config(config_path) {
        Ok(cfg) => cfg,
        Err(e) => {
            eprintln!("Configuration error: {e}");
            if config_path.is_none() {
                if let Some(default_path) = config::default_config_path() {
                    eprintln!("\nWhile loading config at: {}", default_path.display());
                }
            }
            return ExitCode::FAILURE;
        }
    };

    // Initialise logging
    let log_level = get_log_level(args.verbose, args.quiet, &cfg.logging.level);
    init_tracing(log_level);

    // Display GPL license notice (required by GPLv3 Section 5d)
    eprintln!(
        "toolhost-mcp {}  Copyright (C) 2026  The Embedded Society",
        env!("CARGO_PKG_VERSION")
    );
    eprintln!("This program comes with ABSOLUTELY NO WARRANTY.");
    eprintln!("This is free software, licensed under GPL-3.0-or-later.");
    eprintln!("Source: {}", env!("CARGO_PKG_REPOSITORY"));
    eprintln!();

    info!(
        version = env!("CARGO_PKG_VERSION"),
        "Starting toolhost-mcp server"
    );

    // Build the registry
    let mut registry = Registry::new();
    builtin::register_builtins(&mut registry);

    info!(
        tools = registry.tool_count(),
        resources = registry.resource_count(),
        prompts = registry.prompt_count(),
        "Registry initialised"
    );

    let rate_limiter = RateLimiter::new(RateLimitConfig {
        rate: cfg.limits.rate,
        burst: cfg.limits.burst,
        global_rate: cfg.limits.global_rate,
        global_burst: cfg.limits.global_burst,
    });
    let timeouts = TimeoutConfig {
        default_seconds: cfg.timeouts.default_seconds,
        per_tool: cfg.timeouts.per_tool,
    };
    let server_info = ServerInfo {
        name: cfg.server.name,
        version: env!("CARGO_PKG_VERSION").to_string(),
    };

    let server = Arc::new(McpServer::new(
        Arc::new(registry),
        rate_limiter,
        timeouts,
        server_info,
    ));

    let use_http = args.http || args.bind.is_some();
    let bind = args.bind.unwrap_or(cfg.http.bind);

    // HTTP serves concurrent connections; stdio is strictly sequential.
    let runtime = if use_http {
        tokio::runtime::Builder::new_multi_thread()
    } else {
        tokio::runtime::Builder::new_current_thread()
    }
    .enable_all()
    .build()
    .expect("Failed to create Tokio runtime");

    let result = if use_http {
        info!(bind = %bind, "MCP server ready, serving HTTP");
        runtime.block_on(serve_http(&bind, server))
    } else {
        info!("MCP server ready, waiting for client connection...");
        runtime.block_on(serve_stdio(server))
    };

    match result {
        Ok(()) => {
            info!("Server shut down gracefully");
            ExitCode::SUCCESS
        }
        Err(e) => {
            error!(error = %e, "Server error");
            ExitCode::FAILURE
        }
    }
}
