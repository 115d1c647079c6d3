//! stdio transport for the MCP server.
//!
//! This module implements the stdio transport as specified by MCP:
//!
//! - Messages are UTF-8 encoded JSON-RPC
//! - Messages are delimited by newlines
//! - Messages must not contain embedded newlines
//! - stdin: receives messages from client
//! - stdout: sends messages to client
//! - stderr: may be used for logging (not MCP messages)
//!
//! Unlike the HTTP transport, malformed input here gets no reply at all:
//! a line that does not parse as a JSON-RPC message is logged and dropped,
//! keeping stdout clean for well-formed traffic.

use std::io;
use std::sync::Arc;

use tokio::io::{AsyncBufReadExt, AsyncRead, AsyncWrite, AsyncWriteExt, BufReader};

use crate::mcp::protocol::{parse_message, JsonRpcReply};
use crate::mcp::server::McpServer;

/// A stdio-based MCP transport.
///
/// Handles reading JSON-RPC messages from the reader and writing replies
/// to the writer. Defaults to the process stdin/stdout pair.
pub struct StdioTransport<R = tokio::io::Stdin, W = tokio::io::Stdout> {
    /// Buffered reader, stdin by default.
    reader: BufReader<R>,
    /// Reply sink, stdout by default.
    writer: W,
}

impl StdioTransport {
    /// Creates a new stdio transport.
    #[must_use]
    pub fn new() -> Self {
        Self {
            reader: BufReader::new(tokio::io::stdin()),
            writer: tokio::io::stdout(),
        }
    }
}

impl<R, W> StdioTransport<R, W>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    /// Creates a transport over the given reader and writer.
    #[must_use]
    pub fn with_io(reader: R, writer: W) -> Self {
        Self {
            reader: BufReader::new(reader),
            writer,
        }
    }

    /// Reads the next message line.
    ///
    /// Returns `None` if the input is closed (EOF).
    ///
    /// # Errors
    ///
    /// Returns an error if reading fails.
    pub async fn read_line(&mut self) -> io::Result<Option<String>> {
        let mut line = String::new();
        let bytes_read = self.reader.read_line(&mut line).await?;

        if bytes_read == 0 {
            // EOF - input closed
            return Ok(None);
        }

        // Remove the trailing newline
        if line.ends_with('\n') {
            line.pop();
            if line.ends_with('\r') {
                line.pop();
            }
        }

        Ok(Some(line))
    }

    /// Writes a JSON-RPC reply.
    ///
    /// The reply is serialised to JSON and terminated with a newline.
    ///
    /// # Errors
    ///
    /// Returns an error if serialisation or writing fails.
    pub async fn write_reply(&mut self, reply: &JsonRpcReply) -> io::Result<()> {
        let json = serde_json::to_string(reply)
            .map_err(|e| io::Error::new(io::ErrorKind::InvalidData, e))?;

        self.write_raw(&json).await
    }

    /// Writes a raw JSON string with newline termination.
    ///
    /// # Errors
    ///
    /// Returns an error if writing fails.
    async fn write_raw(&mut self, json: &str) -> io::Result<()> {
        // MCP spec: messages must not contain embedded newlines
        debug_assert!(
            !json.contains('\n'),
            "JSON message must not contain embedded newlines"
        );

        self.writer.write_all(json.as_bytes()).await?;
        self.writer.write_all(b"\n").await?;
        self.writer.flush().await?;

        Ok(())
    }
}

impl Default for StdioTransport {
    fn default() -> Self {
        Self::new()
    }
}

/// Runs the dispatcher over stdio until EOF or a shutdown signal.
///
/// # Errors
///
/// Returns an error if transport I/O fails.
#[cfg(unix)]
pub async fn serve_stdio(server: Arc<McpServer>) -> io::Result<()> {
    use tokio::signal::unix::{signal, SignalKind};

    let mut transport = StdioTransport::new();
    let mut sigint = signal(SignalKind::interrupt()).map_err(io::Error::other)?;
    let mut sigterm = signal(SignalKind::terminate()).map_err(io::Error::other)?;

    loop {
        tokio::select! {
            _ = sigint.recv() => {
                tracing::info!("Received SIGINT, initiating graceful shutdown");
                return Ok(());
            }

            _ = sigterm.recv() => {
                tracing::info!("Received SIGTERM, initiating graceful shutdown");
                return Ok(());
            }

            line_result = transport.read_line() => {
                let Some(line) = line_result? else {
                    tracing::info!("stdin closed, shutting down");
                    return Ok(());
                };
                handle_line(&server, &mut transport, &line).await?;
            }
        }
    }
}

/// Runs the dispatcher over stdio until EOF or Ctrl+C.
///
/// # Errors
///
/// Returns an error if transport I/O fails.
#[cfg(windows)]
pub async fn serve_stdio(server: Arc<McpServer>) -> io::Result<()> {
    let mut transport = StdioTransport::new();
    let ctrl_c = tokio::signal::ctrl_c();
    tokio::pin!(ctrl_c);

    loop {
        tokio::select! {
            _ = &mut ctrl_c => {
                tracing::info!("Received Ctrl+C, initiating graceful shutdown");
                return Ok(());
            }

            line_result = transport.read_line() => {
                let Some(line) = line_result? else {
                    tracing::info!("stdin closed, shutting down");
                    return Ok(());
                };
                handle_line(&server, &mut transport, &line).await?;
            }
        }
    }
}

/// Handles one input line. Malformed lines are dropped without a reply.
async fn handle_line<R, W>(
    server: &McpServer,
    transport: &mut StdioTransport<R, W>,
    line: &str,
) -> io::Result<()>
where
    R: AsyncRead + Unpin,
    W: AsyncWrite + Unpin,
{
    if line.trim().is_empty() {
        return Ok(());
    }

    let msg = match parse_message(line) {
        Ok(msg) => msg,
        Err(error) => {
            tracing::debug!(reason = %error.error.message, "Dropping malformed stdio line");
            return Ok(());
        }
    };

    if let Some(reply) = server.handle_message(msg).await {
        transport.write_reply(&reply).await?;
    }

    Ok(())
}
