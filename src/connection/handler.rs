//! Connection Handler Module
//!
//! This module handles individual client connections to the relay.
//! Each client gets its own handler task that runs in a loop,
//! reading commands and sending responses.
//!
//! ## Connection Lifecycle
//!
//! ```text
//! 1. Client connects (TCP handshake)
//!        │
//!        ▼
//! 2. ConnectionHandler spawned
//!        │
//!        ▼
//! 3. ┌──────────────────────────────┐
//!    │      Main Loop               │
//!    │                              │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Read one NUL frame      │ │ <── shutdown signal ends the
//!    │  └───────────┬─────────────┘ │     loop only while idle here
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Execute (blocking pool) │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │  ┌─────────────────────────┐ │
//!    │  │ Send framed response    │ │
//!    │  └───────────┬─────────────┘ │
//!    │              ▼               │
//!    │         [Loop back]          │
//!    └──────────────────────────────┘
//!        │
//!        ▼
//! 4. Client disconnects / I/O error / shutdown
//!        │
//!        ▼
//! 5. Handler task ends, socket closed
//! ```
//!
//! Requests on one connection are answered strictly in order: the next frame
//! is not read until the previous response has been written.

use crate::commands::{CommandHandler, StatementExecutor};
use crate::connection::framed::{FramedStream, DEFAULT_MAX_FRAME_SIZE};
use crate::protocol::{ErrorCategory, Response};
use std::net::SocketAddr;
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;
use tokio::io::{AsyncRead, AsyncWrite};
use tokio::sync::watch;
use tracing::{debug, error, info, warn};

/// Statistics for connection handling
#[derive(Debug, Default)]
pub struct ConnectionStats {
    /// Total number of connections accepted
    pub connections_accepted: AtomicU64,
    /// Currently active connections
    pub active_connections: AtomicU64,
    /// Total commands processed
    pub commands_processed: AtomicU64,
    /// Total bytes read
    pub bytes_read: AtomicU64,
    /// Total bytes written
    pub bytes_written: AtomicU64,
}

impl ConnectionStats {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn connection_opened(&self) {
        self.connections_accepted.fetch_add(1, Ordering::Relaxed);
        self.active_connections.fetch_add(1, Ordering::Relaxed);
    }

    pub fn connection_closed(&self) {
        self.active_connections.fetch_sub(1, Ordering::Relaxed);
    }

    pub fn command_processed(&self) {
        self.commands_processed.fetch_add(1, Ordering::Relaxed);
    }

    pub fn bytes_read(&self, count: usize) {
        self.bytes_read.fetch_add(count as u64, Ordering::Relaxed);
    }

    pub fn bytes_written(&self, count: usize) {
        self.bytes_written
            .fetch_add(count as u64, Ordering::Relaxed);
    }
}

/// Handles a single client connection.
///
/// This struct owns the framed stream and runs the
/// receive, execute, respond loop for one connected client. The executor
/// defaults to the store-backed [`CommandHandler`].
pub struct ConnectionHandler<S, E = CommandHandler> {
    /// The framed stream for this connection
    framed: FramedStream<S>,

    /// Client's address (for logging)
    addr: SocketAddr,

    /// The command handler (shares the store with every connection)
    command_handler: E,

    /// Connection statistics (shared)
    stats: Arc<ConnectionStats>,

    /// Flips to `true` when the server shuts down
    shutdown: watch::Receiver<bool>,
}

impl<S: AsyncRead + AsyncWrite + Unpin, E: StatementExecutor> ConnectionHandler<S, E> {
    /// Creates a new connection handler.
    ///
    /// # Arguments
    ///
    /// * `stream` - The byte stream for this connection
    /// * `addr` - The client's socket address
    /// * `command_handler` - The command handler for executing commands
    /// * `stats` - Shared connection statistics
    /// * `shutdown` - Server shutdown signal
    pub fn new(
        stream: S,
        addr: SocketAddr,
        command_handler: E,
        stats: Arc<ConnectionStats>,
        shutdown: watch::Receiver<bool>,
    ) -> Self {
        stats.connection_opened();

        Self {
            framed: FramedStream::new(stream, Arc::clone(&stats)),
            addr,
            command_handler,
            stats,
            shutdown,
        }
    }

    pub fn with_max_frame_size(mut self, max_frame_size: usize) -> Self {
        self.framed = self.framed.with_max_frame_size(max_frame_size);
        self
    }

    /// Runs the main connection loop.
    ///
    /// Reads commands, executes them, and sends back responses until the
    /// client disconnects, an I/O error occurs, or the server shuts down.
    pub async fn run(mut self) -> Result<(), ConnectionError> {
        info!(client = %self.addr, "Client connected");

        let result = self.main_loop().await;

        match &result {
            Ok(()) => info!(client = %self.addr, "Client disconnected"),
            Err(ConnectionError::IoError(io_err))
                if io_err.kind() == std::io::ErrorKind::ConnectionReset =>
            {
                debug!(client = %self.addr, "Connection reset by client")
            }
            Err(e) => warn!(client = %self.addr, error = %e, "Connection error"),
        }

        // Best effort: the peer may already be gone
        let _ = self.framed.shutdown().await;

        self.stats.connection_closed();
        result
    }

    /// The main read-execute-respond loop.
    async fn main_loop(&mut self) -> Result<(), ConnectionError> {
        loop {
            if *self.shutdown.borrow() {
                debug!(client = %self.addr, "Server shutting down, closing connection");
                return Ok(());
            }

            let message = tokio::select! {
                changed = self.shutdown.changed() => {
                    if changed.is_err() || *self.shutdown.borrow() {
                        debug!(client = %self.addr, "Server shutting down, closing idle connection");
                        return Ok(());
                    }
                    continue;
                }
                message = self.framed.read_message() => message?,
            };

            let Some(command) = message else {
                return Ok(());
            };

            let response = self.execute(command).await;
            self.stats.command_processed();

            let text = self.command_handler.render(&response);
            self.framed.write_message(&text).await?;
            info!(
                client = %self.addr,
                outcome = response.label(),
                bytes = text.len() + 1,
                "Response sent"
            );
        }
    }

    /// Executes a command on the blocking pool.
    ///
    /// The store gate and SQLite calls block, so they must stay off the
    /// async workers. A panic during execution becomes an internal error
    /// response instead of tearing down the connection.
    async fn execute(&self, command: String) -> Response {
        let handler = self.command_handler.clone();

        match tokio::task::spawn_blocking(move || handler.execute(&command)).await {
            Ok(response) => response,
            Err(e) => {
                error!(client = %self.addr, error = %e, "Command execution failed");
                Response::failure_with(ErrorCategory::Internal, e.to_string())
            }
        }
    }
}

/// Errors that can occur while handling a connection.
#[derive(Debug, thiserror::Error)]
pub enum ConnectionError {
    /// I/O error (network issue)
    #[error("I/O error: {0}")]
    IoError(#[from] std::io::Error),

    /// The peer sent more than the allowed bytes without a delimiter
    #[error("frame too large: {size} bytes (max: {max})")]
    FrameTooLarge { size: usize, max: usize },
}

/// Handles a client connection.
///
/// This is a convenience function that creates a ConnectionHandler
/// and runs it to completion. Errors are logged, never returned:
/// one failing connection never affects another.
pub async fn handle_connection<S, E>(
    stream: S,
    addr: SocketAddr,
    command_handler: E,
    stats: Arc<ConnectionStats>,
    shutdown: watch::Receiver<bool>,
    max_frame_size: Option<usize>,
) where
    S: AsyncRead + AsyncWrite + Unpin,
    E: StatementExecutor,
{
    let handler = ConnectionHandler::new(stream, addr, command_handler, stats, shutdown)
        .with_max_frame_size(max_frame_size.unwrap_or(DEFAULT_MAX_FRAME_SIZE));

    if let Err(e) = handler.run().await {
        debug!(client = %addr, error = %e, "Connection ended with error");
    }
}
