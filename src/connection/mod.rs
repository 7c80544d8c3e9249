//! Connection Handler Module
//!
//! This module manages individual client connections to the relay.
//! Each client connection is handled by its own async task, so one slow
//! or broken client never holds up another.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                     TCP Listener                            │
//! │                    (server.rs)                              │
//! └──────────────────────┬──────────────────────────────────────┘
//!                        │
//!                        │ accept()
//!                        ▼
//!           ┌────────────────────────┐
//!           │   For each client...   │
//!           └────────────┬───────────┘
//!                        │
//!                        │ spawn task
//!                        ▼
//! ┌─────────────────────────────────────────────────────────────┐
//! │                 ConnectionHandler                           │
//! │                                                             │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐     │
//! │  │ Read frame  │───>│ Execute SQL │───>│ Send frame  │     │
//! │  │ (framed.rs) │    │ (blocking)  │    │ (framed.rs) │     │
//! │  └─────────────┘    └─────────────┘    └─────────────┘     │
//! └─────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Features
//!
//! - **Async I/O**: Uses Tokio for non-blocking network operations
//! - **Reassembly**: Messages split across reads are stitched back together
//! - **Ordering**: Strict request/response per connection
//! - **Statistics**: Tracks connection and command metrics
//!
//! ## Example
//!
//! ```ignore
//! use sqlrelay::connection::{handle_connection, ConnectionStats};
//! use sqlrelay::commands::CommandHandler;
//! use sqlrelay::storage::{Store, StoreConfig};
//! use std::sync::Arc;
//! use tokio::sync::watch;
//!
//! let store = Arc::new(Store::new(StoreConfig::default()));
//! let stats = Arc::new(ConnectionStats::new());
//! let handler = CommandHandler::new(store);
//! let (_shutdown_tx, shutdown_rx) = watch::channel(false);
//!
//! // For each accepted connection...
//! let (stream, addr) = listener.accept().await?;
//! tokio::spawn(handle_connection(stream, addr, handler, stats, shutdown_rx, None));
//! ```

pub mod framed;
pub mod handler;

// Re-export commonly used types
pub use framed::{FramedStream, DEFAULT_MAX_FRAME_SIZE};
pub use handler::{handle_connection, ConnectionError, ConnectionHandler, ConnectionStats};
