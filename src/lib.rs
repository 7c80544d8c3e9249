//! # sqlrelay - A SQL Relay over NUL-Framed TCP
//!
//! sqlrelay lets a front-end process delegate persistence to a backend
//! without linking a database driver. The front-end sends SQL statements
//! as NUL-terminated text; the relay runs them against a shared SQLite file
//! and answers with one NUL-terminated line per statement.
//!
//! ## Features
//!
//! - **Tiny Protocol**: UTF-8 text frames delimited by `0x00`
//! - **Safe Sharing**: One process-wide gate serializes every store operation
//! - **Atomic Writes**: Each write runs in its own transaction
//! - **Async I/O**: Built on Tokio, one task per client connection
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────────────────┐
//! │                              sqlrelay                                   │
//! │                                                                         │
//! │  ┌─────────────┐    ┌─────────────┐    ┌─────────────┐                  │
//! │  │ TCP Server  │───>│ Connection  │───>│  Command    │                  │
//! │  │ (Listener)  │    │  Handler    │    │  Handler    │                  │
//! │  └─────────────┘    └──────┬──────┘    └──────┬──────┘                  │
//! │                            │                  │ classify                │
//! │                            ▼                  ▼                         │
//! │                     ┌─────────────┐    ┌──────────────────────────────┐ │
//! │                     │ NUL framing │    │            Store             │ │
//! │                     │  (protocol) │    │  Mutex gate ─> SQLite handle │ │
//! │                     └─────────────┘    │  (opened per operation)      │ │
//! │                                        └──────────────────────────────┘ │
//! └─────────────────────────────────────────────────────────────────────────┘
//! ```
//!
//! ## Quick Start
//!
//! ```ignore
//! use sqlrelay::commands::CommandHandler;
//! use sqlrelay::config::Config;
//! use sqlrelay::server::Server;
//! use sqlrelay::storage::{init_schema, Store};
//! use std::sync::Arc;
//!
//! #[tokio::main]
//! async fn main() -> anyhow::Result<()> {
//!     let config = Config::default();
//!     let store = Arc::new(Store::new(config.store_config()));
//!     init_schema(&store)?;
//!
//!     let server = Server::bind(&config, CommandHandler::new(store)).await?;
//!     server.run(async { let _ = tokio::signal::ctrl_c().await; }).await;
//!     Ok(())
//! }
//! ```
//!
//! ## Wire Format
//!
//! ```text
//! -> INSERT INTO users (username, password) VALUES ('alice','pw')\0
//! <- done\0
//! -> SELECT username FROM users\0
//! <- SUCCESS|('alice',)\0
//! -> INSERT INTO users (username, password) VALUES ('alice','pw')\0
//! <- ERROR:DUPLICATE\0
//! ```
//!
//! ## Module Overview
//!
//! - [`protocol`]: Framing and response rendering
//! - [`storage`]: The gated SQLite store, row rendering, schema bootstrap
//! - [`commands`]: Classification and execution of statements
//! - [`connection`]: Client connection management
//! - [`server`]: Accept loop and graceful shutdown
//! - [`config`]: Command-line configuration

pub mod commands;
pub mod config;
pub mod connection;
pub mod protocol;
pub mod server;
pub mod storage;

// Re-export commonly used types for convenience
pub use commands::{classify, Classification, CommandHandler, StatementExecutor};
pub use config::{CliAction, Config, ConfigError};
pub use connection::{handle_connection, ConnectionStats};
pub use protocol::{ErrorCategory, Response};
pub use server::Server;
pub use storage::{init_schema, Store, StoreConfig, StoreError};

/// Name the relay reports in its logs and banner
pub const SERVER_NAME: &str = "STOMP_PYTHON_SQL_SERVER";

/// The default port the relay listens on
pub const DEFAULT_PORT: u16 = 7778;

/// The default host the relay binds to
pub const DEFAULT_HOST: &str = "127.0.0.1";

/// Version of sqlrelay
pub const VERSION: &str = env!("CARGO_PKG_VERSION");
