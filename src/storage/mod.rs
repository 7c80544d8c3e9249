//! Storage Module
//!
//! This module owns everything that touches the SQLite file.
//!
//! ## Architecture
//!
//! ```text
//! ┌─────────────────────────────────────────────────────────────┐
//! │                          Store                              │
//! │                                                             │
//! │   Mutex<()> gate ──> Connection::open ──> statement ──> close│
//! │   (one operation at a time, process-wide)                   │
//! └─────────────────────────────────────────────────────────────┘
//!          ▲                                   │
//!          │ init_schema (startup)             │ rows
//!          │                                   ▼
//!   ┌──────┴──────┐                    ┌───────────────┐
//!   │   schema    │                    │    render     │
//!   └─────────────┘                    │ ('a', 1, None)│
//!                                      └───────────────┘
//! ```
//!
//! ## Example
//!
//! ```
//! use sqlrelay::storage::{Store, StoreConfig};
//!
//! let dir = tempfile::tempdir().unwrap();
//! let store = Store::new(StoreConfig::new(dir.path().join("relay.db")));
//!
//! store
//!     .with_handle(|conn| Ok(conn.execute_batch("CREATE TABLE t (v TEXT)")?))
//!     .unwrap();
//! assert_eq!(store.stats().handles_opened(), 1);
//! ```

pub mod render;
pub mod schema;
pub mod store;

// Re-export commonly used types
pub use render::{render_row, render_value};
pub use schema::init_schema;
pub use store::{Store, StoreConfig, StoreError, StoreStats};
