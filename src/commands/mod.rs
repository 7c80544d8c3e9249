//! Command Handler Module
//!
//! This module implements the command processing layer of the relay.
//! It receives decoded SQL statements, classifies them, executes them
//! against the store, and returns the response to send back.
//!
//! ## Architecture
//!
//! ```text
//! Client Request
//!       │
//!       ▼
//! ┌─────────────────┐
//! │  Frame Parser   │  (protocol module)
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │ CommandHandler  │  (this module)
//! │                 │
//! │  - Classify     │
//! │  - Execute      │
//! │  - Map errors   │
//! └────────┬────────┘
//!          │
//!          ▼
//! ┌─────────────────┐
//! │     Store       │  (storage module)
//! └─────────────────┘
//! ```
//!
//! ## Recognized Verbs
//!
//! - Read: `SELECT`
//! - Write: `INSERT`, `UPDATE`, `DELETE`, `CREATE`, `DROP`, `ALTER`

pub mod classify;
pub mod handler;

// Re-export the main command handler
pub use classify::{classify, Classification};
pub use handler::{CommandHandler, StatementExecutor};
