//! Command Executor
//!
//! Runs one classified SQL statement against the store and turns the outcome
//! into a [`Response`]. Nothing escapes this boundary: store errors, bad
//! statements and unknown verbs all become failure responses.
//!
//! ## Routing
//!
//! ```text
//!   command ──> classify ──┬── Read ──────> with_handle: prepare, fetch all rows
//!                          ├── Write ─────> with_handle: tx, execute, commit | rollback
//!                          └── Unrecognized ─> ERROR:UNKNOWN_COMMAND (store untouched)
//! ```
//!
//! ## Error Mapping
//!
//! | Store outcome                    | Response                      |
//! |----------------------------------|-------------------------------|
//! | UNIQUE / PRIMARY KEY violation   | `ERROR:DUPLICATE`             |
//! | any other SQLite error           | `ERROR:STORE:<message>`       |
//! | fault inside the relay           | `ERROR:INTERNAL:<message>`    |

use crate::commands::classify::{classify, Classification};
use crate::protocol::types::{ErrorCategory, Response, DEFAULT_WRITE_ACK};
use crate::storage::render::render_row;
use crate::storage::store::{Store, StoreError};
use rusqlite::Connection;
use std::sync::Arc;
use std::time::Instant;
use tracing::{debug, info, warn};

/// Executes commands against the shared store.
///
/// Cloning is cheap; every connection gets its own clone.
#[derive(Clone)]
pub struct CommandHandler {
    /// The shared store
    store: Arc<Store>,
    /// Literal sent back for a successful write
    write_ack: Arc<str>,
}

impl CommandHandler {
    /// Creates a new command handler over the given store.
    pub fn new(store: Arc<Store>) -> Self {
        Self {
            store,
            write_ack: Arc::from(DEFAULT_WRITE_ACK),
        }
    }

    /// Overrides the write acknowledgement literal.
    pub fn with_write_ack(mut self, write_ack: impl Into<String>) -> Self {
        self.write_ack = Arc::from(write_ack.into());
        self
    }

    pub fn store(&self) -> &Arc<Store> {
        &self.store
    }

    pub fn write_ack(&self) -> &str {
        &self.write_ack
    }

    /// Renders a response with this handler's write acknowledgement.
    pub fn render(&self, response: &Response) -> String {
        response.render(&self.write_ack)
    }

    /// Classifies and executes a command.
    ///
    /// Blocks on the store gate; call it from a blocking context.
    pub fn execute(&self, command: &str) -> Response {
        self.execute_classified(command, classify(command))
    }

    /// Executes a command that has already been classified.
    pub fn execute_classified(&self, command: &str, classification: Classification) -> Response {
        let start = Instant::now();
        info!(kind = %classification, command = %command, "Received command");

        let response = match classification {
            Classification::Read => self
                .store
                .with_handle(|conn| run_query(conn, command))
                .map(Response::rows)
                .unwrap_or_else(|e| failure_from(&e)),
            Classification::Write => self
                .store
                .with_handle(|conn| run_statement(conn, command))
                .map(|changed| {
                    debug!(rows_changed = changed, "Write committed");
                    Response::done()
                })
                .unwrap_or_else(|e| failure_from(&e)),
            Classification::Unrecognized => Response::failure(ErrorCategory::UnknownCommand),
        };

        info!(
            outcome = response.label(),
            elapsed_us = start.elapsed().as_micros() as u64,
            "Command executed"
        );
        response
    }
}

/// Turns one decoded command into a response.
///
/// The connection layer runs whatever implements this on the blocking pool;
/// [`CommandHandler`] is the store-backed implementation the server uses.
pub trait StatementExecutor: Clone + Send + Sync + 'static {
    /// Executes a command. Never fails: every outcome is a response.
    fn execute(&self, command: &str) -> Response;

    /// Renders a response to its wire text.
    fn render(&self, response: &Response) -> String;
}

impl StatementExecutor for CommandHandler {
    fn execute(&self, command: &str) -> Response {
        CommandHandler::execute(self, command)
    }

    fn render(&self, response: &Response) -> String {
        CommandHandler::render(self, response)
    }
}

/// Maps a store error to a failure response.
pub fn failure_from(err: &StoreError) -> Response {
    if err.is_duplicate() {
        debug!(error = %err, "Uniqueness violation");
        Response::failure(ErrorCategory::DuplicateEntry)
    } else {
        warn!(error = %err, "Store error");
        Response::failure_with(ErrorCategory::StoreError, err.detail())
    }
}

/// Runs a read and renders every resulting row.
fn run_query(conn: &mut Connection, sql: &str) -> Result<Vec<String>, StoreError> {
    let mut stmt = conn.prepare(sql)?;
    let columns = stmt.column_count();
    let mut rows = stmt.query([])?;

    let mut rendered = Vec::new();
    while let Some(row) = rows.next()? {
        rendered.push(render_row(row, columns)?);
    }
    Ok(rendered)
}

/// Runs a write inside its own transaction.
///
/// Commits on success. On error the transaction is rolled back before the
/// error is returned, so a failed statement leaves no trace.
fn run_statement(conn: &mut Connection, sql: &str) -> Result<usize, StoreError> {
    let tx = conn.transaction()?;
    let result = tx.execute(sql, []);

    match result {
        Ok(changed) => {
            tx.commit()?;
            Ok(changed)
        }
        Err(e) => {
            if let Err(rollback_err) = tx.rollback() {
                warn!(error = %rollback_err, "Rollback failed");
            }
            Err(e.into())
        }
    }
}
