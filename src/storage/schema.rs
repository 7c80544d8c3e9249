//! Schema Bootstrap
//!
//! Creates the tables the front-end expects before the first connection is
//! accepted. The relay itself never reads these definitions: requests are
//! opaque SQL and the store remains the authority on their validity.

use crate::storage::store::{Store, StoreError};
use tracing::info;

/// Tables used by the front-end: accounts, login sessions, uploaded files.
pub const SCHEMA: &str = "
CREATE TABLE IF NOT EXISTS users (
    username TEXT PRIMARY KEY,
    password TEXT NOT NULL,
    registration_date TEXT
);

CREATE TABLE IF NOT EXISTS login_history (
    username TEXT,
    login_time TEXT,
    logout_time TEXT
);

CREATE TABLE IF NOT EXISTS file_tracking (
    username TEXT,
    filename TEXT,
    upload_time TEXT,
    game_channel TEXT
);
";

/// Applies [`SCHEMA`] in a single transaction. Safe to run repeatedly.
pub fn init_schema(store: &Store) -> Result<(), StoreError> {
    store.with_handle(|conn| {
        let tx = conn.transaction()?;
        tx.execute_batch(SCHEMA)?;
        tx.commit()?;
        Ok(())
    })?;

    info!(path = %store.path().display(), "Database schema initialized");
    Ok(())
}
