//! Store Handle
//!
//! The relay fronts a single SQLite file. SQLite does not make concurrent
//! writers from independent connections safe on its own, so every operation
//! goes through one process-wide gate:
//!
//! ```text
//!   with_handle(f)
//!        │
//!        ▼
//!   lock gate ──> open connection ──> f(&mut conn) ──> close ──> unlock
//!                                         │
//!                                         └─ error: close, unlock, return Err
//! ```
//!
//! A connection lives for exactly one operation. Nothing is pooled, so a
//! failed operation can never leave a broken handle behind for the next one.

use rusqlite::{Connection, ErrorCode, OpenFlags};
use std::path::{Path, PathBuf};
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::{Mutex, PoisonError};
use std::time::Duration;
use tracing::{trace, warn};

/// Default database file, relative to the working directory.
pub const DEFAULT_DB_PATH: &str = "stomp_server.db";

/// Default time a handle waits on a locked database file.
pub const DEFAULT_BUSY_TIMEOUT: Duration = Duration::from_secs(5);

/// Configuration for the store.
#[derive(Debug, Clone)]
pub struct StoreConfig {
    /// Path of the SQLite database file (created if missing)
    pub path: PathBuf,

    /// How long a freshly opened handle waits for the file lock
    pub busy_timeout: Duration,
}

impl Default for StoreConfig {
    fn default() -> Self {
        Self {
            path: PathBuf::from(DEFAULT_DB_PATH),
            busy_timeout: DEFAULT_BUSY_TIMEOUT,
        }
    }
}

impl StoreConfig {
    pub fn new(path: impl Into<PathBuf>) -> Self {
        Self {
            path: path.into(),
            ..Self::default()
        }
    }
}

/// Errors reported by the store.
#[derive(Debug, thiserror::Error)]
pub enum StoreError {
    /// The database file could not be opened
    #[error("unable to open database {path}: {source}")]
    Open {
        path: PathBuf,
        #[source]
        source: rusqlite::Error,
    },

    /// SQLite rejected or failed the statement
    #[error("{0}")]
    Sqlite(#[from] rusqlite::Error),
}

impl StoreError {
    /// Returns true for a UNIQUE or PRIMARY KEY constraint violation.
    pub fn is_duplicate(&self) -> bool {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(err, _)) => {
                err.code == ErrorCode::ConstraintViolation
                    && matches!(
                        err.extended_code,
                        rusqlite::ffi::SQLITE_CONSTRAINT_UNIQUE
                            | rusqlite::ffi::SQLITE_CONSTRAINT_PRIMARYKEY
                    )
            }
            _ => false,
        }
    }

    /// The store's own description of the failure.
    pub fn detail(&self) -> String {
        match self {
            StoreError::Sqlite(rusqlite::Error::SqliteFailure(_, Some(msg))) => msg.clone(),
            other => other.to_string(),
        }
    }
}

/// Counters describing store usage.
#[derive(Debug, Default)]
pub struct StoreStats {
    /// Connections opened against the database file
    pub handles_opened: AtomicU64,
    /// Operations that ended in an error
    pub operations_failed: AtomicU64,
}

impl StoreStats {
    pub fn handles_opened(&self) -> u64 {
        self.handles_opened.load(Ordering::Relaxed)
    }

    pub fn operations_failed(&self) -> u64 {
        self.operations_failed.load(Ordering::Relaxed)
    }
}

/// The shared persistent store.
///
/// Cheap to share behind an `Arc`; every access is serialized by the gate.
#[derive(Debug)]
pub struct Store {
    config: StoreConfig,
    gate: Mutex<()>,
    stats: StoreStats,
}

impl Store {
    pub fn new(config: StoreConfig) -> Self {
        Self {
            config,
            gate: Mutex::new(()),
            stats: StoreStats::default(),
        }
    }

    /// Path of the database file.
    pub fn path(&self) -> &Path {
        &self.config.path
    }

    pub fn stats(&self) -> &StoreStats {
        &self.stats
    }

    /// Runs `f` against a fresh connection while holding the gate.
    ///
    /// The connection is closed and the gate released before this returns,
    /// whether `f` succeeds or not.
    pub fn with_handle<T, F>(&self, f: F) -> Result<T, StoreError>
    where
        F: FnOnce(&mut Connection) -> Result<T, StoreError>,
    {
        // Nothing lives behind the gate, so a panic in a previous holder
        // leaves no state to repair.
        let _guard = self.gate.lock().unwrap_or_else(PoisonError::into_inner);

        let mut conn = self.open()?;
        let result = f(&mut conn);

        if let Err((_, e)) = conn.close() {
            warn!(error = %e, "Failed to close store handle");
        }
        trace!(path = %self.config.path.display(), "Store handle released");

        if result.is_err() {
            self.stats.operations_failed.fetch_add(1, Ordering::Relaxed);
        }
        result
    }

    fn open(&self) -> Result<Connection, StoreError> {
        let flags = OpenFlags::SQLITE_OPEN_READ_WRITE
            | OpenFlags::SQLITE_OPEN_CREATE
            | OpenFlags::SQLITE_OPEN_NO_MUTEX;
        let path = &self.config.path;

        let conn = Connection::open_with_flags(path, flags)
            .and_then(|conn| {
                conn.busy_timeout(self.config.busy_timeout)?;
                Ok(conn)
            })
            .map_err(|source| {
                self.stats.operations_failed.fetch_add(1, Ordering::Relaxed);
                StoreError::Open {
                    path: path.clone(),
                    source,
                }
            })?;

        self.stats.handles_opened.fetch_add(1, Ordering::Relaxed);
        trace!(path = %path.display(), "Store handle opened");
        Ok(conn)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use std::sync::atomic::AtomicUsize;
    use std::sync::Arc;
    use std::thread;

    fn temp_store() -> (tempfile::TempDir, Store) {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(StoreConfig::new(dir.path().join("test.db")));
        (dir, store)
    }

    #[test]
    fn test_handle_opened_per_operation() {
        let (_dir, store) = temp_store();

        for _ in 0..3 {
            store
                .with_handle(|conn| Ok(conn.execute_batch("SELECT 1")?))
                .unwrap();
        }

        assert_eq!(store.stats().handles_opened(), 3);
        assert_eq!(store.stats().operations_failed(), 0);
    }

    #[test]
    fn test_data_persists_across_handles() {
        let (_dir, store) = temp_store();

        store
            .with_handle(|conn| {
                conn.execute_batch("CREATE TABLE t (v INTEGER); INSERT INTO t VALUES (7);")?;
                Ok(())
            })
            .unwrap();

        let v: i64 = store
            .with_handle(|conn| Ok(conn.query_row("SELECT v FROM t", [], |row| row.get(0))?))
            .unwrap();
        assert_eq!(v, 7);
    }

    #[test]
    fn test_error_releases_gate() {
        let (_dir, store) = temp_store();

        let err = store
            .with_handle(|conn| Ok(conn.execute_batch("NOT SQL")?))
            .unwrap_err();
        assert!(!err.is_duplicate());
        assert_eq!(store.stats().operations_failed(), 1);

        // The gate must be free again
        store
            .with_handle(|conn| Ok(conn.execute_batch("SELECT 1")?))
            .unwrap();
    }

    #[test]
    fn test_gate_recovers_from_panic() {
        let (_dir, store) = temp_store();
        let store = Arc::new(store);

        let panicking = Arc::clone(&store);
        let result = thread::spawn(move || {
            let _: Result<(), StoreError> = panicking.with_handle(|_| panic!("boom"));
        })
        .join();
        assert!(result.is_err());

        store
            .with_handle(|conn| Ok(conn.execute_batch("SELECT 1")?))
            .unwrap();
    }

    #[test]
    fn test_operations_never_overlap() {
        let (_dir, store) = temp_store();
        let store = Arc::new(store);
        let in_flight = Arc::new(AtomicUsize::new(0));
        let mut handles = vec![];

        for _ in 0..8 {
            let store = Arc::clone(&store);
            let in_flight = Arc::clone(&in_flight);
            handles.push(thread::spawn(move || {
                for _ in 0..10 {
                    store
                        .with_handle(|_| {
                            let before = in_flight.fetch_add(1, Ordering::SeqCst);
                            assert_eq!(before, 0, "two operations inside the gate");
                            thread::sleep(Duration::from_millis(1));
                            in_flight.fetch_sub(1, Ordering::SeqCst);
                            Ok(())
                        })
                        .unwrap();
                }
            }));
        }

        for handle in handles {
            handle.join().unwrap();
        }
        assert_eq!(store.stats().handles_opened(), 80);
    }

    #[test]
    fn test_duplicate_detection() {
        let (_dir, store) = temp_store();

        store
            .with_handle(|conn| {
                conn.execute_batch(
                    "CREATE TABLE users (username TEXT PRIMARY KEY, email TEXT UNIQUE, n TEXT NOT NULL)",
                )?;
                conn.execute("INSERT INTO users VALUES ('a', 'a@x', 'n')", [])?;
                Ok(())
            })
            .unwrap();

        let pk = store
            .with_handle(|conn| Ok(conn.execute("INSERT INTO users VALUES ('a', 'b@x', 'n')", [])?))
            .unwrap_err();
        assert!(pk.is_duplicate());

        let unique = store
            .with_handle(|conn| Ok(conn.execute("INSERT INTO users VALUES ('b', 'a@x', 'n')", [])?))
            .unwrap_err();
        assert!(unique.is_duplicate());

        let not_null = store
            .with_handle(|conn| Ok(conn.execute("INSERT INTO users VALUES ('c', 'c@x', NULL)", [])?))
            .unwrap_err();
        assert!(!not_null.is_duplicate());
        assert!(not_null.detail().contains("NOT NULL"));
    }

    #[test]
    fn test_open_failure() {
        let dir = tempfile::tempdir().unwrap();
        let store = Store::new(StoreConfig::new(dir.path().join("missing").join("x.db")));

        let err = store.with_handle(|_| Ok(())).unwrap_err();
        assert!(matches!(err, StoreError::Open { .. }));
        assert_eq!(store.stats().handles_opened(), 0);
        assert_eq!(store.stats().operations_failed(), 1);
    }
}
