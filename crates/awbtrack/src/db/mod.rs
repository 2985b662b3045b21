//! SQLite persistence behind [`SqliteJobStore`](crate::store::SqliteJobStore).
//!
//! The job store is the only caller. Every statement goes through one
//! connection, so per-job updates are serialised without extra locking.

use std::path::{Path, PathBuf};
use std::sync::{Arc, Mutex, MutexGuard};

use rusqlite::Connection;

pub mod error;
pub mod job_repo;
pub mod migrations;
pub mod result_repo;

pub use error::DatabaseError;

/// Pragmas for an on-disk database. Viewers read while a worker writes, so
/// the journal runs in WAL mode and writers wait briefly instead of failing.
const FILE_PRAGMAS: &str = "PRAGMA journal_mode=WAL; PRAGMA foreign_keys=ON; PRAGMA busy_timeout=5000;";
const MEMORY_PRAGMAS: &str = "PRAGMA foreign_keys=ON;";

/// Shared handle to the job database. Clones share the connection.
#[derive(Clone)]
pub struct Database {
    conn: Arc<Mutex<Connection>>,
    location: Arc<str>,
}

impl Database {
    /// Opens the job database at `path`, creating parent directories and
    /// bringing the schema up to date.
    pub fn open(path: &Path) -> Result<Self, DatabaseError> {
        if let Some(dir) = path.parent().filter(|d| !d.as_os_str().is_empty()) {
            std::fs::create_dir_all(dir).map_err(|source| DatabaseError::CreateDir {
                path: dir.to_path_buf(),
                source,
            })?;
        }
        let conn = Connection::open(path)?;
        Self::prepare(conn, FILE_PRAGMAS, &path.display().to_string())
    }

    pub fn open_in_memory() -> Result<Self, DatabaseError> {
        Self::prepare(Connection::open_in_memory()?, MEMORY_PRAGMAS, ":memory:")
    }

    fn prepare(conn: Connection, pragmas: &str, location: &str) -> Result<Self, DatabaseError> {
        conn.execute_batch(pragmas)?;
        let applied = migrations::run_all(&conn)?;
        log::info!(
            "Job database ready at {} ({} migrations applied)",
            location,
            applied
        );

        Ok(Self {
            conn: Arc::new(Mutex::new(conn)),
            location: Arc::from(location),
        })
    }

    /// File path, or `:memory:`.
    pub fn location(&self) -> &str {
        &self.location
    }

    /// Runs `f` with the connection locked. A panic inside an earlier
    /// caller leaves SQLite consistent, so a poisoned lock is taken over.
    pub fn with_conn<F, T>(&self, f: F) -> Result<T, DatabaseError>
    where
        F: FnOnce(&Connection) -> Result<T, DatabaseError>,
    {
        f(&self.lock())
    }

    fn lock(&self) -> MutexGuard<'_, Connection> {
        match self.conn.lock() {
            Ok(guard) => guard,
            Err(poisoned) => {
                log::warn!("Job database lock was poisoned, recovering");
                poisoned.into_inner()
            }
        }
    }
}

/// `~/.awbtrack/data/awbtrack.db`, or `None` without a home directory.
pub fn default_database_path() -> Option<PathBuf> {
    dirs::home_dir().map(|home| home.join(".awbtrack").join("data").join("awbtrack.db"))
}
