//! Store handle and lifecycle management.

use std::path::Path;

use anyhow::{Context, Result};
use duckdb::Connection;
use tracing::{debug, info, warn};

use super::extensions;

/// Handle to one DuckDB database, exclusively owned by a single run.
///
/// Not shared and not locked: the pipeline is sequential by design, so the
/// connection passes by reference through extraction, materialization and
/// analysis, and is released with a checkpoint at the end of the run.
pub struct Store {
    conn: Connection,
    db_path: String,
}

impl Store {
    /// Open or create the database at `db_path` and ensure the optional
    /// engine capabilities are loaded (failures are non-fatal).
    pub fn open(db_path: &str) -> Result<Self> {
        info!(path = %db_path, "Opening database");

        if let Some(parent) = Path::new(db_path).parent() {
            if !parent.as_os_str().is_empty() && !parent.exists() {
                info!(directory = %parent.display(), "Creating database directory");
                std::fs::create_dir_all(parent).context("Failed to create database directory")?;
            }
        }

        let conn = Connection::open(db_path).context("Failed to open DuckDB database")?;

        let engine_version: String = conn
            .query_row("SELECT version()", [], |row| row.get(0))
            .unwrap_or_else(|_| "unknown".to_string());
        debug!(duckdb_version = %engine_version, "Engine version");

        extensions::ensure_loaded(&conn);

        info!(path = %db_path, duckdb_version = %engine_version, "Database opened");

        Ok(Self {
            conn,
            db_path: db_path.to_string(),
        })
    }

    /// In-memory store for tests and ad hoc use.
    pub fn open_in_memory() -> Result<Self> {
        let conn = Connection::open_in_memory().context("Failed to open in-memory database")?;
        extensions::ensure_loaded(&conn);
        Ok(Self {
            conn,
            db_path: ":memory:".to_string(),
        })
    }

    pub fn conn(&self) -> &Connection {
        &self.conn
    }

    pub fn path(&self) -> &str {
        &self.db_path
    }

    /// Force a durability checkpoint so nothing is lost if the process
    /// exits right after the run.
    pub fn checkpoint(&self) -> Result<()> {
        self.conn
            .execute_batch("CHECKPOINT;")
            .context("Checkpoint failed")
    }

    /// Checkpoint and release the handle. Close failures are logged, not
    /// escalated; at this point the data that could be saved has been.
    pub fn close(self) {
        if let Err(e) = self.checkpoint() {
            warn!(path = %self.db_path, error = %e, "Checkpoint on close failed");
        }
        debug!(path = %self.db_path, "Database handle released");
    }

    /// Database file size, for log output.
    pub fn file_size(&self) -> u64 {
        std::fs::metadata(&self.db_path).map(|m| m.len()).unwrap_or(0)
    }
}
