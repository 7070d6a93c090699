//! Optional engine capability registry.
//!
//! Each entry is installed-then-loaded on every open. A missing or broken
//! extension is logged and skipped; one failure must never block the
//! others or abort the run. Models that need an absent capability degrade
//! at their own layer (recorded as skipped or warned).

use duckdb::Connection;
use tracing::{debug, warn};

pub struct Extension {
    pub name: &'static str,
    pub description: &'static str,
}

pub const EXTENSIONS: &[Extension] = &[
    Extension {
        name: "json",
        description: "JSON ingestion and json_extract functions",
    },
    Extension {
        name: "parquet",
        description: "Columnar export via COPY TO parquet",
    },
    Extension {
        name: "fts",
        description: "Full-text index over workflow content",
    },
    Extension {
        name: "httpfs",
        description: "Remote file access for ad hoc queries",
    },
    Extension {
        name: "autocomplete",
        description: "Shell autocompletion when the database is opened interactively",
    },
    Extension {
        name: "ui",
        description: "Local web UI for browsing the analyzed database",
    },
];

/// Ensure every listed capability is installed and active. Idempotent;
/// called on every new connection.
pub fn ensure_loaded(conn: &Connection) {
    for extension in EXTENSIONS {
        let sql = format!("INSTALL {name}; LOAD {name};", name = extension.name);
        match conn.execute_batch(&sql) {
            Ok(()) => debug!(extension = extension.name, "Extension loaded"),
            Err(e) => warn!(
                extension = extension.name,
                description = extension.description,
                error = %e,
                "Extension unavailable, continuing without it"
            ),
        }
    }
}
