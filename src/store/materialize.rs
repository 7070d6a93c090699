//! Per-table materialization.
//!
//! Non-empty record arrays are staged to a temporary NDJSON file and loaded
//! with `read_json_auto`, which infers column types from the data itself.
//! Empty arrays fall back to the statically declared schema for that table;
//! an empty table with no declared fallback is a programming error and
//! fails loud. Each table is created by a single CREATE OR REPLACE
//! statement, so a table is never visible half-populated.

use std::io::Write;

use anyhow::{Context, Result};
use duckdb::Connection;
use tracing::debug;

use crate::error::ScanError;
use crate::extract::EntityTable;

/// Materialize one logical table from uniform JSON records.
///
/// `fallback_schema` is the column list used when `rows` is empty; pass
/// `None` only for tables that are guaranteed non-empty by construction.
pub fn materialize_json_table(
    conn: &Connection,
    table: &str,
    rows: &[serde_json::Value],
    fallback_schema: Option<&str>,
) -> Result<()> {
    if rows.is_empty() {
        let Some(schema) = fallback_schema else {
            return Err(ScanError::MissingFallbackSchema(table.to_string()).into());
        };
        conn.execute_batch(&format!(
            "CREATE OR REPLACE TABLE \"{}\" ({});",
            table, schema
        ))
        .with_context(|| format!("Failed to create empty table {}", table))?;
        debug!(table = %table, rows = 0, "Materialized table from fallback schema");
        return Ok(());
    }

    let staging = stage_ndjson(rows)
        .with_context(|| format!("Failed to stage records for table {}", table))?;
    let staging_path = staging
        .path()
        .to_str()
        .context("Staging path is not valid UTF-8")?
        .replace('\'', "''");

    conn.execute_batch(&format!(
        "CREATE OR REPLACE TABLE \"{}\" AS \
         SELECT * FROM read_json_auto('{}', format = 'newline_delimited');",
        table, staging_path
    ))
    .with_context(|| format!("Failed to materialize table {}", table))?;

    debug!(table = %table, rows = rows.len(), "Materialized table");
    Ok(())
}

/// Materialize every normalized entity table from an extractor's output,
/// using each table's registered fallback schema for the zero-row case.
pub fn materialize_entities(
    conn: &Connection,
    tables: Vec<(EntityTable, Vec<serde_json::Value>)>,
) -> Result<Vec<(String, usize)>> {
    let mut written = Vec::with_capacity(tables.len());
    for (table, rows) in tables {
        materialize_json_table(conn, table.name(), &rows, Some(table.fallback_schema()))?;
        written.push((table.name().to_string(), rows.len()));
    }
    Ok(written)
}

fn stage_ndjson(rows: &[serde_json::Value]) -> Result<tempfile::NamedTempFile> {
    let mut file = tempfile::NamedTempFile::new().context("Failed to create staging file")?;
    for row in rows {
        serde_json::to_writer(&mut file, row).context("Failed to serialize record")?;
        file.write_all(b"\n").context("Failed to write staging file")?;
    }
    file.flush().context("Failed to flush staging file")?;
    Ok(file)
}
