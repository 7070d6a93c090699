//! Batch write orchestration.
//!
//! Drives one fetch batch end to end: raw-tier load, extractor dispatch,
//! entity materialization, optional enrichment tables, and columnar export.
//! The raw tier is written before anything else so a normalization failure
//! never loses data. Storage failures abort the batch; a missing extractor
//! only skips normalization.

use std::collections::{HashMap, HashSet};
use std::path::Path;

use anyhow::{Context, Result};
use duckdb::params;
use serde_json::json;
use tracing::{info, warn};

use crate::error::ScanError;
use crate::extract;
use crate::github::types::InsightsDocument;
use crate::targets::ProjectRecord;

use super::database::Store;
use super::materialize::{materialize_entities, materialize_json_table};

/// Fallback schema for an empty raw batch; mirrors the response envelope.
const RAW_FALLBACK_SCHEMA: &str = "repository JSON";

/// What one batch write produced, for logging and exit decisions.
#[derive(Debug, Default)]
pub struct WriteReport {
    pub raw_rows: usize,
    pub normalized: bool,
    pub tables: Vec<(String, usize)>,
    pub exported_files: usize,
}

/// Materialize one fetch batch into the store.
pub fn write_batch(
    store: &Store,
    shape: &str,
    batch: &[serde_json::Value],
    projects: &[ProjectRecord],
    insights: &[InsightsDocument],
    parquet_dir: Option<&Path>,
) -> Result<WriteReport> {
    let conn = store.conn();
    let mut report = WriteReport {
        raw_rows: batch.len(),
        ..WriteReport::default()
    };

    // Raw tier first: the audit copy exists even if everything below fails.
    let raw_table = format!("raw_{}", shape);
    materialize_json_table(conn, &raw_table, batch, Some(RAW_FALLBACK_SCHEMA))?;
    info!(table = %raw_table, rows = batch.len(), "Raw tier written");

    // Normalized tier, when an extractor is registered for this shape.
    let mut repository_ids: HashMap<String, String> = HashMap::new();
    match extract::dispatch(shape, batch) {
        None => {
            let miss = ScanError::UnknownQueryShape(shape.to_string());
            warn!(error = %miss, "Skipping normalization, raw tier is still available");
        }
        Some(extracted) => {
            let extracted = extracted.context("Entity extraction failed")?;
            info!("{}", extracted.summary());

            for repo in &extracted.repositories {
                repository_ids.insert(repo.name_with_owner.clone(), repo.id.clone());
            }

            let tables = extracted.into_tables()?;
            report.tables = materialize_entities(conn, tables)?;
            report.normalized = true;
        }
    }

    if !projects.is_empty() {
        write_project_metadata(store, projects)?;
    }

    if !insights.is_empty() {
        if repository_ids.is_empty() {
            warn!("Skipping security insights: no normalized repositories to key against");
        } else {
            upsert_security_insights(store, insights, &repository_ids)?;
        }
    }

    if let Some(dir) = parquet_dir {
        report.exported_files = export_parquet(store, dir)?;
    }

    // Durability is best-effort here; the caller still closes the handle.
    if let Err(e) = store.checkpoint() {
        warn!(error = %e, "Post-write checkpoint failed");
    }

    Ok(report)
}

/// Write the project enrichment entity and its repository junction table,
/// deduplicated by project name.
fn write_project_metadata(store: &Store, projects: &[ProjectRecord]) -> Result<()> {
    let mut seen: HashSet<&str> = HashSet::new();
    let mut metadata_rows = Vec::new();
    let mut junction_rows = Vec::new();

    for project in projects {
        if !seen.insert(project.project_name.as_str()) {
            continue;
        }

        let last_audit_date = project
            .audits
            .iter()
            .filter_map(|a| a.date.as_deref())
            .max()
            .map(str::to_string);

        metadata_rows.push(json!({
            "project_name": project.project_name,
            "maturity": project.maturity,
            "category": project.category,
            "subcategory": project.subcategory,
            "homepage": project.homepage,
            "accepted_at": project.accepted_at,
            "graduated_at": project.graduated_at,
            "dev_stats_url": project.dev_stats_url,
            "artwork_url": project.artwork_url,
            "audits_count": project.audits.len(),
            "last_audit_date": last_audit_date,
        }));

        for repo in &project.repos {
            junction_rows.push(json!({
                "project_name": project.project_name,
                "name_with_owner": format!("{}/{}", repo.owner, repo.name),
                "is_primary": repo.primary,
            }));
        }
    }

    let conn = store.conn();
    materialize_json_table(conn, "project_metadata", &metadata_rows, None)?;
    materialize_json_table(
        conn,
        "project_repositories",
        &junction_rows,
        Some("project_name VARCHAR, name_with_owner VARCHAR, is_primary BOOLEAN"),
    )?;

    info!(
        projects = metadata_rows.len(),
        repositories = junction_rows.len(),
        "Project metadata written"
    );
    Ok(())
}

/// Upsert parsed SECURITY-INSIGHTS documents keyed by
/// (repository_id, source_url).
fn upsert_security_insights(
    store: &Store,
    insights: &[InsightsDocument],
    repository_ids: &HashMap<String, String>,
) -> Result<()> {
    let conn = store.conn();

    conn.execute_batch(
        r#"
        CREATE TABLE IF NOT EXISTS security_insights (
            repository_id VARCHAR NOT NULL,
            source_url VARCHAR NOT NULL,
            document JSON,
            PRIMARY KEY (repository_id, source_url)
        );
        "#,
    )
    .context("Failed to create security_insights table")?;

    let mut written = 0usize;
    for doc in insights {
        let Some(repository_id) = repository_ids.get(&doc.name_with_owner) else {
            warn!(
                repo = %doc.name_with_owner,
                "Insights document has no matching repository row, skipping"
            );
            continue;
        };

        let document = serde_json::to_string(&doc.document)
            .context("Failed to serialize insights document")?;

        conn.execute(
            r#"
            INSERT INTO security_insights (repository_id, source_url, document)
            VALUES (?, ?, ?)
            ON CONFLICT (repository_id, source_url)
            DO UPDATE SET document = excluded.document
            "#,
            params![repository_id, doc.source_url, document],
        )
        .context("Failed to upsert security insights")?;
        written += 1;
    }

    info!(documents = written, "Security insights written");
    Ok(())
}

/// Export every base table to one Parquet file per table.
fn export_parquet(store: &Store, dir: &Path) -> Result<usize> {
    std::fs::create_dir_all(dir).context("Failed to create parquet directory")?;
    let conn = store.conn();

    let mut stmt = conn
        .prepare(
            "SELECT table_name FROM information_schema.tables \
             WHERE table_type = 'BASE TABLE' ORDER BY table_name",
        )
        .context("Failed to list tables for export")?;
    let tables: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .context("Failed to list tables for export")?
        .collect::<std::result::Result<_, _>>()?;

    for table in &tables {
        let file = dir.join(format!("{}.parquet", table));
        let file_path = file
            .to_str()
            .context("Parquet path is not valid UTF-8")?
            .replace('\'', "''");
        conn.execute_batch(&format!(
            "COPY \"{}\" TO '{}' (FORMAT PARQUET, COMPRESSION ZSTD);",
            table, file_path
        ))
        .with_context(|| format!("Failed to export table {} to parquet", table))?;
    }

    info!(files = tables.len(), directory = %dir.display(), "Parquet export complete");
    Ok(tables.len())
}
