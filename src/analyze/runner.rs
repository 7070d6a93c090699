//! SQL model execution.
//!
//! The model list is fixed and ordered; file names encode the dependency
//! chain (index init, asset patterns, insights flattening, workflow tools,
//! repository rollup, summary views, project rollup). Models execute one at
//! a time, single shot; re-running the whole pipeline is the retry
//! strategy.

use anyhow::{Context, Result};
use duckdb::Connection;
use tracing::{info, warn};

use crate::store::Store;

use super::report;

pub struct SqlModel {
    pub name: &'static str,
    pub sql: &'static str,
}

/// Ordered model list. Lexicographic file naming matches execution order.
pub const MODELS: &[SqlModel] = &[
    SqlModel {
        name: "000_fts_index",
        sql: include_str!("../../sql/000_fts_index.sql"),
    },
    SqlModel {
        name: "010_artifact_patterns",
        sql: include_str!("../../sql/010_artifact_patterns.sql"),
    },
    SqlModel {
        name: "020_security_insights",
        sql: include_str!("../../sql/020_security_insights.sql"),
    },
    SqlModel {
        name: "030_workflow_tools",
        sql: include_str!("../../sql/030_workflow_tools.sql"),
    },
    SqlModel {
        name: "040_repo_security_summary",
        sql: include_str!("../../sql/040_repo_security_summary.sql"),
    },
    SqlModel {
        name: "050_summary_views",
        sql: include_str!("../../sql/050_summary_views.sql"),
    },
    SqlModel {
        name: "060_project_security_summary",
        sql: include_str!("../../sql/060_project_security_summary.sql"),
    },
];

#[derive(Debug, Clone, PartialEq, Eq)]
pub enum ModelOutcome {
    Succeeded,
    /// A referenced table or view does not exist because its optional
    /// producer had nothing to produce. Expected, informational.
    Skipped(String),
    /// Any other execution error. Logged and bypassed.
    Warned(String),
}

#[derive(Debug, Clone)]
pub struct ModelRun {
    pub name: &'static str,
    pub outcome: ModelOutcome,
}

#[derive(Debug, Default)]
pub struct AnalysisReport {
    pub runs: Vec<ModelRun>,
}

impl AnalysisReport {
    pub fn succeeded(&self) -> usize {
        self.count(|o| matches!(o, ModelOutcome::Succeeded))
    }

    pub fn skipped(&self) -> usize {
        self.count(|o| matches!(o, ModelOutcome::Skipped(_)))
    }

    pub fn warned(&self) -> usize {
        self.count(|o| matches!(o, ModelOutcome::Warned(_)))
    }

    fn count(&self, pred: impl Fn(&ModelOutcome) -> bool) -> usize {
        self.runs.iter().filter(|r| pred(&r.outcome)).count()
    }
}

/// Analyze an existing store end to end: open, optional reset, run every
/// model, print the summary, close. Only a store that cannot be opened is
/// a hard error.
pub fn run(db_path: &str, recreate: bool) -> Result<AnalysisReport> {
    let store = Store::open(db_path)?;
    let report = run_models(&store, recreate)?;

    info!(
        succeeded = report.succeeded(),
        skipped = report.skipped(),
        warned = report.warned(),
        "Model run complete"
    );

    report::summarize(&store);
    store.close();
    Ok(report)
}

/// Run the model sequence against an already-open store.
pub fn run_models(store: &Store, recreate: bool) -> Result<AnalysisReport> {
    if recreate {
        drop_aggregate_tables(store)?;
    }

    let mut report = AnalysisReport::default();
    for model in MODELS {
        let outcome = execute_model(store.conn(), model);
        match &outcome {
            ModelOutcome::Succeeded => info!(model = model.name, "✓ model succeeded"),
            ModelOutcome::Skipped(reason) => {
                info!(model = model.name, reason = %reason, "ⓘ model skipped")
            }
            ModelOutcome::Warned(reason) => {
                warn!(model = model.name, reason = %reason, "✗ model failed, continuing")
            }
        }
        report.runs.push(ModelRun {
            name: model.name,
            outcome,
        });
    }

    Ok(report)
}

/// Execute one model, single shot, and classify the result.
pub fn execute_model(conn: &Connection, model: &SqlModel) -> ModelOutcome {
    match conn.execute_batch(model.sql) {
        Ok(()) => ModelOutcome::Succeeded,
        Err(e) => {
            let message = truncate(&e.to_string(), 240);
            if is_missing_dependency(&message) {
                ModelOutcome::Skipped(message)
            } else {
                ModelOutcome::Warned(message)
            }
        }
    }
}

/// Classify "referenced catalog object is absent" from the error text.
///
/// The duckdb crate surfaces engine errors as strings, so this matches the
/// catalog-error phrasing. Known fragility: an engine message change would
/// demote skips to warnings, which still keeps the run alive.
fn is_missing_dependency(message: &str) -> bool {
    message.contains("does not exist")
        && (message.contains("Catalog Error") || message.contains("with name"))
}

/// Drop every derived-tier view and table, views first since views may
/// reference tables. Makes re-analysis idempotent without re-fetching.
pub fn drop_aggregate_tables(store: &Store) -> Result<()> {
    let conn = store.conn();

    let views = list_catalog(conn, "SELECT view_name FROM duckdb_views() WHERE view_name LIKE 'agg_%'")?;
    for view in &views {
        conn.execute_batch(&format!("DROP VIEW IF EXISTS \"{}\";", view))
            .with_context(|| format!("Failed to drop view {}", view))?;
    }

    let tables = list_catalog(conn, "SELECT table_name FROM duckdb_tables() WHERE table_name LIKE 'agg_%'")?;
    for table in &tables {
        conn.execute_batch(&format!("DROP TABLE IF EXISTS \"{}\";", table))
            .with_context(|| format!("Failed to drop table {}", table))?;
    }

    info!(
        views = views.len(),
        tables = tables.len(),
        "Dropped derived tier"
    );
    Ok(())
}

/// Escape hatch for ad hoc read queries; rows come back as JSON objects.
pub fn run_single_query(store: &Store, sql: &str) -> Result<Vec<serde_json::Value>> {
    let inner = sql.trim().trim_end_matches(';');
    let wrapped = format!("SELECT CAST(to_json(t) AS VARCHAR) FROM ({}) AS t", inner);

    let conn = store.conn();
    let mut stmt = conn.prepare(&wrapped).context("Failed to prepare query")?;
    let rows: Vec<String> = stmt
        .query_map([], |row| row.get(0))
        .context("Query failed")?
        .collect::<std::result::Result<_, _>>()?;

    rows.iter()
        .map(|row| serde_json::from_str(row).context("Engine returned malformed JSON row"))
        .collect()
}

fn list_catalog(conn: &Connection, sql: &str) -> Result<Vec<String>> {
    let mut stmt = conn.prepare(sql).context("Catalog query failed")?;
    let names = stmt
        .query_map([], |row| row.get(0))
        .context("Catalog query failed")?
        .collect::<std::result::Result<_, _>>()?;
    Ok(names)
}

fn truncate(message: &str, max: usize) -> String {
    if message.len() <= max {
        return message.to_string();
    }
    let mut end = max;
    while !message.is_char_boundary(end) {
        end -= 1;
    }
    format!("{}…", &message[..end])
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::{write_batch, Store};
    use serde_json::json;

    fn fixture_batch() -> Vec<serde_json::Value> {
        vec![json!({
            "repository": {
                "id": "R_cosign",
                "name": "cosign",
                "nameWithOwner": "sigstore/cosign",
                "description": null,
                "url": "https://github.com/sigstore/cosign",
                "licenseInfo": { "spdxId": "Apache-2.0" },
                "defaultBranchRef": { "name": "main" },
                "releases": {
                    "nodes": [{
                        "id": "REL_1",
                        "tagName": "v2.2.0",
                        "name": "v2.2.0",
                        "createdAt": "2023-10-10T00:00:00Z",
                        "url": null,
                        "releaseAssets": {
                            "nodes": [
                                { "id": "A_1", "name": "cosign.sig", "downloadUrl": null },
                                { "id": "A_2", "name": "cosign_sbom.spdx.json", "downloadUrl": null }
                            ]
                        }
                    }]
                },
                "branchProtectionRules": { "nodes": null },
                "workflows": {
                    "entries": [{
                        "name": "ci.yml",
                        "type": "blob",
                        // Tool name only inside a comment: still a detection.
                        "object": { "text": "# we might use cosign here one day\non: push\n" }
                    }]
                }
            }
        })]
    }

    fn populated_store() -> Store {
        let store = Store::open_in_memory().unwrap();
        write_batch(&store, "repo_artifacts", &fixture_batch(), &[], &[], None).unwrap();
        store
    }

    fn outcome_of<'a>(report: &'a AnalysisReport, name: &str) -> &'a ModelOutcome {
        &report
            .runs
            .iter()
            .find(|r| r.name == name)
            .unwrap_or_else(|| panic!("model {} missing from report", name))
            .outcome
    }

    #[test]
    fn test_full_sequence_always_completes() {
        let store = populated_store();
        let report = run_models(&store, true).unwrap();

        assert_eq!(report.runs.len(), MODELS.len());
        assert_eq!(outcome_of(&report, "010_artifact_patterns"), &ModelOutcome::Succeeded);
        assert_eq!(outcome_of(&report, "030_workflow_tools"), &ModelOutcome::Succeeded);
        assert_eq!(outcome_of(&report, "040_repo_security_summary"), &ModelOutcome::Succeeded);

        // No insights or project metadata were supplied: their dependent
        // models are informational skips, never failures.
        assert!(matches!(
            outcome_of(&report, "020_security_insights"),
            &ModelOutcome::Skipped(_)
        ));
        assert!(matches!(
            outcome_of(&report, "060_project_security_summary"),
            &ModelOutcome::Skipped(_)
        ));
        store.close();
    }

    #[test]
    fn test_sequence_on_empty_entity_tables() {
        let store = Store::open_in_memory().unwrap();
        write_batch(&store, "repo_artifacts", &[], &[], &[], None).unwrap();

        let report = run_models(&store, false).unwrap();
        assert_eq!(report.runs.len(), MODELS.len());
        assert_eq!(outcome_of(&report, "010_artifact_patterns"), &ModelOutcome::Succeeded);

        let rows = run_single_query(&store, "SELECT * FROM agg_repo_security_summary").unwrap();
        assert!(rows.is_empty());
        store.close();
    }

    #[test]
    fn test_artifact_classification() {
        let store = populated_store();
        run_models(&store, false).unwrap();

        let rows = run_single_query(
            &store,
            "SELECT asset_name, is_sbom, sbom_format, is_signature \
             FROM agg_artifact_patterns ORDER BY asset_name",
        )
        .unwrap();
        assert_eq!(rows.len(), 2);

        let sig = &rows[0];
        assert_eq!(sig["asset_name"], "cosign.sig");
        assert_eq!(sig["is_signature"], true);
        assert_eq!(sig["is_sbom"], false);

        let sbom = &rows[1];
        assert_eq!(sbom["asset_name"], "cosign_sbom.spdx.json");
        assert_eq!(sbom["is_sbom"], true);
        assert_eq!(sbom["sbom_format"], "spdx");
        store.close();
    }

    #[test]
    fn test_classification_is_idempotent() {
        let store = populated_store();
        let patterns = MODELS
            .iter()
            .find(|m| m.name == "010_artifact_patterns")
            .unwrap();

        assert_eq!(execute_model(store.conn(), patterns), ModelOutcome::Succeeded);
        let first = run_single_query(&store, "SELECT * FROM agg_artifact_patterns ORDER BY asset_id")
            .unwrap();
        assert_eq!(execute_model(store.conn(), patterns), ModelOutcome::Succeeded);
        let second = run_single_query(&store, "SELECT * FROM agg_artifact_patterns ORDER BY asset_id")
            .unwrap();

        assert_eq!(first, second);
        store.close();
    }

    #[test]
    fn test_substring_match_counts_as_detection() {
        let store = populated_store();
        run_models(&store, false).unwrap();

        let rows = run_single_query(
            &store,
            "SELECT tool_name, tool_category FROM agg_workflow_tools",
        )
        .unwrap();
        assert_eq!(rows.len(), 1);
        assert_eq!(rows[0]["tool_name"], "cosign");
        assert_eq!(rows[0]["tool_category"], "signer");
        store.close();
    }

    #[test]
    fn test_recreate_drops_derived_tier() {
        let store = populated_store();
        run_models(&store, false).unwrap();
        drop_aggregate_tables(&store).unwrap();

        let remaining: i64 = store
            .conn()
            .query_row(
                "SELECT COUNT(*) FROM duckdb_tables() WHERE table_name LIKE 'agg_%'",
                [],
                |row| row.get(0),
            )
            .unwrap();
        assert_eq!(remaining, 0);

        // Base entity tables survive the reset.
        let repos: i64 = store
            .conn()
            .query_row("SELECT COUNT(*) FROM repositories", [], |row| row.get(0))
            .unwrap();
        assert_eq!(repos, 1);
        store.close();
    }

    #[test]
    fn test_missing_dependency_classifier() {
        assert!(is_missing_dependency(
            "Catalog Error: Table with name security_insights does not exist!"
        ));
        assert!(!is_missing_dependency("Binder Error: column nope not found"));
        assert!(!is_missing_dependency("Parser Error: syntax error at or near"));
    }

    #[test]
    fn test_truncate_respects_char_boundaries() {
        let message = "ü".repeat(300);
        let truncated = truncate(&message, 241);
        assert!(truncated.len() <= 245);
        assert!(truncated.ends_with('…'));
        assert_eq!(truncate("short", 240), "short");
    }
}
