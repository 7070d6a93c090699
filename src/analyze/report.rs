//! Read-only console summary over the final aggregates.
//!
//! Advisory output: any missing summary table degrades to a note instead
//! of failing the run.

use anyhow::Result;
use duckdb::Connection;
use tracing::debug;

use crate::store::Store;

/// Print the post-analysis summary. Never fails the run.
pub fn summarize(store: &Store) {
    match build_summary(store.conn()) {
        Ok(summary) => println!("{}", summary),
        Err(e) => {
            debug!(error = %e, "Summary unavailable");
            println!("ⓘ summary unavailable (no aggregate tables in this store)");
        }
    }
}

/// Assemble the summary text. The repository rollup is required; the
/// optional sections degrade independently.
fn build_summary(conn: &Connection) -> Result<String> {
    let mut out = String::new();

    let (repos, with_sbom, with_sig, with_provenance): (i64, i64, i64, i64) = conn.query_row(
        "SELECT count(*), \
                CAST(sum(CASE WHEN has_sbom_artifact THEN 1 ELSE 0 END) AS BIGINT), \
                CAST(sum(CASE WHEN has_signature_artifact THEN 1 ELSE 0 END) AS BIGINT), \
                CAST(sum(CASE WHEN has_slsa_provenance THEN 1 ELSE 0 END) AS BIGINT) \
         FROM agg_repo_security_summary",
        [],
        |row| {
            Ok((
                row.get(0)?,
                row.get::<_, Option<i64>>(1)?.unwrap_or(0),
                row.get::<_, Option<i64>>(2)?.unwrap_or(0),
                row.get::<_, Option<i64>>(3)?.unwrap_or(0),
            ))
        },
    )?;

    out.push_str("\nSUPPLY CHAIN SECURITY SUMMARY\n");
    out.push_str("=============================\n");
    out.push_str(&format!("Repositories analyzed:      {}\n", repos));
    out.push_str(&format!(
        "With SBOM artifacts:        {} ({})\n",
        with_sbom,
        percent(with_sbom, repos)
    ));
    out.push_str(&format!(
        "With signature artifacts:   {} ({})\n",
        with_sig,
        percent(with_sig, repos)
    ));
    out.push_str(&format!(
        "With SLSA provenance:       {} ({})\n",
        with_provenance,
        percent(with_provenance, repos)
    ));

    match tool_usage(conn) {
        Ok(rows) if !rows.is_empty() => {
            out.push_str("\nTOP CI SECURITY TOOLS\n");
            out.push_str(&format!(
                "{:<24} {:<24} {:>6}\n",
                "TOOL", "CATEGORY", "REPOS"
            ));
            for (tool, category, count) in rows {
                out.push_str(&format!("{:<24} {:<24} {:>6}\n", tool, category, count));
            }
        }
        Ok(_) => out.push_str("\nⓘ no CI security tools detected\n"),
        Err(e) => {
            debug!(error = %e, "Tool usage summary unavailable");
            out.push_str("\nⓘ tool usage summary unavailable\n");
        }
    }

    match project_rollup(conn) {
        Ok(Some((projects, with_any_sbom))) => {
            out.push_str(&format!(
                "\nProjects analyzed:          {} ({} with an SBOM somewhere)\n",
                projects, with_any_sbom
            ));
        }
        Ok(None) => {}
        Err(e) => debug!(error = %e, "Project rollup summary unavailable"),
    }

    Ok(out)
}

fn tool_usage(conn: &Connection) -> Result<Vec<(String, String, i64)>> {
    let mut stmt = conn.prepare(
        "SELECT tool_name, tool_category, repository_count \
         FROM agg_tool_usage ORDER BY repository_count DESC, tool_name LIMIT 10",
    )?;
    let rows = stmt
        .query_map([], |row| Ok((row.get(0)?, row.get(1)?, row.get(2)?)))?
        .collect::<std::result::Result<_, _>>()?;
    Ok(rows)
}

/// Project-level counts, or `None` when the project rollup was skipped.
fn project_rollup(conn: &Connection) -> Result<Option<(i64, i64)>> {
    let exists: i64 = conn.query_row(
        "SELECT COUNT(*) FROM duckdb_tables() \
         WHERE table_name = 'agg_project_security_summary'",
        [],
        |row| row.get(0),
    )?;
    if exists == 0 {
        return Ok(None);
    }

    let counts = conn.query_row(
        "SELECT count(*), \
                CAST(sum(CASE WHEN any_sbom_artifact THEN 1 ELSE 0 END) AS BIGINT) \
         FROM agg_project_security_summary",
        [],
        |row| {
            Ok((
                row.get(0)?,
                row.get::<_, Option<i64>>(1)?.unwrap_or(0),
            ))
        },
    )?;
    Ok(Some(counts))
}

fn percent(part: i64, whole: i64) -> String {
    if whole == 0 {
        return "0.0%".to_string();
    }
    format!("{:.1}%", 100.0 * part as f64 / whole as f64)
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::store::Store;

    #[test]
    fn test_percent_formatting() {
        assert_eq!(percent(1, 4), "25.0%");
        assert_eq!(percent(0, 0), "0.0%");
        assert_eq!(percent(3, 3), "100.0%");
    }

    #[test]
    fn test_summarize_tolerates_empty_store() {
        let store = Store::open_in_memory().unwrap();
        // No aggregate tables exist; must not panic or fail the run.
        summarize(&store);
        store.close();
    }

    #[test]
    fn test_build_summary_requires_rollup_table() {
        let store = Store::open_in_memory().unwrap();
        assert!(build_summary(store.conn()).is_err());
        store.close();
    }
}
