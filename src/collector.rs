//! Collection driver.
//!
//! Thin orchestration: load the target list, fan out GraphQL fetches under
//! a concurrency limit, append the fetch audit log, then hand the completed
//! batch to the storage writer and optionally the analyzer. Per-target
//! failures are contained here; only storage failures abort the run.

use std::io::Write;
use std::sync::Arc;

use anyhow::{Context, Result};
use chrono::Utc;
use serde_json::json;
use tokio::sync::Semaphore;
use tracing::{info, warn};

use crate::analyze;
use crate::config::CollectArgs;
use crate::github::types::InsightsDocument;
use crate::github::{queries, GithubClient, RepoFetch};
use crate::store::{self, Store};
use crate::targets::{self, Target};

pub async fn run(args: &CollectArgs) -> Result<()> {
    let list = targets::load(&args.targets)?;
    if list.targets.is_empty() {
        warn!("Targets file contains no repositories");
    }

    std::fs::create_dir_all(&args.output_dir).context("Failed to create output directory")?;

    let client = Arc::new(GithubClient::new(&args.github_token, args.request_timeout)?);
    let mut fetch_log = FetchLog::open(&args.fetch_log_path())?;

    info!(
        targets = list.targets.len(),
        concurrency = args.concurrency,
        fetch_insights = args.fetch_insights,
        "Starting collection"
    );

    let semaphore = Arc::new(Semaphore::new(args.concurrency));
    let mut tasks = Vec::with_capacity(list.targets.len());

    for target in list.targets.clone() {
        let semaphore = Arc::clone(&semaphore);
        let client = Arc::clone(&client);
        let fetch_insights = args.fetch_insights;

        tasks.push(tokio::spawn(async move {
            let _permit = semaphore.acquire().await.unwrap();
            let fetch = client
                .fetch_repo_artifacts(&target.owner, &target.name)
                .await;

            let insights = match (&fetch, fetch_insights) {
                (Ok(f), true) => fetch_insights_for(&client, f).await,
                _ => None,
            };

            (target, fetch, insights)
        }));
    }

    let mut batch: Vec<serde_json::Value> = Vec::new();
    let mut insights: Vec<InsightsDocument> = Vec::new();
    let mut not_found = 0usize;
    let mut failed = 0usize;

    for task in tasks {
        let (target, fetch, doc) = task.await.context("Fetch task panicked")?;
        match fetch {
            Ok(f) => {
                fetch_log.record(&target, Some(&f.raw), None);
                if f.response.repository.is_none() {
                    not_found += 1;
                    info!(repo = %target.name_with_owner(), "ⓘ repository not found, skipped");
                }
                batch.push(f.raw);
                insights.extend(doc);
            }
            Err(e) => {
                failed += 1;
                fetch_log.record(&target, None, Some(&e.to_string()));
                warn!(repo = %target.name_with_owner(), error = %e, "Fetch failed, skipping target");
            }
        }
    }

    info!(
        fetched = batch.len(),
        not_found,
        failed,
        insights = insights.len(),
        "Fetch phase complete"
    );

    let store = Store::open(&args.db_path())?;
    let parquet_dir = std::path::PathBuf::from(args.parquet_dir());
    let report = store::write_batch(
        &store,
        queries::REPO_ARTIFACTS_SHAPE,
        &batch,
        &list.projects,
        &insights,
        Some(&parquet_dir),
    )?;

    info!(
        raw_rows = report.raw_rows,
        normalized = report.normalized,
        tables = report.tables.len(),
        exported_files = report.exported_files,
        "Write phase complete"
    );

    if args.analyze {
        let analysis = analyze::run_models(&store, false)?;
        info!(
            succeeded = analysis.succeeded(),
            skipped = analysis.skipped(),
            warned = analysis.warned(),
            "Analysis phase complete"
        );
        analyze::report::summarize(&store);
    }

    store.close();
    Ok(())
}

async fn fetch_insights_for(client: &GithubClient, fetch: &RepoFetch) -> Option<InsightsDocument> {
    let repo = fetch.response.repository.as_ref()?;
    let branch = repo
        .default_branch_ref
        .as_ref()
        .map(|r| r.name.as_str())
        .unwrap_or("HEAD");

    match client
        .fetch_security_insights(&fetch.owner, &fetch.name, branch)
        .await
    {
        Ok(doc) => doc,
        Err(e) => {
            warn!(repo = %repo.name_with_owner, error = %e, "Insights fetch failed");
            None
        }
    }
}

/// Append-only JSONL audit log, one line per fetch, written regardless of
/// what the rest of the pipeline does with the batch.
struct FetchLog {
    file: std::fs::File,
    path: String,
}

impl FetchLog {
    fn open(path: &str) -> Result<Self> {
        let file = std::fs::OpenOptions::new()
            .create(true)
            .append(true)
            .open(path)
            .with_context(|| format!("Failed to open fetch log: {}", path))?;
        Ok(Self {
            file,
            path: path.to_string(),
        })
    }

    fn record(&mut self, target: &Target, response: Option<&serde_json::Value>, error: Option<&str>) {
        let line = json!({
            "metadata": {
                "queryType": queries::REPO_ARTIFACTS_SHAPE,
                "timestamp": Utc::now().to_rfc3339(),
                "owner": target.owner,
                "repo": target.name,
            },
            "response": response,
            "error": error,
        });

        // Audit logging is best-effort; it must never fail a fetch.
        if let Err(e) = writeln!(self.file, "{}", line) {
            warn!(path = %self.path, error = %e, "Failed to append fetch log");
        }
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fetch_log_appends_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("fetch-log.jsonl");
        let target = Target {
            owner: "sigstore".to_string(),
            name: "cosign".to_string(),
        };

        let mut log = FetchLog::open(path.to_str().unwrap()).unwrap();
        log.record(&target, Some(&json!({ "repository": null })), None);
        log.record(&target, None, Some("boom"));

        let content = std::fs::read_to_string(&path).unwrap();
        let lines: Vec<&str> = content.lines().collect();
        assert_eq!(lines.len(), 2);

        let first: serde_json::Value = serde_json::from_str(lines[0]).unwrap();
        assert_eq!(first["metadata"]["queryType"], "repo_artifacts");
        assert_eq!(first["metadata"]["owner"], "sigstore");
        assert!(first["response"]["repository"].is_null());

        let second: serde_json::Value = serde_json::from_str(lines[1]).unwrap();
        assert_eq!(second["error"], "boom");
        assert!(second["response"].is_null());
    }
}
