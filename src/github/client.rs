use anyhow::{Context, Result};
use octocrab::Octocrab;
use serde_json::json;
use tracing::{debug, warn};

use super::queries::REPO_ARTIFACTS_QUERY;
use super::types::{GraphQlEnvelope, InsightsDocument, RepoArtifactsResponse, RepoFetch};

/// Candidate paths for the OpenSSF security-insights document, tried in order.
const INSIGHTS_PATHS: &[&str] = &["SECURITY-INSIGHTS.yml", ".github/SECURITY-INSIGHTS.yml"];

/// GitHub client for the artifact survey.
///
/// One GraphQL round trip per repository; failures are reported to the
/// caller, which decides skip-vs-abort per target.
pub struct GithubClient {
    client: Octocrab,
    http: reqwest::Client,
    request_timeout: std::time::Duration,
}

impl GithubClient {
    pub fn new(token: &str, request_timeout_secs: u64) -> Result<Self> {
        let client = Octocrab::builder()
            .personal_token(token.to_string())
            .build()
            .context("Failed to build GitHub client")?;

        let http = reqwest::Client::builder()
            .timeout(std::time::Duration::from_secs(request_timeout_secs))
            .build()
            .context("Failed to build HTTP client")?;

        Ok(Self {
            client,
            http,
            request_timeout: std::time::Duration::from_secs(request_timeout_secs),
        })
    }

    /// Fetch one repository's artifact surface.
    ///
    /// A missing or inaccessible repository resolves to a response with a
    /// null `repository` field rather than an error, so the raw tier still
    /// records the miss. Transport and auth failures are returned as errors.
    pub async fn fetch_repo_artifacts(&self, owner: &str, name: &str) -> Result<RepoFetch> {
        debug!(owner = %owner, repo = %name, "Fetching repository artifacts");

        let payload = json!({
            "query": REPO_ARTIFACTS_QUERY,
            "variables": { "owner": owner, "name": name },
        });

        let body: serde_json::Value = tokio::time::timeout(
            self.request_timeout,
            self.client.graphql(&payload),
        )
        .await
        .with_context(|| format!("Timeout fetching {}/{}", owner, name))?
        .with_context(|| format!("GraphQL request failed for {}/{}", owner, name))?;

        let envelope: GraphQlEnvelope<serde_json::Value> =
            serde_json::from_value(body).context("Malformed GraphQL response envelope")?;

        for error in &envelope.errors {
            match error.error_type.as_deref() {
                // NOT_FOUND arrives alongside a null repository in data;
                // record it and move on.
                Some("NOT_FOUND") => {
                    debug!(owner = %owner, repo = %name, "Repository not found")
                }
                _ => warn!(
                    owner = %owner,
                    repo = %name,
                    message = %error.message,
                    "GraphQL error entry"
                ),
            }
        }

        let raw = envelope
            .data
            .unwrap_or_else(|| json!({ "repository": null }));
        let response: RepoArtifactsResponse = serde_json::from_value(raw.clone())
            .with_context(|| format!("Unexpected response shape for {}/{}", owner, name))?;

        Ok(RepoFetch {
            owner: owner.to_string(),
            name: name.to_string(),
            raw,
            response,
        })
    }

    /// Fetch and parse SECURITY-INSIGHTS.yml from the repository head.
    ///
    /// Returns `None` when no document is published at any known path.
    /// Parse failures are treated the same way; a broken document is not
    /// worth failing a target over.
    pub async fn fetch_security_insights(
        &self,
        owner: &str,
        name: &str,
        branch: &str,
    ) -> Result<Option<InsightsDocument>> {
        for path in INSIGHTS_PATHS {
            let url = format!(
                "https://raw.githubusercontent.com/{}/{}/{}/{}",
                owner, name, branch, path
            );

            let response = match self.http.get(&url).send().await {
                Ok(r) => r,
                Err(e) => {
                    debug!(url = %url, error = %e, "Insights fetch failed");
                    continue;
                }
            };

            if !response.status().is_success() {
                continue;
            }

            let text = response
                .text()
                .await
                .with_context(|| format!("Failed to read insights body from {}", url))?;

            match serde_yaml::from_str::<serde_json::Value>(&text) {
                Ok(document) => {
                    debug!(owner = %owner, repo = %name, path = %path, "Found security insights");
                    return Ok(Some(InsightsDocument {
                        name_with_owner: format!("{}/{}", owner, name),
                        source_url: url,
                        document,
                    }));
                }
                Err(e) => {
                    warn!(url = %url, error = %e, "Unparseable SECURITY-INSIGHTS.yml");
                    return Ok(None);
                }
            }
        }

        Ok(None)
    }
}
