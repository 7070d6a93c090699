//! Typed response shapes for the GraphQL queries.
//!
//! Every connection is `{ nodes: Option<Vec<Option<T>>> }` and every field
//! that is nullable in the GitHub schema is an `Option` here. The extractors
//! rely on that shape to filter null parents and null elements; nothing in
//! this module coalesces missing strings to defaults.

use serde::{Deserialize, Serialize};

/// GraphQL response envelope: `{ "data": ..., "errors": [...] }`
#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlEnvelope<T> {
    pub data: Option<T>,
    #[serde(default)]
    pub errors: Vec<GraphQlErrorEntry>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct GraphQlErrorEntry {
    pub message: String,
    #[serde(rename = "type")]
    pub error_type: Option<String>,
}

/// Top-level shape of the repo artifact survey query.
///
/// A null `repository` means the target does not exist or is inaccessible;
/// it still counts as one raw-tier record and zero normalized rows.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RepoArtifactsResponse {
    pub repository: Option<RepositoryNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct RepositoryNode {
    pub id: String,
    pub name: String,
    pub name_with_owner: String,
    pub description: Option<String>,
    pub url: String,
    pub license_info: Option<LicenseInfo>,
    pub default_branch_ref: Option<RefNode>,
    #[serde(default)]
    pub releases: Connection<ReleaseNode>,
    #[serde(default)]
    pub branch_protection_rules: Connection<BranchProtectionRuleNode>,
    pub workflows: Option<WorkflowsTree>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct LicenseInfo {
    pub spdx_id: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct RefNode {
    pub name: String,
}

/// GraphQL connection: a null node list and null elements are both legal.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Connection<T> {
    pub nodes: Option<Vec<Option<T>>>,
}

impl<T> Default for Connection<T> {
    fn default() -> Self {
        Self { nodes: None }
    }
}

impl<T> Connection<T> {
    /// Non-null nodes, with a null list treated as empty.
    pub fn present_nodes(&self) -> impl Iterator<Item = &T> {
        self.nodes
            .as_deref()
            .unwrap_or_default()
            .iter()
            .filter_map(|n| n.as_ref())
    }
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseNode {
    pub id: String,
    pub tag_name: String,
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub url: Option<String>,
    #[serde(default)]
    pub release_assets: Connection<ReleaseAssetNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ReleaseAssetNode {
    pub id: String,
    pub name: String,
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct BranchProtectionRuleNode {
    pub id: String,
    pub pattern: String,
    #[serde(default)]
    pub requires_approving_reviews: bool,
    pub required_approving_review_count: Option<i64>,
    #[serde(default)]
    pub requires_code_owner_reviews: bool,
    #[serde(default)]
    pub requires_commit_signatures: bool,
    #[serde(default)]
    pub requires_linear_history: bool,
    #[serde(default)]
    pub allows_force_pushes: bool,
    #[serde(default)]
    pub is_admin_enforced: bool,
}

/// `.github/workflows` tree, when the repository has one.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct WorkflowsTree {
    pub entries: Option<Vec<TreeEntry>>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct TreeEntry {
    pub name: String,
    #[serde(rename = "type")]
    pub entry_type: Option<String>,
    pub object: Option<BlobNode>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct BlobNode {
    pub text: Option<String>,
}

/// One completed fetch: the raw response value for the audit/raw tier and
/// the typed parse the extractors consume.
#[derive(Debug, Clone)]
pub struct RepoFetch {
    pub owner: String,
    pub name: String,
    pub raw: serde_json::Value,
    pub response: RepoArtifactsResponse,
}

/// A parsed SECURITY-INSIGHTS.yml document, keyed for upsert.
#[derive(Debug, Clone)]
pub struct InsightsDocument {
    pub name_with_owner: String,
    pub source_url: String,
    pub document: serde_json::Value,
}
