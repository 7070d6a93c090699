//! Flat entity row types and the table registry.
//!
//! `EntityTable` is the single source of truth for which normalized tables
//! exist. Its matches are exhaustive, so adding an entity type without a
//! table name, fallback schema, and emitted array refuses to compile.
//!
//! Null policy: nullable source fields stay `Option` and land as SQL NULL.
//! The SQL models apply `COALESCE` where a default is needed.

use anyhow::Result;
use serde::Serialize;

/// Normalized entity tables, one per extracted entity type.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum EntityTable {
    Repositories,
    Releases,
    ReleaseAssets,
    Workflows,
    BranchProtectionRules,
}

impl EntityTable {
    pub const ALL: [EntityTable; 5] = [
        EntityTable::Repositories,
        EntityTable::Releases,
        EntityTable::ReleaseAssets,
        EntityTable::Workflows,
        EntityTable::BranchProtectionRules,
    ];

    pub fn name(self) -> &'static str {
        match self {
            EntityTable::Repositories => "repositories",
            EntityTable::Releases => "releases",
            EntityTable::ReleaseAssets => "release_assets",
            EntityTable::Workflows => "workflows",
            EntityTable::BranchProtectionRules => "branch_protection_rules",
        }
    }

    /// Column list used when a table must be created with zero rows, so
    /// downstream SQL models never hit "table not found".
    pub fn fallback_schema(self) -> &'static str {
        match self {
            EntityTable::Repositories => {
                "id VARCHAR, name VARCHAR, name_with_owner VARCHAR, description VARCHAR, \
                 url VARCHAR, license VARCHAR, default_branch VARCHAR"
            }
            EntityTable::Releases => {
                "id VARCHAR, repository_id VARCHAR, tag_name VARCHAR, name VARCHAR, \
                 created_at TIMESTAMP, url VARCHAR"
            }
            EntityTable::ReleaseAssets => {
                "id VARCHAR, release_id VARCHAR, name VARCHAR, download_url VARCHAR"
            }
            EntityTable::Workflows => "repository_id VARCHAR, path VARCHAR, content VARCHAR",
            EntityTable::BranchProtectionRules => {
                "id VARCHAR, repository_id VARCHAR, pattern VARCHAR, \
                 requires_approving_reviews BOOLEAN, required_approving_review_count BIGINT, \
                 requires_code_owner_reviews BOOLEAN, requires_commit_signatures BOOLEAN, \
                 requires_linear_history BOOLEAN, allows_force_pushes BOOLEAN, \
                 is_admin_enforced BOOLEAN"
            }
        }
    }
}

#[derive(Debug, Clone, Serialize)]
pub struct RepositoryRow {
    pub id: String,
    pub name: String,
    pub name_with_owner: String,
    pub description: Option<String>,
    pub url: String,
    pub license: Option<String>,
    pub default_branch: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseRow {
    pub id: String,
    pub repository_id: String,
    pub tag_name: String,
    pub name: Option<String>,
    pub created_at: Option<String>,
    pub url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct ReleaseAssetRow {
    pub id: String,
    pub release_id: String,
    pub name: String,
    pub download_url: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct WorkflowRow {
    pub repository_id: String,
    pub path: String,
    pub content: String,
}

#[derive(Debug, Clone, Serialize)]
pub struct BranchProtectionRuleRow {
    pub id: String,
    pub repository_id: String,
    pub pattern: String,
    pub requires_approving_reviews: bool,
    pub required_approving_review_count: Option<i64>,
    pub requires_code_owner_reviews: bool,
    pub requires_commit_signatures: bool,
    pub requires_linear_history: bool,
    pub allows_force_pushes: bool,
    pub is_admin_enforced: bool,
}

/// Output of one extractor run: every table's rows, always all present.
#[derive(Debug, Clone, Default)]
pub struct ExtractedEntities {
    pub repositories: Vec<RepositoryRow>,
    pub releases: Vec<ReleaseRow>,
    pub release_assets: Vec<ReleaseAssetRow>,
    pub workflows: Vec<WorkflowRow>,
    pub branch_protection_rules: Vec<BranchProtectionRuleRow>,
}

impl ExtractedEntities {
    /// Convert to the materializer's input. Emits one entry per
    /// `EntityTable` variant unconditionally, empty or not. The match below
    /// is the registry: a new variant cannot compile without a row source.
    pub fn into_tables(self) -> Result<Vec<(EntityTable, Vec<serde_json::Value>)>> {
        fn rows<T: Serialize>(items: &[T]) -> Result<Vec<serde_json::Value>> {
            items
                .iter()
                .map(|item| serde_json::to_value(item).map_err(Into::into))
                .collect()
        }

        let mut tables = Vec::with_capacity(EntityTable::ALL.len());
        for table in EntityTable::ALL {
            let values = match table {
                EntityTable::Repositories => rows(&self.repositories)?,
                EntityTable::Releases => rows(&self.releases)?,
                EntityTable::ReleaseAssets => rows(&self.release_assets)?,
                EntityTable::Workflows => rows(&self.workflows)?,
                EntityTable::BranchProtectionRules => rows(&self.branch_protection_rules)?,
            };
            tables.push((table, values));
        }
        Ok(tables)
    }

    /// Human-readable load summary for logging. Side channel only; not part
    /// of the data contract.
    pub fn summary(&self) -> String {
        format!(
            "Normalized {} repositories, extracted {} releases, {} release assets, \
             {} workflows, {} branch protection rules",
            self.repositories.len(),
            self.releases.len(),
            self.release_assets.len(),
            self.workflows.len(),
            self.branch_protection_rules.len()
        )
    }
}
