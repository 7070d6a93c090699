//! Target list loading.
//!
//! Two input shapes are accepted, both YAML (JSON parses as a YAML subset):
//! a flat list of `{owner, name}` records, or a list of project records
//! each carrying metadata and a `repos` list. Both normalize to a flat,
//! deduplicated target list plus an optional project metadata side-table.

use std::collections::HashSet;
use std::path::Path;

use anyhow::{Context, Result};
use serde::{Deserialize, Serialize};
use tracing::info;

#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct Target {
    pub owner: String,
    pub name: String,
}

impl Target {
    pub fn name_with_owner(&self) -> String {
        format!("{}/{}", self.owner, self.name)
    }
}

/// A foundation-hosted project spanning one or more repositories.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRecord {
    pub project_name: String,
    pub maturity: Option<String>,
    pub category: Option<String>,
    pub subcategory: Option<String>,
    pub homepage: Option<String>,
    pub accepted_at: Option<String>,
    pub graduated_at: Option<String>,
    pub dev_stats_url: Option<String>,
    pub artwork_url: Option<String>,
    #[serde(default)]
    pub audits: Vec<ProjectAudit>,
    #[serde(default)]
    pub repos: Vec<ProjectRepo>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectAudit {
    pub date: Option<String>,
    pub url: Option<String>,
    #[serde(rename = "type")]
    pub audit_type: Option<String>,
}

#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProjectRepo {
    pub owner: String,
    pub name: String,
    #[serde(default)]
    pub primary: bool,
}

#[derive(Debug, Clone, Deserialize)]
#[serde(untagged)]
enum TargetEntry {
    Project(ProjectRecord),
    Repo(Target),
}

/// Normalized target input: the flat fetch list plus optional enrichment.
#[derive(Debug, Clone, Default)]
pub struct TargetList {
    pub targets: Vec<Target>,
    pub projects: Vec<ProjectRecord>,
}

/// Load and normalize a targets file.
pub fn load(path: &str) -> Result<TargetList> {
    let content = std::fs::read_to_string(Path::new(path))
        .with_context(|| format!("Failed to read targets file: {}", path))?;

    let entries: Vec<TargetEntry> =
        serde_yaml::from_str(&content).with_context(|| format!("Malformed targets file: {}", path))?;

    let mut seen: HashSet<Target> = HashSet::new();
    let mut list = TargetList::default();

    for entry in entries {
        match entry {
            TargetEntry::Repo(target) => {
                if seen.insert(target.clone()) {
                    list.targets.push(target);
                }
            }
            TargetEntry::Project(project) => {
                for repo in &project.repos {
                    let target = Target {
                        owner: repo.owner.clone(),
                        name: repo.name.clone(),
                    };
                    if seen.insert(target.clone()) {
                        list.targets.push(target);
                    }
                }
                list.projects.push(project);
            }
        }
    }

    info!(
        path = %path,
        targets = list.targets.len(),
        projects = list.projects.len(),
        "Loaded targets file"
    );

    Ok(list)
}
