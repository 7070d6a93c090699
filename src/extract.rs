//! Entity extraction
//!
//! One hand-written extractor per query shape, dispatched by name. There is
//! deliberately no generic response walker: foreign keys in nested GraphQL
//! data cannot be discovered safely without a schema, and a per-shape
//! mapping function stays debuggable.
//!
//! # Module Structure
//! - `entities`: flat entity row types and the table registry
//! - `repo_artifacts`: extractor for the repository artifact survey shape

pub mod entities;
pub mod repo_artifacts;

use anyhow::Result;

pub use entities::{EntityTable, ExtractedEntities};

/// Supported query shapes. One extractor per variant.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum QueryShape {
    RepoArtifacts,
}

impl QueryShape {
    pub fn from_name(name: &str) -> Option<Self> {
        match name {
            crate::github::queries::REPO_ARTIFACTS_SHAPE => Some(Self::RepoArtifacts),
            _ => None,
        }
    }

    pub fn name(self) -> &'static str {
        match self {
            Self::RepoArtifacts => crate::github::queries::REPO_ARTIFACTS_SHAPE,
        }
    }
}

/// Dispatch a raw response batch to the extractor registered for `shape`.
///
/// Returns `None` for an unregistered shape; the caller logs and skips
/// normalization while the raw tier keeps the data.
pub fn dispatch(shape: &str, batch: &[serde_json::Value]) -> Option<Result<ExtractedEntities>> {
    match QueryShape::from_name(shape)? {
        QueryShape::RepoArtifacts => Some(repo_artifacts::extract_from_values(batch)),
    }
}
