//! GitHub fetch boundary
//!
//! Thin GraphQL client for pulling one repository's supply-chain surface
//! (releases with assets, workflow files, branch protection rules) in a
//! single query, plus an optional raw-file fetch of SECURITY-INSIGHTS.yml.
//!
//! # Module Structure
//! - `client`: octocrab-backed client with per-request timeouts
//! - `queries`: GraphQL query text
//! - `types`: typed response shapes mirroring the query

pub mod client;
pub mod queries;
pub mod types;

pub use client::GithubClient;
pub use types::{RepoArtifactsResponse, RepoFetch};
