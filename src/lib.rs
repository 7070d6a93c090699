//! chainscan - GitHub supply-chain security artifact collector and analyzer
//!
//! Fetches repository release/workflow data over the GitHub GraphQL API,
//! persists raw and normalized tables into an embedded DuckDB database, and
//! runs layered SQL models to detect supply-chain security patterns (SBOMs,
//! signatures, attestations, CI tooling) across many repositories.
//!
//! Tables fall into three naming tiers so provenance is readable from the
//! name alone:
//!
//! - `raw_*`: complete fetch batches, nesting preserved (audit/debug tier)
//! - plain names (`repositories`, `releases`, ...): normalized entity tier
//! - `agg_*`: derived tables and views rebuilt by the SQL models

pub mod analyze;
pub mod collector;
pub mod config;
pub mod error;
pub mod extract;
pub mod github;
pub mod logging;
pub mod store;
pub mod targets;
