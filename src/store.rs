//! Storage layer
//!
//! DuckDB-based persistence for fetch batches. Tables are written in three
//! naming tiers: `raw_*` (complete nested batches), plain entity names
//! (normalized rows with foreign keys), and `agg_*` (derived tables and
//! views owned by the SQL models in `analyze`).
//!
//! # Module Structure
//! - `database`: store handle and lifecycle (open, checkpoint, close)
//! - `extensions`: optional engine capability registry
//! - `materialize`: per-table materialization including the zero-row path
//! - `writer`: batch orchestration (raw load, extraction, export)

pub mod database;
pub mod extensions;
pub mod materialize;
pub mod writer;

pub use database::Store;
pub use writer::{write_batch, WriteReport};
