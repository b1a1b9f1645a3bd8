//! Persistent job store.
//!
//! This crate provides:
//! - SQLite database handle with versioned migrations
//! - The `JobStore` trait and its SQLite implementation
//! - The dedup resolver used by job intake
//!
//! Uniqueness of live jobs per (video URL, model size) is enforced by a
//! partial unique index, not by callers.

pub mod db;
pub mod dedup;
pub mod error;
pub mod migrations;
pub mod repo;

pub use db::Database;
pub use dedup::{resolve_existing, DedupOutcome};
pub use error::{StoreError, StoreResult};
pub use repo::{CreateOutcome, JobPage, JobStore, NewJob, PageRequest, SqliteJobStore};
