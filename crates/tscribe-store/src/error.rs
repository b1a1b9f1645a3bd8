//! Store error types.

use std::path::PathBuf;

use thiserror::Error;
use tscribe_models::TransitionError;

/// Result type for store operations.
pub type StoreResult<T> = Result<T, StoreError>;

/// Errors that can occur during store operations.
#[derive(Debug, Error)]
pub enum StoreError {
    #[error("SQLite error: {0}")]
    Sqlite(#[from] rusqlite::Error),

    #[error("IO error for path '{path}': {source}")]
    Io {
        path: PathBuf,
        #[source]
        source: std::io::Error,
    },

    #[error("Migration failed at version {version}: {reason}")]
    Migration { version: u32, reason: String },

    #[error("Database lock poisoned")]
    LockPoisoned,

    #[error("Blocking task failed: {0}")]
    Task(String),

    #[error("Corrupt row for job {id}: {reason}")]
    Corrupt { id: String, reason: String },

    #[error("Job not found: {0}")]
    NotFound(String),

    #[error("Job {0} was modified concurrently")]
    Conflict(String),

    #[error(transparent)]
    Transition(#[from] TransitionError),
}

impl StoreError {
    pub fn not_found(id: impl Into<String>) -> Self {
        Self::NotFound(id.into())
    }
}
