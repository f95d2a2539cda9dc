//! Storage traits and error types
//!
//! This module defines the trait interface the runner uses to checkpoint
//! progress and write scraped records, and the associated error types.

use crate::scraper::Lead;
use crate::state::Account;
use thiserror::Error;

/// Errors that can occur during storage operations
#[derive(Debug, Error)]
pub enum StorageError {
    #[error("Unsupported file format: '{0}'")]
    UnsupportedFormat(String),

    #[error("CSV error: {0}")]
    Csv(#[from] csv::Error),

    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Result type for storage operations
pub type StorageResult<T> = Result<T, StorageError>;

/// Trait for persistence backends used during a run
///
/// Checkpoint failures are tolerated by the runner; lead writes are not.
pub trait ProgressStore: Send {
    /// Writes the progress of every account, queued or retired
    fn save_progress(&mut self, accounts: &[&Account]) -> StorageResult<()>;

    /// Appends scraped records to the file backing `list`
    fn write_leads(&mut self, list: &str, leads: &[Lead]) -> StorageResult<()>;
}
