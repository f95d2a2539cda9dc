//! Storage module for persisting run data
//!
//! This module handles all file operations for the runner, including:
//! - Reading and writing account records as CSV or JSON
//! - Appending scraped records to per-list output files
//! - Checkpointing account progress and login cookies between runs

mod file;
mod leads;
mod records;
mod traits;

pub use file::{
    attach_cookies, load_accounts, load_cookies, progress_path, save_cookies, CookieJar, FileStore,
    COOKIES_FILE_NAME, PROGRESS_FILE_STEM,
};
pub use leads::LeadWriter;
pub use records::{read_records, save_records, FileFormat};
pub use traits::{ProgressStore, StorageError, StorageResult};
