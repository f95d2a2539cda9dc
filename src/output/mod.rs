//! Output module for reporting run progress
//!
//! This module handles:
//! - Summarizing the progress checkpoint
//! - Printing per-account progress

pub mod stats;

pub use stats::{compute_statistics, print_statistics, AccountProgress, ProgressStatistics};
