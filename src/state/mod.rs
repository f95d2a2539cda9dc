//! State module for tracking scrape progress
//!
//! # Components
//!
//! - `Account`: a scrape account, its credit balance, cooldown and cumulative progress
//! - `Job`: an account plus the transient 24 hour save window used by the quota controller
//! - `Cookie`: login cookies carried between runs

mod account;
mod job;
pub mod timestamp;

// Re-export main types
pub use account::{Account, Cookie, DEFAULT_LIST_PREFIX};
pub use job::Job;
