//! Scrape-Rotor: quota-aware scrape job orchestration over rotating VPN tunnels
//!
//! This crate drives bulk data-collection sessions against rate-limited
//! accounts. Jobs are scheduled round-robin, each account's daily save window
//! and credit balance gate further work, and every job runs behind its own
//! OpenVPN tunnel configuration with failover to unused configurations.

pub mod config;
pub mod output;
pub mod runner;
pub mod scraper;
pub mod state;
pub mod storage;
pub mod vpn;

use thiserror::Error;

/// Main error type for Scrape-Rotor operations
#[derive(Debug, Error)]
pub enum RotorError {
    #[error("Configuration error: {0}")]
    Config(#[from] ConfigError),

    #[error("VPN error: {0}")]
    Vpn(#[from] vpn::VpnError),

    #[error("Scraping error: {0}")]
    Scrape(#[from] scraper::ScrapeError),

    #[error("Storage error: {0}")]
    Storage(#[from] storage::StorageError),

    #[error("Gave up after {attempts} attempts: {last}")]
    RetriesExhausted {
        attempts: u32,
        last: scraper::ScrapeError,
    },

    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
}

/// Configuration-specific errors
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("Failed to read config file: {0}")]
    Io(#[from] std::io::Error),

    #[error("Failed to parse TOML: {0}")]
    Parse(#[from] toml::de::Error),

    #[error("Validation error: {0}")]
    Validation(String),

    #[error("Invalid URL in config: {0}")]
    InvalidUrl(String),
}

/// Result type alias for Scrape-Rotor operations
pub type Result<T> = std::result::Result<T, RotorError>;

/// Result type alias for configuration operations
pub type ConfigResult<T> = std::result::Result<T, ConfigError>;

// Re-export commonly used types
pub use config::{Config, RunnerConfig};
pub use runner::{JobOutcome, RunReport, Runner};
pub use scraper::{Scraper, Tab};
pub use state::{Account, Job};
pub use vpn::VpnManager;
