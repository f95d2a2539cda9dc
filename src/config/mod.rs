//! Configuration module for Scrape-Rotor
//!
//! This module handles loading, parsing, and validating TOML configuration files.
//!
//! # Example
//!
//! ```no_run
//! use scrape_rotor::config::load_config;
//! use std::path::Path;
//!
//! let config = load_config(Path::new("rotor.toml")).unwrap();
//! println!("Jobs stop after {} saves per day", config.runner.daily_limit);
//! ```

mod parser;
mod types;
mod validation;

// Re-export types
pub use types::{Config, OutputConfig, RunnerConfig, VpnConfig};

// Re-export parser functions
pub use parser::{compute_config_hash, load_config, load_config_with_hash, parse_config};

pub use validation::validate_accounts;
