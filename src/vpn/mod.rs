//! OpenVPN tunnel control
//!
//! This module handles:
//! - Driving a single tunnel process through start/stop/restart
//! - Discovering the pool of tunnel configurations
//! - Failing over to unused configurations when a tunnel will not come up

mod manager;
mod session;

pub use manager::VpnManager;
pub use session::{Tunnel, TunnelHandle, SUCCESS_MARKER};

use std::path::PathBuf;
use thiserror::Error;

/// Errors raised while managing tunnels
#[derive(Debug, Error)]
pub enum VpnError {
    #[error("VPN config not found: {0}")]
    ConfigNotFound(String),

    #[error("No VPN configs found in {}", .0.display())]
    ConfigsNotFound(PathBuf),

    #[error("No unused VPN configs left")]
    NoUnusedConfigs,

    #[error("No VPN process running")]
    NoProcess,

    #[error("Timed out waiting for tunnel: {output}")]
    Timeout { output: String },

    #[error("Tunnel process failed\nstdout: {stdout}\nstderr: {stderr}")]
    ProcessFailure { stdout: String, stderr: String },

    #[error("Failed to launch tunnel process: {0}")]
    Spawn(#[source] std::io::Error),

    #[error("Failed to stop tunnel: {0}")]
    Stop(String),
}

/// Result type alias for tunnel operations
pub type VpnResult<T> = std::result::Result<T, VpnError>;
