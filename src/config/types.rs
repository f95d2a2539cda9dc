use crate::scraper::{BrowserOptions, Tab};
use crate::storage::FileFormat;
use serde::Deserialize;
use std::path::PathBuf;
use std::time::Duration;

/// Main configuration structure for Scrape-Rotor
#[derive(Debug, Clone, Deserialize)]
pub struct Config {
    #[serde(default)]
    pub runner: RunnerConfig,
    #[serde(default)]
    pub output: OutputConfig,
    /// Absent when jobs should run without a tunnel
    #[serde(default)]
    pub vpn: Option<VpnConfig>,
}

/// Job execution behavior
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct RunnerConfig {
    /// Maximum number of saves per job within a 24 hour window
    #[serde(default = "default_daily_limit")]
    pub daily_limit: u32,

    /// Time limit handed to the scraping capability for each action (seconds)
    #[serde(default = "default_timeout_secs")]
    pub timeout_secs: u64,

    /// Transient failures tolerated within one job attempt
    #[serde(default = "default_max_retries")]
    pub max_retries: u32,

    /// Result tab the scraping capability selects after login
    #[serde(default)]
    pub tab: Tab,

    /// Refresh the credit balance after every login
    #[serde(default)]
    pub fetch_credits: bool,

    #[serde(default = "default_true")]
    pub headless: bool,

    #[serde(default)]
    pub stealth: bool,
}

impl RunnerConfig {
    /// Per-action timeout as a [`Duration`]
    pub fn timeout(&self) -> Duration {
        Duration::from_secs(self.timeout_secs)
    }

    /// Browser settings passed to the scraping capability at login
    pub fn browser_options(&self) -> BrowserOptions {
        BrowserOptions {
            headless: self.headless,
            stealth: self.stealth,
            action_timeout: self.timeout(),
        }
    }
}

impl Default for RunnerConfig {
    fn default() -> Self {
        Self {
            daily_limit: default_daily_limit(),
            timeout_secs: default_timeout_secs(),
            max_retries: default_max_retries(),
            tab: Tab::default(),
            fetch_credits: false,
            headless: true,
            stealth: false,
        }
    }
}

/// Output configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct OutputConfig {
    /// Directory receiving lead files and progress checkpoints
    #[serde(default = "default_output_dir")]
    pub directory: PathBuf,

    /// Encoding used for lead files and the progress checkpoint
    #[serde(default)]
    pub format: FileFormat,

    /// JSON file mapping account emails to previously captured login cookies
    #[serde(default)]
    pub cookie_file: Option<PathBuf>,
}

impl Default for OutputConfig {
    fn default() -> Self {
        Self {
            directory: default_output_dir(),
            format: FileFormat::default(),
            cookie_file: None,
        }
    }
}

/// OpenVPN pool configuration
#[derive(Debug, Clone, Deserialize)]
#[serde(rename_all = "kebab-case")]
pub struct VpnConfig {
    /// Directory holding one OpenVPN configuration file per exit node
    pub configs_dir: PathBuf,

    /// File passed to `--auth-user-pass`
    pub auth_file: PathBuf,

    /// Program and leading arguments, e.g. `["sudo", "openvpn"]`
    #[serde(default = "default_vpn_command")]
    pub command: Vec<String>,

    /// Arguments appended after the config and auth flags
    #[serde(default)]
    pub extra_args: Vec<String>,

    /// Deadline for "Initialization Sequence Completed" (seconds)
    #[serde(default = "default_start_timeout_secs")]
    pub start_timeout_secs: u64,

    /// Wall-clock budget for one backup selection cycle (seconds)
    #[serde(default = "default_backup_budget_secs")]
    pub backup_budget_secs: u64,
}

impl VpnConfig {
    pub fn start_timeout(&self) -> Duration {
        Duration::from_secs(self.start_timeout_secs)
    }

    pub fn backup_budget(&self) -> Duration {
        Duration::from_secs(self.backup_budget_secs)
    }
}

fn default_daily_limit() -> u32 {
    500
}

fn default_timeout_secs() -> u64 {
    60
}

fn default_max_retries() -> u32 {
    5
}

fn default_true() -> bool {
    true
}

fn default_output_dir() -> PathBuf {
    PathBuf::from("./scrape-results")
}

fn default_vpn_command() -> Vec<String> {
    vec!["openvpn".to_string()]
}

fn default_start_timeout_secs() -> u64 {
    20
}

fn default_backup_budget_secs() -> u64 {
    60
}
