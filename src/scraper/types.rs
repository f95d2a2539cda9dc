use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::str::FromStr;
use std::time::Duration;
use thiserror::Error;

/// Errors reported by the scraping capability
#[derive(Debug, Error)]
pub enum ScrapeError {
    #[error("Reached end of list")]
    ListEnd,

    #[error("Security challenge: {0}")]
    SecurityChallenge(String),

    #[error("Login failed: {0}")]
    Login(String),

    #[error("Navigation failed: {0}")]
    Navigation(String),

    #[error("Timed out: {0}")]
    Timeout(String),

    #[error("{0}")]
    Other(String),
}

/// Result tab on the target site
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Serialize, Deserialize)]
pub enum Tab {
    /// Records not yet saved by the account
    #[default]
    #[serde(rename = "new")]
    NetNew,

    /// Records already saved by the account
    #[serde(rename = "saved")]
    Saved,

    /// Every record matching the search
    #[serde(rename = "total")]
    Total,
}

impl Tab {
    pub fn as_str(&self) -> &'static str {
        match self {
            Self::NetNew => "new",
            Self::Saved => "saved",
            Self::Total => "total",
        }
    }
}

impl fmt::Display for Tab {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(self.as_str())
    }
}

impl FromStr for Tab {
    type Err = String;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        match s {
            "new" => Ok(Self::NetNew),
            "saved" => Ok(Self::Saved),
            "total" => Ok(Self::Total),
            other => Err(format!(
                "unknown tab '{}', expected 'new', 'saved' or 'total'",
                other
            )),
        }
    }
}

/// Credit balance reported by the target site
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CreditInfo {
    pub credits: i64,
    pub refresh_at: Option<DateTime<Utc>>,
}

/// A scraped record
///
/// Multi-valued fields (emails, links) are joined with `"; "` so every
/// record stays a flat row.
#[derive(Debug, Clone, Default, PartialEq, Eq, Serialize, Deserialize)]
pub struct Lead {
    pub name: String,
    pub title: String,
    pub company: String,
    pub location: String,
    pub employees: String,
    pub phone: String,
    pub industry: String,
    pub keywords: String,
    pub email: String,
    pub links: String,
}

/// Browser settings handed to the capability at login
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BrowserOptions {
    /// Run the browser without a window
    pub headless: bool,

    /// Apply anti-bot-detection measures
    pub stealth: bool,

    /// Upper bound for any single page action
    pub action_timeout: Duration,
}
