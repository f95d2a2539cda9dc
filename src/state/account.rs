use crate::state::timestamp;
use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};

/// Prefix for list names generated for accounts that do not name one
pub const DEFAULT_LIST_PREFIX: &str = "scrape-rotor-run-";

/// A browser cookie captured after login
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Cookie {
    pub name: String,
    pub value: String,
    #[serde(default)]
    pub domain: String,
    #[serde(default)]
    pub path: String,
    /// Expiry as seconds since the Unix epoch; absent or zero for session cookies
    #[serde(default)]
    pub expires: Option<f64>,
}

impl Cookie {
    /// Returns true if the cookie carries a real expiry that has passed
    pub fn is_expired(&self, now: DateTime<Utc>) -> bool {
        match self.expires {
            Some(expires) if expires > 0.0 => (now.timestamp() as f64) > expires,
            _ => false,
        }
    }
}

/// A scrape account together with its scrape progress
///
/// Accounts are read from and written back to CSV or JSON files, so field
/// names match the columns of those files.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Account {
    pub email: String,
    pub password: String,
    #[serde(default)]
    pub list: String,
    pub url: String,

    /// Tunnel configuration identifier; stable unless a backup replaces it
    #[serde(default, rename = "vpn")]
    pub vpn_config: String,

    /// Remaining scrape budget
    #[serde(default)]
    pub credits: i64,

    /// When the credit budget replenishes
    #[serde(default, rename = "credit-refresh", with = "timestamp::optional")]
    pub credit_refresh: Option<DateTime<Utc>>,

    /// Cooldown deadline; the account must not be scraped before it
    #[serde(default, with = "timestamp::optional")]
    pub timeout: Option<DateTime<Utc>>,

    #[serde(default)]
    pub target: u32,

    /// Cumulative saves; never decreases
    #[serde(default)]
    pub saved: u32,

    #[serde(skip)]
    done: bool,

    #[serde(skip)]
    cookies: Vec<Cookie>,
}

impl Account {
    /// Creates an account with no progress recorded
    pub fn new(
        email: impl Into<String>,
        password: impl Into<String>,
        url: impl Into<String>,
        target: u32,
    ) -> Self {
        Self {
            email: email.into(),
            password: password.into(),
            list: String::new(),
            url: url.into(),
            vpn_config: String::new(),
            credits: 0,
            credit_refresh: None,
            timeout: None,
            target,
            saved: 0,
            done: false,
            cookies: Vec::new(),
        }
    }

    /// Returns true once the save target is met or the source ran dry
    pub fn is_done(&self) -> bool {
        self.saved >= self.target || self.done
    }

    /// Marks the account finished regardless of its target
    pub fn mark_done(&mut self) {
        self.done = true;
    }

    /// Increases the cumulative save count
    pub fn increment_saved(&mut self, amount: u32) {
        self.saved = self.saved.saturating_add(amount);
    }

    /// Spends credits; the balance may go negative when the site over-delivers
    pub fn use_credits(&mut self, amount: u32) {
        self.credits -= i64::from(amount);
    }

    /// Returns the cooldown deadline if it is still in the future
    pub fn active_cooldown(&self, now: DateTime<Utc>) -> Option<DateTime<Utc>> {
        self.timeout.filter(|deadline| *deadline > now)
    }

    /// Returns true if the account is under an unexpired cooldown
    pub fn is_cooling_down(&self, now: DateTime<Utc>) -> bool {
        self.active_cooldown(now).is_some()
    }

    /// Clears a cooldown whose deadline has passed
    ///
    /// Returns true if a cooldown was cleared.
    pub fn clear_expired_cooldown(&mut self, now: DateTime<Utc>) -> bool {
        match self.timeout {
            Some(deadline) if deadline <= now => {
                self.timeout = None;
                true
            }
            _ => false,
        }
    }

    /// Fills in the list name when the account file left it blank
    pub fn ensure_list(&mut self) {
        if self.list.is_empty() {
            self.list = format!("{}{}", DEFAULT_LIST_PREFIX, self.email.replace('@', "_"));
        }
    }

    pub fn cookies(&self) -> &[Cookie] {
        &self.cookies
    }

    pub fn set_cookies(&mut self, cookies: Vec<Cookie>) {
        self.cookies = cookies;
    }

    /// Returns true if stored cookies can be reused for login
    pub fn has_valid_cookies(&self, now: DateTime<Utc>) -> bool {
        !self.cookies.is_empty() && !self.cookies.iter().any(|c| c.is_expired(now))
    }
}
