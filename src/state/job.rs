use crate::state::Account;
use chrono::{DateTime, Utc};

/// The unit of scheduling: one account plus its daily save window
#[derive(Debug, Clone, PartialEq)]
pub struct Job {
    pub account: Account,

    /// Start of the current 24 hour save window
    pub started_at: Option<DateTime<Utc>>,

    /// Saves made inside the current window
    pub saved_today: u32,
}

impl Job {
    /// Wraps an account, filling in its list name if blank
    pub fn new(mut account: Account) -> Self {
        account.ensure_list();
        Self {
            account,
            started_at: None,
            saved_today: 0,
        }
    }

    /// Opens the save window unless one is already open
    pub fn open_window(&mut self, now: DateTime<Utc>) {
        if self.started_at.is_none() {
            self.started_at = Some(now);
        }
    }

    /// Closes the save window and forgets its count
    pub fn reset_window(&mut self) {
        self.started_at = None;
        self.saved_today = 0;
    }

    pub fn email(&self) -> &str {
        &self.account.email
    }
}
