//! Scraper trait definition

use crate::scraper::types::{BrowserOptions, CreditInfo, Lead, ScrapeError, Tab};
use crate::state::{Account, Cookie};
use async_trait::async_trait;

/// Result of a successful login
#[derive(Debug)]
pub struct Login<S> {
    /// Handle to the logged-in browsing session
    pub session: S,

    /// Cookies worth keeping for the next login of the same account
    pub cookies: Vec<Cookie>,
}

/// Browser automation capability driven by the runner
///
/// Every method receives the session produced by [`Scraper::login`]. Two
/// errors carry scheduling meaning: [`ScrapeError::ListEnd`] reports that the
/// upstream source is exhausted and [`ScrapeError::SecurityChallenge`] that
/// the site demands interactive verification.
#[async_trait]
pub trait Scraper: Send {
    /// Per-login session state
    type Session: Send;

    /// Logs into the account's target site
    ///
    /// The runner also bounds every call by `options.action_timeout` and
    /// treats an overrun as [`ScrapeError::Timeout`].
    async fn login(
        &mut self,
        account: &Account,
        options: &BrowserOptions,
    ) -> Result<Login<Self::Session>, ScrapeError>;

    /// Switches the result view to the given tab
    async fn select_tab(&mut self, session: &mut Self::Session, tab: Tab)
        -> Result<(), ScrapeError>;

    /// Reads the remaining credit balance and its refresh time
    async fn fetch_quota(&mut self, session: &mut Self::Session)
        -> Result<CreditInfo, ScrapeError>;

    /// Saves the current page of results into `list`, returning how many were saved
    async fn save_batch(
        &mut self,
        session: &mut Self::Session,
        list: &str,
    ) -> Result<u32, ScrapeError>;

    /// Scrapes the next page of records from `tab`
    async fn scrape_batch(
        &mut self,
        session: &mut Self::Session,
        tab: Tab,
    ) -> Result<Vec<Lead>, ScrapeError>;

    /// Releases the session
    async fn close(&mut self, _session: Self::Session) -> Result<(), ScrapeError> {
        Ok(())
    }
}
