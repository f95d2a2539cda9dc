//! Scraping capability consumed by the runner
//!
//! The browser automation that logs into the target site, selects result
//! tabs, saves batches to a list and scrapes records is supplied by the
//! embedding application through the [`Scraper`] trait. This module defines
//! that seam and the values that cross it.

mod traits;
mod types;

pub use traits::{Login, Scraper};
pub use types::{BrowserOptions, CreditInfo, Lead, ScrapeError, Tab};
