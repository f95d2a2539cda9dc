//! Daily save window and credit budget checks

use crate::state::{Account, Job};
use chrono::{DateTime, Duration, Utc};

/// Length of a save window and of a daily-limit cooldown
pub const WINDOW_HOURS: i64 = 24;

/// Gates scraping on the rolling daily save count and the credit balance
#[derive(Debug, Clone, Copy)]
pub struct QuotaController {
    daily_limit: u32,
}

impl QuotaController {
    pub fn new(daily_limit: u32) -> Self {
        Self { daily_limit }
    }

    pub fn daily_limit(&self) -> u32 {
        self.daily_limit
    }

    /// Checks whether the job has used up its current save window
    ///
    /// A window that hit the limit is reset when reported, so the next check
    /// after the cooldown starts fresh. A window that has fully elapsed is
    /// also reset.
    ///
    /// # Arguments
    ///
    /// * `job` - The job to check; its window may be reset
    /// * `now` - Current time
    ///
    /// # Returns
    ///
    /// `true` if the daily limit was reached inside the open window
    pub fn is_done_for_today(&self, job: &mut Job, now: DateTime<Utc>) -> bool {
        let started_at = match job.started_at {
            Some(started_at) => started_at,
            None => return false,
        };

        if now < started_at + Duration::hours(WINDOW_HOURS) {
            if job.saved_today >= self.daily_limit {
                job.reset_window();
                return true;
            }
        } else {
            job.reset_window();
        }

        false
    }

    /// Returns true while the account has credits, or once its credits are due to refresh
    pub fn can_scrape(&self, account: &Account, now: DateTime<Utc>) -> bool {
        account.credits > 0 || account.credit_refresh.map_or(false, |at| now >= at)
    }

    /// Books `count` saves against the job and its account
    pub fn record_save(&self, job: &mut Job, count: u32) {
        job.account.increment_saved(count);
        job.account.use_credits(count);
        job.saved_today = job.saved_today.saturating_add(count);
    }

    /// Puts the account on a full-day cooldown
    pub fn mark_daily_limit_hit(&self, account: &mut Account, now: DateTime<Utc>) {
        account.timeout = Some(now + Duration::hours(WINDOW_HOURS));
    }
}
