//! The body of one job: login, save loop and export

use crate::config::RunnerConfig;
use crate::runner::quota::QuotaController;
use crate::runner::JobOutcome;
use crate::scraper::{ScrapeError, Scraper};
use crate::state::Job;
use crate::storage::ProgressStore;
use crate::{Result, RotorError};
use chrono::Utc;
use std::future::Future;
use std::time::Duration;

/// Transient failure budget shared by every login of one job run
struct Retries {
    max: u32,
    failures: u32,
}

impl Retries {
    fn new(max: u32) -> Self {
        Self { max, failures: 0 }
    }

    /// Records a failure; returns the error to give up with once the ceiling is hit
    fn record(&mut self, account: &str, error: ScrapeError) -> Option<RotorError> {
        self.failures += 1;
        if self.failures >= self.max {
            return Some(RotorError::RetriesExhausted {
                attempts: self.failures,
                last: error,
            });
        }
        tracing::warn!(
            account,
            "Attempt {}/{} failed: {}",
            self.failures,
            self.max,
            error
        );
        None
    }
}

/// Runs one scraping action, failing it with [`ScrapeError::Timeout`] once `timeout` passes
async fn bounded<T, F>(timeout: Duration, action: &str, call: F) -> std::result::Result<T, ScrapeError>
where
    F: Future<Output = std::result::Result<T, ScrapeError>>,
{
    match tokio::time::timeout(timeout, call).await {
        Ok(result) => result,
        Err(_) => Err(ScrapeError::Timeout(format!(
            "{} did not finish within {:?}",
            action, timeout
        ))),
    }
}

/// Runs jobs against a scraper
pub(crate) struct JobExecutor<'a, S: Scraper> {
    pub scraper: &'a mut S,
    pub store: &'a mut dyn ProgressStore,
    pub quota: &'a QuotaController,
    pub config: &'a RunnerConfig,
}

impl<'a, S: Scraper> JobExecutor<'a, S> {
    /// Runs a job until it reaches an outcome or exhausts its retries
    ///
    /// Setup failures (login, tab selection, quota lookup) start a fresh
    /// login; failed saves are retried inside the same session. Both count
    /// against the same retry ceiling.
    pub async fn run(&mut self, job: &mut Job) -> Result<JobOutcome> {
        let mut retries = Retries::new(self.config.max_retries);

        loop {
            match self.attempt(job, &mut retries).await {
                Ok(outcome) => return Ok(outcome),
                Err(RotorError::Scrape(error)) => {
                    if let Some(exhausted) = retries.record(job.email(), error) {
                        return Err(exhausted);
                    }
                }
                Err(e) => return Err(e),
            }
        }
    }

    /// One login session
    async fn attempt(&mut self, job: &mut Job, retries: &mut Retries) -> Result<JobOutcome> {
        let options = self.config.browser_options();
        let timeout = options.action_timeout;
        let login = match bounded(timeout, "login", self.scraper.login(&job.account, &options)).await {
            Ok(login) => login,
            Err(ScrapeError::SecurityChallenge(reason)) => {
                return Ok(JobOutcome::SecurityChallenge(reason))
            }
            Err(e) => return Err(e.into()),
        };
        tracing::debug!(account = %job.email(), "Logged in");

        if !login.cookies.is_empty() {
            job.account.set_cookies(login.cookies);
        }

        let mut session = login.session;
        let result = self.work(&mut session, job, retries).await;

        if let Err(e) = bounded(timeout, "close", self.scraper.close(session)).await {
            tracing::warn!(account = %job.email(), "Failed to close session: {}", e);
        }

        result
    }

    async fn work(
        &mut self,
        session: &mut S::Session,
        job: &mut Job,
        retries: &mut Retries,
    ) -> Result<JobOutcome> {
        let timeout = self.config.timeout();

        if self.config.fetch_credits {
            let info = bounded(timeout, "fetch quota", self.scraper.fetch_quota(session)).await?;
            tracing::info!(
                account = %job.email(),
                "{} credits left, refresh at {:?}",
                info.credits,
                info.refresh_at
            );
            job.account.credits = info.credits;
            job.account.credit_refresh = info.refresh_at;
        }

        job.open_window(Utc::now());
        bounded(timeout, "select tab", self.scraper.select_tab(session, self.config.tab)).await?;

        loop {
            let now = Utc::now();

            if job.account.is_done() {
                return self.export(session, job, retries).await;
            }

            if self.quota.is_done_for_today(job, now) {
                return Ok(JobOutcome::DailyLimit);
            }
            job.open_window(now);

            if !self.quota.can_scrape(&job.account, now) {
                return Ok(JobOutcome::NoCredits);
            }

            let saved = bounded(
                timeout,
                "save batch",
                self.scraper.save_batch(session, &job.account.list),
            )
            .await;

            match saved {
                Ok(0) => {
                    let error = ScrapeError::Other("no records were saved".to_string());
                    if let Some(exhausted) = retries.record(job.email(), error) {
                        return Err(exhausted);
                    }
                }
                Ok(count) => {
                    self.quota.record_save(job, count);
                    tracing::info!(
                        account = %job.email(),
                        list = %job.account.list,
                        saved = job.account.saved,
                        "Saved {} records ({} today)",
                        count,
                        job.saved_today
                    );
                }
                Err(ScrapeError::ListEnd) => {
                    tracing::info!(account = %job.email(), "Reached end of source list");
                    job.account.mark_done();
                }
                Err(ScrapeError::SecurityChallenge(reason)) => {
                    return Ok(JobOutcome::SecurityChallenge(reason));
                }
                Err(e) => {
                    if let Some(exhausted) = retries.record(job.email(), e) {
                        return Err(exhausted);
                    }
                }
            }
        }
    }

    /// Scrapes the account's records and appends them to its list file
    async fn export(
        &mut self,
        session: &mut S::Session,
        job: &mut Job,
        retries: &mut Retries,
    ) -> Result<JobOutcome> {
        let timeout = self.config.timeout();
        let mut exported = 0usize;

        loop {
            let scraped = bounded(
                timeout,
                "scrape batch",
                self.scraper.scrape_batch(session, self.config.tab),
            )
            .await;

            match scraped {
                Ok(leads) if leads.is_empty() => break,
                Ok(leads) => {
                    self.store.write_leads(&job.account.list, &leads)?;
                    exported += leads.len();
                }
                Err(ScrapeError::ListEnd) => break,
                Err(ScrapeError::SecurityChallenge(reason)) => {
                    return Ok(JobOutcome::SecurityChallenge(reason));
                }
                Err(e) => {
                    if let Some(exhausted) = retries.record(job.email(), e) {
                        return Err(exhausted);
                    }
                }
            }
        }

        tracing::info!(
            account = %job.email(),
            list = %job.account.list,
            "Exported {} records",
            exported
        );

        if job.account.saved >= job.account.target {
            Ok(JobOutcome::TargetReached)
        } else {
            Ok(JobOutcome::ListEnd)
        }
    }
}
