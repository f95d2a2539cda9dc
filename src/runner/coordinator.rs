//! Runner - main scheduling loop
//!
//! This module ties the pieces together:
//! - Building the job queue from the accounts
//! - Assigning tunnel configurations and failing over when one will not start
//! - Running each job and acting on its outcome
//! - Checkpointing progress after every iteration

use crate::config::RunnerConfig;
use crate::runner::executor::JobExecutor;
use crate::runner::queue::JobQueue;
use crate::runner::quota::QuotaController;
use crate::runner::scheduler::Scheduler;
use crate::runner::{JobOutcome, RunReport};
use crate::scraper::Scraper;
use crate::state::{Account, Job};
use crate::storage::ProgressStore;
use crate::vpn::{VpnError, VpnManager};
use crate::Result;
use chrono::Utc;

/// Drives every job to completion
pub struct Runner<S: Scraper> {
    config: RunnerConfig,
    scraper: S,
    store: Box<dyn ProgressStore>,
    vpn: Option<VpnManager>,
    scheduler: Scheduler,
    quota: QuotaController,

    /// Jobs removed from the queue, kept for progress checkpoints
    retired: Vec<Job>,

    report: RunReport,
}

impl<S: Scraper> Runner<S> {
    /// Creates a runner
    ///
    /// # Arguments
    ///
    /// * `config` - Runner settings
    /// * `accounts` - Accounts to scrape, in round-robin order
    /// * `scraper` - Browser automation capability
    /// * `store` - Where progress and scraped records go
    /// * `vpn` - Tunnel pool; `None` runs without a tunnel
    pub fn new(
        config: RunnerConfig,
        accounts: Vec<Account>,
        scraper: S,
        store: Box<dyn ProgressStore>,
        mut vpn: Option<VpnManager>,
    ) -> Self {
        let (finished, pending): (Vec<Account>, Vec<Account>) =
            accounts.into_iter().partition(Account::is_done);
        for account in &finished {
            tracing::info!(
                account = %account.email,
                saved = account.saved,
                "Account already finished, not queueing"
            );
        }

        let mut queue = JobQueue::new(pending.into_iter().map(Job::new));

        if let Some(vpn) = vpn.as_mut() {
            vpn.assign_configs(queue.iter_mut().map(|job| &mut job.account));
        }

        let quota = QuotaController::new(config.daily_limit);

        Self {
            config,
            scraper,
            store,
            vpn,
            scheduler: Scheduler::new(queue),
            quota,
            retired: finished.into_iter().map(Job::new).collect(),
            report: RunReport::default(),
        }
    }

    /// Jobs still queued, front first
    pub fn jobs(&self) -> impl Iterator<Item = &Job> {
        self.scheduler.queue().iter()
    }

    /// Jobs removed from the queue, including accounts that were already finished
    pub fn retired(&self) -> &[Job] {
        &self.retired
    }

    pub fn scraper(&self) -> &S {
        &self.scraper
    }

    pub fn report(&self) -> &RunReport {
        &self.report
    }

    /// Runs until the queue is empty
    ///
    /// Job failures are logged and the job is rotated; only a tunnel that
    /// cannot be brought up on any configuration stops the run. The tunnel is
    /// stopped before returning either way.
    pub async fn run(&mut self) -> Result<RunReport> {
        tracing::info!("Starting run with {} jobs", self.scheduler.queue().len());

        let result = self.drain().await;
        self.shutdown_tunnel().await;
        result?;

        tracing::info!(
            "Run complete: {} completed, {} challenged, {} iterations",
            self.report.completed.len(),
            self.report.challenged.len(),
            self.report.iterations
        );

        Ok(self.report.clone())
    }

    async fn drain(&mut self) -> Result<()> {
        while self.step().await? {}
        Ok(())
    }

    /// Runs one scheduler iteration
    ///
    /// # Returns
    ///
    /// * `Ok(true)` - A job ran; there may be more work
    /// * `Ok(false)` - The queue is empty
    /// * `Err(RotorError::Vpn)` - No tunnel configuration could be brought up
    pub async fn step(&mut self) -> Result<bool> {
        let job = match self.scheduler.next_job().await {
            Some(job) => job,
            None => {
                tracing::info!("Job queue is empty");
                return Ok(false);
            }
        };

        self.report.iterations += 1;
        let email = job.email().to_string();
        tracing::info!(account = %email, saved = job.account.saved, "Starting job");

        if let Some(vpn) = self.vpn.as_mut() {
            if let Err(e) = connect(vpn, &mut job.account).await {
                self.save_progress();
                return Err(e);
            }
        }

        let mut executor = JobExecutor {
            scraper: &mut self.scraper,
            store: self.store.as_mut(),
            quota: &self.quota,
            config: &self.config,
        };
        let result = executor.run(job).await;

        match result {
            Ok(JobOutcome::DailyLimit) => {
                let now = Utc::now();
                self.quota.mark_daily_limit_hit(&mut job.account, now);
                tracing::warn!(
                    account = %email,
                    until = ?job.account.timeout,
                    "Daily limit of {} reached",
                    self.quota.daily_limit()
                );
                self.scheduler.rotate();
            }
            Ok(JobOutcome::NoCredits) => {
                tracing::warn!(
                    account = %email,
                    refresh = ?job.account.credit_refresh,
                    "No credits left"
                );
                self.scheduler.rotate();
            }
            Ok(outcome @ (JobOutcome::TargetReached | JobOutcome::ListEnd)) => {
                if outcome == JobOutcome::ListEnd {
                    // The source has nothing more; record that in the checkpoint
                    job.account.target = job.account.saved;
                }
                tracing::info!(account = %email, saved = job.account.saved, "Job finished: {}", outcome);
                self.retire();
                self.report.completed.push(email);
            }
            Ok(JobOutcome::SecurityChallenge(reason)) => {
                tracing::error!(
                    account = %email,
                    "Security challenge, retiring job: {}",
                    reason
                );
                self.retire();
                self.report.challenged.push(email);
            }
            Err(e) => {
                tracing::error!(account = %email, "Job failed: {}", e);
                self.scheduler.rotate();
            }
        }

        self.save_progress();
        Ok(true)
    }

    fn retire(&mut self) {
        if let Some(job) = self.scheduler.retire() {
            self.retired.push(job);
        }
    }

    /// Checkpoints every account; failures are logged and ignored
    fn save_progress(&mut self) {
        let accounts: Vec<&Account> = self
            .scheduler
            .queue()
            .iter()
            .chain(self.retired.iter())
            .map(|job| &job.account)
            .collect();

        if let Err(e) = self.store.save_progress(&accounts) {
            tracing::warn!("Failed to save progress: {}", e);
        }
    }

    async fn shutdown_tunnel(&mut self) {
        if let Some(vpn) = self.vpn.as_mut() {
            match vpn.stop().await {
                Ok(()) | Err(VpnError::NoProcess) => {}
                Err(e) => tracing::warn!("Failed to stop tunnel: {}", e),
            }
        }
    }
}

/// Brings up the account's tunnel, substituting a backup configuration on failure
async fn connect(vpn: &mut VpnManager, account: &mut Account) -> Result<()> {
    if !account.vpn_config.is_empty() {
        match vpn.restart(&account.vpn_config).await {
            Ok(()) => return Ok(()),
            Err(e) => {
                tracing::warn!(
                    account = %account.email,
                    config = %account.vpn_config,
                    "Tunnel failed, trying a backup config: {}",
                    e
                );
            }
        }
    }

    let id = vpn.backup().await?;
    tracing::info!(account = %account.email, config = %id, "Switched to backup VPN config");
    account.vpn_config = id;
    Ok(())
}
