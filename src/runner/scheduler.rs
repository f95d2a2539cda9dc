//! Round-robin scheduling with cooldown awareness
//!
//! The scheduler examines the front of the queue:
//! - A job on cooldown is rotated to the back so ready jobs run first
//! - Once every job has been examined and all are cooling down, the queue is
//!   sorted by deadline and the scheduler sleeps until the earliest one passes
//! - Otherwise the front job is handed out to run

use crate::runner::queue::JobQueue;
use crate::state::Job;
use chrono::{DateTime, Utc};

/// Picks the next job to run from a [`JobQueue`]
#[derive(Debug)]
pub struct Scheduler {
    queue: JobQueue,

    /// Consecutive cooling-down jobs examined since a job last ran
    skipped: usize,
}

impl Scheduler {
    pub fn new(queue: JobQueue) -> Self {
        Self { queue, skipped: 0 }
    }

    pub fn queue(&self) -> &JobQueue {
        &self.queue
    }

    /// Waits for the next runnable job
    ///
    /// # Returns
    ///
    /// * `Some(&mut Job)` - The front job, ready to run
    /// * `None` - The queue is empty
    pub async fn next_job(&mut self) -> Option<&mut Job> {
        loop {
            let now = Utc::now();

            let cooldown = {
                let job = self.queue.front_mut()?;
                if job.account.clear_expired_cooldown(now) {
                    tracing::debug!(account = %job.email(), "Cooldown expired");
                }
                job.account.active_cooldown(now)
            };

            let until = match cooldown {
                Some(until) => until,
                None => {
                    self.skipped = 0;
                    return self.queue.front_mut();
                }
            };

            self.skipped += 1;
            if self.skipped < self.queue.len() {
                if let Some(job) = self.queue.front() {
                    tracing::trace!(account = %job.email(), until = %until, "Skipping job on cooldown");
                }
                self.queue.rotate();
                continue;
            }

            self.queue.sort_by_cooldown();
            let earliest = self
                .queue
                .front()
                .and_then(|job| job.account.timeout)
                .unwrap_or(until);
            self.sleep_until(earliest, now).await;
            self.skipped = 0;
        }
    }

    /// Moves the front job to the back of the queue
    pub fn rotate(&mut self) {
        self.skipped = 0;
        self.queue.rotate();
    }

    /// Removes the front job from the queue
    pub fn retire(&mut self) -> Option<Job> {
        self.skipped = 0;
        self.queue.remove_front()
    }

    async fn sleep_until(&self, until: DateTime<Utc>, now: DateTime<Utc>) {
        let wait = (until - now).to_std().unwrap_or_default();
        tracing::info!(
            until = %until,
            "All {} jobs are cooling down, sleeping for {:?}",
            self.queue.len(),
            wait
        );
        tokio::time::sleep(wait).await;
    }
}
