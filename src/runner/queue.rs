//! Round-robin job queue

use crate::state::Job;
use std::collections::{HashSet, VecDeque};

/// Ordered jobs; the front is the next job to examine
#[derive(Debug, Default)]
pub struct JobQueue {
    jobs: VecDeque<Job>,
}

impl JobQueue {
    /// Builds a queue in input order, dropping repeated accounts
    pub fn new(jobs: impl IntoIterator<Item = Job>) -> Self {
        let mut seen = HashSet::new();
        let mut queue = VecDeque::new();

        for job in jobs {
            if seen.insert(job.email().to_string()) {
                queue.push_back(job);
            } else {
                tracing::warn!(account = %job.email(), "Dropping duplicate job");
            }
        }

        Self { jobs: queue }
    }

    pub fn len(&self) -> usize {
        self.jobs.len()
    }

    pub fn is_empty(&self) -> bool {
        self.jobs.is_empty()
    }

    pub fn front(&self) -> Option<&Job> {
        self.jobs.front()
    }

    pub fn front_mut(&mut self) -> Option<&mut Job> {
        self.jobs.front_mut()
    }

    /// Moves the front job to the back
    pub fn rotate(&mut self) {
        if let Some(job) = self.jobs.pop_front() {
            self.jobs.push_back(job);
        }
    }

    /// Removes and returns the front job
    pub fn remove_front(&mut self) -> Option<Job> {
        self.jobs.pop_front()
    }

    pub fn iter(&self) -> impl Iterator<Item = &Job> {
        self.jobs.iter()
    }

    pub fn iter_mut(&mut self) -> impl Iterator<Item = &mut Job> {
        self.jobs.iter_mut()
    }

    /// Orders jobs by cooldown deadline, earliest first
    ///
    /// Jobs without a cooldown sort ahead of all others. The sort is stable so
    /// equal deadlines keep their round-robin order.
    pub fn sort_by_cooldown(&mut self) {
        self.jobs
            .make_contiguous()
            .sort_by_key(|job| job.account.timeout);
    }
}
