//! Job orchestration
//!
//! This module handles:
//! - The round-robin job queue
//! - Daily save windows and credit budgets
//! - Cooldown-aware scheduling
//! - Running each job through the scraping capability
//! - The top-level run loop

mod coordinator;
mod executor;
mod queue;
mod quota;
mod scheduler;

pub use coordinator::Runner;
pub use queue::JobQueue;
pub use quota::{QuotaController, WINDOW_HOURS};
pub use scheduler::Scheduler;

use std::fmt;

/// How a job run ended
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum JobOutcome {
    /// The daily save limit was reached; the job cools down for a day
    DailyLimit,

    /// The account has no credits left
    NoCredits,

    /// The account saved its target
    TargetReached,

    /// The source list ran out before the target was reached
    ListEnd,

    /// The site demanded interactive verification
    SecurityChallenge(String),
}

impl JobOutcome {
    /// Returns true if the job leaves the queue
    pub fn is_terminal(&self) -> bool {
        matches!(
            self,
            JobOutcome::TargetReached | JobOutcome::ListEnd | JobOutcome::SecurityChallenge(_)
        )
    }
}

impl fmt::Display for JobOutcome {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            JobOutcome::DailyLimit => write!(f, "daily limit reached"),
            JobOutcome::NoCredits => write!(f, "no credits left"),
            JobOutcome::TargetReached => write!(f, "target reached"),
            JobOutcome::ListEnd => write!(f, "source list exhausted"),
            JobOutcome::SecurityChallenge(reason) => write!(f, "security challenge: {}", reason),
        }
    }
}

/// Summary of a finished run
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct RunReport {
    /// Accounts retired after reaching their target or the end of their list
    pub completed: Vec<String>,

    /// Accounts retired on a security challenge
    pub challenged: Vec<String>,

    /// Jobs run, including ones that rotated
    pub iterations: u64,
}
