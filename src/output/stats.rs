//! Statistics generation from the progress checkpoint
//!
//! This module provides functionality for summarizing account progress
//! recorded by previous runs.

use crate::state::Account;
use chrono::{DateTime, Utc};

/// Progress of one account
#[derive(Debug, Clone, PartialEq)]
pub struct AccountProgress {
    pub email: String,
    pub list: String,
    pub saved: u32,
    pub target: u32,
    pub credits: i64,

    /// Cooldown deadline, if still in the future
    pub cooldown: Option<DateTime<Utc>>,
}

/// Progress summary over every account
#[derive(Debug, Clone, PartialEq)]
pub struct ProgressStatistics {
    /// Number of accounts in the checkpoint
    pub total_accounts: usize,

    /// Sum of saves across accounts
    pub total_saved: u64,

    /// Sum of save targets across accounts
    pub total_target: u64,

    /// Accounts that reached their target
    pub accounts_done: usize,

    /// Accounts under an unexpired cooldown, with their deadlines
    pub cooling_down: Vec<(String, DateTime<Utc>)>,

    /// Accounts with no credits left
    pub out_of_credits: Vec<String>,

    /// Per-account rows, in checkpoint order
    pub accounts: Vec<AccountProgress>,
}

/// Computes statistics from a set of accounts
///
/// # Arguments
///
/// * `accounts` - Accounts as read from the progress checkpoint
/// * `now` - Reference time for deciding which cooldowns are active
pub fn compute_statistics(accounts: &[Account], now: DateTime<Utc>) -> ProgressStatistics {
    let mut cooling_down = Vec::new();
    let mut out_of_credits = Vec::new();
    let mut rows = Vec::with_capacity(accounts.len());

    for account in accounts {
        let cooldown = account.active_cooldown(now);
        if let Some(until) = cooldown {
            cooling_down.push((account.email.clone(), until));
        }
        if account.credits <= 0 {
            out_of_credits.push(account.email.clone());
        }
        rows.push(AccountProgress {
            email: account.email.clone(),
            list: account.list.clone(),
            saved: account.saved,
            target: account.target,
            credits: account.credits,
            cooldown,
        });
    }

    cooling_down.sort_by_key(|(_, until)| *until);

    ProgressStatistics {
        total_accounts: accounts.len(),
        total_saved: accounts.iter().map(|a| u64::from(a.saved)).sum(),
        total_target: accounts.iter().map(|a| u64::from(a.target)).sum(),
        accounts_done: accounts.iter().filter(|a| a.is_done()).count(),
        cooling_down,
        out_of_credits,
        accounts: rows,
    }
}

/// Prints statistics to stdout in a formatted manner
///
/// # Arguments
///
/// * `stats` - The statistics to display
pub fn print_statistics(stats: &ProgressStatistics) {
    println!("=== Scrape Progress ===\n");

    let percentage = if stats.total_target > 0 {
        (stats.total_saved as f64 / stats.total_target as f64) * 100.0
    } else {
        0.0
    };

    println!("Overview:");
    println!("  Accounts: {}", stats.total_accounts);
    println!(
        "  Saved: {} / {} ({:.1}%)",
        stats.total_saved, stats.total_target, percentage
    );
    println!(
        "  Done: {} / {}",
        stats.accounts_done, stats.total_accounts
    );
    println!();

    println!("Accounts:");
    for row in &stats.accounts {
        println!(
            "  {}: {} / {} saved to '{}', {} credits",
            row.email, row.saved, row.target, row.list, row.credits
        );
    }
    println!();

    if !stats.cooling_down.is_empty() {
        println!("Cooling Down ({}):", stats.cooling_down.len());
        for (email, until) in &stats.cooling_down {
            println!("  - {} until {}", email, until.format("%Y-%m-%d %H:%M UTC"));
        }
        println!();
    }

    if !stats.out_of_credits.is_empty() {
        println!("Out of Credits ({}):", stats.out_of_credits.len());
        for email in &stats.out_of_credits {
            println!("  - {}", email);
        }
    }
}
