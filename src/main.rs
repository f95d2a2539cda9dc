//! Scrape-Rotor main entry point
//!
//! This is the command-line interface for the Scrape-Rotor job orchestrator.

use anyhow::{bail, Context};
use chrono::Utc;
use clap::Parser;
use scrape_rotor::config::{load_config_with_hash, validate_accounts, Config};
use scrape_rotor::output::{compute_statistics, print_statistics};
use scrape_rotor::state::Account;
use scrape_rotor::storage::{attach_cookies, load_accounts, load_cookies, progress_path};
use scrape_rotor::VpnManager;
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

/// Scrape-Rotor: quota-aware scrape job orchestration
///
/// Scrape-Rotor schedules scrape accounts round-robin, respects their daily
/// save limits and credit budgets, and runs each job behind its own OpenVPN
/// configuration with failover to unused ones.
#[derive(Parser, Debug)]
#[command(name = "scrape-rotor")]
#[command(version = "1.0.0")]
#[command(about = "Quota-aware scrape job orchestration over rotating VPN tunnels", long_about = None)]
struct Cli {
    /// Path to TOML configuration file
    #[arg(value_name = "CONFIG")]
    config: PathBuf,

    /// Accounts file (.csv or .json)
    #[arg(short, long, value_name = "FILE", required_unless_present_any = ["stats", "check_vpn"])]
    accounts: Option<PathBuf>,

    /// Increase logging verbosity (-v, -vv, -vvv)
    #[arg(short, long, action = clap::ArgAction::Count)]
    verbose: u8,

    /// Suppress non-error output
    #[arg(short, long, conflicts_with = "verbose")]
    quiet: bool,

    /// Validate config and accounts and show the job plan without running
    #[arg(long, conflicts_with_all = ["stats", "check_vpn"])]
    dry_run: bool,

    /// Show progress from the last checkpoint and exit
    #[arg(long, conflicts_with_all = ["dry_run", "check_vpn"])]
    stats: bool,

    /// Start and stop one VPN config to check that it connects
    #[arg(long, value_name = "ID", conflicts_with_all = ["dry_run", "stats"])]
    check_vpn: Option<String>,
}

#[tokio::main]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();

    // Setup logging based on verbosity
    setup_logging(cli.verbose, cli.quiet);

    tracing::info!("Loading configuration from: {}", cli.config.display());
    let (config, hash) = load_config_with_hash(&cli.config)
        .with_context(|| format!("failed to load {}", cli.config.display()))?;
    tracing::info!("Configuration loaded successfully (hash: {})", hash);

    if cli.stats {
        return handle_stats(&config);
    }

    if let Some(id) = &cli.check_vpn {
        return handle_check_vpn(&config, id).await;
    }

    let accounts_path = match &cli.accounts {
        Some(path) => path,
        None => bail!("--accounts is required"),
    };
    let accounts = prepare_accounts(&config, accounts_path)?;

    if cli.dry_run {
        handle_dry_run(&config, accounts)
    } else {
        handle_run(&config, &accounts)
    }
}

/// Sets up the logging/tracing subscriber based on verbosity level
fn setup_logging(verbose: u8, quiet: bool) {
    let filter = if quiet {
        // Only show errors
        EnvFilter::new("error")
    } else {
        match verbose {
            0 => EnvFilter::new("scrape_rotor=info,warn"),
            1 => EnvFilter::new("scrape_rotor=debug,info"),
            2 => EnvFilter::new("scrape_rotor=trace,debug"),
            _ => EnvFilter::new("trace"),
        }
    };

    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_target(false)
        .with_thread_ids(false)
        .with_file(false)
        .init();
}

/// Loads, validates and decorates the accounts input
fn prepare_accounts(config: &Config, path: &Path) -> anyhow::Result<Vec<Account>> {
    let mut accounts = load_accounts(path)
        .with_context(|| format!("failed to read accounts from {}", path.display()))?;
    validate_accounts(&accounts)?;
    tracing::info!("Loaded {} accounts", accounts.len());

    if let Some(cookie_file) = &config.output.cookie_file {
        let jar = load_cookies(cookie_file)
            .with_context(|| format!("failed to read cookies from {}", cookie_file.display()))?;
        let attached = attach_cookies(&mut accounts, &jar);
        tracing::info!("Preloaded cookies for {} accounts", attached);
    }

    for account in &mut accounts {
        account.ensure_list();
    }

    Ok(accounts)
}

/// Handles the --dry-run mode: validates everything and shows the job plan
fn handle_dry_run(config: &Config, mut accounts: Vec<Account>) -> anyhow::Result<()> {
    println!("=== Scrape-Rotor Dry Run ===\n");

    println!("Runner Configuration:");
    println!("  Daily limit: {}", config.runner.daily_limit);
    println!("  Action timeout: {}s", config.runner.timeout_secs);
    println!("  Max retries: {}", config.runner.max_retries);
    println!("  Tab: {}", config.runner.tab);
    println!("  Fetch credits: {}", config.runner.fetch_credits);
    println!("  Headless: {}", config.runner.headless);
    println!("  Stealth: {}", config.runner.stealth);

    println!("\nOutput:");
    println!("  Directory: {}", config.output.directory.display());
    println!("  Format: {}", config.output.format.extension());

    match &config.vpn {
        Some(vpn_config) => {
            let mut vpn = VpnManager::new(vpn_config)?;
            vpn.assign_configs(accounts.iter_mut());
            println!("\nVPN:");
            println!("  Configs: {}", vpn.configs().len());
            println!("  Command: {}", vpn_config.command.join(" "));
        }
        None => println!("\nVPN: disabled"),
    }

    println!("\nJobs ({}):", accounts.len());
    for account in &accounts {
        let vpn = if account.vpn_config.is_empty() {
            "-"
        } else {
            account.vpn_config.as_str()
        };
        println!(
            "  - {} -> '{}' ({} / {} saved, vpn {})",
            account.email, account.list, account.saved, account.target, vpn
        );
    }

    println!("\n✓ Configuration is valid");
    println!(
        "✓ Would run {} jobs",
        accounts.iter().filter(|a| !a.is_done()).count()
    );

    Ok(())
}

/// Handles the --stats mode: shows progress from the checkpoint
fn handle_stats(config: &Config) -> anyhow::Result<()> {
    let path = progress_path(&config.output.directory, config.output.format);
    println!("Progress file: {}\n", path.display());

    let accounts = load_accounts(&path)
        .with_context(|| format!("failed to read progress from {}", path.display()))?;
    let stats = compute_statistics(&accounts, Utc::now());
    print_statistics(&stats);

    Ok(())
}

/// Handles the --check-vpn mode: brings one config up and down again
async fn handle_check_vpn(config: &Config, id: &str) -> anyhow::Result<()> {
    let vpn_config = match &config.vpn {
        Some(vpn_config) => vpn_config,
        None => bail!("no [vpn] section in configuration"),
    };

    let mut vpn = VpnManager::new(vpn_config)?;
    println!("Starting VPN config '{}'...", id);
    vpn.start(id).await?;
    println!("✓ Tunnel is up");

    vpn.stop().await?;
    println!("✓ Tunnel stopped");

    Ok(())
}

/// Handles the default mode
///
/// The browser automation is supplied by an embedding application through
/// the `Scraper` trait, so the binary stops after validation.
fn handle_run(config: &Config, accounts: &[Account]) -> anyhow::Result<()> {
    if let Some(vpn_config) = &config.vpn {
        let vpn = VpnManager::new(vpn_config)?;
        tracing::info!("VPN pool has {} configs", vpn.configs().len());
    }

    tracing::info!(
        "{} accounts ready, {} unfinished",
        accounts.len(),
        accounts.iter().filter(|a| !a.is_done()).count()
    );

    bail!(
        "no scraper is built into this binary; embed scrape_rotor::Runner with a \
         Scraper implementation to run jobs (use --dry-run to inspect the plan)"
    )
}
