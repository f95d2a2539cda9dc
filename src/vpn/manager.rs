//! Tunnel configuration pool and failover

use crate::config::VpnConfig;
use crate::state::Account;
use crate::vpn::session::{Tunnel, TunnelHandle};
use crate::vpn::{VpnError, VpnResult};
use rand::seq::SliceRandom;
use std::collections::HashSet;
use std::path::{Path, PathBuf};
use std::time::{Duration, Instant};

/// Owns the single active tunnel and the pool it is drawn from
///
/// Configuration identifiers are file names inside the configured
/// directory. The pool is discovered once; identifiers handed out to jobs are
/// tracked so that failover prefers configurations no other job is using.
#[derive(Debug)]
pub struct VpnManager {
    tunnel: Tunnel,
    configs_dir: PathBuf,
    auth_file: PathBuf,
    extra_args: Vec<String>,
    start_timeout: Duration,
    backup_budget: Duration,

    /// Discovered identifiers, sorted
    configs: Vec<String>,

    used: HashSet<String>,
    active: Option<TunnelHandle>,
    active_config: Option<String>,
}

impl VpnManager {
    /// Discovers the configuration pool
    ///
    /// # Returns
    ///
    /// * `Ok(VpnManager)` - At least one configuration file was found
    /// * `Err(VpnError::ConfigsNotFound)` - The directory is unreadable or has no files
    pub fn new(config: &VpnConfig) -> VpnResult<Self> {
        let configs = discover_configs(&config.configs_dir)?;

        tracing::info!(
            "Discovered {} VPN configs in {}",
            configs.len(),
            config.configs_dir.display()
        );

        Ok(Self {
            tunnel: Tunnel::new(config.command.clone()),
            configs_dir: config.configs_dir.clone(),
            auth_file: config.auth_file.clone(),
            extra_args: config.extra_args.clone(),
            start_timeout: config.start_timeout(),
            backup_budget: config.backup_budget(),
            configs,
            used: HashSet::new(),
            active: None,
            active_config: None,
        })
    }

    /// All discovered configuration identifiers
    pub fn configs(&self) -> &[String] {
        &self.configs
    }

    /// Identifier of the running tunnel, if any
    pub fn active_config(&self) -> Option<&str> {
        self.active_config.as_deref()
    }

    pub fn is_used(&self, id: &str) -> bool {
        self.used.contains(id)
    }

    /// Records that a job has been given this configuration
    pub fn mark_used(&mut self, id: &str) {
        self.used.insert(id.to_string());
    }

    /// Configurations no job has been given yet, in pool order
    pub fn unused_configs(&self) -> Vec<String> {
        self.configs
            .iter()
            .filter(|id| !self.used.contains(*id))
            .cloned()
            .collect()
    }

    /// Gives every account a configuration
    ///
    /// Configurations already named by an account are reserved first. Accounts
    /// without one receive a distinct unused configuration; once the pool is
    /// exhausted the remaining accounts share configurations in pool order.
    pub fn assign_configs<'a>(&mut self, accounts: impl IntoIterator<Item = &'a mut Account>) {
        let accounts: Vec<&mut Account> = accounts.into_iter().collect();

        for account in &accounts {
            if account.vpn_config.is_empty() {
                continue;
            }
            if self.contains(&account.vpn_config) {
                self.used.insert(account.vpn_config.clone());
            } else {
                tracing::warn!(
                    account = %account.email,
                    config = %account.vpn_config,
                    "account names a VPN config outside the pool"
                );
            }
        }

        let mut unused = self.unused_configs().into_iter();
        let mut shared = self.configs.iter().cycle();

        for account in accounts {
            if !account.vpn_config.is_empty() {
                continue;
            }
            let id = match unused.next() {
                Some(id) => id,
                None => match shared.next() {
                    Some(id) => id.clone(),
                    None => break,
                },
            };
            tracing::debug!(account = %account.email, config = %id, "assigned VPN config");
            self.used.insert(id.clone());
            account.vpn_config = id;
        }
    }

    /// Starts the tunnel for `id`, stopping any running tunnel first
    pub async fn start(&mut self, id: &str) -> VpnResult<()> {
        let path = self.resolve(id)?;

        if let Some(handle) = self.active.take() {
            self.active_config = None;
            self.tunnel.stop(Some(handle)).await?;
        }

        let handle = self
            .tunnel
            .start(&path, &self.auth_file, &self.extra_args, self.start_timeout)
            .await?;
        self.activate(id, handle);
        Ok(())
    }

    /// Stops the running tunnel
    pub async fn stop(&mut self) -> VpnResult<()> {
        self.active_config = None;
        self.tunnel.stop(self.active.take()).await
    }

    /// Restarts the tunnel on `id`; a missing tunnel is not an error
    pub async fn restart(&mut self, id: &str) -> VpnResult<()> {
        let path = self.resolve(id)?;
        self.active_config = None;

        let handle = self
            .tunnel
            .restart(
                self.active.take(),
                &path,
                &self.auth_file,
                &self.extra_args,
                self.start_timeout,
            )
            .await?;
        self.activate(id, handle);
        Ok(())
    }

    /// Brings up a tunnel on some configuration no job has been given yet
    ///
    /// Candidates are tried in random order, each at most once, within the
    /// backup budget. Each attempt's start timeout is clamped to the budget
    /// remaining.
    ///
    /// # Returns
    ///
    /// * `Ok(id)` - The configuration now running
    /// * `Err(VpnError::NoUnusedConfigs)` - Every configuration is already in use
    /// * `Err(VpnError::Timeout)` - No candidate came up within the budget
    pub async fn backup(&mut self) -> VpnResult<String> {
        let mut candidates = self.unused_configs();
        if candidates.is_empty() {
            return Err(VpnError::NoUnusedConfigs);
        }
        candidates.shuffle(&mut rand::thread_rng());

        let deadline = Instant::now() + self.backup_budget;

        for id in candidates {
            let remaining = deadline.saturating_duration_since(Instant::now());
            if remaining.is_zero() {
                break;
            }

            if let Some(handle) = self.active.take() {
                self.active_config = None;
                if let Err(e) = self.tunnel.stop(Some(handle)).await {
                    tracing::warn!("Failed to stop tunnel before backup: {}", e);
                }
            }

            let path = self.configs_dir.join(&id);
            let timeout = self.start_timeout.min(remaining);

            match self
                .tunnel
                .start(&path, &self.auth_file, &self.extra_args, timeout)
                .await
            {
                Ok(handle) => {
                    tracing::info!(config = %id, "backup VPN config is up");
                    self.activate(&id, handle);
                    return Ok(id);
                }
                Err(e) => {
                    tracing::warn!(config = %id, "backup VPN config failed: {}", e);
                }
            }
        }

        Err(VpnError::Timeout {
            output: "too many retries".to_string(),
        })
    }

    fn contains(&self, id: &str) -> bool {
        self.configs.iter().any(|c| c == id)
    }

    fn resolve(&self, id: &str) -> VpnResult<PathBuf> {
        if self.contains(id) {
            Ok(self.configs_dir.join(id))
        } else {
            Err(VpnError::ConfigNotFound(id.to_string()))
        }
    }

    fn activate(&mut self, id: &str, handle: TunnelHandle) {
        self.used.insert(id.to_string());
        self.active = Some(handle);
        self.active_config = Some(id.to_string());
    }
}

fn discover_configs(dir: &Path) -> VpnResult<Vec<String>> {
    let entries = std::fs::read_dir(dir).map_err(|e| {
        tracing::debug!("Cannot read {}: {}", dir.display(), e);
        VpnError::ConfigsNotFound(dir.to_path_buf())
    })?;

    let mut configs: Vec<String> = entries
        .filter_map(|entry| entry.ok())
        .filter(|entry| entry.file_type().map(|t| t.is_file()).unwrap_or(false))
        .filter_map(|entry| entry.file_name().to_str().map(str::to_string))
        .collect();
    configs.sort();

    if configs.is_empty() {
        return Err(VpnError::ConfigsNotFound(dir.to_path_buf()));
    }
    Ok(configs)
}
