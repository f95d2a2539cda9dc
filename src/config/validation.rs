use crate::config::types::{Config, OutputConfig, RunnerConfig, VpnConfig};
use crate::state::Account;
use crate::ConfigError;
use std::collections::HashSet;
use url::Url;

/// Validates the entire configuration
pub fn validate(config: &Config) -> Result<(), ConfigError> {
    validate_runner_config(&config.runner)?;
    validate_output_config(&config.output)?;
    if let Some(vpn) = &config.vpn {
        validate_vpn_config(vpn)?;
    }
    Ok(())
}

/// Validates runner configuration
fn validate_runner_config(config: &RunnerConfig) -> Result<(), ConfigError> {
    if config.daily_limit < 1 {
        return Err(ConfigError::Validation(format!(
            "daily_limit must be >= 1, got {}",
            config.daily_limit
        )));
    }

    if config.timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "timeout_secs must be >= 1, got {}",
            config.timeout_secs
        )));
    }

    if config.max_retries < 1 || config.max_retries > 50 {
        return Err(ConfigError::Validation(format!(
            "max_retries must be between 1 and 50, got {}",
            config.max_retries
        )));
    }

    Ok(())
}

/// Validates output configuration
fn validate_output_config(config: &OutputConfig) -> Result<(), ConfigError> {
    if config.directory.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "output directory cannot be empty".to_string(),
        ));
    }

    if let Some(cookie_file) = &config.cookie_file {
        if cookie_file.extension().and_then(|e| e.to_str()) != Some("json") {
            return Err(ConfigError::Validation(format!(
                "cookie_file must be a .json file, got '{}'",
                cookie_file.display()
            )));
        }
    }

    Ok(())
}

/// Validates VPN configuration
fn validate_vpn_config(config: &VpnConfig) -> Result<(), ConfigError> {
    match config.command.first() {
        Some(program) if !program.trim().is_empty() => {}
        _ => {
            return Err(ConfigError::Validation(
                "vpn command must name a program".to_string(),
            ))
        }
    }

    if config.configs_dir.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "vpn configs_dir cannot be empty".to_string(),
        ));
    }

    if config.auth_file.as_os_str().is_empty() {
        return Err(ConfigError::Validation(
            "vpn auth_file cannot be empty".to_string(),
        ));
    }

    if config.start_timeout_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "start_timeout_secs must be >= 1, got {}",
            config.start_timeout_secs
        )));
    }

    if config.backup_budget_secs < 1 {
        return Err(ConfigError::Validation(format!(
            "backup_budget_secs must be >= 1, got {}",
            config.backup_budget_secs
        )));
    }

    Ok(())
}

/// Validates the accounts input
///
/// Every account needs an email, a password and a parseable target URL.
/// Emails must be unique since they key progress and cookie checkpoints.
pub fn validate_accounts(accounts: &[Account]) -> Result<(), ConfigError> {
    let mut seen = HashSet::new();

    for (index, account) in accounts.iter().enumerate() {
        let row = index + 1;

        if account.email.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "account {} has no email",
                row
            )));
        }

        if account.password.is_empty() {
            return Err(ConfigError::Validation(format!(
                "account {} has no password",
                account.email
            )));
        }

        if account.url.trim().is_empty() {
            return Err(ConfigError::Validation(format!(
                "account {} has no url",
                account.email
            )));
        }

        Url::parse(&account.url)
            .map_err(|e| ConfigError::InvalidUrl(format!("{}: {}", account.url, e)))?;

        if !seen.insert(account.email.as_str()) {
            return Err(ConfigError::Validation(format!(
                "duplicate account email: {}",
                account.email
            )));
        }
    }

    Ok(())
}
