//! Tunnel failover through the runner

use crate::common::{account, email, runner_config, ScriptedScraper};
use scrape_rotor::config::VpnConfig;
use scrape_rotor::storage::{FileFormat, FileStore};
use scrape_rotor::vpn::VpnError;
use scrape_rotor::{RotorError, Runner, VpnManager};
use std::path::Path;
use tempfile::TempDir;

/// Writes a tunnel pool where only the named configs come up
fn vpn_fixture(dir: &Path, configs: &[&str], working: &[&str]) -> VpnConfig {
    let pool = dir.join("pool");
    std::fs::create_dir_all(&pool).unwrap();
    for name in configs {
        std::fs::write(pool.join(name), "client\nremote vpn.example.net 1194\n").unwrap();
    }

    let mut script = String::from("echo \"OpenVPN 2.6 starting with $2\"\ncase \"$2\" in\n");
    for name in working {
        script.push_str(&format!(
            "*/{}) echo 'Initialization Sequence Completed'; exec sleep 60 ;;\n",
            name
        ));
    }
    script.push_str("*) echo 'TLS Error: TLS handshake failed' >&2; exit 1 ;;\nesac\n");

    let script_path = dir.join("openvpn.sh");
    std::fs::write(&script_path, script).unwrap();

    VpnConfig {
        configs_dir: pool,
        auth_file: dir.join("auth.txt"),
        command: vec!["sh".to_string(), script_path.to_string_lossy().into_owned()],
        extra_args: vec!["--verb".to_string(), "3".to_string()],
        start_timeout_secs: 5,
        backup_budget_secs: 20,
    }
}

#[tokio::test]
async fn test_failed_tunnel_switches_to_backup() {
    let dir = TempDir::new().unwrap();
    let vpn_config = vpn_fixture(dir.path(), &["cfgX", "cfgY"], &["cfgY"]);
    let vpn = VpnManager::new(&vpn_config).unwrap();

    let mut acc = account("a", 1, 10);
    acc.vpn_config = "cfgX".to_string();
    let scraper = ScriptedScraper::new().save(&email("a"), Ok(1));
    let store = Box::new(FileStore::new(dir.path().join("out"), FileFormat::Json).unwrap());

    let mut runner = Runner::new(runner_config(100), vec![acc], scraper, store, Some(vpn));
    let report = runner.run().await.unwrap();

    assert_eq!(report.completed, [email("a")]);
    assert_eq!(runner.retired()[0].account.vpn_config, "cfgY");
}

#[tokio::test]
async fn test_accounts_get_distinct_configs() {
    let dir = TempDir::new().unwrap();
    let vpn_config = vpn_fixture(dir.path(), &["cfgA", "cfgB"], &["cfgA", "cfgB"]);
    let vpn = VpnManager::new(&vpn_config).unwrap();

    let scraper = ScriptedScraper::new()
        .save(&email("a"), Ok(1))
        .save(&email("b"), Ok(1));
    let store = Box::new(FileStore::new(dir.path().join("out"), FileFormat::Csv).unwrap());

    let mut runner = Runner::new(
        runner_config(100),
        vec![account("a", 1, 10), account("b", 1, 10)],
        scraper,
        store,
        Some(vpn),
    );

    let assigned: Vec<String> = runner.jobs().map(|j| j.account.vpn_config.clone()).collect();
    assert_eq!(assigned, ["cfgA", "cfgB"]);

    let report = runner.run().await.unwrap();
    assert_eq!(report.completed, [email("a"), email("b")]);
}

#[tokio::test]
async fn test_run_fails_when_no_config_connects() {
    let dir = TempDir::new().unwrap();
    let vpn_config = vpn_fixture(dir.path(), &["cfgX", "cfgY"], &[]);
    let vpn = VpnManager::new(&vpn_config).unwrap();

    let scraper = ScriptedScraper::new().save(&email("a"), Ok(1));
    let store = Box::new(FileStore::new(dir.path().join("out"), FileFormat::Csv).unwrap());

    let mut runner = Runner::new(
        runner_config(100),
        vec![account("a", 1, 10)],
        scraper,
        store,
        Some(vpn),
    );

    let err = runner.run().await.unwrap_err();
    assert!(matches!(
        err,
        RotorError::Vpn(VpnError::NoUnusedConfigs) | RotorError::Vpn(VpnError::Timeout { .. })
    ));
    assert!(runner.scraper().logins.is_empty());
}

#[tokio::test]
async fn test_check_single_config() {
    let dir = TempDir::new().unwrap();
    let vpn_config = vpn_fixture(dir.path(), &["cfgA"], &["cfgA"]);
    let mut vpn = VpnManager::new(&vpn_config).unwrap();

    vpn.start("cfgA").await.unwrap();
    assert_eq!(vpn.active_config(), Some("cfgA"));
    assert!(vpn.is_used("cfgA"));

    vpn.stop().await.unwrap();
    assert!(vpn.active_config().is_none());
    assert!(matches!(vpn.stop().await, Err(VpnError::NoProcess)));
}
