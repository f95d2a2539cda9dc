//! End-to-end scheduling scenarios

use crate::common::{account, email, lead, runner_config, FailingStore, ScriptedScraper};
use chrono::{Duration, Utc};
use scrape_rotor::scraper::ScrapeError;
use scrape_rotor::state::Account;
use scrape_rotor::storage::{load_accounts, load_cookies, FileFormat, FileStore};
use scrape_rotor::{RotorError, Runner};
use tempfile::TempDir;

fn file_store(dir: &TempDir) -> Box<FileStore> {
    Box::new(FileStore::new(dir.path(), FileFormat::Csv).unwrap())
}

fn queue_order(runner: &Runner<ScriptedScraper>) -> Vec<String> {
    runner.jobs().map(|job| job.email().to_string()).collect()
}

#[tokio::test]
async fn test_round_robin_fairness() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new()
        .save(&email("a"), Ok(1))
        .save(&email("b"), Ok(1))
        .save(&email("c"), Ok(1));
    let accounts = vec![account("a", 10, 50), account("b", 10, 50), account("c", 10, 50)];

    let mut runner = Runner::new(runner_config(1), accounts, scraper, file_store(&dir), None);

    for _ in 0..3 {
        assert!(runner.step().await.unwrap());
    }

    assert_eq!(runner.scraper().logins, [email("a"), email("b"), email("c")]);
    assert_eq!(queue_order(&runner), [email("a"), email("b"), email("c")]);
    assert!(runner.jobs().all(|job| job.account.is_cooling_down(Utc::now())));
}

#[tokio::test]
async fn test_daily_limit_rotates_job() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new()
        .save(&email("a"), Ok(1))
        .save(&email("b"), Ok(1));
    let accounts = vec![account("a", 10, 50), account("b", 10, 50)];

    let mut runner = Runner::new(runner_config(1), accounts, scraper, file_store(&dir), None);

    let before = Utc::now();
    assert!(runner.step().await.unwrap());

    assert_eq!(queue_order(&runner), [email("b"), email("a")]);
    let a = runner.jobs().last().unwrap();
    assert_eq!(a.account.saved, 1);
    assert_eq!(a.account.credits, 49);
    let timeout = a.account.timeout.unwrap();
    assert!(timeout >= before + Duration::hours(24));
    assert!(timeout <= Utc::now() + Duration::hours(24));

    assert!(runner.step().await.unwrap());
    assert_eq!(runner.scraper().logins, [email("a"), email("b")]);
    assert_eq!(runner.report().iterations, 2);
}

#[tokio::test]
async fn test_target_reached_exports_and_retires() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new()
        .save(&email("a"), Ok(1))
        .save(&email("a"), Ok(1))
        .scrape(&email("a"), vec![lead("Ana"), lead("Bo")])
        .scrape(&email("a"), vec![lead("Cy")]);
    let mut acc = account("a", 2, 10);
    acc.list = "fintech".to_string();

    let mut runner = Runner::new(runner_config(100), vec![acc], scraper, file_store(&dir), None);
    let report = runner.run().await.unwrap();

    assert_eq!(report.completed, [email("a")]);
    assert!(report.challenged.is_empty());
    assert_eq!(report.iterations, 1);
    assert_eq!(runner.jobs().count(), 0);
    assert_eq!(runner.scraper().closed, 1);

    let content = std::fs::read_to_string(dir.path().join("fintech.csv")).unwrap();
    assert_eq!(content.lines().count(), 4);
    assert!(content.contains("Cy"));

    let progress = load_accounts(&dir.path().join("scrape-rotor-progress.csv")).unwrap();
    assert_eq!(progress.len(), 1);
    assert_eq!(progress[0].saved, 2);
    assert_eq!(progress[0].credits, 8);

    let jar = load_cookies(&dir.path().join("scrape-rotor-cookies.json")).unwrap();
    assert_eq!(jar[&email("a")][0].value, format!("token-{}", email("a")));
}

#[tokio::test]
async fn test_list_end_retires_job() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new()
        .save(&email("a"), Ok(3))
        .save(&email("a"), Err(ScrapeError::ListEnd));

    let mut runner = Runner::new(
        runner_config(100),
        vec![account("a", 10, 10)],
        scraper,
        file_store(&dir),
        None,
    );
    let report = runner.run().await.unwrap();

    assert_eq!(report.completed, [email("a")]);
    let retired = &runner.retired()[0];
    assert_eq!(retired.account.saved, 3);
    assert_eq!(retired.account.target, 3);
    assert!(retired.account.is_done());
    assert_eq!(
        retired.account.list,
        "scrape-rotor-run-a_example.com".to_string()
    );
}

#[tokio::test]
async fn test_finished_accounts_stay_finished_after_restart() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new()
        .save(&email("a"), Ok(2))
        .scrape(&email("a"), vec![lead("Ana")]);
    let mut acc = account("a", 10, 10);
    acc.list = "leads".to_string();

    let mut runner = Runner::new(runner_config(100), vec![acc], scraper, file_store(&dir), None);
    runner.run().await.unwrap();

    let progress_path = dir.path().join("scrape-rotor-progress.csv");
    let reloaded = load_accounts(&progress_path).unwrap();
    assert_eq!(reloaded[0].saved, 2);
    assert_eq!(reloaded[0].target, 2);
    assert!(reloaded[0].is_done());

    let scraper = ScriptedScraper::new().scrape(&email("a"), vec![lead("Ana")]);
    let mut restarted = Runner::new(runner_config(100), reloaded, scraper, file_store(&dir), None);
    let report = restarted.run().await.unwrap();

    assert!(restarted.scraper().logins.is_empty());
    assert_eq!(report.iterations, 0);
    assert_eq!(restarted.retired().len(), 1);

    let content = std::fs::read_to_string(dir.path().join("leads.csv")).unwrap();
    assert_eq!(content.lines().count(), 2);
}

#[tokio::test]
async fn test_security_challenge_retires_and_reports() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new()
        .save(
            &email("a"),
            Err(ScrapeError::SecurityChallenge("captcha".to_string())),
        )
        .save(&email("b"), Ok(5));

    let mut runner = Runner::new(
        runner_config(100),
        vec![account("a", 10, 10), account("b", 5, 10)],
        scraper,
        file_store(&dir),
        None,
    );
    let report = runner.run().await.unwrap();

    assert_eq!(report.challenged, [email("a")]);
    assert_eq!(report.completed, [email("b")]);

    let progress: Vec<Account> =
        load_accounts(&dir.path().join("scrape-rotor-progress.csv")).unwrap();
    let emails: Vec<&str> = progress.iter().map(|a| a.email.as_str()).collect();
    assert_eq!(emails.len(), 2);
    assert!(emails.contains(&"a@example.com"));
}

#[tokio::test]
async fn test_exhausted_retries_rotate_job() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new()
        .fail_login(&email("a"), ScrapeError::Login("bad gateway".to_string()))
        .fail_login(&email("a"), ScrapeError::Timeout("login form".to_string()))
        .fail_login(&email("a"), ScrapeError::Login("bad gateway".to_string()));

    let mut runner = Runner::new(
        runner_config(100),
        vec![account("a", 10, 10), account("b", 10, 0)],
        scraper,
        file_store(&dir),
        None,
    );

    assert!(runner.step().await.unwrap());

    assert_eq!(runner.scraper().logins.len(), 3);
    assert_eq!(queue_order(&runner), [email("b"), email("a")]);
    assert!(runner.retired().is_empty());
}

#[tokio::test]
async fn test_save_failures_retry_in_session() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new()
        .save(&email("a"), Err(ScrapeError::Timeout("save button".to_string())))
        .save(&email("a"), Ok(2));

    let mut runner = Runner::new(
        runner_config(100),
        vec![account("a", 2, 10)],
        scraper,
        file_store(&dir),
        None,
    );
    let report = runner.run().await.unwrap();

    assert_eq!(report.completed, [email("a")]);
    assert_eq!(runner.scraper().logins.len(), 1);
}

#[tokio::test]
async fn test_no_credits_rotates_without_cooldown() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new();

    let mut runner = Runner::new(
        runner_config(100),
        vec![account("a", 10, 0), account("b", 10, 0)],
        scraper,
        file_store(&dir),
        None,
    );

    assert!(runner.step().await.unwrap());

    assert_eq!(queue_order(&runner), [email("b"), email("a")]);
    assert!(runner.jobs().all(|job| job.account.timeout.is_none()));
}

#[tokio::test]
async fn test_fetched_credits_unblock_job() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new()
        .quota(&email("a"), 5)
        .save(&email("a"), Ok(5));
    let mut config = runner_config(100);
    config.fetch_credits = true;

    let mut runner = Runner::new(
        config,
        vec![account("a", 5, 0)],
        scraper,
        file_store(&dir),
        None,
    );
    let report = runner.run().await.unwrap();

    assert_eq!(report.completed, [email("a")]);
    assert_eq!(runner.retired()[0].account.credits, 0);
}

#[tokio::test]
async fn test_failing_store_is_not_fatal() {
    let scraper = ScriptedScraper::new().save(&email("a"), Ok(1));

    let mut runner = Runner::new(
        runner_config(100),
        vec![account("a", 1, 10)],
        scraper,
        Box::new(FailingStore),
        None,
    );
    let report = runner.run().await.unwrap();

    assert_eq!(report.completed, [email("a")]);
}

#[tokio::test]
async fn test_waits_out_short_cooldown() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new().save(&email("a"), Ok(1));
    let mut acc = account("a", 1, 10);
    acc.timeout = Some(Utc::now() + Duration::milliseconds(300));

    let mut runner = Runner::new(runner_config(100), vec![acc], scraper, file_store(&dir), None);

    let started = std::time::Instant::now();
    let report = runner.run().await.unwrap();

    assert!(started.elapsed() >= std::time::Duration::from_millis(200));
    assert_eq!(report.completed, [email("a")]);
    assert_eq!(runner.retired()[0].account.timeout, None);
}

#[tokio::test]
async fn test_retries_exhausted_error_carries_last_error() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new()
        .save(&email("a"), Ok(0))
        .save(&email("a"), Ok(0))
        .save(&email("a"), Err(ScrapeError::Navigation("lost page".to_string())));

    let mut runner = Runner::new(
        runner_config(100),
        vec![account("a", 10, 10)],
        scraper,
        file_store(&dir),
        None,
    );

    assert!(runner.step().await.unwrap());
    assert_eq!(runner.jobs().count(), 1);

    let err = RotorError::RetriesExhausted {
        attempts: 3,
        last: ScrapeError::Navigation("lost page".to_string()),
    };
    assert_eq!(
        err.to_string(),
        "Gave up after 3 attempts: Navigation failed: lost page"
    );
}

#[tokio::test]
async fn test_hung_action_fails_attempt_after_timeout() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new().hang_saves(&email("a"));
    let mut config = runner_config(100);
    config.timeout_secs = 1;
    config.max_retries = 2;

    let mut runner = Runner::new(
        config,
        vec![account("a", 10, 10), account("b", 10, 10)],
        scraper,
        file_store(&dir),
        None,
    );

    let started = std::time::Instant::now();
    assert!(runner.step().await.unwrap());
    let elapsed = started.elapsed();

    assert!(elapsed >= std::time::Duration::from_secs(2));
    assert!(elapsed < std::time::Duration::from_secs(10));
    assert_eq!(runner.scraper().logins, [email("a")]);
    assert_eq!(runner.scraper().closed, 1);
    assert_eq!(queue_order(&runner), [email("b"), email("a")]);
}

#[tokio::test]
async fn test_browser_options_reach_login() {
    let dir = TempDir::new().unwrap();
    let scraper = ScriptedScraper::new().save(&email("a"), Ok(1));
    let mut config = runner_config(100);
    config.headless = false;
    config.stealth = true;
    config.timeout_secs = 45;

    let mut runner = Runner::new(config, vec![account("a", 1, 10)], scraper, file_store(&dir), None);
    runner.run().await.unwrap();

    let options = runner.scraper().options[0];
    assert!(!options.headless);
    assert!(options.stealth);
    assert_eq!(options.action_timeout, std::time::Duration::from_secs(45));
}
