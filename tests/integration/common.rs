//! Shared fixtures for integration tests

use async_trait::async_trait;
use scrape_rotor::config::RunnerConfig;
use scrape_rotor::scraper::{BrowserOptions, CreditInfo, Lead, Login, ScrapeError, Scraper, Tab};
use scrape_rotor::state::{Account, Cookie};
use scrape_rotor::storage::{ProgressStore, StorageError, StorageResult};
use std::collections::{HashMap, HashSet, VecDeque};

/// Scraper whose every answer is scripted per account
///
/// Saves fall back to `ListEnd` and scrapes to an empty batch once their
/// scripts run out.
#[derive(Default)]
pub struct ScriptedScraper {
    login_failures: HashMap<String, VecDeque<ScrapeError>>,
    saves: HashMap<String, VecDeque<Result<u32, ScrapeError>>>,
    leads: HashMap<String, VecDeque<Vec<Lead>>>,
    quota: HashMap<String, CreditInfo>,
    hanging_saves: HashSet<String>,

    /// Emails in login order
    pub logins: Vec<String>,

    /// Number of sessions closed
    pub closed: usize,

    /// Tabs selected, in order
    pub tabs: Vec<Tab>,

    /// Browser options received at each login
    pub options: Vec<BrowserOptions>,
}

impl ScriptedScraper {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn fail_login(mut self, email: &str, error: ScrapeError) -> Self {
        self.login_failures
            .entry(email.to_string())
            .or_default()
            .push_back(error);
        self
    }

    pub fn save(mut self, email: &str, result: Result<u32, ScrapeError>) -> Self {
        self.saves
            .entry(email.to_string())
            .or_default()
            .push_back(result);
        self
    }

    pub fn scrape(mut self, email: &str, leads: Vec<Lead>) -> Self {
        self.leads
            .entry(email.to_string())
            .or_default()
            .push_back(leads);
        self
    }

    /// Makes every save for the account wait forever
    pub fn hang_saves(mut self, email: &str) -> Self {
        self.hanging_saves.insert(email.to_string());
        self
    }

    pub fn quota(mut self, email: &str, credits: i64) -> Self {
        self.quota.insert(
            email.to_string(),
            CreditInfo {
                credits,
                refresh_at: None,
            },
        );
        self
    }
}

#[async_trait]
impl Scraper for ScriptedScraper {
    type Session = String;

    async fn login(
        &mut self,
        account: &Account,
        options: &BrowserOptions,
    ) -> Result<Login<String>, ScrapeError> {
        self.logins.push(account.email.clone());
        self.options.push(*options);

        if let Some(error) = self
            .login_failures
            .get_mut(&account.email)
            .and_then(|failures| failures.pop_front())
        {
            return Err(error);
        }

        Ok(Login {
            session: account.email.clone(),
            cookies: vec![Cookie {
                name: "session".to_string(),
                value: format!("token-{}", account.email),
                domain: "app.example.com".to_string(),
                path: "/".to_string(),
                expires: None,
            }],
        })
    }

    async fn select_tab(&mut self, _session: &mut String, tab: Tab) -> Result<(), ScrapeError> {
        self.tabs.push(tab);
        Ok(())
    }

    async fn fetch_quota(&mut self, session: &mut String) -> Result<CreditInfo, ScrapeError> {
        self.quota
            .get(session.as_str())
            .copied()
            .ok_or_else(|| ScrapeError::Navigation("quota page missing".to_string()))
    }

    async fn save_batch(&mut self, session: &mut String, _list: &str) -> Result<u32, ScrapeError> {
        if self.hanging_saves.contains(session.as_str()) {
            std::future::pending::<()>().await;
        }
        self.saves
            .get_mut(session.as_str())
            .and_then(|saves| saves.pop_front())
            .unwrap_or(Err(ScrapeError::ListEnd))
    }

    async fn scrape_batch(
        &mut self,
        session: &mut String,
        _tab: Tab,
    ) -> Result<Vec<Lead>, ScrapeError> {
        Ok(self
            .leads
            .get_mut(session.as_str())
            .and_then(|batches| batches.pop_front())
            .unwrap_or_default())
    }

    async fn close(&mut self, _session: String) -> Result<(), ScrapeError> {
        self.closed += 1;
        Ok(())
    }
}

/// Progress store that always fails
pub struct FailingStore;

impl ProgressStore for FailingStore {
    fn save_progress(&mut self, _accounts: &[&Account]) -> StorageResult<()> {
        Err(StorageError::Io(std::io::Error::new(
            std::io::ErrorKind::PermissionDenied,
            "read-only output directory",
        )))
    }

    fn write_leads(&mut self, _list: &str, _leads: &[Lead]) -> StorageResult<()> {
        Ok(())
    }
}

pub fn account(name: &str, target: u32, credits: i64) -> Account {
    let mut account = Account::new(
        format!("{}@example.com", name),
        "secret",
        "https://app.example.com/people",
        target,
    );
    account.credits = credits;
    account
}

pub fn email(name: &str) -> String {
    format!("{}@example.com", name)
}

pub fn lead(name: &str) -> Lead {
    Lead {
        name: name.to_string(),
        title: "CTO".to_string(),
        company: "Acme".to_string(),
        email: format!("{}@acme.io", name.to_lowercase()),
        ..Default::default()
    }
}

pub fn runner_config(daily_limit: u32) -> RunnerConfig {
    RunnerConfig {
        daily_limit,
        max_retries: 3,
        ..RunnerConfig::default()
    }
}
