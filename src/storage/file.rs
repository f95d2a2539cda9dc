//! File-backed progress store
//!
//! Layout under the output directory:
//! - `scrape-rotor-progress.<ext>`: every account with its counters and cooldowns
//! - `scrape-rotor-cookies.json`: login cookies keyed by account email
//! - `<list>.<ext>`: scraped records for each account's list

use crate::scraper::Lead;
use crate::state::{Account, Cookie};
use crate::storage::leads::LeadWriter;
use crate::storage::records::{read_records, save_records, FileFormat};
use crate::storage::traits::{ProgressStore, StorageResult};
use std::collections::BTreeMap;
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::{Path, PathBuf};

/// Stem of the progress checkpoint file
pub const PROGRESS_FILE_STEM: &str = "scrape-rotor-progress";

/// Name of the cookie checkpoint file
pub const COOKIES_FILE_NAME: &str = "scrape-rotor-cookies.json";

/// Cookies keyed by account email
pub type CookieJar = BTreeMap<String, Vec<Cookie>>;

/// Progress store writing into a single output directory
#[derive(Debug, Clone)]
pub struct FileStore {
    directory: PathBuf,
    format: FileFormat,
}

impl FileStore {
    /// Creates the store, creating the output directory if needed
    pub fn new(directory: impl Into<PathBuf>, format: FileFormat) -> StorageResult<Self> {
        let directory = directory.into();
        std::fs::create_dir_all(&directory)?;
        Ok(Self { directory, format })
    }

    pub fn directory(&self) -> &Path {
        &self.directory
    }

    /// Path of the progress checkpoint
    pub fn progress_path(&self) -> PathBuf {
        progress_path(&self.directory, self.format)
    }

    /// Path of the cookie checkpoint
    pub fn cookies_path(&self) -> PathBuf {
        self.directory.join(COOKIES_FILE_NAME)
    }

    /// Path of the lead file for `list`
    pub fn leads_path(&self, list: &str) -> PathBuf {
        self.directory
            .join(format!("{}.{}", list, self.format.extension()))
    }
}

impl ProgressStore for FileStore {
    fn save_progress(&mut self, accounts: &[&Account]) -> StorageResult<()> {
        let jar: CookieJar = accounts
            .iter()
            .filter(|acc| !acc.cookies().is_empty())
            .map(|acc| (acc.email.clone(), acc.cookies().to_vec()))
            .collect();

        let cookies_path = self.cookies_path();
        tracing::debug!(file = %cookies_path.display(), "saving cookies");
        save_cookies(&cookies_path, &jar)?;

        let progress_path = self.progress_path();
        tracing::debug!(file = %progress_path.display(), "saving progress");
        save_records(&progress_path, accounts)
    }

    fn write_leads(&mut self, list: &str, leads: &[Lead]) -> StorageResult<()> {
        LeadWriter::new(self.leads_path(list), self.format).write_leads(leads)
    }
}

/// Path of the progress checkpoint inside `directory`
pub fn progress_path(directory: &Path, format: FileFormat) -> PathBuf {
    directory.join(format!("{}.{}", PROGRESS_FILE_STEM, format.extension()))
}

/// Reads a cookie jar written by [`save_cookies`]
pub fn load_cookies(path: &Path) -> StorageResult<CookieJar> {
    let file = File::open(path)?;
    Ok(serde_json::from_reader(BufReader::new(file))?)
}

/// Writes a cookie jar as pretty-printed JSON
pub fn save_cookies(path: &Path, jar: &CookieJar) -> StorageResult<()> {
    let mut writer = BufWriter::new(File::create(path)?);
    serde_json::to_writer_pretty(&mut writer, jar)?;
    writer.flush()?;
    Ok(())
}

/// Attaches preloaded cookies to the accounts they belong to
///
/// Returns how many accounts received cookies.
pub fn attach_cookies(accounts: &mut [Account], jar: &CookieJar) -> usize {
    let mut attached = 0;
    for account in accounts.iter_mut() {
        if let Some(cookies) = jar.get(&account.email) {
            account.set_cookies(cookies.clone());
            attached += 1;
        }
    }
    attached
}

/// Reads the accounts input file (CSV or JSON)
pub fn load_accounts(path: &Path) -> StorageResult<Vec<Account>> {
    read_records(path)
}
