//! Append-only writer for scraped records

use crate::scraper::Lead;
use crate::storage::records::FileFormat;
use crate::storage::traits::StorageResult;
use std::fs::OpenOptions;
use std::io::{BufWriter, Write};
use std::path::{Path, PathBuf};

/// Appends leads to a single output file
///
/// CSV output gets a header row only when the file is new or empty. JSON
/// output is written one object per line so appends never rewrite the file.
#[derive(Debug, Clone)]
pub struct LeadWriter {
    path: PathBuf,
    format: FileFormat,
}

impl LeadWriter {
    pub fn new(path: impl Into<PathBuf>, format: FileFormat) -> Self {
        Self {
            path: path.into(),
            format,
        }
    }

    pub fn path(&self) -> &Path {
        &self.path
    }

    /// Appends a batch of leads
    pub fn write_leads(&self, leads: &[Lead]) -> StorageResult<()> {
        if leads.is_empty() {
            return Ok(());
        }

        let file = OpenOptions::new()
            .create(true)
            .append(true)
            .open(&self.path)?;
        let is_empty = file.metadata()?.len() == 0;

        match self.format {
            FileFormat::Csv => {
                let mut writer = csv::WriterBuilder::new()
                    .has_headers(is_empty)
                    .from_writer(file);
                for lead in leads {
                    writer.serialize(lead)?;
                }
                writer.flush()?;
            }
            FileFormat::Json => {
                let mut writer = BufWriter::new(file);
                for lead in leads {
                    serde_json::to_writer(&mut writer, lead)?;
                    writer.write_all(b"\n")?;
                }
                writer.flush()?;
            }
        }

        Ok(())
    }
}
