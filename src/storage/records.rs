//! Record file encoding
//!
//! Records are read and written as CSV (with a header row) or as a JSON
//! array, selected by the file extension.

use crate::storage::traits::{StorageError, StorageResult};
use serde::de::DeserializeOwned;
use serde::{Deserialize, Serialize};
use std::fs::File;
use std::io::{BufReader, BufWriter, Write};
use std::path::Path;

/// Supported record file encodings
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Default, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum FileFormat {
    #[default]
    Csv,
    Json,
}

impl FileFormat {
    /// Detects the format from a file extension
    pub fn from_path(path: &Path) -> StorageResult<Self> {
        match path.extension().and_then(|e| e.to_str()) {
            Some(ext) if ext.eq_ignore_ascii_case("csv") => Ok(Self::Csv),
            Some(ext) if ext.eq_ignore_ascii_case("json") => Ok(Self::Json),
            Some(ext) => Err(StorageError::UnsupportedFormat(ext.to_string())),
            None => Err(StorageError::UnsupportedFormat(String::new())),
        }
    }

    /// File extension without the leading dot
    pub fn extension(&self) -> &'static str {
        match self {
            Self::Csv => "csv",
            Self::Json => "json",
        }
    }
}

/// Writes records to `path`, replacing any existing content
pub fn save_records<T: Serialize>(path: &Path, records: &[T]) -> StorageResult<()> {
    let format = FileFormat::from_path(path)?;
    let file = File::create(path)?;

    match format {
        FileFormat::Csv => {
            let mut writer = csv::Writer::from_writer(file);
            for record in records {
                writer.serialize(record)?;
            }
            writer.flush()?;
        }
        FileFormat::Json => {
            let mut writer = BufWriter::new(file);
            serde_json::to_writer_pretty(&mut writer, records)?;
            writer.flush()?;
        }
    }

    Ok(())
}

/// Reads every record stored in `path`
pub fn read_records<T: DeserializeOwned>(path: &Path) -> StorageResult<Vec<T>> {
    let format = FileFormat::from_path(path)?;
    let file = File::open(path)?;

    match format {
        FileFormat::Csv => {
            let mut reader = csv::Reader::from_reader(file);
            let mut records = Vec::new();
            for record in reader.deserialize() {
                records.push(record?);
            }
            Ok(records)
        }
        FileFormat::Json => Ok(serde_json::from_reader(BufReader::new(file))?),
    }
}
