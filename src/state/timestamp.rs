//! Timestamp encoding shared by account records
//!
//! The target site displays times as `Jan 02, 2006 3:04 PM`; account files
//! use the same layout so they can be edited by hand. An empty field means
//! the timestamp is unset.

use chrono::{DateTime, NaiveDateTime, Utc};
use serde::{Deserialize, Deserializer, Serializer};

/// Layout used when writing timestamps
pub const TIME_FORMAT: &str = "%b %d, %Y %-I:%M %p";

/// Layout used when reading timestamps (hour padding optional)
const PARSE_FORMAT: &str = "%b %d, %Y %I:%M %p";

/// Formats a timestamp in the account file layout
pub fn format_time(time: &DateTime<Utc>) -> String {
    time.format(TIME_FORMAT).to_string()
}

/// Parses a timestamp in the account file layout
pub fn parse_time(value: &str) -> Result<DateTime<Utc>, chrono::ParseError> {
    NaiveDateTime::parse_from_str(value.trim(), PARSE_FORMAT).map(|naive| naive.and_utc())
}

/// Serde adapter for `Option<DateTime<Utc>>` fields
pub mod optional {
    use super::*;

    pub fn serialize<S>(value: &Option<DateTime<Utc>>, serializer: S) -> Result<S::Ok, S::Error>
    where
        S: Serializer,
    {
        match value {
            Some(time) => serializer.serialize_str(&format_time(time)),
            None => serializer.serialize_str(""),
        }
    }

    pub fn deserialize<'de, D>(deserializer: D) -> Result<Option<DateTime<Utc>>, D::Error>
    where
        D: Deserializer<'de>,
    {
        let raw: Option<String> = Option::deserialize(deserializer)?;
        match raw.as_deref().map(str::trim) {
            None | Some("") => Ok(None),
            Some(value) => parse_time(value)
                .map(Some)
                .map_err(|e| serde::de::Error::custom(format!("invalid time '{}': {}", value, e))),
        }
    }
}
