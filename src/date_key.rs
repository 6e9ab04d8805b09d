//! Trading date keys
//!
//! The archive names its daily files with an 8-digit `ddMMyyyy` date and a
//! handful of files with the compact `ddMMyy` form.

use chrono::{Datelike, NaiveDate};
use serde::{Deserialize, Deserializer, Serialize, Serializer};
use std::cmp::Ordering;
use std::fmt;
use std::str::FromStr;

/// Calendar date in the archive's `ddMMyyyy` format
///
/// Ordering follows the calendar, not the byte order of the string form.
///
/// # Examples
///
/// ```
/// use nse_data_downloader::date_key::DateKey;
///
/// let key = DateKey::parse("15032024").unwrap();
/// assert_eq!(key.as_str(), "15032024");
/// assert_eq!(key.compact(), "150324");
/// assert!(DateKey::parse("01042024").unwrap() > key);
/// ```
#[derive(Debug, Clone, PartialEq, Eq, Hash)]
pub struct DateKey {
    raw: String,
    date: NaiveDate,
}

impl DateKey {
    /// Parse an 8-digit `ddMMyyyy` string
    ///
    /// # Errors
    ///
    /// Returns an error if the input is not exactly 8 ASCII digits or does not
    /// name a real calendar day.
    pub fn parse(s: &str) -> Result<Self, DateKeyError> {
        if s.len() != 8 || !s.bytes().all(|b| b.is_ascii_digit()) {
            return Err(DateKeyError::InvalidFormat(s.to_string()));
        }

        // All ASCII digits, so byte slicing is safe and the parses cannot fail
        let day: u32 = s[0..2].parse().map_err(|_| DateKeyError::InvalidFormat(s.to_string()))?;
        let month: u32 = s[2..4].parse().map_err(|_| DateKeyError::InvalidFormat(s.to_string()))?;
        let year: i32 = s[4..8].parse().map_err(|_| DateKeyError::InvalidFormat(s.to_string()))?;

        let date = NaiveDate::from_ymd_opt(year, month, day)
            .ok_or_else(|| DateKeyError::InvalidDate(s.to_string()))?;

        Ok(Self {
            raw: s.to_string(),
            date,
        })
    }

    /// Build a key from a calendar date
    pub fn from_date(date: NaiveDate) -> Self {
        Self {
            raw: format!("{:02}{:02}{:04}", date.day(), date.month(), date.year()),
            date,
        }
    }

    /// The canonical `ddMMyyyy` form
    pub fn as_str(&self) -> &str {
        &self.raw
    }

    /// The compact `ddMMyy` form: day and month followed by the last two
    /// digits of the year
    pub fn compact(&self) -> String {
        format!("{}{}", &self.raw[0..4], &self.raw[6..8])
    }

    /// The calendar date this key names
    pub fn date(&self) -> NaiveDate {
        self.date
    }
}

impl Ord for DateKey {
    fn cmp(&self, other: &Self) -> Ordering {
        self.date.cmp(&other.date)
    }
}

impl PartialOrd for DateKey {
    fn partial_cmp(&self, other: &Self) -> Option<Ordering> {
        Some(self.cmp(other))
    }
}

impl fmt::Display for DateKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(&self.raw)
    }
}

impl FromStr for DateKey {
    type Err = DateKeyError;

    fn from_str(s: &str) -> Result<Self, Self::Err> {
        Self::parse(s)
    }
}

impl Serialize for DateKey {
    fn serialize<S: Serializer>(&self, serializer: S) -> Result<S::Ok, S::Error> {
        serializer.serialize_str(&self.raw)
    }
}

impl<'de> Deserialize<'de> for DateKey {
    fn deserialize<D: Deserializer<'de>>(deserializer: D) -> Result<Self, D::Error> {
        let raw = String::deserialize(deserializer)?;
        DateKey::parse(&raw).map_err(serde::de::Error::custom)
    }
}

/// Date key parsing errors
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum DateKeyError {
    /// Not 8 ASCII digits
    #[error("invalid date '{0}': expected ddMMyyyy (8 digits)")]
    InvalidFormat(String),

    /// Digits do not form a calendar date
    #[error("invalid date '{0}': no such calendar day")]
    InvalidDate(String),
}
