//! Core record types for toyledger.
//!
//! This module defines the toy record itself, the month key records are
//! grouped under, and the shape of a not-yet-stored record.

use std::fmt;
use std::str::FromStr;

use chrono::{DateTime, Datelike, NaiveDate, Utc};
use serde::{Deserialize, Serialize};
use uuid::Uuid;

use crate::error::{Error, Result};

/// Year and month a record is filed under, e.g. `2024-03`.
///
/// Ordering is chronological.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
#[serde(into = "String", try_from = "String")]
pub struct MonthKey {
    year: i32,
    month: u32,
}

impl MonthKey {
    /// Create a month key, validating the month number.
    ///
    /// # Errors
    ///
    /// Returns a validation error if `month` is not in `1..=12`.
    pub fn new(year: i32, month: u32) -> Result<Self> {
        if !(1..=12).contains(&month) || !(0..=9999).contains(&year) {
            return Err(Error::validation("invalid month"));
        }
        Ok(Self { year, month })
    }

    /// The calendar year.
    #[must_use]
    pub fn year(&self) -> i32 {
        self.year
    }

    /// The month number, 1-based.
    #[must_use]
    pub fn month(&self) -> u32 {
        self.month
    }

    /// The first day of this month.
    #[must_use]
    pub fn first_day(&self) -> NaiveDate {
        NaiveDate::from_ymd_opt(self.year, self.month, 1).unwrap_or(NaiveDate::MIN)
    }

    /// Human label shown above a month group, e.g. `2024年3月`.
    #[must_use]
    pub fn label(&self) -> String {
        format!("{}年{}月", self.year, self.month)
    }
}

impl From<NaiveDate> for MonthKey {
    fn from(date: NaiveDate) -> Self {
        Self {
            year: date.year(),
            month: date.month(),
        }
    }
}

impl fmt::Display for MonthKey {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{:04}-{:02}", self.year, self.month)
    }
}

impl FromStr for MonthKey {
    type Err = Error;

    fn from_str(s: &str) -> Result<Self> {
        let s = s.trim();
        let (year, month) = s
            .split_once('-')
            .ok_or_else(|| Error::validation("invalid month"))?;
        if year.len() != 4 || month.len() != 2 {
            return Err(Error::validation("invalid month"));
        }
        let year = year
            .parse()
            .map_err(|_| Error::validation("invalid month"))?;
        let month = month
            .parse()
            .map_err(|_| Error::validation("invalid month"))?;
        Self::new(year, month)
    }
}

impl From<MonthKey> for String {
    fn from(key: MonthKey) -> Self {
        key.to_string()
    }
}

impl TryFrom<String> for MonthKey {
    type Error = Error;

    fn try_from(s: String) -> Result<Self> {
        s.parse()
    }
}

/// Parse a submitted date.
///
/// Accepts a full `YYYY-MM-DD` date or a bare `YYYY-MM` month, which is
/// filed as the first day of that month.
///
/// # Errors
///
/// Returns a validation error if the value is neither form.
pub fn parse_record_date(value: &str) -> Result<NaiveDate> {
    let value = value.trim();
    if value.len() == 7 {
        return value.parse::<MonthKey>().map(|m| m.first_day());
    }
    NaiveDate::parse_from_str(value, "%Y-%m-%d").map_err(|_| Error::validation("invalid date"))
}

/// Identifier of a stored record.
///
/// `SQLite` rows use their autoincrement id; snapshot records use a UUID.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
#[serde(untagged)]
pub enum RecordId {
    /// Row id in the `toy_records` table.
    Row(i64),
    /// Random id assigned by the snapshot store.
    Uuid(Uuid),
}

impl fmt::Display for RecordId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Row(id) => write!(f, "{id}"),
            Self::Uuid(id) => write!(f, "{id}"),
        }
    }
}

/// Where a record's photo lives.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub enum Photo {
    /// Path under `/uploads/` of a file on disk.
    #[serde(rename = "imagePath")]
    Stored(String),
    /// The encoded image itself as a `data:` URL.
    #[serde(rename = "photoDataUrl")]
    Inline(String),
}

impl Photo {
    /// The URL a client uses to display this photo.
    #[must_use]
    pub fn src(&self) -> &str {
        match self {
            Self::Stored(path) | Self::Inline(path) => path,
        }
    }
}

/// One toy purchase or photo entry.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct ToyRecord {
    /// Identifier assigned by the store.
    pub id: RecordId,
    /// Owning profile.
    pub user_id: String,
    /// Month the record is filed under; always the month of `date`.
    pub month: MonthKey,
    /// Day the purchase or photo belongs to.
    pub date: NaiveDate,
    /// What was bought.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub name: Option<String>,
    /// What it cost.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub amount: Option<f64>,
    /// Free-form note.
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub note: Option<String>,
    /// The photo reference.
    #[serde(flatten)]
    pub photo: Photo,
    /// When the upload batch was stored.
    pub created_at: DateTime<Utc>,
}

impl ToyRecord {
    /// Build a stored record from a pending one.
    #[must_use]
    pub fn from_new(
        id: RecordId,
        user_id: &str,
        new: &NewRecord,
        photo: Photo,
        created_at: DateTime<Utc>,
    ) -> Self {
        Self {
            id,
            user_id: user_id.to_string(),
            month: MonthKey::from(new.date),
            date: new.date,
            name: new.name.clone(),
            amount: new.amount,
            note: new.note.clone(),
            photo,
            created_at,
        }
    }
}

/// Photo bytes waiting to be persisted.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PhotoData {
    /// Name the client gave the file.
    pub file_name: String,
    /// MIME type of `bytes`.
    pub content_type: String,
    /// Encoded image.
    pub bytes: Vec<u8>,
}

impl PhotoData {
    /// File extension to store the photo under, including the dot.
    ///
    /// Taken from the client's file name; falls back to `.jpg`.
    #[must_use]
    pub fn extension(&self) -> String {
        std::path::Path::new(&self.file_name)
            .extension()
            .and_then(|ext| ext.to_str())
            .filter(|ext| {
                !ext.is_empty() && ext.len() <= 8 && ext.chars().all(|c| c.is_ascii_alphanumeric())
            })
            .map_or_else(|| ".jpg".to_string(), |ext| format!(".{}", ext.to_ascii_lowercase()))
    }
}

/// A validated record that has not been stored yet.
#[derive(Debug, Clone, PartialEq)]
pub struct NewRecord {
    /// Day the record belongs to.
    pub date: NaiveDate,
    /// What was bought.
    pub name: Option<String>,
    /// What it cost.
    pub amount: Option<f64>,
    /// Free-form note.
    pub note: Option<String>,
    /// The photo to persist.
    pub photo: PhotoData,
}
