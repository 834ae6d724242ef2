//! Turning a submitted upload form into records ready to store.
//!
//! Validation happens before any photo is touched, so a rejected form never
//! produces a record.

use chrono::NaiveDate;

use crate::config::{Config, IngestMode};
use crate::error::{Error, Result};
use crate::images;
use crate::record::{parse_record_date, NewRecord, PhotoData};

/// Raw fields of one upload, as submitted.
#[derive(Debug, Clone, Default, PartialEq)]
pub struct UploadForm {
    /// Month the photos belong to (`YYYY-MM`).
    pub month: Option<String>,
    /// Full date (`YYYY-MM-DD`), takes precedence over `month`.
    pub date: Option<String>,
    /// What was bought.
    pub name: Option<String>,
    /// What it cost, as typed.
    pub amount: Option<String>,
    /// Free-form note.
    pub note: Option<String>,
    /// Uploaded photos, in submission order.
    pub photos: Vec<PhotoData>,
}

/// Validates upload forms and prepares their photos.
#[derive(Debug, Clone)]
pub struct Ingestor {
    mode: IngestMode,
    max_photos: usize,
    downscale: bool,
    max_width: u32,
    jpeg_quality: u8,
}

impl Ingestor {
    /// Create an ingestor from the loaded configuration.
    #[must_use]
    pub fn new(config: &Config) -> Self {
        Self {
            mode: config.ingest.mode,
            max_photos: config.server.max_photos_per_upload,
            downscale: config.downscale_enabled(),
            max_width: config.ingest.max_width,
            jpeg_quality: config.ingest.jpeg_quality,
        }
    }

    /// Maximum number of photos one form may carry.
    #[must_use]
    pub fn max_photos(&self) -> usize {
        self.max_photos
    }

    /// Validate a form and produce one pending record per photo.
    ///
    /// # Errors
    ///
    /// Returns [`Error::Validation`] for missing or malformed fields and
    /// [`Error::Photo`] if a photo cannot be downscaled.
    pub fn prepare(&self, form: UploadForm) -> Result<Vec<NewRecord>> {
        let date = self.required_date(&form)?;
        let name = non_blank(form.name);
        let note = non_blank(form.note);
        let amount = non_blank(form.amount)
            .map(|raw| parse_amount(&raw))
            .transpose()?;

        if self.mode == IngestMode::Itemized {
            if name.is_none() {
                return Err(Error::validation("name required"));
            }
            if amount.is_none() {
                return Err(Error::validation("amount required"));
            }
        }

        if form.photos.is_empty() {
            return Err(Error::validation("photos required"));
        }
        if form.photos.len() > self.max_photos {
            return Err(Error::validation(format!(
                "too many photos: at most {} per upload",
                self.max_photos
            )));
        }

        form.photos
            .into_iter()
            .map(|photo| {
                let photo = if self.downscale {
                    images::downscale(&photo, self.max_width, self.jpeg_quality)?
                } else {
                    photo
                };
                Ok(NewRecord {
                    date,
                    name: name.clone(),
                    amount,
                    note: note.clone(),
                    photo,
                })
            })
            .collect()
    }

    fn required_date(&self, form: &UploadForm) -> Result<NaiveDate> {
        let date = non_blank(form.date.clone());
        match self.mode {
            IngestMode::Itemized => {
                let date = date.ok_or_else(|| Error::validation("date required"))?;
                if date.trim().len() != 10 {
                    return Err(Error::validation("invalid date"));
                }
                parse_record_date(&date)
            }
            IngestMode::Quick => {
                let value = date
                    .or_else(|| non_blank(form.month.clone()))
                    .ok_or_else(|| Error::validation("month required"))?;
                parse_record_date(&value)
            }
        }
    }
}

fn non_blank(value: Option<String>) -> Option<String> {
    value
        .map(|v| v.trim().to_string())
        .filter(|v| !v.is_empty())
}

fn parse_amount(raw: &str) -> Result<f64> {
    match raw.parse::<f64>() {
        Ok(amount) if amount.is_finite() && amount >= 0.0 => Ok(amount),
        _ => Err(Error::validation("invalid amount")),
    }
}
