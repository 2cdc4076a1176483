//! Activity records as they arrive from the CRM and as they travel through
//! the pipeline.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};
use thiserror::Error;

/// Maximum subject length carried into a batch.
pub const MAX_SUBJECT_CHARS: usize = 250;

/// Maximum description length carried into a batch.
pub const MAX_DESCRIPTION_CHARS: usize = 1000;

/// A raw activity row exactly as the CRM query returns it.
///
/// The date is kept as an optional string because rows with missing or
/// malformed dates are legal in the source and must be dropped, not
/// rejected, by the batching stage.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SourceActivity {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "ActivityDate", default)]
    pub activity_date: Option<String>,
    #[serde(rename = "Subject", default)]
    pub subject: Option<String>,
    #[serde(rename = "Description", default)]
    pub description: Option<String>,
}

/// Why a [`SourceActivity`] could not become an [`ActivityRecord`].
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum DateIssue {
    #[error("activity date is missing")]
    Missing,
    #[error("activity date '{0}' is not a valid date")]
    Unparseable(String),
}

/// A validated activity with a calendar date and bounded text fields.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct ActivityRecord {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "ActivityDate")]
    pub activity_date: NaiveDate,
    #[serde(rename = "Subject", skip_serializing_if = "Option::is_none")]
    pub subject: Option<String>,
    #[serde(rename = "Description", skip_serializing_if = "Option::is_none")]
    pub description: Option<String>,
}

impl SourceActivity {
    /// Validates the date and truncates subject/description to their caps.
    ///
    /// Accepts plain `YYYY-MM-DD` dates and datetime strings whose first ten
    /// characters are a date (`2024-01-15T09:00:00.000+0000`).
    ///
    /// # Errors
    ///
    /// Returns a [`DateIssue`] when the date is absent, blank, or unparseable.
    pub fn into_record(self) -> Result<ActivityRecord, DateIssue> {
        let raw = match self.activity_date.as_deref().map(str::trim) {
            None | Some("") => return Err(DateIssue::Missing),
            Some(raw) => raw,
        };
        let date_part = raw.get(..10).unwrap_or(raw);
        let activity_date = NaiveDate::parse_from_str(date_part, "%Y-%m-%d")
            .map_err(|_| DateIssue::Unparseable(raw.to_string()))?;

        Ok(ActivityRecord {
            id: self.id,
            activity_date,
            subject: self.subject.map(|s| truncate_chars(&s, MAX_SUBJECT_CHARS)),
            description: self
                .description
                .map(|d| truncate_chars(&d, MAX_DESCRIPTION_CHARS)),
        })
    }
}

/// Truncates to at most `max` characters, respecting char boundaries.
#[must_use]
pub fn truncate_chars(text: &str, max: usize) -> String {
    match text.char_indices().nth(max) {
        Some((byte_idx, _)) => text[..byte_idx].to_string(),
        None => text.to_string(),
    }
}
