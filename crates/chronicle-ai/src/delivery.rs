//! Inline vs. attachment delivery of an activity batch.

use std::fmt::Write as _;

use chronicle_core::ActivityRecord;

use crate::error::AiError;

const ATTACHMENT_INSTRUCTION: &str = "The activity records for this period are in the attached \
file, one paragraph per activity. Use file search to read every record before calling the \
function.";

/// Size limits that decide between inline and attachment delivery.
///
/// Both bounds are exclusive: a batch exactly at either limit goes to a file.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct DeliveryLimits {
    pub max_inline_records: usize,
    pub max_inline_chars: usize,
}

impl Default for DeliveryLimits {
    fn default() -> Self {
        Self {
            max_inline_records: 1_500,
            max_inline_chars: 256_000,
        }
    }
}

/// How the user message carries its data.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Delivery {
    /// The full message text, data included.
    Inline(String),
    /// Message text plus a document to upload and attach.
    Attachment { message: String, document: String },
}

impl Delivery {
    /// Chooses delivery for `prompt` and an optional batch.
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Encode`] if the batch cannot be serialized.
    pub fn choose(
        prompt: &str,
        records: Option<&[ActivityRecord]>,
        limits: DeliveryLimits,
    ) -> Result<Self, AiError> {
        let records = match records {
            Some(records) if !records.is_empty() => records,
            _ => return Ok(Delivery::Inline(prompt.to_string())),
        };

        let serialized = serde_json::to_string(records).map_err(AiError::Encode)?;
        let fits = records.len() < limits.max_inline_records
            && prompt.chars().count() + serialized.chars().count() < limits.max_inline_chars;

        if fits {
            Ok(Delivery::Inline(format!("{prompt}\n\n{serialized}")))
        } else {
            Ok(Delivery::Attachment {
                message: format!("{prompt}\n\n{ATTACHMENT_INSTRUCTION}"),
                document: render_document(records),
            })
        }
    }

    #[must_use]
    pub fn is_attachment(&self) -> bool {
        matches!(self, Delivery::Attachment { .. })
    }
}

/// Renders records as plain text, one blank-line-separated paragraph each.
#[must_use]
pub fn render_document(records: &[ActivityRecord]) -> String {
    let mut out = String::new();
    for record in records {
        if !out.is_empty() {
            out.push('\n');
        }
        // Writing to a String cannot fail.
        let _ = writeln!(out, "Id: {}", record.id);
        let _ = writeln!(out, "Date: {}", record.activity_date);
        let _ = writeln!(out, "Subject: {}", record.subject.as_deref().unwrap_or(""));
        let _ = writeln!(
            out,
            "Description: {}",
            record.description.as_deref().unwrap_or("")
        );
    }
    out
}
