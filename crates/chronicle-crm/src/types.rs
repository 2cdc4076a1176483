//! Wire types for the CRM query and composite sObject endpoints.

use chrono::NaiveDate;
use chronicle_core::SourceActivity;
use serde::{Deserialize, Serialize};

/// One page of a query result.
#[derive(Debug, Deserialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct QueryResponse {
    pub total_size: i64,
    pub done: bool,
    #[serde(default)]
    pub next_records_url: Option<String>,
    #[serde(default)]
    pub records: Vec<SourceActivity>,
}

/// Where the next page of a query comes from.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum PageCursor {
    /// First page: run the query text.
    Query(String),
    /// Later pages: follow the `nextRecordsUrl` returned by the previous page.
    Next(String),
}

/// A page of activity rows plus the cursor for the following page, if any.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct ActivityPage {
    pub records: Vec<SourceActivity>,
    pub next: Option<PageCursor>,
}

/// A summary record in the CRM's field vocabulary.
///
/// `id` is set for updates and omitted for creates. The parent reference is
/// only written on create; the relationship cannot be re-pointed afterwards.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SummaryRecord {
    #[serde(rename = "Id", skip_serializing_if = "Option::is_none")]
    pub id: Option<String>,
    #[serde(rename = "Account__c", skip_serializing_if = "Option::is_none")]
    pub account_id: Option<String>,
    #[serde(rename = "Period__c")]
    pub period: String,
    #[serde(rename = "Year__c")]
    pub year: i32,
    #[serde(rename = "Summary_Category__c")]
    pub category: String,
    #[serde(rename = "Summary_Details__c")]
    pub details_json: String,
    #[serde(rename = "Summary__c")]
    pub narrative_html: String,
    #[serde(rename = "Period_Start_Date__c", skip_serializing_if = "Option::is_none")]
    pub period_start_date: Option<NaiveDate>,
    #[serde(rename = "Record_Count__c")]
    pub record_count: i64,
}

/// Per-record outcome of a composite save, in request order.
#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct SaveResult {
    #[serde(default)]
    pub id: Option<String>,
    pub success: bool,
    #[serde(default)]
    pub errors: Vec<SaveError>,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct SaveError {
    #[serde(default)]
    pub status_code: String,
    #[serde(default)]
    pub message: String,
    #[serde(default)]
    pub fields: Vec<String>,
}

impl SaveResult {
    /// Joins the record's error messages for logging.
    #[must_use]
    pub fn error_summary(&self) -> String {
        if self.errors.is_empty() {
            return "unknown error".to_string();
        }
        self.errors
            .iter()
            .map(|e| {
                if e.fields.is_empty() {
                    format!("{}: {}", e.status_code, e.message)
                } else {
                    format!("{}: {} ({})", e.status_code, e.message, e.fields.join(", "))
                }
            })
            .collect::<Vec<_>>()
            .join("; ")
    }
}

/// Request body for composite create/update.
#[derive(Serialize)]
#[serde(rename_all = "camelCase")]
pub(crate) struct CompositeRequest<'a> {
    pub all_or_none: bool,
    pub records: Vec<CompositeRecord<'a>>,
}

#[derive(Serialize)]
pub(crate) struct CompositeRecord<'a> {
    pub attributes: Attributes<'a>,
    #[serde(flatten)]
    pub record: &'a SummaryRecord,
}

#[derive(Serialize)]
pub(crate) struct Attributes<'a> {
    #[serde(rename = "type")]
    pub object_type: &'a str,
}
