//! Maps period results onto summary records and saves them.

use std::collections::HashMap;
use std::sync::Arc;

use chronicle_core::activity::truncate_chars;
use chronicle_core::PeriodKey;
use chronicle_crm::{SaveResult, SummaryRecord};
use serde_json::Value;

use crate::error::PipelineError;
use crate::ports::SummaryStore;

/// JSON paths tried, in order, when a result carries no narrative.
const NARRATIVE_POINTERS: [&str; 2] = ["/summary", "/yearlySummary/0/quarters/0/summary"];

/// One period's output ready to be saved.
#[derive(Debug, Clone, PartialEq)]
pub struct PeriodResult {
    pub period: PeriodKey,
    pub output: Value,
    pub narrative: Option<String>,
    pub record_count: i64,
}

/// A record the CRM refused, identified by its lookup key.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct Rejection {
    pub key: String,
    pub reason: String,
}

/// Create-or-update writer for one account's summaries.
///
/// Holds the existing-record lookup for the run; ids of records it creates
/// are added so a later write to the same period becomes an update.
pub struct ResultPersister {
    store: Arc<dyn SummaryStore>,
    object_type: String,
    account_id: String,
    field_max_chars: usize,
    lookup: HashMap<String, String>,
}

impl ResultPersister {
    pub fn new(
        store: Arc<dyn SummaryStore>,
        object_type: &str,
        account_id: &str,
        field_max_chars: usize,
        lookup: HashMap<String, String>,
    ) -> Self {
        Self {
            store,
            object_type: object_type.to_string(),
            account_id: account_id.to_string(),
            field_max_chars,
            lookup,
        }
    }

    #[must_use]
    pub fn known_id(&self, period: &PeriodKey) -> Option<&str> {
        self.lookup.get(&period.lookup_key()).map(String::as_str)
    }

    /// Saves `results`, creating unknown periods and updating known ones.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Persist`] if a bulk call fails at the
    /// transport level. Per-record refusals are returned as [`Rejection`]s.
    pub async fn persist(&mut self, results: &[PeriodResult]) -> Result<Vec<Rejection>, PipelineError> {
        let mut creates: Vec<(String, SummaryRecord)> = Vec::new();
        let mut updates: Vec<(String, SummaryRecord)> = Vec::new();

        for result in results {
            let key = result.period.lookup_key();
            match self.lookup.get(&key) {
                Some(id) => {
                    let record = self.to_record(result, Some(id.clone()));
                    updates.push((key, record));
                }
                None => {
                    let record = self.to_record(result, None);
                    creates.push((key, record));
                }
            }
        }

        let mut rejections = Vec::new();

        if !creates.is_empty() {
            let records: Vec<SummaryRecord> = creates.iter().map(|(_, r)| r.clone()).collect();
            let saved = self
                .store
                .create_records(&self.object_type, &records)
                .await
                .map_err(|source| PipelineError::Persist {
                    period: join_keys(&creates),
                    source,
                })?;
            for (key, outcome) in pair_outcomes(&creates, saved) {
                match outcome {
                    Ok(Some(id)) => {
                        tracing::debug!(account = %self.account_id, key = %key, id = %id, "summary created");
                        self.lookup.insert(key, id);
                    }
                    Ok(None) => {
                        tracing::warn!(account = %self.account_id, key = %key, "summary created without an id");
                    }
                    Err(reason) => {
                        tracing::warn!(account = %self.account_id, key = %key, reason = %reason, "summary create rejected");
                        rejections.push(Rejection { key, reason });
                    }
                }
            }
        }

        if !updates.is_empty() {
            let records: Vec<SummaryRecord> = updates.iter().map(|(_, r)| r.clone()).collect();
            let saved = self
                .store
                .update_records(&self.object_type, &records)
                .await
                .map_err(|source| PipelineError::Persist {
                    period: join_keys(&updates),
                    source,
                })?;
            for (key, outcome) in pair_outcomes(&updates, saved) {
                if let Err(reason) = outcome {
                    tracing::warn!(account = %self.account_id, key = %key, reason = %reason, "summary update rejected");
                    rejections.push(Rejection { key, reason });
                }
            }
        }

        Ok(rejections)
    }

    fn to_record(&self, result: &PeriodResult, id: Option<String>) -> SummaryRecord {
        let narrative = result
            .narrative
            .clone()
            .filter(|text| !text.trim().is_empty())
            .or_else(|| extract_narrative(&result.output))
            .unwrap_or_default();
        let is_create = id.is_none();

        SummaryRecord {
            id,
            account_id: is_create.then(|| self.account_id.clone()),
            period: result.period.label().to_string(),
            year: result.period.year(),
            category: result.period.category().as_str().to_string(),
            details_json: truncate_chars(&result.output.to_string(), self.field_max_chars),
            narrative_html: truncate_chars(&narrative, self.field_max_chars),
            period_start_date: result.period.start_date(),
            record_count: result.record_count,
        }
    }
}

/// First non-empty string found at one of the known narrative paths.
#[must_use]
pub fn extract_narrative(output: &Value) -> Option<String> {
    NARRATIVE_POINTERS
        .iter()
        .filter_map(|pointer| output.pointer(pointer)?.as_str())
        .find(|text| !text.trim().is_empty())
        .map(str::to_string)
}

fn join_keys(items: &[(String, SummaryRecord)]) -> String {
    items
        .iter()
        .map(|(key, _)| key.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

/// Pairs each request key with its outcome; a missing response entry counts
/// as a rejection.
fn pair_outcomes(
    requested: &[(String, SummaryRecord)],
    saved: Vec<SaveResult>,
) -> Vec<(String, Result<Option<String>, String>)> {
    let mut saved = saved.into_iter();
    requested
        .iter()
        .map(|(key, _)| {
            let outcome = match saved.next() {
                Some(result) if result.success => Ok(result.id),
                Some(result) => Err(result.error_summary()),
                None => Err("no result returned for record".to_string()),
            };
            (key.clone(), outcome)
        })
        .collect()
}
