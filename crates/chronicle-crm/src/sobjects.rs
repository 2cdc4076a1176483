//! Composite sObject create and update.
//!
//! Both calls run with `allOrNone: false`, so one bad record does not block
//! the rest; the per-record outcome comes back in request order.

use reqwest::Method;

use crate::client::CrmClient;
use crate::error::CrmError;
use crate::types::{Attributes, CompositeRecord, CompositeRequest, SaveResult, SummaryRecord};

/// Maximum records per composite request accepted by the CRM.
pub const COMPOSITE_CHUNK_SIZE: usize = 200;

impl CrmClient {
    /// Creates `records` as `object_type` rows.
    ///
    /// Not retried: a create that timed out may already have been applied.
    ///
    /// # Errors
    ///
    /// Returns [`CrmError`] if any chunk fails at the transport level or the
    /// response cannot be parsed. Per-record failures are reported in the
    /// returned [`SaveResult`]s, not as an error.
    pub async fn create_records(
        &self,
        object_type: &str,
        records: &[SummaryRecord],
    ) -> Result<Vec<SaveResult>, CrmError> {
        self.save_composite(Method::POST, object_type, records, false)
            .await
    }

    /// Updates existing `object_type` rows; every record must carry an `Id`.
    ///
    /// Updates are idempotent and retried on transient failures.
    ///
    /// # Errors
    ///
    /// Same as [`CrmClient::create_records`].
    pub async fn update_records(
        &self,
        object_type: &str,
        records: &[SummaryRecord],
    ) -> Result<Vec<SaveResult>, CrmError> {
        self.save_composite(Method::PATCH, object_type, records, true)
            .await
    }

    async fn save_composite(
        &self,
        method: Method,
        object_type: &str,
        records: &[SummaryRecord],
        retry: bool,
    ) -> Result<Vec<SaveResult>, CrmError> {
        if records.is_empty() {
            return Ok(Vec::new());
        }

        let url = self.api_url("composite/sobjects")?;
        let mut results = Vec::with_capacity(records.len());

        for chunk in records.chunks(COMPOSITE_CHUNK_SIZE) {
            let body = CompositeRequest {
                all_or_none: false,
                records: chunk
                    .iter()
                    .map(|record| CompositeRecord {
                        attributes: Attributes { object_type },
                        record,
                    })
                    .collect(),
            };

            let text = self.send_json(method.clone(), &url, &body, retry).await?;
            let chunk_results: Vec<SaveResult> =
                serde_json::from_str(&text).map_err(|source| CrmError::Deserialize {
                    context: format!("composite {method} response"),
                    source,
                })?;

            if chunk_results.len() != chunk.len() {
                tracing::warn!(
                    sent = chunk.len(),
                    received = chunk_results.len(),
                    %method,
                    "composite response length does not match request"
                );
            }
            results.extend(chunk_results);
        }

        Ok(results)
    }
}
