//! Terminal status callback.

use std::time::Duration;

use async_trait::async_trait;
use chronicle_core::ProcessResult;
use serde::Serialize;

use crate::ports::StatusNotifier;

/// Where and how to deliver the run report.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct CallbackTarget {
    pub url: String,
    pub token: String,
}

/// Body posted to the caller when a run ends.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CallbackReport {
    pub account_id: String,
    #[serde(rename = "loggedinUserId")]
    pub logged_in_user_id: String,
    pub status: &'static str,
    pub process_result: ProcessResult,
    pub message: String,
}

impl CallbackReport {
    #[must_use]
    pub fn completed(
        account_id: &str,
        user_id: &str,
        process_result: ProcessResult,
        message: String,
    ) -> Self {
        Self {
            account_id: account_id.to_string(),
            logged_in_user_id: user_id.to_string(),
            status: "Completed",
            process_result,
            message,
        }
    }
}

/// Posts the report as JSON with a bearer token.
#[derive(Debug, Clone)]
pub struct CallbackNotifier {
    client: reqwest::Client,
}

impl CallbackNotifier {
    /// # Errors
    ///
    /// Returns the builder error if the HTTP client cannot be constructed.
    pub fn new(timeout: Duration) -> Result<Self, reqwest::Error> {
        let client = reqwest::Client::builder()
            .timeout(timeout)
            .user_agent("chronicle/0.1 (activity-summaries)")
            .build()?;
        Ok(Self { client })
    }
}

#[async_trait]
impl StatusNotifier for CallbackNotifier {
    async fn notify(&self, target: &CallbackTarget, report: &CallbackReport) {
        let result = self
            .client
            .post(&target.url)
            .bearer_auth(&target.token)
            .json(report)
            .send()
            .await;

        match result {
            Ok(response) if response.status().is_success() => {
                tracing::info!(
                    account = %report.account_id,
                    process_result = %report.process_result,
                    "status callback delivered"
                );
            }
            Ok(response) => {
                tracing::warn!(
                    account = %report.account_id,
                    status = response.status().as_u16(),
                    "status callback rejected"
                );
            }
            Err(e) => {
                tracing::warn!(
                    account = %report.account_id,
                    error = %e,
                    "status callback failed"
                );
            }
        }
    }
}
