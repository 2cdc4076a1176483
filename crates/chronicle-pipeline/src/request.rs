//! Trigger request validation and per-run configuration.

use std::collections::HashMap;

use chronicle_core::schema::SchemaRejection;
use chronicle_core::{AppConfig, FunctionSchema, MONTHLY_FUNCTION_NAME, QUARTERLY_FUNCTION_NAME};
use chronicle_crm::validate_activity_query;
use serde::Deserialize;
use serde_json::Value;
use thiserror::Error;

use crate::notify::CallbackTarget;

/// A trigger request was malformed; nothing was processed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("{field}: {message}")]
pub struct ValidationError {
    pub field: &'static str,
    pub message: String,
}

impl ValidationError {
    fn new(field: &'static str, message: impl Into<String>) -> Self {
        Self {
            field,
            message: message.into(),
        }
    }
}

/// Trigger request as received from a caller.
#[derive(Debug, Clone, Default, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct PipelineRequest {
    #[serde(default)]
    pub account_id: String,
    #[serde(default)]
    pub user_id: String,
    #[serde(default)]
    pub callback_url: String,
    #[serde(default)]
    pub callback_token: String,
    #[serde(default)]
    pub monthly_prompt: String,
    #[serde(default)]
    pub quarterly_prompt: String,
    #[serde(default)]
    pub activity_query: String,
    /// Existing summary ids keyed by `"Jan 2024"` / `"Q1 2024"`.
    #[serde(default)]
    pub existing_summaries: HashMap<String, String>,
    #[serde(default)]
    pub monthly_schema: Option<Value>,
    #[serde(default)]
    pub quarterly_schema: Option<Value>,
}

/// A validated request, ready to run.
#[derive(Debug, Clone)]
pub struct SummaryJob {
    pub account_id: String,
    pub user_id: String,
    pub callback: CallbackTarget,
    pub monthly_prompt: String,
    pub quarterly_prompt: String,
    pub activity_query: String,
    pub existing_summaries: HashMap<String, String>,
    pub monthly_schema: FunctionSchema,
    pub quarterly_schema: FunctionSchema,
}

impl PipelineRequest {
    /// Checks every field and resolves the output schemas.
    ///
    /// # Errors
    ///
    /// Returns the first [`ValidationError`] found.
    pub fn validate(self) -> Result<SummaryJob, ValidationError> {
        let required = [
            ("accountId", &self.account_id),
            ("userId", &self.user_id),
            ("callbackUrl", &self.callback_url),
            ("callbackToken", &self.callback_token),
            ("monthlyPrompt", &self.monthly_prompt),
            ("quarterlyPrompt", &self.quarterly_prompt),
            ("activityQuery", &self.activity_query),
        ];
        for (field, value) in required {
            if value.trim().is_empty() {
                return Err(ValidationError::new(field, "is required"));
            }
        }

        let url = reqwest::Url::parse(self.callback_url.trim())
            .map_err(|e| ValidationError::new("callbackUrl", format!("is not a valid URL: {e}")))?;
        if !matches!(url.scheme(), "http" | "https") {
            return Err(ValidationError::new(
                "callbackUrl",
                "must use http or https",
            ));
        }

        validate_activity_query(&self.activity_query)
            .map_err(|e| ValidationError::new("activityQuery", e.to_string()))?;

        for (key, id) in &self.existing_summaries {
            if id.trim().is_empty() {
                return Err(ValidationError::new(
                    "existingSummaries",
                    format!("'{key}' has an empty record id"),
                ));
            }
        }

        let monthly_schema = resolve_schema(
            "monthlySchema",
            self.monthly_schema,
            MONTHLY_FUNCTION_NAME,
            FunctionSchema::monthly,
        )?;
        let quarterly_schema = resolve_schema(
            "quarterlySchema",
            self.quarterly_schema,
            QUARTERLY_FUNCTION_NAME,
            FunctionSchema::quarterly,
        )?;

        Ok(SummaryJob {
            account_id: self.account_id.trim().to_string(),
            user_id: self.user_id.trim().to_string(),
            callback: CallbackTarget {
                url: url.to_string(),
                token: self.callback_token,
            },
            monthly_prompt: self.monthly_prompt,
            quarterly_prompt: self.quarterly_prompt,
            activity_query: self.activity_query,
            existing_summaries: self.existing_summaries,
            monthly_schema,
            quarterly_schema,
        })
    }
}

fn resolve_schema(
    field: &'static str,
    value: Option<Value>,
    expected_name: &str,
    builtin: fn() -> FunctionSchema,
) -> Result<FunctionSchema, ValidationError> {
    match value {
        None | Some(Value::Null) => Ok(builtin()),
        Some(value) => FunctionSchema::from_override(value, expected_name).map_err(
            |rejection: SchemaRejection| ValidationError::new(field, rejection.to_string()),
        ),
    }
}

/// Per-run tuning passed to the orchestrator.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct PipelineConfig {
    /// API name of the summary object in the CRM.
    pub summary_object: String,
    pub sub_batch_size: usize,
    pub field_max_chars: usize,
}

impl Default for PipelineConfig {
    fn default() -> Self {
        Self {
            summary_object: "Account_Summary__c".to_string(),
            sub_batch_size: 500,
            field_max_chars: 131_070,
        }
    }
}

impl PipelineConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            summary_object: config.crm_summary_object.clone(),
            sub_batch_size: config.sub_batch_size,
            field_max_chars: config.field_max_chars,
        }
    }
}

#[cfg(test)]
#[path = "request_test.rs"]
mod tests;
