//! HTTP client for the CRM REST API.
//!
//! Wraps `reqwest` with bearer authentication, versioned URL building,
//! transient-error retry, and typed error mapping. Query and composite
//! endpoints live in [`crate::query`] and [`crate::sobjects`].

use std::time::Duration;

use reqwest::{Client, Method, Response, Url};
use serde::Serialize;

use crate::error::CrmError;
use crate::retry::retry_with_backoff;

/// Client for one CRM instance.
///
/// Cheap to share behind an `Arc`; the inner `reqwest::Client` pools
/// connections across concurrent pipeline runs.
#[derive(Debug, Clone)]
pub struct CrmClient {
    client: Client,
    base_url: Url,
    api_version: String,
    access_token: String,
    pub(crate) max_retries: u32,
    pub(crate) backoff_base_ms: u64,
}

impl CrmClient {
    /// Creates a client for `instance_url` using API `api_version`
    /// (e.g. `"v60.0"`). Retries default to 3 with a 1 s back-off base.
    ///
    /// # Errors
    ///
    /// Returns [`CrmError::Http`] if the `reqwest::Client` cannot be built,
    /// or [`CrmError::InvalidUrl`] if `instance_url` does not parse.
    pub fn new(
        instance_url: &str,
        access_token: &str,
        api_version: &str,
        timeout_secs: u64,
    ) -> Result<Self, CrmError> {
        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .user_agent("chronicle/0.1 (activity-summaries)")
            .build()?;

        // Normalise to exactly one trailing slash so Url::join appends rather
        // than replacing the last path segment.
        let normalised = format!("{}/", instance_url.trim_end_matches('/'));
        let base_url = Url::parse(&normalised).map_err(|e| CrmError::InvalidUrl {
            url: instance_url.to_owned(),
            reason: e.to_string(),
        })?;

        Ok(Self {
            client,
            base_url,
            api_version: api_version.trim_matches('/').to_owned(),
            access_token: access_token.to_owned(),
            max_retries: 3,
            backoff_base_ms: 1_000,
        })
    }

    /// Builds a client from application configuration.
    ///
    /// # Errors
    ///
    /// Same as [`CrmClient::new`].
    pub fn from_app_config(config: &chronicle_core::AppConfig) -> Result<Self, CrmError> {
        Ok(Self::new(
            &config.crm_instance_url,
            &config.crm_access_token,
            &config.crm_api_version,
            config.crm_request_timeout_secs,
        )?
        .with_retry(config.crm_max_retries, config.crm_retry_backoff_base_ms))
    }

    /// Overrides the retry policy. `max_retries` is clamped to 10 at call time.
    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    /// URL under the versioned data API, e.g. `services/data/v60.0/query`.
    pub(crate) fn api_url(&self, path: &str) -> Result<Url, CrmError> {
        let relative = format!(
            "services/data/{}/{}",
            self.api_version,
            path.trim_start_matches('/')
        );
        self.join(&relative)
    }

    /// Resolves a server-supplied path (such as `nextRecordsUrl`) against
    /// the instance URL.
    pub(crate) fn join(&self, path: &str) -> Result<Url, CrmError> {
        self.base_url
            .join(path.trim_start_matches('/'))
            .map_err(|e| CrmError::InvalidUrl {
                url: path.to_owned(),
                reason: e.to_string(),
            })
    }

    /// GETs `url` and returns the body text, retrying transient failures.
    pub(crate) async fn get_text(&self, url: &Url) -> Result<String, CrmError> {
        retry_with_backoff(self.max_retries, self.backoff_base_ms, move || async move {
            let response = self
                .client
                .get(url.clone())
                .bearer_auth(&self.access_token)
                .send()
                .await?;
            Self::read_success_body(response).await
        })
        .await
    }

    /// Sends a JSON body with `method` and returns the response text.
    ///
    /// Retried only when `retry` is set; creates must not be replayed after
    /// the server may already have applied them.
    pub(crate) async fn send_json<B: Serialize + Sync>(
        &self,
        method: Method,
        url: &Url,
        body: &B,
        retry: bool,
    ) -> Result<String, CrmError> {
        let max_retries = if retry { self.max_retries } else { 0 };
        retry_with_backoff(max_retries, self.backoff_base_ms, move || {
            let method = method.clone();
            async move {
                let response = self
                    .client
                    .request(method, url.clone())
                    .bearer_auth(&self.access_token)
                    .json(body)
                    .send()
                    .await?;
                Self::read_success_body(response).await
            }
        })
        .await
    }

    async fn read_success_body(response: Response) -> Result<String, CrmError> {
        let status = response.status();
        let body = response.text().await?;
        if status.is_success() {
            return Ok(body);
        }
        Err(CrmError::Api {
            status: status.as_u16(),
            message: extract_error_message(&body),
        })
    }
}

/// Pulls a readable message out of a CRM error body.
///
/// The REST API reports errors as `[{"errorCode": "...", "message": "..."}]`;
/// anything else is returned verbatim (trimmed to 500 characters).
pub(crate) fn extract_error_message(body: &str) -> String {
    if let Ok(serde_json::Value::Array(items)) = serde_json::from_str::<serde_json::Value>(body) {
        let joined: Vec<String> = items
            .iter()
            .filter_map(|item| {
                let message = item.get("message")?.as_str()?;
                let code = item
                    .get("errorCode")
                    .and_then(serde_json::Value::as_str)
                    .unwrap_or("ERROR");
                Some(format!("{code}: {message}"))
            })
            .collect();
        if !joined.is_empty() {
            return joined.join("; ");
        }
    }
    let trimmed = body.trim();
    if trimmed.is_empty() {
        return "empty response body".to_string();
    }
    chronicle_core::activity::truncate_chars(trimmed, 500)
}
