//! HTTP client for the assistants API.
//!
//! [`AssistantApi`] is the seam the summarizer drives; [`AssistantsClient`]
//! is the production implementation over `reqwest`.

use std::path::Path;
use std::time::Duration;

use async_trait::async_trait;
use reqwest::header::{HeaderMap, HeaderValue};
use reqwest::multipart::{Form, Part};
use reqwest::{Client, RequestBuilder, Response};
use serde::de::DeserializeOwned;

use crate::error::AiError;
use crate::retry::retry_with_backoff;
use crate::types::{AssistantRequest, MessageRequest, ObjectRef, Run, RunRequest};

/// Operations the summarizer needs from the provider.
#[async_trait]
pub trait AssistantApi: Send + Sync {
    async fn create_assistant(&self, request: &AssistantRequest) -> Result<String, AiError>;
    async fn create_thread(&self) -> Result<String, AiError>;
    async fn upload_file(&self, path: &Path) -> Result<String, AiError>;
    async fn create_message(
        &self,
        thread_id: &str,
        message: &MessageRequest,
    ) -> Result<String, AiError>;
    async fn create_run(&self, thread_id: &str, request: &RunRequest) -> Result<Run, AiError>;
    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AiError>;
    async fn delete_file(&self, file_id: &str) -> Result<(), AiError>;
    async fn delete_thread(&self, thread_id: &str) -> Result<(), AiError>;
    async fn delete_assistant(&self, assistant_id: &str) -> Result<(), AiError>;
}

#[derive(Debug, Clone)]
pub struct AssistantsClient {
    client: Client,
    base_url: String,
    api_key: String,
    max_retries: u32,
    backoff_base_ms: u64,
}

impl AssistantsClient {
    /// Creates a client against `base_url` (e.g. `https://api.openai.com/v1`).
    ///
    /// # Errors
    ///
    /// Returns [`AiError::Http`] if the `reqwest::Client` cannot be built.
    pub fn new(base_url: &str, api_key: &str, timeout_secs: u64) -> Result<Self, AiError> {
        let mut headers = HeaderMap::new();
        headers.insert("OpenAI-Beta", HeaderValue::from_static("assistants=v2"));

        let client = Client::builder()
            .timeout(Duration::from_secs(timeout_secs))
            .connect_timeout(Duration::from_secs(10))
            .default_headers(headers)
            .user_agent("chronicle/0.1 (activity-summaries)")
            .build()?;

        Ok(Self {
            client,
            base_url: base_url.trim_end_matches('/').to_string(),
            api_key: api_key.to_string(),
            max_retries: 3,
            backoff_base_ms: 1_000,
        })
    }

    /// Builds a client from application configuration.
    ///
    /// # Errors
    ///
    /// Same as [`AssistantsClient::new`].
    pub fn from_app_config(config: &chronicle_core::AppConfig) -> Result<Self, AiError> {
        Ok(Self::new(
            &config.openai_base_url,
            &config.openai_api_key,
            config.ai_request_timeout_secs,
        )?
        .with_retry(config.ai_max_retries, 1_000))
    }

    #[must_use]
    pub fn with_retry(mut self, max_retries: u32, backoff_base_ms: u64) -> Self {
        self.max_retries = max_retries;
        self.backoff_base_ms = backoff_base_ms;
        self
    }

    fn url(&self, path: &str) -> String {
        format!("{}/{}", self.base_url, path.trim_start_matches('/'))
    }

    async fn send<T: DeserializeOwned>(
        &self,
        request: RequestBuilder,
        context: &str,
    ) -> Result<T, AiError> {
        let response = request.bearer_auth(&self.api_key).send().await?;
        let body = read_success_body(response).await?;
        serde_json::from_str(&body).map_err(|source| AiError::Deserialize {
            context: context.to_string(),
            source,
        })
    }

    async fn post_json<B, T>(&self, path: &str, body: &B, context: &str) -> Result<T, AiError>
    where
        B: serde::Serialize + Sync,
        T: DeserializeOwned,
    {
        self.send(self.client.post(self.url(path)).json(body), context)
            .await
    }

    /// DELETE with retry; a 404 means the object is already gone.
    async fn delete(&self, path: &str) -> Result<(), AiError> {
        let url = self.url(path);
        let result = retry_with_backoff(self.max_retries, self.backoff_base_ms, move || {
            let url = url.clone();
            async move {
                let response = self
                    .client
                    .delete(url)
                    .bearer_auth(&self.api_key)
                    .send()
                    .await?;
                read_success_body(response).await
            }
        })
        .await;

        match result {
            Ok(_) | Err(AiError::Api { status: 404, .. }) => Ok(()),
            Err(e) => Err(e),
        }
    }
}

#[async_trait]
impl AssistantApi for AssistantsClient {
    async fn create_assistant(&self, request: &AssistantRequest) -> Result<String, AiError> {
        let created: ObjectRef = self.post_json("assistants", request, "assistant").await?;
        Ok(created.id)
    }

    async fn create_thread(&self) -> Result<String, AiError> {
        let created: ObjectRef = self
            .post_json("threads", &serde_json::json!({}), "thread")
            .await?;
        Ok(created.id)
    }

    async fn upload_file(&self, path: &Path) -> Result<String, AiError> {
        let bytes = tokio::fs::read(path).await?;
        let file_name = path
            .file_name()
            .map_or_else(|| "activities.txt".to_string(), |n| n.to_string_lossy().into_owned());
        let part = Part::bytes(bytes)
            .file_name(file_name)
            .mime_str("text/plain")?;
        let form = Form::new().text("purpose", "assistants").part("file", part);

        let created: ObjectRef = self
            .send(self.client.post(self.url("files")).multipart(form), "file upload")
            .await?;
        Ok(created.id)
    }

    async fn create_message(
        &self,
        thread_id: &str,
        message: &MessageRequest,
    ) -> Result<String, AiError> {
        let created: ObjectRef = self
            .post_json(&format!("threads/{thread_id}/messages"), message, "message")
            .await?;
        Ok(created.id)
    }

    async fn create_run(&self, thread_id: &str, request: &RunRequest) -> Result<Run, AiError> {
        self.post_json(&format!("threads/{thread_id}/runs"), request, "run")
            .await
    }

    async fn get_run(&self, thread_id: &str, run_id: &str) -> Result<Run, AiError> {
        let url = self.url(&format!("threads/{thread_id}/runs/{run_id}"));
        retry_with_backoff(self.max_retries, self.backoff_base_ms, move || {
            let url = url.clone();
            async move { self.send(self.client.get(url), "run status").await }
        })
        .await
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), AiError> {
        self.delete(&format!("files/{file_id}")).await
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), AiError> {
        self.delete(&format!("threads/{thread_id}")).await
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<(), AiError> {
        self.delete(&format!("assistants/{assistant_id}")).await
    }
}

async fn read_success_body(response: Response) -> Result<String, AiError> {
    let status = response.status();
    let body = response.text().await?;
    if status.is_success() {
        return Ok(body);
    }
    Err(AiError::Api {
        status: status.as_u16(),
        message: extract_error_message(&body),
    })
}

/// Pulls `error.message` out of a provider error body, falling back to the
/// raw text.
fn extract_error_message(body: &str) -> String {
    serde_json::from_str::<serde_json::Value>(body)
        .ok()
        .and_then(|v| v.pointer("/error/message")?.as_str().map(str::to_owned))
        .unwrap_or_else(|| {
            let trimmed = body.trim();
            if trimmed.is_empty() {
                "empty response body".to_string()
            } else {
                chronicle_core::activity::truncate_chars(trimmed, 500)
            }
        })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn error_message_reads_provider_envelope() {
        let body = r#"{"error":{"message":"No assistant found","type":"invalid_request_error"}}"#;
        assert_eq!(extract_error_message(body), "No assistant found");
        assert_eq!(extract_error_message("gateway timeout"), "gateway timeout");
    }

    #[test]
    fn url_joins_without_double_slash() {
        let client = AssistantsClient::new("https://api.example.com/v1/", "k", 5).unwrap();
        assert_eq!(
            client.url("/threads/t1/runs"),
            "https://api.example.com/v1/threads/t1/runs"
        );
    }
}
