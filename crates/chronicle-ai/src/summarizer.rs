//! One forced-function AI round trip per call.
//!
//! Each call leases an assistant, a thread and optionally an uploaded file.
//! The lease is released on every exit path, including a panic in the run
//! body, which is resumed once cleanup finishes;
//! release failures are logged and never change the call's outcome.

use std::panic::AssertUnwindSafe;
use std::path::PathBuf;
use std::time::Duration;

use chronicle_core::activity::truncate_chars;
use chronicle_core::{ActivityRecord, AppConfig, FunctionSchema};
use futures::FutureExt;
use serde_json::Value;
use tokio::time::Instant;

use crate::client::{AssistantApi, AssistantsClient};
use crate::delivery::{Delivery, DeliveryLimits};
use crate::error::AiError;
use crate::types::{AssistantRequest, MessageRequest, Run, RunRequest, RunStatus};

const INSTRUCTIONS: &str = "You summarize CRM account activity for account managers. Always \
answer by calling the provided function with arguments that satisfy its schema.";

const ARGUMENT_EXCERPT_CHARS: usize = 200;

#[derive(Debug, Clone)]
pub struct SummarizerConfig {
    pub model: String,
    pub limits: DeliveryLimits,
    pub poll_interval: Duration,
    pub run_timeout: Duration,
}

impl SummarizerConfig {
    #[must_use]
    pub fn from_app_config(config: &AppConfig) -> Self {
        Self {
            model: config.openai_model.clone(),
            limits: DeliveryLimits {
                max_inline_records: config.inline_max_records,
                max_inline_chars: config.inline_max_chars,
            },
            poll_interval: Duration::from_millis(config.ai_run_poll_interval_ms),
            run_timeout: Duration::from_secs(config.ai_run_timeout_secs),
        }
    }
}

pub struct Summarizer<A = AssistantsClient> {
    api: A,
    config: SummarizerConfig,
}

/// Provider resources created during one call.
#[derive(Debug, Default)]
struct Lease {
    assistant_id: Option<String>,
    thread_id: Option<String>,
    file_id: Option<String>,
    local_file: Option<PathBuf>,
}

impl Lease {
    async fn release<A: AssistantApi + ?Sized>(self, api: &A) {
        if let Some(path) = &self.local_file {
            if let Err(e) = tokio::fs::remove_file(path).await {
                if e.kind() != std::io::ErrorKind::NotFound {
                    tracing::warn!(path = %path.display(), error = %e, "failed to remove temp file");
                }
            }
        }
        if let Some(id) = &self.file_id {
            if let Err(e) = api.delete_file(id).await {
                tracing::warn!(file_id = %id, error = %e, "failed to delete uploaded file");
            }
        }
        if let Some(id) = &self.thread_id {
            if let Err(e) = api.delete_thread(id).await {
                tracing::warn!(thread_id = %id, error = %e, "failed to delete thread");
            }
        }
        if let Some(id) = &self.assistant_id {
            if let Err(e) = api.delete_assistant(id).await {
                tracing::warn!(assistant_id = %id, error = %e, "failed to delete assistant");
            }
        }
    }
}

impl<A: AssistantApi> Summarizer<A> {
    pub fn new(api: A, config: SummarizerConfig) -> Self {
        Self { api, config }
    }

    pub fn api(&self) -> &A {
        &self.api
    }

    /// Sends `prompt` (plus `records`, if any) and returns the arguments of
    /// the forced call to `schema.name`.
    ///
    /// # Errors
    ///
    /// Returns [`AiError`] for transport failures, provider errors, run
    /// failures or timeouts, and forced-call contract violations.
    pub async fn summarize(
        &self,
        records: Option<&[ActivityRecord]>,
        prompt: &str,
        schema: &FunctionSchema,
    ) -> Result<Value, AiError> {
        let delivery = Delivery::choose(prompt, records, self.config.limits)?;
        tracing::debug!(
            function = %schema.name,
            records = records.map_or(0, <[ActivityRecord]>::len),
            attachment = delivery.is_attachment(),
            "starting summarization"
        );

        let mut lease = Lease::default();
        let outcome = AssertUnwindSafe(self.run_leased(&mut lease, delivery, schema))
            .catch_unwind()
            .await;
        lease.release(&self.api).await;
        match outcome {
            Ok(result) => result,
            Err(panic) => std::panic::resume_unwind(panic),
        }
    }

    async fn run_leased(
        &self,
        lease: &mut Lease,
        delivery: Delivery,
        schema: &FunctionSchema,
    ) -> Result<Value, AiError> {
        let assistant_id = self
            .api
            .create_assistant(&AssistantRequest::for_schema(
                &self.config.model,
                INSTRUCTIONS,
                schema,
            ))
            .await?;
        lease.assistant_id = Some(assistant_id.clone());

        let thread_id = self.api.create_thread().await?;
        lease.thread_id = Some(thread_id.clone());

        let message = match delivery {
            Delivery::Inline(text) => MessageRequest::user(text),
            Delivery::Attachment { message, document } => {
                let path = std::env::temp_dir().join(format!(
                    "chronicle-activities-{}.txt",
                    uuid::Uuid::new_v4()
                ));
                lease.local_file = Some(path.clone());
                tokio::fs::write(&path, document).await?;

                let file_id = self.api.upload_file(&path).await?;
                lease.file_id = Some(file_id.clone());
                MessageRequest::user(message).with_file(&file_id)
            }
        };
        self.api.create_message(&thread_id, &message).await?;

        let run = self
            .api
            .create_run(&thread_id, &RunRequest::forcing(&assistant_id, &schema.name))
            .await?;
        let run = self.await_terminal(&thread_id, run).await?;
        extract_arguments(&run, &schema.name)
    }

    async fn await_terminal(&self, thread_id: &str, mut run: Run) -> Result<Run, AiError> {
        let started = Instant::now();
        while run.status.is_pending() {
            if started.elapsed() >= self.config.run_timeout {
                return Err(AiError::RunTimedOut {
                    waited_secs: started.elapsed().as_secs(),
                });
            }
            tokio::time::sleep(self.config.poll_interval).await;
            run = self.api.get_run(thread_id, &run.id).await?;
        }
        Ok(run)
    }
}

/// Validates the forced call on a terminal run and parses its arguments.
fn extract_arguments(run: &Run, expected: &str) -> Result<Value, AiError> {
    match run.status {
        RunStatus::RequiresAction => {
            let call = run
                .first_function_call()
                .ok_or_else(|| AiError::NoFunctionCall {
                    status: run.status.as_str().to_string(),
                    reason: "required action carried no tool call".to_string(),
                })?;
            if call.name != expected {
                return Err(AiError::WrongFunction {
                    expected: expected.to_string(),
                    actual: call.name.clone(),
                });
            }
            serde_json::from_str(&call.arguments).map_err(|source| AiError::MalformedArguments {
                function: call.name.clone(),
                excerpt: truncate_chars(&call.arguments, ARGUMENT_EXCERPT_CHARS),
                source,
            })
        }
        RunStatus::Completed => Err(AiError::NoFunctionCall {
            status: run.status.as_str().to_string(),
            reason: "run completed without calling a function".to_string(),
        }),
        status => Err(AiError::RunFailed {
            status: status.as_str().to_string(),
            reason: run.failure_reason(),
        }),
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    fn run(value: Value) -> Run {
        serde_json::from_value(value).unwrap()
    }

    fn requires_action(name: &str, arguments: &str) -> Run {
        run(json!({
            "id": "run_1",
            "status": "requires_action",
            "required_action": {"submit_tool_outputs": {"tool_calls": [
                {"id": "call_1", "type": "function", "function": {"name": name, "arguments": arguments}}
            ]}}
        }))
    }

    #[test]
    fn arguments_of_expected_function_are_parsed() {
        let value = extract_arguments(
            &requires_action("generate_monthly_summary", r#"{"activityCount": 2}"#),
            "generate_monthly_summary",
        )
        .unwrap();
        assert_eq!(value["activityCount"], 2);
    }

    #[test]
    fn other_function_is_wrong_function() {
        let err = extract_arguments(&requires_action("other", "{}"), "generate_monthly_summary")
            .unwrap_err();
        assert!(matches!(err, AiError::WrongFunction { ref actual, .. } if actual == "other"));
        assert!(err.is_contract_violation());
    }

    #[test]
    fn invalid_json_is_malformed_with_excerpt() {
        let err = extract_arguments(
            &requires_action("generate_monthly_summary", "{\"summary\": \"<h3>Jan"),
            "generate_monthly_summary",
        )
        .unwrap_err();
        match err {
            AiError::MalformedArguments { excerpt, .. } => assert!(excerpt.starts_with("{\"summary\"")),
            other => panic!("expected MalformedArguments, got {other:?}"),
        }
    }

    #[test]
    fn completed_without_call_is_no_function_call() {
        let err = extract_arguments(&run(json!({"id": "r", "status": "completed"})), "f").unwrap_err();
        assert!(matches!(err, AiError::NoFunctionCall { .. }));
    }

    #[test]
    fn expired_run_surfaces_reason() {
        let err = extract_arguments(
            &run(json!({"id": "r", "status": "incomplete", "incomplete_details": {"reason": "max_prompt_tokens"}})),
            "f",
        )
        .unwrap_err();
        match err {
            AiError::RunFailed { status, reason } => {
                assert_eq!(status, "incomplete");
                assert_eq!(reason, "max_prompt_tokens");
            }
            other => panic!("expected RunFailed, got {other:?}"),
        }
    }
}
