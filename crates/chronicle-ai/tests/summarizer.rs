//! Summarizer lifecycle tests against an in-memory `AssistantApi`.

use std::panic::AssertUnwindSafe;
use std::path::{Path, PathBuf};
use std::sync::Mutex;
use std::time::Duration;

use async_trait::async_trait;
use chrono::NaiveDate;
use chronicle_ai::{
    AiError, AssistantApi, AssistantRequest, DeliveryLimits, MessageRequest, Run, RunRequest,
    Summarizer, SummarizerConfig,
};
use chronicle_core::{ActivityRecord, FunctionSchema};
use futures::FutureExt;
use serde_json::json;

#[derive(Default)]
struct FakeApi {
    calls: Mutex<Vec<String>>,
    messages: Mutex<Vec<MessageRequest>>,
    uploaded: Mutex<Option<(PathBuf, String)>>,
    /// Returned in order by create_run then get_run; the last one repeats.
    runs: Mutex<Vec<serde_json::Value>>,
    fail_message: bool,
    fail_thread_delete: bool,
    panic_on_run: bool,
}

impl FakeApi {
    fn with_runs(runs: Vec<serde_json::Value>) -> Self {
        Self {
            runs: Mutex::new(runs),
            ..Self::default()
        }
    }

    fn log(&self, call: impl Into<String>) {
        self.calls.lock().unwrap().push(call.into());
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }

    fn next_run(&self) -> Run {
        let mut runs = self.runs.lock().unwrap();
        let value = if runs.len() > 1 {
            runs.remove(0)
        } else {
            runs[0].clone()
        };
        serde_json::from_value(value).unwrap()
    }
}

#[async_trait]
impl AssistantApi for FakeApi {
    async fn create_assistant(&self, request: &AssistantRequest) -> Result<String, AiError> {
        self.log(format!("create_assistant:{}", request.tools.len()));
        Ok("asst_1".into())
    }

    async fn create_thread(&self) -> Result<String, AiError> {
        self.log("create_thread");
        Ok("thread_1".into())
    }

    async fn upload_file(&self, path: &Path) -> Result<String, AiError> {
        self.log("upload_file");
        let content = std::fs::read_to_string(path).unwrap();
        *self.uploaded.lock().unwrap() = Some((path.to_path_buf(), content));
        Ok("file_1".into())
    }

    async fn create_message(
        &self,
        _thread_id: &str,
        message: &MessageRequest,
    ) -> Result<String, AiError> {
        self.log("create_message");
        if self.fail_message {
            return Err(AiError::Api {
                status: 400,
                message: "bad message".into(),
            });
        }
        self.messages.lock().unwrap().push(message.clone());
        Ok("msg_1".into())
    }

    async fn create_run(&self, _thread_id: &str, request: &RunRequest) -> Result<Run, AiError> {
        self.log(format!(
            "create_run:{}",
            request.tool_choice["function"]["name"].as_str().unwrap_or_default()
        ));
        if self.panic_on_run {
            panic!("run creation blew up");
        }
        Ok(self.next_run())
    }

    async fn get_run(&self, _thread_id: &str, _run_id: &str) -> Result<Run, AiError> {
        self.log("get_run");
        Ok(self.next_run())
    }

    async fn delete_file(&self, file_id: &str) -> Result<(), AiError> {
        self.log(format!("delete_file:{file_id}"));
        Ok(())
    }

    async fn delete_thread(&self, thread_id: &str) -> Result<(), AiError> {
        self.log(format!("delete_thread:{thread_id}"));
        if self.fail_thread_delete {
            return Err(AiError::Api {
                status: 500,
                message: "boom".into(),
            });
        }
        Ok(())
    }

    async fn delete_assistant(&self, assistant_id: &str) -> Result<(), AiError> {
        self.log(format!("delete_assistant:{assistant_id}"));
        Ok(())
    }
}

fn config(limits: DeliveryLimits) -> SummarizerConfig {
    SummarizerConfig {
        model: "gpt-test".into(),
        limits,
        poll_interval: Duration::from_millis(0),
        run_timeout: Duration::from_secs(5),
    }
}

fn pending() -> serde_json::Value {
    json!({"id": "run_1", "status": "in_progress"})
}

fn called(name: &str, arguments: &str) -> serde_json::Value {
    json!({
        "id": "run_1",
        "status": "requires_action",
        "required_action": {"submit_tool_outputs": {"tool_calls": [
            {"id": "call_1", "type": "function", "function": {"name": name, "arguments": arguments}}
        ]}}
    })
}

fn records(n: usize) -> Vec<ActivityRecord> {
    (0..n)
        .map(|i| ActivityRecord {
            id: format!("00T{i}"),
            activity_date: NaiveDate::from_ymd_opt(2024, 1, 2).unwrap(),
            subject: Some(format!("Call {i}")),
            description: Some("Discussed renewal".into()),
        })
        .collect()
}

#[tokio::test]
async fn inline_call_polls_until_function_is_invoked() {
    let api = FakeApi::with_runs(vec![
        pending(),
        pending(),
        called("generate_monthly_summary", r#"{"summary":"<h3>Jan</h3>"}"#),
    ]);
    let summarizer = Summarizer::new(api, config(DeliveryLimits::default()));

    let batch = records(2);
    let value = summarizer
        .summarize(Some(&batch), "Summarize January 2024", &FunctionSchema::monthly())
        .await
        .expect("summarize should succeed");

    assert_eq!(value["summary"], "<h3>Jan</h3>");
}

#[tokio::test]
async fn attachment_is_uploaded_and_everything_is_cleaned_up() {
    let api = FakeApi::with_runs(vec![called("generate_monthly_summary", "{}")]);
    let limits = DeliveryLimits {
        max_inline_records: 2,
        max_inline_chars: 1_000_000,
    };
    let summarizer = Summarizer::new(api, config(limits));

    let batch = records(2);
    summarizer
        .summarize(Some(&batch), "Summarize", &FunctionSchema::monthly())
        .await
        .expect("summarize should succeed");

    let api = summarizer_api(&summarizer);
    let (path, content) = api.uploaded.lock().unwrap().clone().expect("file uploaded");
    assert!(content.contains("Id: 00T0"));
    assert!(!path.exists(), "temp file should be removed");

    let message = api.messages.lock().unwrap()[0].clone();
    assert_eq!(message.attachments.len(), 1);
    assert_eq!(message.attachments[0].file_id, "file_1");

    let calls = api.calls();
    assert_eq!(
        &calls[calls.len() - 3..],
        ["delete_file:file_1", "delete_thread:thread_1", "delete_assistant:asst_1"]
    );
}

#[tokio::test]
async fn failure_midway_still_releases_created_resources() {
    let api = FakeApi {
        fail_message: true,
        ..FakeApi::with_runs(vec![pending()])
    };
    let summarizer = Summarizer::new(api, config(DeliveryLimits::default()));

    let err = summarizer
        .summarize(None, "Summarize Q1", &FunctionSchema::quarterly())
        .await
        .expect_err("message creation fails");
    assert!(matches!(err, AiError::Api { status: 400, .. }));

    let calls = summarizer_api(&summarizer).calls();
    assert!(calls.contains(&"delete_thread:thread_1".to_string()));
    assert!(calls.contains(&"delete_assistant:asst_1".to_string()));
    assert!(!calls.iter().any(|c| c.starts_with("delete_file")));
}

#[tokio::test]
async fn panic_midway_still_releases_created_resources() {
    let api = FakeApi {
        panic_on_run: true,
        ..FakeApi::with_runs(vec![pending()])
    };
    let summarizer = Summarizer::new(api, config(DeliveryLimits::default()));

    let outcome = AssertUnwindSafe(summarizer.summarize(
        None,
        "Summarize Q1",
        &FunctionSchema::quarterly(),
    ))
    .catch_unwind()
    .await;
    assert!(outcome.is_err(), "panic is resumed after cleanup");

    let calls = summarizer_api(&summarizer).calls();
    assert!(calls.contains(&"delete_thread:thread_1".to_string()));
    assert!(calls.contains(&"delete_assistant:asst_1".to_string()));
}

#[tokio::test]
async fn cleanup_failure_does_not_mask_result() {
    let api = FakeApi {
        fail_thread_delete: true,
        ..FakeApi::with_runs(vec![called("generate_quarterly_summary", r#"{"yearlySummary":[]}"#)])
    };
    let summarizer = Summarizer::new(api, config(DeliveryLimits::default()));

    let value = summarizer
        .summarize(None, "Summarize Q1", &FunctionSchema::quarterly())
        .await
        .expect("cleanup errors are only logged");
    assert!(value["yearlySummary"].is_array());
    assert!(summarizer_api(&summarizer)
        .calls()
        .contains(&"delete_assistant:asst_1".to_string()));
}

#[tokio::test]
async fn wrong_function_is_a_contract_violation() {
    let api = FakeApi::with_runs(vec![called("generate_quarterly_summary", "{}")]);
    let summarizer = Summarizer::new(api, config(DeliveryLimits::default()));

    let err = summarizer
        .summarize(None, "Summarize", &FunctionSchema::monthly())
        .await
        .unwrap_err();
    assert!(err.is_contract_violation());
}

#[tokio::test]
async fn run_that_never_finishes_times_out() {
    let api = FakeApi::with_runs(vec![pending()]);
    let mut cfg = config(DeliveryLimits::default());
    cfg.poll_interval = Duration::from_millis(5);
    cfg.run_timeout = Duration::from_millis(30);
    let summarizer = Summarizer::new(api, cfg);

    let err = summarizer
        .summarize(None, "Summarize", &FunctionSchema::monthly())
        .await
        .unwrap_err();
    assert!(matches!(err, AiError::RunTimedOut { .. }));
    assert!(summarizer_api(&summarizer)
        .calls()
        .contains(&"delete_thread:thread_1".to_string()));
}

fn summarizer_api(summarizer: &Summarizer<FakeApi>) -> &FakeApi {
    summarizer.api()
}
