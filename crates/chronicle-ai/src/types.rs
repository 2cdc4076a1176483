//! Wire types for the assistants, threads, files and runs endpoints.

use chronicle_core::FunctionSchema;
use serde::{Deserialize, Serialize};
use serde_json::{json, Value};

/// Body for `POST /assistants`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct AssistantRequest {
    pub model: String,
    pub name: String,
    pub instructions: String,
    pub tools: Vec<Value>,
}

impl AssistantRequest {
    /// An assistant that can call `schema` and search attached files.
    #[must_use]
    pub fn for_schema(model: &str, instructions: &str, schema: &FunctionSchema) -> Self {
        Self {
            model: model.to_string(),
            name: format!("chronicle-{}", schema.name),
            instructions: instructions.to_string(),
            tools: vec![
                json!({
                    "type": "function",
                    "function": {
                        "name": schema.name,
                        "description": schema.description,
                        "parameters": schema.parameters,
                    }
                }),
                json!({"type": "file_search"}),
            ],
        }
    }
}

/// Body for `POST /threads/{id}/messages`.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct MessageRequest {
    pub role: &'static str,
    pub content: String,
    #[serde(skip_serializing_if = "Vec::is_empty")]
    pub attachments: Vec<Attachment>,
}

impl MessageRequest {
    #[must_use]
    pub fn user(content: String) -> Self {
        Self {
            role: "user",
            content,
            attachments: Vec::new(),
        }
    }

    /// Attaches an uploaded file for the file-search tool.
    #[must_use]
    pub fn with_file(mut self, file_id: &str) -> Self {
        self.attachments.push(Attachment {
            file_id: file_id.to_string(),
            tools: vec![json!({"type": "file_search"})],
        });
        self
    }
}

#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct Attachment {
    pub file_id: String,
    pub tools: Vec<Value>,
}

/// Body for `POST /threads/{id}/runs` forcing one named function.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct RunRequest {
    pub assistant_id: String,
    pub tool_choice: Value,
}

impl RunRequest {
    #[must_use]
    pub fn forcing(assistant_id: &str, function_name: &str) -> Self {
        Self {
            assistant_id: assistant_id.to_string(),
            tool_choice: json!({"type": "function", "function": {"name": function_name}}),
        }
    }
}

/// Any object the provider identifies by `id` (assistant, thread, file, message).
#[derive(Debug, Clone, Deserialize)]
pub(crate) struct ObjectRef {
    pub id: String,
}

/// Lifecycle state of a run.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Deserialize)]
#[serde(rename_all = "snake_case")]
pub enum RunStatus {
    Queued,
    InProgress,
    RequiresAction,
    Cancelling,
    Cancelled,
    Failed,
    Completed,
    Incomplete,
    Expired,
    #[serde(other)]
    Unknown,
}

impl RunStatus {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            RunStatus::Queued => "queued",
            RunStatus::InProgress => "in_progress",
            RunStatus::RequiresAction => "requires_action",
            RunStatus::Cancelling => "cancelling",
            RunStatus::Cancelled => "cancelled",
            RunStatus::Failed => "failed",
            RunStatus::Completed => "completed",
            RunStatus::Incomplete => "incomplete",
            RunStatus::Expired => "expired",
            RunStatus::Unknown => "unknown",
        }
    }

    /// Still moving; poll again.
    #[must_use]
    pub fn is_pending(self) -> bool {
        matches!(
            self,
            RunStatus::Queued | RunStatus::InProgress | RunStatus::Cancelling | RunStatus::Unknown
        )
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct Run {
    pub id: String,
    pub status: RunStatus,
    #[serde(default)]
    pub required_action: Option<RequiredAction>,
    #[serde(default)]
    pub last_error: Option<RunError>,
    #[serde(default)]
    pub incomplete_details: Option<IncompleteDetails>,
}

impl Run {
    /// The first tool call the run is waiting on, if any.
    #[must_use]
    pub fn first_function_call(&self) -> Option<&FunctionCall> {
        self.required_action
            .as_ref()?
            .submit_tool_outputs
            .tool_calls
            .first()
            .map(|call| &call.function)
    }

    /// Provider-supplied reason for a failed or incomplete run.
    #[must_use]
    pub fn failure_reason(&self) -> String {
        if let Some(err) = &self.last_error {
            return format!("{}: {}", err.code, err.message);
        }
        if let Some(details) = &self.incomplete_details {
            return details.reason.clone();
        }
        "no reason given".to_string()
    }
}

#[derive(Debug, Clone, Deserialize)]
pub struct RequiredAction {
    pub submit_tool_outputs: SubmitToolOutputs,
}

#[derive(Debug, Clone, Deserialize)]
pub struct SubmitToolOutputs {
    #[serde(default)]
    pub tool_calls: Vec<ToolCall>,
}

#[derive(Debug, Clone, Deserialize)]
pub struct ToolCall {
    pub id: String,
    pub function: FunctionCall,
}

#[derive(Debug, Clone, PartialEq, Eq, Deserialize)]
pub struct FunctionCall {
    pub name: String,
    pub arguments: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct RunError {
    #[serde(default)]
    pub code: String,
    #[serde(default)]
    pub message: String,
}

#[derive(Debug, Clone, Deserialize)]
pub struct IncompleteDetails {
    #[serde(default)]
    pub reason: String,
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn requires_action_run_exposes_function_call() {
        let run: Run = serde_json::from_value(json!({
            "id": "run_1",
            "object": "thread.run",
            "status": "requires_action",
            "required_action": {
                "type": "submit_tool_outputs",
                "submit_tool_outputs": {"tool_calls": [{
                    "id": "call_1",
                    "type": "function",
                    "function": {"name": "generate_monthly_summary", "arguments": "{}"}
                }]}
            }
        }))
        .unwrap();
        assert_eq!(run.status, RunStatus::RequiresAction);
        assert_eq!(
            run.first_function_call().map(|c| c.name.as_str()),
            Some("generate_monthly_summary")
        );
    }

    #[test]
    fn unknown_status_keeps_polling() {
        let run: Run = serde_json::from_value(json!({"id": "run_1", "status": "paused"})).unwrap();
        assert_eq!(run.status, RunStatus::Unknown);
        assert!(run.status.is_pending());
    }

    #[test]
    fn failure_reason_prefers_last_error() {
        let run: Run = serde_json::from_value(json!({
            "id": "run_1",
            "status": "failed",
            "last_error": {"code": "rate_limit_exceeded", "message": "quota"}
        }))
        .unwrap();
        assert_eq!(run.failure_reason(), "rate_limit_exceeded: quota");
    }

    #[test]
    fn run_request_forces_named_function() {
        let body = serde_json::to_value(RunRequest::forcing("asst_1", "generate_quarterly_summary"))
            .unwrap();
        assert_eq!(body["tool_choice"]["function"]["name"], "generate_quarterly_summary");
    }
}
