//! Assistants-API client and the forced-function summarizer built on it.

mod client;
mod delivery;
mod error;
mod retry;
mod summarizer;
mod types;

pub use client::{AssistantApi, AssistantsClient};
pub use delivery::{render_document, Delivery, DeliveryLimits};
pub use error::AiError;
pub use summarizer::{Summarizer, SummarizerConfig};
pub use types::{
    AssistantRequest, Attachment, FunctionCall, IncompleteDetails, MessageRequest, RequiredAction,
    Run, RunError, RunRequest, RunStatus, SubmitToolOutputs, ToolCall,
};
