//! Seams between the orchestrator and the outside world.
//!
//! Production wiring uses [`CrmClient`], [`Summarizer`] and
//! [`CallbackNotifier`](crate::notify::CallbackNotifier); tests substitute
//! in-memory fakes.

use async_trait::async_trait;
use chronicle_ai::{AiError, AssistantApi, Summarizer};
use chronicle_core::{ActivityRecord, FunctionSchema};
use chronicle_crm::{ActivityPage, CrmClient, CrmError, PageCursor, SaveResult, SummaryRecord};
use serde_json::Value;

use crate::notify::{CallbackReport, CallbackTarget};

/// Page-at-a-time access to activity rows.
#[async_trait]
pub trait ActivitySource: Send + Sync {
    async fn fetch_page(&self, cursor: &PageCursor) -> Result<ActivityPage, CrmError>;
}

/// Bulk create/update of summary records.
#[async_trait]
pub trait SummaryStore: Send + Sync {
    async fn create_records(
        &self,
        object_type: &str,
        records: &[SummaryRecord],
    ) -> Result<Vec<SaveResult>, CrmError>;

    async fn update_records(
        &self,
        object_type: &str,
        records: &[SummaryRecord],
    ) -> Result<Vec<SaveResult>, CrmError>;
}

/// One forced-function AI call returning the function's arguments.
#[async_trait]
pub trait SummaryEngine: Send + Sync {
    async fn summarize(
        &self,
        records: Option<&[ActivityRecord]>,
        prompt: &str,
        schema: &FunctionSchema,
    ) -> Result<Value, AiError>;
}

/// Delivers the terminal run report. Never fails outward.
#[async_trait]
pub trait StatusNotifier: Send + Sync {
    async fn notify(&self, target: &CallbackTarget, report: &CallbackReport);
}

#[async_trait]
impl ActivitySource for CrmClient {
    async fn fetch_page(&self, cursor: &PageCursor) -> Result<ActivityPage, CrmError> {
        self.fetch_activity_page(cursor).await
    }
}

#[async_trait]
impl SummaryStore for CrmClient {
    async fn create_records(
        &self,
        object_type: &str,
        records: &[SummaryRecord],
    ) -> Result<Vec<SaveResult>, CrmError> {
        CrmClient::create_records(self, object_type, records).await
    }

    async fn update_records(
        &self,
        object_type: &str,
        records: &[SummaryRecord],
    ) -> Result<Vec<SaveResult>, CrmError> {
        CrmClient::update_records(self, object_type, records).await
    }
}

#[async_trait]
impl<A: AssistantApi> SummaryEngine for Summarizer<A> {
    async fn summarize(
        &self,
        records: Option<&[ActivityRecord]>,
        prompt: &str,
        schema: &FunctionSchema,
    ) -> Result<Value, AiError> {
        Summarizer::summarize(self, records, prompt, schema).await
    }
}
