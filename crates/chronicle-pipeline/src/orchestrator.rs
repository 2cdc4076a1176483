//! Drives one run from fetch to callback.
//!
//! 1. Pull activity rows page by page and group them into month batches.
//! 2. Summarize and persist each batch as soon as it closes; collect its
//!    output for the quarter.
//! 3. Summarize and persist each quarter in chronological order.
//! 4. Post exactly one status callback, even if steps 1–3 panic.
//!
//! Failures are isolated per period: a month or quarter that fails is
//! recorded in the run state and processing moves on. Only a failed fetch
//! ends the run early.

use std::panic::AssertUnwindSafe;
use std::sync::Arc;
use std::time::Duration;

use chronicle_ai::{AssistantsClient, Summarizer, SummarizerConfig};
use chronicle_core::{AppConfig, MonthlySummary, PeriodKey, ProcessResult, QuarterlySummary};
use chronicle_crm::CrmClient;
use futures::FutureExt;
use serde_json::Value;

use crate::accumulator::{BatchAccumulator, MonthBatch};
use crate::error::{PipelineError, SetupError};
use crate::notify::{CallbackNotifier, CallbackReport};
use crate::persist::{PeriodResult, Rejection, ResultPersister};
use crate::ports::{ActivitySource, StatusNotifier, SummaryEngine, SummaryStore};
use crate::quarter::{QuarterAggregator, QuarterInput};
use crate::request::{PipelineConfig, SummaryJob};
use crate::source::RecordPager;

const SUCCESS_MESSAGE: &str = "Account activity summaries generated successfully.";

/// Run stages; a run only ever moves forward through them.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord)]
pub enum Stage {
    Fetching,
    MonthProcessing,
    QuarterProcessing,
    Notifying,
    Done,
}

/// Mutable state owned by one run.
#[derive(Debug)]
pub struct RunState {
    stage: Stage,
    process_result: ProcessResult,
    messages: Vec<String>,
    months_summarized: usize,
    quarters_summarized: usize,
}

impl Default for RunState {
    fn default() -> Self {
        Self {
            stage: Stage::Fetching,
            process_result: ProcessResult::Success,
            messages: Vec::new(),
            months_summarized: 0,
            quarters_summarized: 0,
        }
    }
}

impl RunState {
    fn advance(&mut self, stage: Stage) {
        if stage > self.stage {
            tracing::info!(from = ?self.stage, to = ?stage, "pipeline stage");
            self.stage = stage;
        }
    }

    fn fail(&mut self, message: String) {
        self.process_result = self.process_result.downgrade(ProcessResult::Failed);
        self.messages.push(message);
    }

    fn partial(&mut self, message: String) {
        self.process_result = self.process_result.downgrade(ProcessResult::PartialSuccess);
        self.messages.push(message);
    }

    fn record_rejections(&mut self, rejections: Vec<Rejection>) {
        for rejection in rejections {
            self.partial(format!(
                "Failed to save summary for {}: {}",
                rejection.key, rejection.reason
            ));
        }
    }

    fn message(&self) -> String {
        if self.messages.is_empty() {
            SUCCESS_MESSAGE.to_string()
        } else {
            self.messages.join("\n")
        }
    }
}

/// Final outcome of a run, as reported to the callback.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct RunReport {
    pub process_result: ProcessResult,
    pub message: String,
    pub months_summarized: usize,
    pub quarters_summarized: usize,
}

/// External collaborators of a run.
#[derive(Clone)]
pub struct PipelineDeps {
    pub source: Arc<dyn ActivitySource>,
    pub store: Arc<dyn SummaryStore>,
    pub engine: Arc<dyn SummaryEngine>,
    pub notifier: Arc<dyn StatusNotifier>,
}

impl PipelineDeps {
    /// Builds the live CRM, AI and callback clients.
    ///
    /// # Errors
    ///
    /// Returns [`SetupError`] if any HTTP client cannot be constructed.
    pub fn from_app_config(config: &AppConfig) -> Result<Self, SetupError> {
        let crm = Arc::new(CrmClient::from_app_config(config)?);
        let summarizer = Summarizer::new(
            AssistantsClient::from_app_config(config)?,
            SummarizerConfig::from_app_config(config),
        );
        let notifier = CallbackNotifier::new(Duration::from_secs(config.callback_timeout_secs))?;

        Ok(Self {
            source: crm.clone(),
            store: crm,
            engine: Arc::new(summarizer),
            notifier: Arc::new(notifier),
        })
    }
}

/// Cumulative monthly summary across the sub-batches of one month.
struct MonthAccumulation {
    period: PeriodKey,
    summary: MonthlySummary,
    /// Persisted JSON: the raw output of the first sub-batch, with the
    /// merged contract fields laid over it once later sub-batches arrive.
    details: Value,
    record_count: usize,
}

pub struct PipelineOrchestrator {
    deps: PipelineDeps,
    config: PipelineConfig,
}

impl PipelineOrchestrator {
    #[must_use]
    pub fn new(deps: PipelineDeps, config: PipelineConfig) -> Self {
        Self { deps, config }
    }

    /// Processes `job` end to end and returns the reported outcome.
    ///
    /// Never fails: every error is folded into the report, and the
    /// notifier is called exactly once.
    pub async fn run(&self, job: SummaryJob) -> RunReport {
        let mut state = RunState::default();
        tracing::info!(account = %job.account_id, "pipeline run started");

        let body = AssertUnwindSafe(self.process(&job, &mut state))
            .catch_unwind()
            .await;
        if body.is_err() {
            tracing::error!(account = %job.account_id, "pipeline run panicked");
            state.fail("Unexpected internal error while generating summaries.".to_string());
        }

        state.advance(Stage::Notifying);
        let report = RunReport {
            process_result: state.process_result,
            message: state.message(),
            months_summarized: state.months_summarized,
            quarters_summarized: state.quarters_summarized,
        };
        let callback = CallbackReport::completed(
            &job.account_id,
            &job.user_id,
            report.process_result,
            report.message.clone(),
        );
        self.deps.notifier.notify(&job.callback, &callback).await;
        state.advance(Stage::Done);

        tracing::info!(
            account = %job.account_id,
            process_result = %report.process_result,
            months = report.months_summarized,
            quarters = report.quarters_summarized,
            "pipeline run finished"
        );
        report
    }

    async fn process(&self, job: &SummaryJob, state: &mut RunState) {
        let mut pager = RecordPager::new(self.deps.source.as_ref(), &job.activity_query);
        let mut accumulator = BatchAccumulator::new(self.config.sub_batch_size);
        let mut quarters = QuarterAggregator::default();
        let mut persister = ResultPersister::new(
            Arc::clone(&self.deps.store),
            &self.config.summary_object,
            &job.account_id,
            self.config.field_max_chars,
            job.existing_summaries.clone(),
        );
        let mut current_month: Option<MonthAccumulation> = None;

        loop {
            let activity = match pager.next_record().await {
                Ok(Some(activity)) => activity,
                Ok(None) => break,
                Err(e) => {
                    tracing::error!(account = %job.account_id, error = %e, "activity fetch failed");
                    state.fail(format!("Failed to retrieve activity records: {e}"));
                    return;
                }
            };
            for batch in accumulator.push(activity) {
                state.advance(Stage::MonthProcessing);
                self.process_month(
                    job,
                    state,
                    batch,
                    &mut quarters,
                    &mut persister,
                    &mut current_month,
                )
                .await;
            }
        }

        if let Some(batch) = accumulator.finish() {
            state.advance(Stage::MonthProcessing);
            self.process_month(
                job,
                state,
                batch,
                &mut quarters,
                &mut persister,
                &mut current_month,
            )
            .await;
        }
        if accumulator.dropped() > 0 {
            tracing::warn!(
                account = %job.account_id,
                dropped = accumulator.dropped(),
                "activities without a usable date were skipped"
            );
        }

        state.advance(Stage::QuarterProcessing);
        for input in quarters.into_quarters() {
            if input.months.is_empty() {
                tracing::warn!(
                    account = %job.account_id,
                    quarter = %input.period(),
                    "no monthly summaries for quarter; skipping"
                );
                continue;
            }
            self.process_quarter(job, state, input, &mut persister).await;
        }
    }

    async fn process_month(
        &self,
        job: &SummaryJob,
        state: &mut RunState,
        batch: MonthBatch,
        quarters: &mut QuarterAggregator,
        persister: &mut ResultPersister,
        current_month: &mut Option<MonthAccumulation>,
    ) {
        let period = batch.period();
        quarters.register(batch.year, batch.month_index);

        match self
            .summarize_month(job, &batch, quarters, persister, current_month)
            .await
        {
            Ok(rejections) => {
                state.months_summarized += 1;
                state.record_rejections(rejections);
                tracing::info!(
                    account = %job.account_id,
                    period = %period,
                    sequence = batch.sequence,
                    records = batch.records.len(),
                    "month summarized"
                );
            }
            Err(e) => {
                tracing::warn!(account = %job.account_id, period = %period, error = %e, "month failed");
                state.fail(format!("Failed to process {period}: {e}"));
            }
        }
    }

    async fn summarize_month(
        &self,
        job: &SummaryJob,
        batch: &MonthBatch,
        quarters: &mut QuarterAggregator,
        persister: &mut ResultPersister,
        current_month: &mut Option<MonthAccumulation>,
    ) -> Result<Vec<Rejection>, PipelineError> {
        let period = batch.period();
        let prompt = job.monthly_prompt.replace("{{YearMonth}}", &period.to_string());

        let output = self
            .deps
            .engine
            .summarize(Some(batch.records.as_slice()), &prompt, &job.monthly_schema)
            .await
            .map_err(|source| PipelineError::Summarize {
                period: period.to_string(),
                source,
            })?;
        let summary: MonthlySummary =
            serde_json::from_value(output.clone()).map_err(|e| PipelineError::InvalidOutput {
                period: period.to_string(),
                reason: e.to_string(),
            })?;

        quarters.add(batch.year, batch.month_index, output.clone(), batch.records.len());

        let cumulative = match current_month.take() {
            Some(mut acc) if acc.period == period => {
                acc.summary.merge(summary);
                acc.record_count += batch.records.len();
                overlay_summary(&mut acc.details, &acc.summary).map_err(|e| {
                    PipelineError::InvalidOutput {
                        period: period.to_string(),
                        reason: e.to_string(),
                    }
                })?;
                acc
            }
            _ => MonthAccumulation {
                period,
                summary,
                details: output,
                record_count: batch.records.len(),
            },
        };

        let result = PeriodResult {
            period,
            output: cumulative.details.clone(),
            narrative: Some(cumulative.summary.summary.clone()),
            record_count: i64::try_from(cumulative.record_count).unwrap_or(i64::MAX),
        };
        *current_month = Some(cumulative);

        persister.persist(&[result]).await
    }

    async fn process_quarter(
        &self,
        job: &SummaryJob,
        state: &mut RunState,
        input: QuarterInput,
        persister: &mut ResultPersister,
    ) {
        let period = input.period();

        let output = match self.summarize_quarter(job, &input).await {
            Ok(output) => output,
            Err(e) => {
                tracing::warn!(account = %job.account_id, quarter = %period, error = %e, "quarter failed");
                state.fail(format!("Failed to process {period}: {e}"));
                return;
            }
        };

        let narrative = match quarter_narrative(&output, &input) {
            Ok(narrative) => narrative,
            Err(e) => {
                tracing::warn!(account = %job.account_id, quarter = %period, error = %e, "quarter output rejected");
                state.partial(format!("Quarterly summary for {period} was not saved: {e}"));
                return;
            }
        };

        let result = PeriodResult {
            period,
            output,
            narrative: Some(narrative),
            record_count: input.record_count,
        };
        match persister.persist(&[result]).await {
            Ok(rejections) => {
                state.quarters_summarized += 1;
                state.record_rejections(rejections);
                tracing::info!(account = %job.account_id, quarter = %period, "quarter summarized");
            }
            Err(e) => {
                tracing::warn!(account = %job.account_id, quarter = %period, error = %e, "quarter save failed");
                state.fail(format!("Failed to process {period}: {e}"));
            }
        }
    }

    async fn summarize_quarter(
        &self,
        job: &SummaryJob,
        input: &QuarterInput,
    ) -> Result<Value, PipelineError> {
        let period = input.period();
        let prompt = input
            .build_prompt(&job.quarterly_prompt)
            .map_err(|e| PipelineError::InvalidOutput {
                period: period.to_string(),
                reason: e.to_string(),
            })?;
        self.deps
            .engine
            .summarize(None, &prompt, &job.quarterly_schema)
            .await
            .map_err(|source| PipelineError::Summarize {
                period: period.to_string(),
                source,
            })
    }
}

/// Replaces the contract fields of `details` with those of `merged`, keeping
/// any other fields the model returned.
fn overlay_summary(details: &mut Value, merged: &MonthlySummary) -> Result<(), serde_json::Error> {
    let Value::Object(fields) = serde_json::to_value(merged)? else {
        return Ok(());
    };
    match details {
        Value::Object(target) => target.extend(fields),
        other => *other = Value::Object(fields),
    }
    Ok(())
}

/// Validates a quarterly output and returns the narrative for `input`'s
/// quarter.
fn quarter_narrative(output: &Value, input: &QuarterInput) -> Result<String, PipelineError> {
    let period = input.period();
    let parsed: QuarterlySummary =
        serde_json::from_value(output.clone()).map_err(|e| PipelineError::InvalidOutput {
            period: period.to_string(),
            reason: e.to_string(),
        })?;
    parsed
        .find_quarter(input.year, input.quarter)
        .map(|quarter| quarter.summary.clone())
        .ok_or_else(|| PipelineError::InvalidOutput {
            period: period.to_string(),
            reason: format!("no entry for {} {}", input.quarter, input.year),
        })
}
