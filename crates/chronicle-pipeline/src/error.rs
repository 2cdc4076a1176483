use chronicle_ai::AiError;
use chronicle_crm::CrmError;
use thiserror::Error;

/// Errors raised while processing one run.
///
/// Only [`PipelineError::Fetch`] and [`PipelineError::PageLimit`] end a run;
/// everything else is scoped to a single period and recorded in the run
/// state.
#[derive(Debug, Error)]
pub enum PipelineError {
    /// Activity records could not be retrieved.
    #[error("failed to fetch activity records: {0}")]
    Fetch(#[source] CrmError),

    /// The query kept returning cursors past the page cap.
    #[error("activity query exceeded {max_pages} pages")]
    PageLimit { max_pages: usize },

    /// The AI round trip for a period failed.
    #[error("AI summarization failed for {period}: {source}")]
    Summarize {
        period: String,
        #[source]
        source: AiError,
    },

    /// The AI answered but its output does not fit the typed contract.
    #[error("AI output for {period} did not match the expected format: {reason}")]
    InvalidOutput { period: String, reason: String },

    /// A bulk save call failed at the transport level.
    #[error("failed to save summaries for {period}: {source}")]
    Persist {
        period: String,
        #[source]
        source: CrmError,
    },
}

/// Live collaborators could not be constructed from configuration.
#[derive(Debug, Error)]
pub enum SetupError {
    #[error("failed to build CRM client: {0}")]
    Crm(#[from] CrmError),

    #[error("failed to build AI client: {0}")]
    Ai(#[from] AiError),

    #[error("failed to build callback client: {0}")]
    Callback(#[from] reqwest::Error),
}
