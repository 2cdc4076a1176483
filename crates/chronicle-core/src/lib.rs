//! Shared domain types and configuration for Chronicle.
//!
//! Everything here is transport-agnostic: activity records as they enter
//! the pipeline, calendar period helpers, the structured AI output
//! contracts, and application configuration loaded from the environment.

pub mod activity;
pub mod app_config;
pub mod config;
pub mod period;
pub mod schema;
pub mod status;
pub mod summary;

use thiserror::Error;

pub use activity::{ActivityRecord, SourceActivity, MAX_DESCRIPTION_CHARS, MAX_SUBJECT_CHARS};
pub use app_config::{AppConfig, Environment};
pub use config::{load_app_config, load_app_config_from_env};
pub use period::{month_name, PeriodKey, Quarter, SummaryCategory};
pub use schema::{FunctionSchema, MONTHLY_FUNCTION_NAME, QUARTERLY_FUNCTION_NAME};
pub use status::ProcessResult;
pub use summary::{MonthlySummary, QuarterSummary, QuarterlySummary};

/// Errors raised while loading configuration.
#[derive(Debug, Error)]
pub enum ConfigError {
    #[error("missing required environment variable: {0}")]
    MissingEnvVar(String),

    #[error("invalid value for {var}: {reason}")]
    InvalidEnvVar { var: String, reason: String },
}
