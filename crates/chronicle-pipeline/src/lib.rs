//! Activity → monthly → quarterly summary pipeline.
//!
//! [`PipelineOrchestrator::run`] is the entry point; everything it talks to
//! goes through the traits in [`ports`].

pub mod accumulator;
pub mod error;
pub mod notify;
pub mod orchestrator;
pub mod persist;
pub mod ports;
pub mod quarter;
pub mod request;
pub mod source;

pub use accumulator::{BatchAccumulator, MonthBatch};
pub use error::{PipelineError, SetupError};
pub use notify::{CallbackNotifier, CallbackReport, CallbackTarget};
pub use orchestrator::{PipelineDeps, PipelineOrchestrator, RunReport, Stage};
pub use persist::{extract_narrative, PeriodResult, Rejection, ResultPersister};
pub use ports::{ActivitySource, StatusNotifier, SummaryEngine, SummaryStore};
pub use quarter::{QuarterAggregator, QuarterInput};
pub use request::{PipelineConfig, PipelineRequest, SummaryJob, ValidationError};
pub use source::{RecordPager, MAX_PAGES};
