//! CRM REST client: paged activity queries and composite summary saves.

mod client;
mod error;
mod query;
mod retry;
mod sobjects;
mod types;

pub use client::CrmClient;
pub use error::CrmError;
pub use query::{validate_activity_query, QueryRejection};
pub use sobjects::COMPOSITE_CHUNK_SIZE;
pub use types::{ActivityPage, PageCursor, SaveError, SaveResult, SummaryRecord};
