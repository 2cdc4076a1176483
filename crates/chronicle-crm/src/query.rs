//! Activity queries against the CRM query endpoint.

use crate::client::CrmClient;
use crate::error::CrmError;
use crate::types::{ActivityPage, PageCursor, QueryResponse};

/// Why an activity query was refused before it was sent.
#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum QueryRejection {
    #[error("activity query is empty")]
    Empty,
    #[error("activity query must include an ORDER BY clause")]
    MissingOrderBy,
    #[error("activity query must order by ActivityDate ascending first (found '{0}')")]
    WrongOrdering(String),
}

/// Checks that `query` returns activities in ascending date order.
///
/// The batch accumulator relies on rows arriving sorted by `ActivityDate`;
/// a query whose first sort term is anything else would scatter a month
/// across several batches.
///
/// # Errors
///
/// Returns a [`QueryRejection`] describing the first problem found.
pub fn validate_activity_query(query: &str) -> Result<(), QueryRejection> {
    let trimmed = query.trim();
    if trimmed.is_empty() {
        return Err(QueryRejection::Empty);
    }

    // Single-spaced so "ORDER\n BY" matches; ASCII uppercasing keeps byte offsets.
    let normalized = trimmed.split_whitespace().collect::<Vec<_>>().join(" ");
    let upper = normalized.to_ascii_uppercase();
    let Some(pos) = upper.rfind("ORDER BY") else {
        return Err(QueryRejection::MissingOrderBy);
    };

    let clause = &normalized[pos + "ORDER BY".len()..];
    let first_term = clause
        .split(',')
        .next()
        .unwrap_or_default()
        .split_whitespace()
        .take_while(|word| {
            !matches!(
                word.to_ascii_uppercase().as_str(),
                "LIMIT" | "OFFSET" | "FOR" | "WITH"
            )
        })
        .collect::<Vec<_>>();

    let field_ok = first_term
        .first()
        .is_some_and(|field| field.eq_ignore_ascii_case("ActivityDate"));
    let descending = first_term
        .iter()
        .skip(1)
        .any(|word| word.eq_ignore_ascii_case("DESC"));

    if field_ok && !descending {
        Ok(())
    } else {
        Err(QueryRejection::WrongOrdering(first_term.join(" ")))
    }
}

impl CrmClient {
    /// Fetches one page of activity rows.
    ///
    /// [`PageCursor::Query`] runs the query text; [`PageCursor::Next`]
    /// follows a `nextRecordsUrl` from a previous page. The returned page's
    /// `next` is `None` once the CRM reports the result set as done.
    ///
    /// # Errors
    ///
    /// Returns [`CrmError`] on transport failure, a non-2xx response, or a
    /// body that does not match the query response shape.
    pub async fn fetch_activity_page(&self, cursor: &PageCursor) -> Result<ActivityPage, CrmError> {
        let url = match cursor {
            PageCursor::Query(soql) => {
                let mut url = self.api_url("query")?;
                url.query_pairs_mut().append_pair("q", soql);
                url
            }
            PageCursor::Next(path) => self.join(path)?,
        };

        let body = self.get_text(&url).await?;
        let response: QueryResponse =
            serde_json::from_str(&body).map_err(|source| CrmError::Deserialize {
                context: "query response".to_string(),
                source,
            })?;

        tracing::debug!(
            total_size = response.total_size,
            page_records = response.records.len(),
            done = response.done,
            "fetched activity page"
        );

        let next = if response.done {
            None
        } else {
            response.next_records_url.map(PageCursor::Next)
        };

        Ok(ActivityPage {
            records: response.records,
            next,
        })
    }
}
