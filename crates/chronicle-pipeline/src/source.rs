//! Lazy record pull over a paged activity source.

use std::collections::VecDeque;

use chronicle_core::SourceActivity;
use chronicle_crm::PageCursor;

use crate::error::PipelineError;
use crate::ports::ActivitySource;

/// Hard cap on pages fetched for one query.
pub const MAX_PAGES: usize = 1_000;

/// Yields activity rows one at a time, fetching the next page only when the
/// current one is exhausted.
pub struct RecordPager<'a> {
    source: &'a dyn ActivitySource,
    cursor: Option<PageCursor>,
    buffer: VecDeque<SourceActivity>,
    pages_fetched: usize,
    records_yielded: usize,
}

impl<'a> RecordPager<'a> {
    pub fn new(source: &'a dyn ActivitySource, query: &str) -> Self {
        Self {
            source,
            cursor: Some(PageCursor::Query(query.to_string())),
            buffer: VecDeque::new(),
            pages_fetched: 0,
            records_yielded: 0,
        }
    }

    /// Returns the next row, or `None` once every page has been consumed.
    ///
    /// # Errors
    ///
    /// Returns [`PipelineError::Fetch`] if a page request fails, or
    /// [`PipelineError::PageLimit`] past [`MAX_PAGES`] pages.
    pub async fn next_record(&mut self) -> Result<Option<SourceActivity>, PipelineError> {
        loop {
            if let Some(record) = self.buffer.pop_front() {
                self.records_yielded += 1;
                return Ok(Some(record));
            }

            let Some(cursor) = self.cursor.take() else {
                tracing::debug!(
                    pages = self.pages_fetched,
                    records = self.records_yielded,
                    "activity query exhausted"
                );
                return Ok(None);
            };

            self.pages_fetched += 1;
            if self.pages_fetched > MAX_PAGES {
                return Err(PipelineError::PageLimit {
                    max_pages: MAX_PAGES,
                });
            }

            let page = self
                .source
                .fetch_page(&cursor)
                .await
                .map_err(PipelineError::Fetch)?;
            self.buffer.extend(page.records);
            self.cursor = page.next;
        }
    }

    #[must_use]
    pub fn pages_fetched(&self) -> usize {
        self.pages_fetched
    }
}
