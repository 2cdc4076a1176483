//! Groups a date-ordered activity stream into month batches.

use chrono::Datelike;
use chronicle_core::{month_name, ActivityRecord, PeriodKey, SourceActivity};

/// Contiguous records of one calendar month. Never empty.
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct MonthBatch {
    pub year: i32,
    /// Zero-based month (0 = January).
    pub month_index: u32,
    /// Sub-batch number within the month, starting at 0.
    pub sequence: u32,
    pub records: Vec<ActivityRecord>,
}

impl MonthBatch {
    #[must_use]
    pub fn period(&self) -> PeriodKey {
        PeriodKey::Month {
            year: self.year,
            month_index: self.month_index,
        }
    }

    #[must_use]
    pub fn month_name(&self) -> &'static str {
        month_name(self.month_index)
    }
}

/// State machine over the current `(year, month)` and its open record list.
#[derive(Debug)]
pub struct BatchAccumulator {
    sub_batch_size: usize,
    current: Option<(i32, u32)>,
    sequence: u32,
    open: Vec<ActivityRecord>,
    dropped: usize,
}

impl BatchAccumulator {
    /// `sub_batch_size` is clamped to at least 1.
    #[must_use]
    pub fn new(sub_batch_size: usize) -> Self {
        Self {
            sub_batch_size: sub_batch_size.max(1),
            current: None,
            sequence: 0,
            open: Vec::new(),
            dropped: 0,
        }
    }

    /// Feeds one row and returns the batches it closed, oldest first.
    ///
    /// At most two batches come back: the previous month when the period
    /// changes, and the new open list if it immediately fills up.
    pub fn push(&mut self, activity: SourceActivity) -> Vec<MonthBatch> {
        let id = activity.id.clone();
        let record = match activity.into_record() {
            Ok(record) => record,
            Err(issue) => {
                self.dropped += 1;
                tracing::warn!(activity_id = %id, reason = %issue, "dropping activity without a usable date");
                return Vec::new();
            }
        };

        let period = (
            record.activity_date.year(),
            record.activity_date.month0(),
        );
        let mut closed = Vec::new();

        if self.current != Some(period) {
            if let Some(batch) = self.take_open() {
                closed.push(batch);
            }
            self.current = Some(period);
            self.sequence = 0;
        }

        self.open.push(record);

        if self.open.len() >= self.sub_batch_size {
            if let Some(batch) = self.take_open() {
                closed.push(batch);
            }
            self.sequence += 1;
        }

        closed
    }

    /// Emits whatever is still open at end of stream.
    pub fn finish(&mut self) -> Option<MonthBatch> {
        self.take_open()
    }

    /// Rows dropped for a missing or unparseable date.
    #[must_use]
    pub fn dropped(&self) -> usize {
        self.dropped
    }

    fn take_open(&mut self) -> Option<MonthBatch> {
        if self.open.is_empty() {
            return None;
        }
        let (year, month_index) = self.current?;
        Some(MonthBatch {
            year,
            month_index,
            sequence: self.sequence,
            records: std::mem::take(&mut self.open),
        })
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn activity(id: &str, date: Option<&str>) -> SourceActivity {
        SourceActivity {
            id: id.into(),
            activity_date: date.map(Into::into),
            subject: Some("subject".into()),
            description: None,
        }
    }

    fn drain(acc: &mut BatchAccumulator, rows: Vec<SourceActivity>) -> Vec<MonthBatch> {
        let mut batches = Vec::new();
        for row in rows {
            batches.extend(acc.push(row));
        }
        batches.extend(acc.finish());
        batches
    }

    #[test]
    fn one_batch_per_month_in_order() {
        let mut acc = BatchAccumulator::new(500);
        let batches = drain(
            &mut acc,
            vec![
                activity("1", Some("2024-01-03")),
                activity("2", Some("2024-01-20")),
                activity("3", Some("2024-02-01")),
                activity("4", Some("2024-03-31T10:00:00.000+0000")),
            ],
        );

        let labels: Vec<_> = batches
            .iter()
            .map(|b| (b.month_name(), b.records.len()))
            .collect();
        assert_eq!(labels, [("January", 2), ("February", 1), ("March", 1)]);
        assert!(batches.iter().all(|b| b.sequence == 0));
    }

    #[test]
    fn oversized_month_is_split_into_numbered_sub_batches() {
        let mut acc = BatchAccumulator::new(3);
        let rows = (0..7)
            .map(|i| activity(&i.to_string(), Some("2024-05-10")))
            .collect();
        let batches = drain(&mut acc, rows);

        let shape: Vec<_> = batches.iter().map(|b| (b.sequence, b.records.len())).collect();
        assert_eq!(shape, [(0, 3), (1, 3), (2, 1)]);
        assert!(batches.iter().all(|b| b.month_index == 4 && b.year == 2024));
    }

    #[test]
    fn exact_multiple_leaves_nothing_open() {
        let mut acc = BatchAccumulator::new(2);
        let rows = (0..4)
            .map(|i| activity(&i.to_string(), Some("2024-05-10")))
            .collect();
        assert_eq!(drain(&mut acc, rows).len(), 2);
    }

    #[test]
    fn sequence_restarts_for_next_month() {
        let mut acc = BatchAccumulator::new(1);
        let batches = drain(
            &mut acc,
            vec![
                activity("1", Some("2024-01-03")),
                activity("2", Some("2024-01-04")),
                activity("3", Some("2024-02-01")),
            ],
        );
        let shape: Vec<_> = batches.iter().map(|b| (b.month_index, b.sequence)).collect();
        assert_eq!(shape, [(0, 0), (0, 1), (1, 0)]);
    }

    #[test]
    fn undated_rows_are_dropped_without_breaking_the_month() {
        let mut acc = BatchAccumulator::new(500);
        let batches = drain(
            &mut acc,
            vec![
                activity("1", Some("2024-01-03")),
                activity("2", None),
                activity("3", Some("not-a-date")),
                activity("4", Some("2024-01-09")),
            ],
        );
        assert_eq!(batches.len(), 1);
        assert_eq!(batches[0].records.len(), 2);
        assert_eq!(acc.dropped(), 2);
    }

    #[test]
    fn same_month_in_different_years_are_separate() {
        let mut acc = BatchAccumulator::new(500);
        let batches = drain(
            &mut acc,
            vec![
                activity("1", Some("2023-01-03")),
                activity("2", Some("2024-01-03")),
            ],
        );
        assert_eq!(batches.len(), 2);
        assert_eq!(batches[0].year, 2023);
        assert_eq!(batches[1].year, 2024);
    }
}
