//! Collects monthly results per calendar quarter.

use std::collections::BTreeMap;

use chronicle_core::{PeriodKey, Quarter};
use serde::Serialize;
use serde_json::Value;

/// Input to one quarterly summarization.
#[derive(Debug, Clone, PartialEq, Serialize)]
pub struct QuarterInput {
    pub year: i32,
    pub quarter: Quarter,
    /// Monthly AI outputs, verbatim, in arrival order.
    pub months: Vec<Value>,
    #[serde(skip)]
    pub record_count: i64,
}

impl QuarterInput {
    #[must_use]
    pub fn period(&self) -> PeriodKey {
        PeriodKey::Quarter {
            year: self.year,
            quarter: self.quarter,
        }
    }

    /// Substitutes `{{Quarter}}` and `{{Year}}` in `template` and appends the
    /// aggregation input as JSON.
    ///
    /// # Errors
    ///
    /// Returns the serialization error if the monthly outputs cannot be
    /// encoded.
    pub fn build_prompt(&self, template: &str) -> Result<String, serde_json::Error> {
        let prompt = template
            .replace("{{Quarter}}", self.quarter.label())
            .replace("{{Year}}", &self.year.to_string());
        let input = serde_json::to_string(self)?;
        Ok(format!("{prompt}\n\n{input}"))
    }
}

/// Map of `(year, quarter)` to the monthly results collected so far.
///
/// A quarter is registered as soon as one of its months is attempted, so a
/// quarter whose months all failed is still visited (and skipped) at the end.
#[derive(Debug, Default)]
pub struct QuarterAggregator {
    quarters: BTreeMap<(i32, Quarter), QuarterInput>,
}

impl QuarterAggregator {
    /// Registers the quarter containing `month_index` of `year`.
    pub fn register(&mut self, year: i32, month_index: u32) {
        let quarter = Quarter::from_month_index(month_index);
        self.quarters
            .entry((year, quarter))
            .or_insert_with(|| QuarterInput {
                year,
                quarter,
                months: Vec::new(),
                record_count: 0,
            });
    }

    /// Appends one monthly output to its quarter.
    pub fn add(&mut self, year: i32, month_index: u32, output: Value, record_count: usize) {
        self.register(year, month_index);
        let quarter = Quarter::from_month_index(month_index);
        if let Some(entry) = self.quarters.get_mut(&(year, quarter)) {
            entry.months.push(output);
            entry.record_count += i64::try_from(record_count).unwrap_or(i64::MAX);
        }
    }

    #[must_use]
    pub fn is_empty(&self) -> bool {
        self.quarters.is_empty()
    }

    /// Consumes the map, yielding quarters in chronological order.
    pub fn into_quarters(self) -> impl Iterator<Item = QuarterInput> {
        self.quarters.into_values()
    }
}

#[cfg(test)]
mod tests {
    use serde_json::json;

    use super::*;

    #[test]
    fn months_map_to_their_quarter_in_chronological_order() {
        let mut agg = QuarterAggregator::default();
        agg.add(2024, 3, json!({"m": "Apr"}), 2);
        agg.add(2023, 11, json!({"m": "Dec"}), 1);
        agg.add(2024, 0, json!({"m": "Jan"}), 5);
        agg.add(2024, 2, json!({"m": "Mar"}), 4);

        let order: Vec<_> = agg
            .into_quarters()
            .map(|q| (q.year, q.quarter, q.months.len(), q.record_count))
            .collect();
        assert_eq!(
            order,
            [
                (2023, Quarter::Q4, 1, 1),
                (2024, Quarter::Q1, 2, 9),
                (2024, Quarter::Q2, 1, 2)
            ]
        );
    }

    #[test]
    fn registered_quarter_without_results_is_kept_empty() {
        let mut agg = QuarterAggregator::default();
        agg.register(2024, 7);
        let quarters: Vec<_> = agg.into_quarters().collect();
        assert_eq!(quarters.len(), 1);
        assert!(quarters[0].months.is_empty());
        assert_eq!(quarters[0].quarter, Quarter::Q3);
    }

    #[test]
    fn prompt_substitutes_placeholders_and_appends_months_verbatim() {
        let mut agg = QuarterAggregator::default();
        let jan = json!({"summary": "<h3>Jan</h3>", "activityCount": 2});
        let feb = json!({"summary": "<h3>Feb</h3>", "activityCount": 1});
        agg.add(2024, 0, jan.clone(), 2);
        agg.add(2024, 1, feb.clone(), 1);
        let input = agg.into_quarters().next().unwrap();

        let prompt = input
            .build_prompt("Summarize {{Quarter}} of {{Year}}.")
            .unwrap();
        let (head, json_part) = prompt.split_once("\n\n").unwrap();
        assert_eq!(head, "Summarize Q1 of 2024.");

        let parsed: Value = serde_json::from_str(json_part).unwrap();
        assert_eq!(parsed["year"], 2024);
        assert_eq!(parsed["quarter"], "Q1");
        assert_eq!(parsed["months"], json!([jan, feb]));
        assert!(parsed.get("record_count").is_none());
    }
}
