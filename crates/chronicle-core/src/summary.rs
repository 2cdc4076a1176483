//! Typed views of the structured AI output contracts.
//!
//! The JSON field names here are fixed by the function schemas in
//! [`crate::schema`]; renaming anything breaks the contract with the model.

use serde::{Deserialize, Serialize};

use crate::period::Quarter;

/// One activity referenced from a monthly sub-theme.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityRef {
    #[serde(rename = "Id")]
    pub id: String,
    #[serde(rename = "LinkText")]
    pub link_text: String,
    #[serde(rename = "ActivityDate")]
    pub activity_date: String,
}

/// A sub-theme inside one monthly category.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct SubTheme {
    #[serde(rename = "Summary")]
    pub summary: String,
    #[serde(rename = "ActivityList")]
    pub activity_list: Vec<ActivityRef>,
}

/// The three fixed monthly categories.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
pub struct ActivityMapping {
    #[serde(rename = "Key Engagements")]
    pub key_engagements: Vec<SubTheme>,
    #[serde(rename = "Challenges and Risks")]
    pub challenges_and_risks: Vec<SubTheme>,
    #[serde(rename = "Opportunities and Next Steps")]
    pub opportunities_and_next_steps: Vec<SubTheme>,
}

/// Structured output of the monthly summary function.
#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct MonthlySummary {
    /// HTML narrative: one heading followed by a bullet list.
    pub summary: String,
    pub activity_mapping: ActivityMapping,
    pub activity_count: i64,
}

impl MonthlySummary {
    /// Folds a later sub-batch of the same month into this summary.
    ///
    /// Narratives are concatenated in order, category themes appended, and
    /// activity counts summed.
    pub fn merge(&mut self, later: MonthlySummary) {
        if self.summary.is_empty() {
            self.summary = later.summary;
        } else if !later.summary.is_empty() {
            self.summary.push('\n');
            self.summary.push_str(&later.summary);
        }
        let mapping = later.activity_mapping;
        self.activity_mapping
            .key_engagements
            .extend(mapping.key_engagements);
        self.activity_mapping
            .challenges_and_risks
            .extend(mapping.challenges_and_risks);
        self.activity_mapping
            .opportunities_and_next_steps
            .extend(mapping.opportunities_and_next_steps);
        self.activity_count += later.activity_count;
    }
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterActivityRef {
    pub id: String,
    pub link_text: String,
    #[serde(rename = "ActivityDate")]
    pub activity_date: String,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterCategory {
    pub category: String,
    pub summary: String,
    pub activity_list: Vec<QuarterActivityRef>,
}

#[derive(Debug, Clone, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterSummary {
    pub quarter: String,
    pub summary: String,
    pub activity_mapping: Vec<QuarterCategory>,
    #[serde(default)]
    pub activity_count: i64,
    #[serde(default)]
    pub startdate: Option<String>,
}

#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct YearSummary {
    /// The model sends the year as either a number or a string.
    pub year: serde_json::Value,
    pub quarters: Vec<QuarterSummary>,
}

/// Structured output of the quarterly summary function.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
#[serde(rename_all = "camelCase")]
pub struct QuarterlySummary {
    pub yearly_summary: Vec<YearSummary>,
}

impl QuarterlySummary {
    /// Finds the entry for `quarter` of `year`.
    ///
    /// Falls back to the only quarter present when the output contains
    /// exactly one, since the model is asked about a single quarter and
    /// sometimes labels it loosely (`"Q1 2024"`, `"First Quarter"`).
    #[must_use]
    pub fn find_quarter(&self, year: i32, quarter: Quarter) -> Option<&QuarterSummary> {
        let year_text = year.to_string();
        let label = quarter.label();

        let exact = self
            .yearly_summary
            .iter()
            .filter(|y| year_matches(&y.year, &year_text))
            .flat_map(|y| y.quarters.iter())
            .find(|q| q.quarter.trim().to_ascii_uppercase().starts_with(label));
        if exact.is_some() {
            return exact;
        }

        let mut all = self.yearly_summary.iter().flat_map(|y| y.quarters.iter());
        match (all.next(), all.next()) {
            (Some(only), None) => Some(only),
            _ => None,
        }
    }
}

fn year_matches(value: &serde_json::Value, year_text: &str) -> bool {
    match value {
        serde_json::Value::Number(n) => n.to_string() == year_text,
        serde_json::Value::String(s) => s.trim() == year_text,
        _ => false,
    }
}
