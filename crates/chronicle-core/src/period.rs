//! Calendar periods: months, quarters, and the keys summary records are
//! stored under.

use chrono::NaiveDate;
use serde::{Deserialize, Serialize};

const MONTH_NAMES: [&str; 12] = [
    "January",
    "February",
    "March",
    "April",
    "May",
    "June",
    "July",
    "August",
    "September",
    "October",
    "November",
    "December",
];

/// Full English month name for a zero-based month index.
///
/// Indices past 11 wrap, so callers never need to handle a missing name.
#[must_use]
pub fn month_name(month_index: u32) -> &'static str {
    MONTH_NAMES[(month_index % 12) as usize]
}

/// Calendar quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Hash, Serialize, Deserialize)]
pub enum Quarter {
    Q1,
    Q2,
    Q3,
    Q4,
}

impl Quarter {
    /// Quarter containing a zero-based month index: 0–2 Q1, 3–5 Q2, 6–8 Q3,
    /// 9–11 Q4.
    #[must_use]
    pub fn from_month_index(month_index: u32) -> Self {
        match month_index % 12 {
            0..=2 => Quarter::Q1,
            3..=5 => Quarter::Q2,
            6..=8 => Quarter::Q3,
            _ => Quarter::Q4,
        }
    }

    #[must_use]
    pub fn label(self) -> &'static str {
        match self {
            Quarter::Q1 => "Q1",
            Quarter::Q2 => "Q2",
            Quarter::Q3 => "Q3",
            Quarter::Q4 => "Q4",
        }
    }

    /// Zero-based index of the quarter's first month.
    #[must_use]
    pub fn first_month_index(self) -> u32 {
        match self {
            Quarter::Q1 => 0,
            Quarter::Q2 => 3,
            Quarter::Q3 => 6,
            Quarter::Q4 => 9,
        }
    }

    /// First day of the quarter in `year`.
    #[must_use]
    pub fn start_date(self, year: i32) -> Option<NaiveDate> {
        NaiveDate::from_ymd_opt(year, self.first_month_index() + 1, 1)
    }
}

impl std::fmt::Display for Quarter {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.label())
    }
}

/// Which tier a persisted summary belongs to.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum SummaryCategory {
    Monthly,
    Quarterly,
}

impl SummaryCategory {
    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            SummaryCategory::Monthly => "Monthly",
            SummaryCategory::Quarterly => "Quarterly",
        }
    }
}

impl std::fmt::Display for SummaryCategory {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}

/// Identity of one summary period.
///
/// Renders as the lookup key callers use for existing records:
/// `"Jan 2024"` for a month, `"Q1 2024"` for a quarter.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, PartialOrd, Ord)]
pub enum PeriodKey {
    Month { year: i32, month_index: u32 },
    Quarter { year: i32, quarter: Quarter },
}

impl PeriodKey {
    #[must_use]
    pub fn year(&self) -> i32 {
        match *self {
            PeriodKey::Month { year, .. } | PeriodKey::Quarter { year, .. } => year,
        }
    }

    #[must_use]
    pub fn category(&self) -> SummaryCategory {
        match self {
            PeriodKey::Month { .. } => SummaryCategory::Monthly,
            PeriodKey::Quarter { .. } => SummaryCategory::Quarterly,
        }
    }

    /// Period label stored on the record: the full month name or the
    /// quarter label.
    #[must_use]
    pub fn label(&self) -> &'static str {
        match *self {
            PeriodKey::Month { month_index, .. } => month_name(month_index),
            PeriodKey::Quarter { quarter, .. } => quarter.label(),
        }
    }

    /// Abbreviated label used in lookup keys (`Jan`, `Q1`).
    #[must_use]
    pub fn short_label(&self) -> &'static str {
        match *self {
            PeriodKey::Month { month_index, .. } => &month_name(month_index)[..3],
            PeriodKey::Quarter { quarter, .. } => quarter.label(),
        }
    }

    /// First day of the period.
    #[must_use]
    pub fn start_date(&self) -> Option<NaiveDate> {
        match *self {
            PeriodKey::Month { year, month_index } => {
                NaiveDate::from_ymd_opt(year, month_index % 12 + 1, 1)
            }
            PeriodKey::Quarter { year, quarter } => quarter.start_date(year),
        }
    }

    #[must_use]
    pub fn lookup_key(&self) -> String {
        format!("{} {}", self.short_label(), self.year())
    }
}

impl std::fmt::Display for PeriodKey {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        write!(f, "{} {}", self.label(), self.year())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn quarter_ranges_cover_every_month() {
        let expected = [
            Quarter::Q1,
            Quarter::Q1,
            Quarter::Q1,
            Quarter::Q2,
            Quarter::Q2,
            Quarter::Q2,
            Quarter::Q3,
            Quarter::Q3,
            Quarter::Q3,
            Quarter::Q4,
            Quarter::Q4,
            Quarter::Q4,
        ];
        for (idx, quarter) in expected.iter().enumerate() {
            assert_eq!(Quarter::from_month_index(idx as u32), *quarter, "month {idx}");
        }
    }

    #[test]
    fn month_lookup_key_uses_abbreviation() {
        let key = PeriodKey::Month {
            year: 2024,
            month_index: 0,
        };
        assert_eq!(key.lookup_key(), "Jan 2024");
        assert_eq!(key.label(), "January");
        assert_eq!(key.to_string(), "January 2024");
    }

    #[test]
    fn quarter_lookup_key() {
        let key = PeriodKey::Quarter {
            year: 2023,
            quarter: Quarter::Q4,
        };
        assert_eq!(key.lookup_key(), "Q4 2023");
        assert_eq!(key.category(), SummaryCategory::Quarterly);
    }

    #[test]
    fn start_dates() {
        let month = PeriodKey::Month {
            year: 2024,
            month_index: 10,
        };
        assert_eq!(month.start_date(), NaiveDate::from_ymd_opt(2024, 11, 1));
        assert_eq!(
            Quarter::Q3.start_date(2024),
            NaiveDate::from_ymd_opt(2024, 7, 1)
        );
    }

    #[test]
    fn month_name_wraps() {
        assert_eq!(month_name(2), "March");
        assert_eq!(month_name(14), "March");
    }
}
