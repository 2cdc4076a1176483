use serde::{Deserialize, Serialize};

/// Terminal outcome of one pipeline run, as reported to the callback.
///
/// Outcomes only ever get worse within a run: `Success` can drop to
/// `PartialSuccess` or `Failed`, `PartialSuccess` can drop to `Failed`.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize, Default)]
pub enum ProcessResult {
    #[default]
    Success,
    PartialSuccess,
    Failed,
}

impl ProcessResult {
    fn severity(self) -> u8 {
        match self {
            ProcessResult::Success => 0,
            ProcessResult::PartialSuccess => 1,
            ProcessResult::Failed => 2,
        }
    }

    /// Returns the worse of `self` and `other`.
    #[must_use]
    pub fn downgrade(self, other: ProcessResult) -> ProcessResult {
        if other.severity() > self.severity() {
            other
        } else {
            self
        }
    }

    #[must_use]
    pub fn as_str(self) -> &'static str {
        match self {
            ProcessResult::Success => "Success",
            ProcessResult::PartialSuccess => "PartialSuccess",
            ProcessResult::Failed => "Failed",
        }
    }
}

impl std::fmt::Display for ProcessResult {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.as_str())
    }
}
