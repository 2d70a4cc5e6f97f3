use std::fmt;

use serde::Serialize;

/// Lifecycle of one analysis request. Anything but `Idle` means busy.
#[derive(Debug, Clone, Copy, Default, PartialEq, Eq, Serialize)]
#[serde(rename_all = "SCREAMING_SNAKE_CASE")]
pub enum AnalysisStatus {
    #[default]
    Idle,
    Capturing,
    Analyzing,
    Complete,
    Error,
}

impl AnalysisStatus {
    pub fn is_busy(self) -> bool {
        self != AnalysisStatus::Idle
    }
}

impl fmt::Display for AnalysisStatus {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        f.write_str(match self {
            AnalysisStatus::Idle => "IDLE",
            AnalysisStatus::Capturing => "CAPTURING",
            AnalysisStatus::Analyzing => "ANALYZING",
            AnalysisStatus::Complete => "COMPLETE",
            AnalysisStatus::Error => "ERROR",
        })
    }
}
