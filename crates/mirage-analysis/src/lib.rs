//! Out-of-loop orchestration: the user-facing log and the still-frame analysis trigger.

pub mod log;
pub mod phrases;
pub mod status;
pub mod trigger;

pub use log::{LogBook, LogEntry, LogHandle, LogKind, LOG_CAPACITY};
pub use phrases::{AnalysisError, Analyzer, PhraseAnalyzer};
pub use status::AnalysisStatus;
pub use trigger::{
    AnalysisTrigger, CaptureError, FrameCapture, TriggerOutcome, DEFAULT_COOLDOWN, DEFAULT_INTERVAL,
};
