//! User-facing event log, bounded to the most recent entries.

use std::collections::VecDeque;
use std::fmt;
use std::sync::{Arc, Mutex, PoisonError};

use chrono::{DateTime, Local};
use serde::Serialize;
use uuid::Uuid;

/// Entries kept before the oldest is dropped.
pub const LOG_CAPACITY: usize = 50;

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "lowercase")]
pub enum LogKind {
    Info,
    Success,
    Warning,
    Error,
    Analysis,
}

#[derive(Debug, Clone, Serialize)]
pub struct LogEntry {
    pub id: Uuid,
    pub timestamp: DateTime<Local>,
    pub message: String,
    pub kind: LogKind,
}

impl fmt::Display for LogEntry {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "[{}] ", self.timestamp.format("%H:%M:%S"))?;
        if self.kind == LogKind::Analysis {
            f.write_str("> ")?;
        }
        f.write_str(&self.message)
    }
}

#[derive(Debug, Default)]
pub struct LogBook {
    entries: VecDeque<LogEntry>,
}

impl LogBook {
    pub fn new() -> Self {
        Self::default()
    }

    /// Append an entry, evicting the oldest beyond [`LOG_CAPACITY`].
    pub fn push(&mut self, kind: LogKind, message: impl Into<String>) -> &LogEntry {
        let message = message.into();
        match kind {
            LogKind::Info => tracing::info!(kind = "info", "{message}"),
            LogKind::Success => tracing::info!(kind = "success", "{message}"),
            LogKind::Analysis => tracing::info!(kind = "analysis", "{message}"),
            LogKind::Warning => tracing::warn!("{message}"),
            LogKind::Error => tracing::error!("{message}"),
        }

        if self.entries.len() == LOG_CAPACITY {
            self.entries.pop_front();
        }
        self.entries.push_back(LogEntry {
            id: Uuid::new_v4(),
            timestamp: Local::now(),
            message,
            kind,
        });
        &self.entries[self.entries.len() - 1]
    }

    pub fn entries(&self) -> impl Iterator<Item = &LogEntry> {
        self.entries.iter()
    }

    pub fn len(&self) -> usize {
        self.entries.len()
    }

    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}

/// Clone-safe handle to a shared [`LogBook`].
#[derive(Debug, Clone, Default)]
pub struct LogHandle {
    book: Arc<Mutex<LogBook>>,
}

impl LogHandle {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn push(&self, kind: LogKind, message: impl Into<String>) {
        let mut book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.push(kind, message);
    }

    pub fn info(&self, message: impl Into<String>) {
        self.push(LogKind::Info, message);
    }

    pub fn success(&self, message: impl Into<String>) {
        self.push(LogKind::Success, message);
    }

    pub fn warning(&self, message: impl Into<String>) {
        self.push(LogKind::Warning, message);
    }

    pub fn error(&self, message: impl Into<String>) {
        self.push(LogKind::Error, message);
    }

    pub fn analysis(&self, message: impl Into<String>) {
        self.push(LogKind::Analysis, message);
    }

    /// Copy of the current entries, oldest first.
    pub fn snapshot(&self) -> Vec<LogEntry> {
        let book = self.book.lock().unwrap_or_else(PoisonError::into_inner);
        book.entries().cloned().collect()
    }
}
