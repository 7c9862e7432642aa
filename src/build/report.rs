//! Progress and diagnostic reporting for the builder.
//!
//! The builder never logs through global state of its own; callers hand it a
//! [`Reporter`].

use std::sync::Mutex;

use tracing::{info, warn};

/// Receives builder diagnostics.
pub trait Reporter: Send + Sync {
    fn info(&self, message: &str);
    fn warn(&self, message: &str);
    fn progress(&self, step: &str, current: usize, total: usize);
}

/// Forwards everything to `tracing`.
#[derive(Debug, Clone, Copy, Default)]
pub struct TracingReporter;

impl Reporter for TracingReporter {
    fn info(&self, message: &str) {
        info!("{message}");
    }

    fn warn(&self, message: &str) {
        warn!("{message}");
    }

    fn progress(&self, step: &str, current: usize, total: usize) {
        info!(step, current, total, "progress");
    }
}

/// Severity of a collected entry.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Warn,
    Progress,
}

/// Stores every message in memory.
#[derive(Debug, Default)]
pub struct CollectingReporter {
    entries: Mutex<Vec<(ReportLevel, String)>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn entries(&self) -> Vec<(ReportLevel, String)> {
        self.entries
            .lock()
            .map(|e| e.clone())
            .unwrap_or_default()
    }

    /// Messages at one level, in arrival order.
    pub fn messages(&self, level: ReportLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    fn push(&self, level: ReportLevel, message: String) {
        if let Ok(mut entries) = self.entries.lock() {
            entries.push((level, message));
        }
    }
}

impl Reporter for CollectingReporter {
    fn info(&self, message: &str) {
        self.push(ReportLevel::Info, message.to_string());
    }

    fn warn(&self, message: &str) {
        self.push(ReportLevel::Warn, message.to_string());
    }

    fn progress(&self, step: &str, current: usize, total: usize) {
        self.push(ReportLevel::Progress, format!("{step} {current}/{total}"));
    }
}
