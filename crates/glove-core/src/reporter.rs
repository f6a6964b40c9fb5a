//! Diagnostic reporting capability injected into the analyzers
//!
//! Analyses never write to a UI directly. They hand informational messages,
//! warnings and recovered degeneracies to an [`AnalysisReporter`].

use crate::error::GloveError;
use std::sync::Mutex;

/// Sink for analysis diagnostics
pub trait AnalysisReporter: Send + Sync {
    /// Progress or result information
    fn info(&self, message: &str);

    /// Something unexpected that did not stop the analysis
    fn warn(&self, message: &str);

    /// A computation degenerated and a fallback result was substituted
    fn degraded(&self, cause: &GloveError) {
        self.warn(&format!("{}; using fallback result", cause));
    }
}

/// Forwards diagnostics to `tracing`
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingReporter;

impl AnalysisReporter for TracingReporter {
    fn info(&self, message: &str) {
        tracing::info!("{}", message);
    }

    fn warn(&self, message: &str) {
        tracing::warn!("{}", message);
    }

    fn degraded(&self, cause: &GloveError) {
        tracing::warn!(error = %cause, "analysis fell back to a degraded result");
    }
}

/// Severity of a collected diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ReportLevel {
    Info,
    Warning,
    Degraded,
}

/// Buffers diagnostics in memory for later display or inspection
#[derive(Debug, Default)]
pub struct CollectingReporter {
    entries: Mutex<Vec<(ReportLevel, String)>>,
}

impl CollectingReporter {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    pub fn entries(&self) -> Vec<(ReportLevel, String)> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Messages of one level
    pub fn messages(&self, level: ReportLevel) -> Vec<String> {
        self.entries()
            .into_iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m)
            .collect()
    }

    fn push(&self, level: ReportLevel, message: String) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push((level, message)),
            Err(poisoned) => poisoned.into_inner().push((level, message)),
        }
    }
}

impl AnalysisReporter for CollectingReporter {
    fn info(&self, message: &str) {
        self.push(ReportLevel::Info, message.to_string());
    }

    fn warn(&self, message: &str) {
        self.push(ReportLevel::Warning, message.to_string());
    }

    fn degraded(&self, cause: &GloveError) {
        self.push(ReportLevel::Degraded, cause.to_string());
    }
}
