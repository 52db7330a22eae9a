//! Injected diagnostics for the conversion pipeline.
//!
//! Core components never log through a process-wide logger directly. They
//! receive a [`Diagnostics`] implementation: [`LogDiagnostics`] forwards to the
//! `log` facade, [`CollectingDiagnostics`] keeps everything in memory so tests
//! and callers can inspect what happened during a run.

use std::fmt;
use std::sync::Mutex;

use serde::{Deserialize, Serialize};

/// Severity of a reported diagnostic
#[derive(Debug, Clone, Copy, PartialEq, Eq, PartialOrd, Ord, Serialize, Deserialize)]
pub enum Severity {
    Debug,
    Info,
    Warning,
    Error,
}

/// One message emitted by a pipeline component
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct Diagnostic {
    pub severity: Severity,
    /// Component that produced the message (used as the log target)
    pub component: String,
    pub message: String,
    /// Zero-based index of the record the message is about, if any
    pub record: Option<usize>,
}

impl Diagnostic {
    pub fn new(severity: Severity, component: &str, message: impl Into<String>) -> Self {
        Self {
            severity,
            component: component.to_string(),
            message: message.into(),
            record: None,
        }
    }

    pub fn with_record(mut self, record: usize) -> Self {
        self.record = Some(record);
        self
    }
}

impl fmt::Display for Diagnostic {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self.record {
            Some(record) => write!(f, "[record {}] {}", record, self.message),
            None => f.write_str(&self.message),
        }
    }
}

/// Sink for diagnostics produced while converting
pub trait Diagnostics: Send + Sync {
    fn report(&self, diagnostic: Diagnostic);

    fn debug(&self, component: &str, message: String) {
        self.report(Diagnostic::new(Severity::Debug, component, message));
    }

    fn info(&self, component: &str, message: String) {
        self.report(Diagnostic::new(Severity::Info, component, message));
    }

    fn warn(&self, component: &str, message: String) {
        self.report(Diagnostic::new(Severity::Warning, component, message));
    }

    fn error(&self, component: &str, message: String) {
        self.report(Diagnostic::new(Severity::Error, component, message));
    }
}

/// Forwards diagnostics to the `log` facade
#[derive(Debug, Default, Clone, Copy)]
pub struct LogDiagnostics;

impl Diagnostics for LogDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        let target = format!("milxly2nvg::{}", diagnostic.component);
        let target = target.as_str();
        match diagnostic.severity {
            Severity::Debug => log::debug!(target: target, "{}", diagnostic),
            Severity::Info => log::info!(target: target, "{}", diagnostic),
            Severity::Warning => log::warn!(target: target, "{}", diagnostic),
            Severity::Error => log::error!(target: target, "{}", diagnostic),
        }
    }
}

/// Keeps every diagnostic in memory
#[derive(Debug, Default)]
pub struct CollectingDiagnostics {
    entries: Mutex<Vec<Diagnostic>>,
}

impl CollectingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// Snapshot of everything reported so far
    pub fn entries(&self) -> Vec<Diagnostic> {
        match self.entries.lock() {
            Ok(entries) => entries.clone(),
            Err(poisoned) => poisoned.into_inner().clone(),
        }
    }

    /// Reported diagnostics at warning severity or above
    pub fn warnings(&self) -> Vec<Diagnostic> {
        self.entries()
            .into_iter()
            .filter(|d| d.severity >= Severity::Warning)
            .collect()
    }

    pub fn count(&self, severity: Severity) -> usize {
        self.entries()
            .iter()
            .filter(|d| d.severity == severity)
            .count()
    }
}

impl Diagnostics for CollectingDiagnostics {
    fn report(&self, diagnostic: Diagnostic) {
        match self.entries.lock() {
            Ok(mut entries) => entries.push(diagnostic),
            Err(poisoned) => poisoned.into_inner().push(diagnostic),
        }
    }
}

/// Reports to two sinks at once
pub struct Tee<'a> {
    first: &'a dyn Diagnostics,
    second: &'a dyn Diagnostics,
}

impl<'a> Tee<'a> {
    pub fn new(first: &'a dyn Diagnostics, second: &'a dyn Diagnostics) -> Self {
        Self { first, second }
    }
}

impl Diagnostics for Tee<'_> {
    fn report(&self, diagnostic: Diagnostic) {
        self.first.report(diagnostic.clone());
        self.second.report(diagnostic);
    }
}
