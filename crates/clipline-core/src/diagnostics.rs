//! Diagnostics sink passed through the pipeline instead of a global logger.
//!
//! Correction and projection report recoverable faults here and carry on.
//! Binaries use [`TracingDiagnostics`]; tests use [`CapturingDiagnostics`]
//! to assert on what was reported.

use std::cell::RefCell;

/// Severity of a captured diagnostic.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Level {
    Debug,
    Info,
    Warn,
    Error,
}

/// Receiver for non-fatal pipeline events.
pub trait Diagnostics {
    fn warn(&self, message: &str);
    fn error(&self, message: &str);

    fn info(&self, _message: &str) {}
    fn debug(&self, _message: &str) {}
}

/// Forwards every event to `tracing` under the `clipline` target.
#[derive(Debug, Default, Clone, Copy)]
pub struct TracingDiagnostics;

impl Diagnostics for TracingDiagnostics {
    fn warn(&self, message: &str) {
        tracing::warn!(target: "clipline", "{message}");
    }

    fn error(&self, message: &str) {
        tracing::error!(target: "clipline", "{message}");
    }

    fn info(&self, message: &str) {
        tracing::info!(target: "clipline", "{message}");
    }

    fn debug(&self, message: &str) {
        tracing::debug!(target: "clipline", "{message}");
    }
}

/// Discards everything.
#[derive(Debug, Default, Clone, Copy)]
pub struct NullDiagnostics;

impl Diagnostics for NullDiagnostics {
    fn warn(&self, _message: &str) {}
    fn error(&self, _message: &str) {}
}

/// Records events in memory.
#[derive(Debug, Default)]
pub struct CapturingDiagnostics {
    events: RefCell<Vec<(Level, String)>>,
}

impl CapturingDiagnostics {
    pub fn new() -> Self {
        Self::default()
    }

    /// All recorded events, oldest first.
    pub fn events(&self) -> Vec<(Level, String)> {
        self.events.borrow().clone()
    }

    /// Messages recorded at exactly `level`.
    pub fn messages(&self, level: Level) -> Vec<String> {
        self.events
            .borrow()
            .iter()
            .filter(|(l, _)| *l == level)
            .map(|(_, m)| m.clone())
            .collect()
    }

    pub fn count(&self, level: Level) -> usize {
        self.events.borrow().iter().filter(|(l, _)| *l == level).count()
    }

    fn push(&self, level: Level, message: &str) {
        self.events.borrow_mut().push((level, message.to_string()));
    }
}

impl Diagnostics for CapturingDiagnostics {
    fn warn(&self, message: &str) {
        self.push(Level::Warn, message);
    }

    fn error(&self, message: &str) {
        self.push(Level::Error, message);
    }

    fn info(&self, message: &str) {
        self.push(Level::Info, message);
    }

    fn debug(&self, message: &str) {
        self.push(Level::Debug, message);
    }
}
