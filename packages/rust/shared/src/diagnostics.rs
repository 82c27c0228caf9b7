//! Append-only diagnostics sink.
//!
//! Expected failure modes (bad codes, bad numbering, failed construction)
//! are recorded here instead of raised, so a pass always completes and tests
//! assert on counts. Every appended record is also mirrored to `tracing`.

use chrono::{DateTime, Utc};
use serde::{Deserialize, Serialize};
use tracing::{debug, error, warn};

/// Severity of a diagnostic record.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Level {
    Info,
    Warning,
    Error,
    /// An absorbed failure that would have been an exception in a
    /// raise-happy design (e.g. a duplicate name during construction).
    Exception,
}

/// One diagnostic record.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct Diagnostic {
    pub level: Level,
    /// Component that reported the condition (e.g. `"builder"`).
    pub module: String,
    /// Operation in progress (e.g. `"create"`).
    pub operation: String,
    pub message: String,
    pub at: DateTime<Utc>,
}

/// Append-only collection of diagnostic records for a document build.
///
/// Deliberately not cleared by `Builder::clear` — it is the audit trail
/// across passes.
#[derive(Debug, Default, Clone, Serialize, Deserialize)]
pub struct Diagnostics {
    entries: Vec<Diagnostic>,
}

impl Diagnostics {
    /// Create an empty sink.
    pub fn new() -> Self {
        Self::default()
    }

    fn append(&mut self, level: Level, module: &str, operation: &str, message: String) {
        self.entries.push(Diagnostic {
            level,
            module: module.to_string(),
            operation: operation.to_string(),
            message,
            at: Utc::now(),
        });
    }

    /// Record an informational message.
    pub fn info(&mut self, module: &str, operation: &str, message: impl Into<String>) {
        let message = message.into();
        debug!(module, operation, %message, "diagnostic");
        self.append(Level::Info, module, operation, message);
    }

    /// Record a warning.
    pub fn warning(&mut self, module: &str, operation: &str, message: impl Into<String>) {
        let message = message.into();
        warn!(module, operation, %message, "diagnostic");
        self.append(Level::Warning, module, operation, message);
    }

    /// Record a data-quality error; the pass continues.
    pub fn error(&mut self, module: &str, operation: &str, message: impl Into<String>) {
        let message = message.into();
        error!(module, operation, %message, "diagnostic");
        self.append(Level::Error, module, operation, message);
    }

    /// Record an absorbed failure.
    pub fn exception(&mut self, module: &str, operation: &str, message: impl Into<String>) {
        let message = message.into();
        error!(module, operation, %message, "absorbed failure");
        self.append(Level::Exception, module, operation, message);
    }

    /// All records, in append order.
    pub fn entries(&self) -> &[Diagnostic] {
        &self.entries
    }

    /// Number of records at a given level.
    pub fn count(&self, level: Level) -> usize {
        self.entries.iter().filter(|d| d.level == level).count()
    }

    /// Errors plus absorbed failures.
    pub fn error_count(&self) -> usize {
        self.count(Level::Error) + self.count(Level::Exception)
    }

    /// Total record count.
    pub fn len(&self) -> usize {
        self.entries.len()
    }

    /// Whether nothing has been recorded.
    pub fn is_empty(&self) -> bool {
        self.entries.is_empty()
    }
}
