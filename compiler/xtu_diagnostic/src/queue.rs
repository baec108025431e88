//! Collecting sink for diagnostics.

use crate::{Diagnostic, Severity};

/// Accumulates diagnostics emitted during an import session.
///
/// Purely observational: nothing in here feeds back into importer control
/// flow. Callers drain the queue after an import and render or count as
/// they see fit.
#[derive(Default)]
pub struct DiagnosticQueue {
    diags: Vec<Diagnostic>,
    error_count: usize,
    warning_count: usize,
}

impl DiagnosticQueue {
    /// Create an empty queue.
    pub fn new() -> Self {
        Self::default()
    }

    /// Emit a diagnostic into the queue.
    pub fn emit(&mut self, diag: Diagnostic) {
        match diag.severity {
            Severity::Error => self.error_count += 1,
            Severity::Warning => self.warning_count += 1,
            Severity::Note => {}
        }
        self.diags.push(diag);
    }

    /// All diagnostics, in emission order.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        &self.diags
    }

    /// Number of error-severity diagnostics.
    pub fn error_count(&self) -> usize {
        self.error_count
    }

    /// Number of warning-severity diagnostics.
    pub fn warning_count(&self) -> usize {
        self.warning_count
    }

    /// Check if nothing has been emitted.
    pub fn is_empty(&self) -> bool {
        self.diags.is_empty()
    }

    /// Drain all diagnostics, resetting the counts.
    pub fn take_all(&mut self) -> Vec<Diagnostic> {
        self.error_count = 0;
        self.warning_count = 0;
        std::mem::take(&mut self.diags)
    }
}
