//! Diagnostic reporting for cross-translation-unit import.
//!
//! - Error codes for searchability (E4xxx: import and merge)
//! - Builder-style diagnostics with labeled locations and notes
//! - A collecting queue the importer emits into
//!
//! Diagnostics here report ODR-style inconsistencies discovered while
//! merging declarations; they are observational and never abort an
//! import.

mod diagnostic;
mod error_code;
mod queue;

pub use diagnostic::{Diagnostic, Label, Severity};
pub use error_code::ErrorCode;
pub use queue::DiagnosticQueue;
