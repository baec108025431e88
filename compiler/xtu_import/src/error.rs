//! Import error taxonomy.
//!
//! Every import operation returns a node or one of these errors; failures
//! propagate up the recursive call chain with `?` and no partially
//! constructed node is ever linked into the destination context.

use thiserror::Error;

/// Why an import failed.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
pub enum ImportError {
    /// Merge search found an incompatible same-name entity and the
    /// conflict resolver declined to rename.
    #[error("name conflict while importing `{name}`")]
    NameConflict { name: String },

    /// A deliberately unhandled input shape.
    #[error("unsupported construct: {construct}")]
    Unsupported { construct: &'static str },

    /// A required sub-import failed (type, sub-declaration, location,
    /// file), or any other leaf failure.
    #[error("import failed: {reason}")]
    Unknown { reason: String },
}

impl ImportError {
    /// Shorthand for [`ImportError::Unknown`].
    pub fn unknown(reason: impl Into<String>) -> Self {
        ImportError::Unknown {
            reason: reason.into(),
        }
    }

    /// The payload-free kind, as cached in the failure side table.
    pub fn kind(&self) -> ImportErrorKind {
        match self {
            ImportError::NameConflict { .. } => ImportErrorKind::NameConflict,
            ImportError::Unsupported { .. } => ImportErrorKind::Unsupported,
            ImportError::Unknown { .. } => ImportErrorKind::Unknown,
        }
    }
}

/// Terminal failure kind recorded per declaration.
///
/// A declaration that failed once is never retried; later attempts get an
/// error rebuilt from this kind.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ImportErrorKind {
    NameConflict,
    Unsupported,
    Unknown,
}

impl ImportErrorKind {
    /// Rebuild an error for a cached failure.
    pub fn to_error(self) -> ImportError {
        match self {
            ImportErrorKind::NameConflict => ImportError::NameConflict {
                name: String::from("<previously failed>"),
            },
            ImportErrorKind::Unsupported => ImportError::Unsupported {
                construct: "<previously failed>",
            },
            ImportErrorKind::Unknown => ImportError::unknown("previously failed import"),
        }
    }
}

/// Importer result alias.
pub type Result<T> = std::result::Result<T, ImportError>;
