use std::fmt;

/// Error codes for import diagnostics.
///
/// Format: E#### in the E4xxx range (cross-context import and merge).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ErrorCode {
    /// Record definitions disagree on their field lists (ODR).
    E4001,
    /// A field's type differs between two definitions (ODR).
    E4002,
    /// Enum definitions disagree on their enumerator lists (ODR).
    E4003,
    /// Same name refers to structurally different entities.
    E4004,
}

impl ErrorCode {
    /// Short description of what this code reports.
    pub fn description(self) -> &'static str {
        match self {
            ErrorCode::E4001 => "record definitions have mismatched fields",
            ErrorCode::E4002 => "field type differs between definitions",
            ErrorCode::E4003 => "enum definitions have mismatched enumerators",
            ErrorCode::E4004 => "name refers to different entities",
        }
    }
}

impl fmt::Display for ErrorCode {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{self:?}")
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn codes_render_as_identifiers() {
        assert_eq!(ErrorCode::E4001.to_string(), "E4001");
        assert!(!ErrorCode::E4003.description().is_empty());
    }
}
