//! Name-conflict resolution hook.

use xtu_ast::{AstContext, DeclId, DeclName};

/// Consulted when a merge search finds same-name declarations that are
/// structurally inequivalent.
///
/// Returning a replacement name lets the import proceed under that name;
/// declining makes the import of the offending declaration fail with
/// `NameConflict`.
pub trait ConflictResolver {
    /// Offer a replacement name for `name`, or decline with `None`.
    ///
    /// `candidates` are the conflicting declarations, in the destination
    /// context.
    fn resolve(
        &mut self,
        from: &AstContext,
        to: &AstContext,
        name: &DeclName,
        candidates: &[DeclId],
    ) -> Option<DeclName>;
}

/// Default resolver: never renames, so every conflict is an error.
#[derive(Default)]
pub struct DeclineConflicts;

impl ConflictResolver for DeclineConflicts {
    fn resolve(
        &mut self,
        _from: &AstContext,
        _to: &AstContext,
        _name: &DeclName,
        _candidates: &[DeclId],
    ) -> Option<DeclName> {
        None
    }
}
