//! Bidirectional identity bookkeeping between two contexts.
//!
//! One [`IdentityMap`] belongs to one (From, To) importer instance. Each
//! node category has its own forward map; once a From-handle is mapped it
//! must always resolve to the same To-handle. Mapping it to a different
//! target is a programming error and panics.
//!
//! `record_decl` is the single funnel through which "this declaration has
//! been imported" becomes visible: for nodes that can forward-reference
//! themselves (records, enums, namespaces, templates) it must be called
//! before the node's children are imported, which is what terminates
//! cycles.

use crate::ImportErrorKind;
use rustc_hash::FxHashMap;
use xtu_ast::{BaseId, DeclId, FileId, StmtId, TypeId};

/// Per-category forward maps plus the declaration failure cache.
#[derive(Default)]
pub struct IdentityMap {
    types: FxHashMap<TypeId, TypeId>,
    decls: FxHashMap<DeclId, DeclId>,
    stmts: FxHashMap<StmtId, StmtId>,
    bases: FxHashMap<BaseId, BaseId>,
    files: FxHashMap<FileId, FileId>,
    failed: FxHashMap<DeclId, ImportErrorKind>,
}

macro_rules! category {
    ($lookup:ident, $record:ident, $field:ident, $handle:ty, $what:literal) => {
        #[doc = concat!("Look up an imported ", $what, ".")]
        #[inline]
        pub fn $lookup(&self, from: $handle) -> Option<$handle> {
            self.$field.get(&from).copied()
        }

        #[doc = concat!("Record an imported ", $what, ". Insert-once:")]
        #[doc = "re-recording the same target is a no-op."]
        ///
        /// # Panics
        /// Panics if `from` is already mapped to a different target.
        pub fn $record(&mut self, from: $handle, to: $handle) {
            let old = self.$field.insert(from, to);
            assert!(
                old.is_none() || old == Some(to),
                concat!("identity map: ", $what, " {:?} remapped from {:?} to {:?}"),
                from,
                old.unwrap_or(to),
                to,
            );
        }
    };
}

impl IdentityMap {
    /// Create an empty map.
    pub fn new() -> Self {
        Self::default()
    }

    category!(lookup_type, record_type, types, TypeId, "type");
    category!(lookup_decl, record_decl, decls, DeclId, "declaration");
    category!(lookup_stmt, record_stmt, stmts, StmtId, "statement");
    category!(lookup_base, record_base, bases, BaseId, "base specifier");
    category!(lookup_file, record_file, files, FileId, "file");

    /// Check the failure cache for a declaration.
    #[inline]
    pub fn failure(&self, from: DeclId) -> Option<ImportErrorKind> {
        self.failed.get(&from).copied()
    }

    /// Record a terminal import failure for a declaration.
    ///
    /// # Panics
    /// Panics if a failure was already recorded for `from`; each
    /// declaration fails at most once.
    pub fn record_failure(&mut self, from: DeclId, kind: ImportErrorKind) {
        let old = self.failed.insert(from, kind);
        assert!(
            old.is_none(),
            "identity map: failure recorded twice for {from:?}"
        );
    }

    /// Number of mapped declarations (diagnostic aid).
    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use pretty_assertions::assert_eq;

    #[test]
    fn lookup_after_record() {
        let mut map = IdentityMap::new();
        let from = DeclId::from_raw(3);
        let to = DeclId::from_raw(7);

        assert_eq!(map.lookup_decl(from), None);
        map.record_decl(from, to);
        assert_eq!(map.lookup_decl(from), Some(to));
    }

    #[test]
    fn idempotent_record_is_allowed() {
        let mut map = IdentityMap::new();
        let from = TypeId::from_raw(40);
        let to = TypeId::from_raw(50);
        map.record_type(from, to);
        map.record_type(from, to); // same target: fine
        assert_eq!(map.lookup_type(from), Some(to));
    }

    #[test]
    #[should_panic(expected = "remapped")]
    fn remap_panics() {
        let mut map = IdentityMap::new();
        let from = StmtId::from_raw(1);
        map.record_stmt(from, StmtId::from_raw(2));
        map.record_stmt(from, StmtId::from_raw(3));
    }

    #[test]
    fn failure_cache_is_per_decl() {
        let mut map = IdentityMap::new();
        let d = DeclId::from_raw(9);
        assert_eq!(map.failure(d), None);
        map.record_failure(d, ImportErrorKind::Unsupported);
        assert_eq!(map.failure(d), Some(ImportErrorKind::Unsupported));
        assert_eq!(map.failure(DeclId::from_raw(10)), None);
    }

    #[test]
    #[should_panic(expected = "failure recorded twice")]
    fn double_failure_panics() {
        let mut map = IdentityMap::new();
        let d = DeclId::from_raw(9);
        map.record_failure(d, ImportErrorKind::Unknown);
        map.record_failure(d, ImportErrorKind::Unknown);
    }

    #[test]
    fn categories_are_independent() {
        let mut map = IdentityMap::new();
        map.record_type(TypeId::from_raw(5), TypeId::from_raw(6));
        // A decl with the same raw index is a different key space.
        assert_eq!(map.lookup_decl(DeclId::from_raw(5)), None);
        assert_eq!(map.decl_count(), 0);
    }
}
