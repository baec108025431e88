//! Cross-context AST import.
//!
//! An [`Importer`] copies declarations, types, and statements from one
//! [`AstContext`] into another. Handles are context-local, so every
//! imported node is rebuilt in the destination and the (From, To) pairing
//! is remembered in an [`IdentityMap`] for the lifetime of the session:
//! importing the same node twice yields the same handle, and cyclic
//! references terminate.
//!
//! Same-name declarations are merged instead of duplicated when the
//! [`StructuralEquivalence`] oracle deems them the same entity;
//! inequivalent ones go to the [`ConflictResolver`], and a declined
//! conflict fails that declaration's import. Failures are robust and
//! memoized: the destination context stays consistent, and a declaration
//! that failed once never gets a second attempt.
//!
//! ```
//! use xtu_ast::{AstContext, DeclId};
//! use xtu_import::Importer;
//!
//! let from = AstContext::default();
//! let mut to = AstContext::default();
//! let mut importer = Importer::new(&from, &mut to);
//! let tu = importer.import_decl(DeclId::TRANSLATION_UNIT).unwrap();
//! assert_eq!(tu, DeclId::TRANSLATION_UNIT);
//! ```

mod conflict;
mod decls;
mod equiv;
mod error;
mod files;
mod ident_map;
mod names;
mod stmts;
mod types;

pub use conflict::{ConflictResolver, DeclineConflicts};
pub use equiv::{StructuralEquivalence, StructuralMatcher};
pub use error::{ImportError, ImportErrorKind, Result};
pub use ident_map::IdentityMap;

use rustc_hash::FxHashSet;
use xtu_ast::{AstContext, DeclId};
use xtu_diagnostic::{Diagnostic, DiagnosticQueue};

/// One import session from a source context into a destination context.
///
/// The session owns the identity map, so identity guarantees hold across
/// every `import_*` call made through the same instance.
pub struct Importer<'ctx> {
    from: &'ctx AstContext,
    to: &'ctx mut AstContext,
    map: IdentityMap,
    oracle: Box<dyn StructuralEquivalence>,
    resolver: Box<dyn ConflictResolver>,
    diags: DiagnosticQueue,
    /// (from, to) definition pairs already checked for ODR consistency,
    /// so re-merging a definition warns at most once.
    odr_checked: FxHashSet<(DeclId, DeclId)>,
}

impl<'ctx> Importer<'ctx> {
    /// Create a session with the default oracle and resolver.
    pub fn new(from: &'ctx AstContext, to: &'ctx mut AstContext) -> Self {
        Importer {
            from,
            to,
            map: IdentityMap::new(),
            oracle: Box::new(StructuralMatcher::new()),
            resolver: Box::new(DeclineConflicts),
            diags: DiagnosticQueue::new(),
            odr_checked: FxHashSet::default(),
        }
    }

    /// Replace the structural-equivalence oracle.
    #[must_use]
    pub fn with_oracle(mut self, oracle: Box<dyn StructuralEquivalence>) -> Self {
        self.oracle = oracle;
        self
    }

    /// Replace the conflict resolver.
    #[must_use]
    pub fn with_resolver(mut self, resolver: Box<dyn ConflictResolver>) -> Self {
        self.resolver = resolver;
        self
    }

    /// The destination handle of an already-imported declaration.
    pub fn imported_decl(&self, from_decl: DeclId) -> Option<DeclId> {
        self.map.lookup_decl(from_decl)
    }

    /// Diagnostics emitted so far.
    pub fn diagnostics(&self) -> &[Diagnostic] {
        self.diags.diagnostics()
    }

    /// Drain the emitted diagnostics.
    pub fn take_diagnostics(&mut self) -> Vec<Diagnostic> {
        self.diags.take_all()
    }
}
