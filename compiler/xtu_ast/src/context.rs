//! The compilation context: one arena owning every node of one AST.
//!
//! All nodes live in per-category vectors and are referenced by 32-bit
//! handles; nothing is ever freed before the context itself is dropped.
//! Types are interned structurally (canonical construction); declarations
//! and statements are plain arena allocations.

use crate::{
    BaseId, BaseSpecifier, BuiltinKind, Decl, DeclId, DeclName, IdentNamespace, Name,
    SourceManager, Stmt, StmtId, StringInterner, TypeId, TypeKind,
};
use rustc_hash::FxHashMap;

/// Target configuration bits the AST depends on.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct TargetInfo {
    /// Whether plain `char` is signed on this target.
    pub char_is_signed: bool,
}

impl Default for TargetInfo {
    fn default() -> Self {
        TargetInfo {
            char_is_signed: true,
        }
    }
}

/// An independent compilation context.
///
/// Owns the string interner, source manager, and the arenas for types,
/// declarations, statements, and base specifiers. The translation-unit
/// root declaration is created at construction and always has handle
/// [`DeclId::TRANSLATION_UNIT`].
pub struct AstContext {
    interner: StringInterner,
    source: SourceManager,
    target: TargetInfo,
    types: Vec<TypeKind>,
    type_map: FxHashMap<TypeKind, TypeId>,
    decls: Vec<Decl>,
    stmts: Vec<Stmt>,
    bases: Vec<BaseSpecifier>,
    /// Member lists of declaration contexts, keyed by context decl.
    members: FxHashMap<DeclId, Vec<DeclId>>,
}

impl AstContext {
    /// Create a context: pre-interns builtin types at their fixed
    /// [`TypeId`] constants and allocates the translation-unit root.
    pub fn new(target: TargetInfo) -> Self {
        let mut types = Vec::with_capacity(TypeId::FIRST_COMPOUND as usize);
        let mut type_map = FxHashMap::default();
        for kind in BuiltinKind::ALL {
            let data = TypeKind::Builtin(kind);
            type_map.insert(data.clone(), kind.type_id());
            types.push(data);
        }
        // Pad up to FIRST_COMPOUND so dynamic handles never collide with
        // reserved builtin slots.
        while types.len() < TypeId::FIRST_COMPOUND as usize {
            types.push(TypeKind::Builtin(BuiltinKind::Void));
        }

        AstContext {
            interner: StringInterner::new(),
            source: SourceManager::new(),
            target,
            types,
            type_map,
            decls: vec![Decl::translation_unit()],
            stmts: Vec::new(),
            bases: Vec::new(),
            members: FxHashMap::default(),
        }
    }

    /// The string interner.
    pub fn interner(&self) -> &StringInterner {
        &self.interner
    }

    /// Intern an identifier.
    pub fn intern(&self, s: &str) -> Name {
        self.interner.intern(s)
    }

    /// The source manager.
    pub fn source(&self) -> &SourceManager {
        &self.source
    }

    /// The source manager, mutably.
    pub fn source_mut(&mut self) -> &mut SourceManager {
        &mut self.source
    }

    /// Target configuration.
    pub fn target(&self) -> TargetInfo {
        self.target
    }

    /// The translation-unit root declaration.
    pub fn translation_unit(&self) -> DeclId {
        DeclId::TRANSLATION_UNIT
    }

    // --- types ---

    /// Canonically construct a type: structurally equal kinds intern to
    /// the same handle.
    pub fn intern_type(&mut self, kind: TypeKind) -> TypeId {
        if let Some(&id) = self.type_map.get(&kind) {
            return id;
        }
        let raw = u32::try_from(self.types.len()).unwrap_or_else(|_| {
            panic!("type arena exceeded u32::MAX entries");
        });
        let id = TypeId::from_raw(raw);
        self.types.push(kind.clone());
        self.type_map.insert(kind, id);
        id
    }

    /// The fixed handle of a builtin type.
    pub fn builtin_type(&self, kind: BuiltinKind) -> TypeId {
        kind.type_id()
    }

    /// Look up a type node.
    pub fn type_kind(&self, id: TypeId) -> &TypeKind {
        &self.types[id.raw() as usize]
    }

    /// Number of types, including reserved builtin slots.
    pub fn type_count(&self) -> usize {
        self.types.len()
    }

    // --- declarations ---

    /// Allocate a declaration node.
    pub fn alloc_decl(&mut self, decl: Decl) -> DeclId {
        let raw = u32::try_from(self.decls.len()).unwrap_or_else(|_| {
            panic!("decl arena exceeded u32::MAX entries");
        });
        self.decls.push(decl);
        DeclId::from_raw(raw)
    }

    /// Look up a declaration.
    pub fn decl(&self, id: DeclId) -> &Decl {
        &self.decls[id.raw() as usize]
    }

    /// Look up a declaration, mutably. Nodes are only augmented in place
    /// (definition completion, flag propagation), never re-kinded.
    pub fn decl_mut(&mut self, id: DeclId) -> &mut Decl {
        &mut self.decls[id.raw() as usize]
    }

    /// Number of declarations.
    pub fn decl_count(&self) -> usize {
        self.decls.len()
    }

    /// Append `member` to the member list of context `dc`.
    ///
    /// # Panics
    /// Panics if `dc` is not a declaration context.
    pub fn add_member(&mut self, dc: DeclId, member: DeclId) {
        assert!(
            self.decl(dc).kind.is_context(),
            "add_member target must be a declaration context"
        );
        self.members.entry(dc).or_default().push(member);
    }

    /// Member list of a declaration context.
    pub fn members(&self, dc: DeclId) -> &[DeclId] {
        self.members.get(&dc).map_or(&[], Vec::as_slice)
    }

    /// Unqualified, uncached lookup of `name` in context `dc`, filtered
    /// by identifier namespace. Linear over the member list.
    pub fn lookup(&self, dc: DeclId, name: &DeclName, ns: IdentNamespace) -> Vec<DeclId> {
        self.members(dc)
            .iter()
            .copied()
            .filter(|&m| {
                let d = self.decl(m);
                d.kind.ident_namespace().intersects(ns) && d.name.as_ref() == Some(name)
            })
            .collect()
    }

    /// Walk `previous` links back to the first declaration of the entity.
    pub fn canonical_decl(&self, mut id: DeclId) -> DeclId {
        while let Some(prev) = self.decl(id).previous {
            id = prev;
        }
        id
    }

    /// The redeclaration chain from the canonical declaration to `id`,
    /// in source order.
    pub fn redecl_chain(&self, id: DeclId) -> Vec<DeclId> {
        let mut chain = vec![id];
        let mut cur = id;
        while let Some(prev) = self.decl(cur).previous {
            chain.push(prev);
            cur = prev;
        }
        chain.reverse();
        chain
    }

    /// Link `later` after `prev` in a redeclaration chain, propagating the
    /// definition pointer for tags.
    pub fn link_previous(&mut self, later: DeclId, prev: DeclId) {
        let inherited_record_def = self.decl(prev).record_data().and_then(|d| d.definition);
        let inherited_enum_def = self.decl(prev).enum_data().and_then(|d| d.definition);
        let later_decl = self.decl_mut(later);
        later_decl.previous = Some(prev);
        if let Some(data) = later_decl.record_data_mut() {
            if data.definition.is_none() {
                data.definition = inherited_record_def;
            }
        }
        if let Some(data) = later_decl.enum_data_mut() {
            if data.definition.is_none() {
                data.definition = inherited_enum_def;
            }
        }
    }

    /// The defining declaration of a record/enum chain, if one exists.
    pub fn tag_definition(&self, id: DeclId) -> Option<DeclId> {
        let decl = self.decl(id);
        if let Some(data) = decl.record_data() {
            if data.is_definition {
                return Some(id);
            }
            return data.definition;
        }
        if let Some(data) = decl.enum_data() {
            if data.is_definition {
                return Some(id);
            }
            return data.definition;
        }
        None
    }

    /// Mark `id` as the definition of its record chain and propagate the
    /// definition pointer back along the chain.
    pub fn complete_record_definition(&mut self, id: DeclId) {
        {
            let data = self
                .decl_mut(id)
                .record_data_mut()
                .expect("complete_record_definition target must be a record");
            data.is_definition = true;
            data.is_complete = true;
            data.definition = Some(id);
        }
        let mut cur = id;
        while let Some(prev) = self.decl(cur).previous {
            if let Some(data) = self.decl_mut(prev).record_data_mut() {
                data.definition = Some(id);
            }
            cur = prev;
        }
    }

    /// Mark `id` as the definition of its enum chain and propagate the
    /// definition pointer back along the chain.
    pub fn complete_enum_definition(&mut self, id: DeclId) {
        {
            let data = self
                .decl_mut(id)
                .enum_data_mut()
                .expect("complete_enum_definition target must be an enum");
            data.is_definition = true;
            data.is_complete = true;
            data.definition = Some(id);
        }
        let mut cur = id;
        while let Some(prev) = self.decl(cur).previous {
            if let Some(data) = self.decl_mut(prev).enum_data_mut() {
                data.definition = Some(id);
            }
            cur = prev;
        }
    }

    // --- statements ---

    /// Allocate a statement/expression node.
    pub fn alloc_stmt(&mut self, stmt: Stmt) -> StmtId {
        let raw = u32::try_from(self.stmts.len()).unwrap_or_else(|_| {
            panic!("stmt arena exceeded u32::MAX entries");
        });
        self.stmts.push(stmt);
        StmtId::from_raw(raw)
    }

    /// Look up a statement.
    pub fn stmt(&self, id: StmtId) -> &Stmt {
        &self.stmts[id.raw() as usize]
    }

    /// Look up a statement, mutably (case-chain relinking).
    pub fn stmt_mut(&mut self, id: StmtId) -> &mut Stmt {
        &mut self.stmts[id.raw() as usize]
    }

    /// Number of statements.
    pub fn stmt_count(&self) -> usize {
        self.stmts.len()
    }

    // --- base specifiers ---

    /// Allocate a base-class specifier.
    pub fn alloc_base(&mut self, base: BaseSpecifier) -> BaseId {
        let raw = u32::try_from(self.bases.len()).unwrap_or_else(|_| {
            panic!("base arena exceeded u32::MAX entries");
        });
        self.bases.push(base);
        BaseId::from_raw(raw)
    }

    /// Look up a base-class specifier.
    pub fn base(&self, id: BaseId) -> &BaseSpecifier {
        &self.bases[id.raw() as usize]
    }
}

impl Default for AstContext {
    fn default() -> Self {
        Self::new(TargetInfo::default())
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::{DeclKind, QualType, RecordData, SourceLoc, TagKind};
    use pretty_assertions::assert_eq;

    #[test]
    fn builtins_are_pre_interned() {
        let mut cx = AstContext::default();
        assert_eq!(
            cx.intern_type(TypeKind::Builtin(BuiltinKind::Int)),
            TypeId::INT
        );
        assert_eq!(cx.builtin_type(BuiltinKind::UChar), TypeId::UCHAR);
    }

    #[test]
    fn interning_is_canonical() {
        let mut cx = AstContext::default();
        let p1 = cx.intern_type(TypeKind::Pointer(TypeId::INT.into()));
        let p2 = cx.intern_type(TypeKind::Pointer(TypeId::INT.into()));
        let p3 = cx.intern_type(TypeKind::Pointer(TypeId::FLOAT.into()));
        assert_eq!(p1, p2);
        assert_ne!(p1, p3);
        assert!(p1.raw() >= TypeId::FIRST_COMPOUND);
    }

    #[test]
    fn lookup_filters_by_namespace() {
        let mut cx = AstContext::default();
        let tu = cx.translation_unit();
        let name = DeclName::Identifier(cx.intern("S"));

        // A record and a variable sharing one name live in different
        // identifier namespaces.
        let record = cx.alloc_decl(Decl::new(
            DeclKind::Record(RecordData::forward(TagKind::Struct)),
            Some(name.clone()),
            SourceLoc::INVALID,
            tu,
        ));
        let var = cx.alloc_decl(Decl::new(
            DeclKind::Var(crate::VarData {
                ty: QualType::unqualified(TypeId::INT),
                storage: Default::default(),
                init: None,
                is_definition: true,
                described_template: None,
            }),
            Some(name.clone()),
            SourceLoc::INVALID,
            tu,
        ));
        cx.add_member(tu, record);
        cx.add_member(tu, var);

        assert_eq!(cx.lookup(tu, &name, IdentNamespace::TAG), vec![record]);
        assert_eq!(cx.lookup(tu, &name, IdentNamespace::ORDINARY), vec![var]);
        assert_eq!(
            cx.lookup(tu, &name, IdentNamespace::TAG | IdentNamespace::ORDINARY),
            vec![record, var]
        );
    }

    #[test]
    fn redecl_chain_walks_to_canonical() {
        let mut cx = AstContext::default();
        let tu = cx.translation_unit();
        let name = DeclName::Identifier(cx.intern("E"));

        let first = cx.alloc_decl(Decl::new(
            DeclKind::Record(RecordData::forward(TagKind::Struct)),
            Some(name.clone()),
            SourceLoc::INVALID,
            tu,
        ));
        let second = cx.alloc_decl(Decl::new(
            DeclKind::Record(RecordData::forward(TagKind::Struct)),
            Some(name),
            SourceLoc::INVALID,
            tu,
        ));
        cx.link_previous(second, first);

        assert_eq!(cx.canonical_decl(second), first);
        assert_eq!(cx.redecl_chain(second), vec![first, second]);

        // Completing the later one propagates the definition pointer back.
        cx.complete_record_definition(second);
        assert_eq!(cx.tag_definition(first), Some(second));
        assert_eq!(cx.tag_definition(second), Some(second));
    }
}
