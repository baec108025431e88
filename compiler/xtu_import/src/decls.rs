//! Declaration import.
//!
//! The order of operations per declaration is fixed and load-bearing:
//! imports that can redirect (definitions, templated patterns) happen
//! first, then the contexts, then the name, then the merge search, and
//! only then is the node constructed. Nodes that can reference themselves
//! are registered in the identity map before their children are imported.
//!
//! Merging is name-based: an unqualified lookup in the destination's
//! semantic context (filtered by identifier namespace) yields candidates,
//! the structural-equivalence oracle decides "same entity", and anything
//! inequivalent goes to the conflict resolver. Function-scope
//! declarations never merge.

use crate::{ImportError, Importer, Result};
use smallvec::SmallVec;
use tracing::{debug, trace};
use xtu_ast::{
    Decl, DeclId, DeclKind, DeclName, EnumData, FunctionData, IdentNamespace, RecordData,
    SourceLoc, TemplateData, VarData,
};
use xtu_diagnostic::{Diagnostic, ErrorCode};

/// Outcome of the merge search for a named declaration.
enum NameResolution {
    /// An equivalent declaration already exists; merge into it.
    Existing(DeclId),
    /// No equivalent exists; create a node under this (possibly
    /// resolver-replaced) name.
    Fresh(Option<DeclName>),
}

impl Importer<'_> {
    /// Import a declaration, memoized per session.
    ///
    /// A declaration that failed to import once is terminal: later
    /// requests return the cached failure without re-attempting.
    pub fn import_decl(&mut self, from_decl: DeclId) -> Result<DeclId> {
        if let Some(kind) = self.map.failure(from_decl) {
            trace!(?from_decl, "declaration previously failed to import");
            return Err(kind.to_error());
        }
        if let Some(to_decl) = self.map.lookup_decl(from_decl) {
            self.propagate_flags(from_decl, to_decl);
            return Ok(to_decl);
        }
        match self.import_decl_uncached(from_decl) {
            Ok(to_decl) => Ok(to_decl),
            Err(e) => {
                // A node that was registered before a late sub-import
                // failed (a body, an initializer) keeps its mapping; only
                // declarations that produced nothing are marked failed.
                if self.map.lookup_decl(from_decl).is_none()
                    && self.map.failure(from_decl).is_none()
                {
                    self.map.record_failure(from_decl, e.kind());
                }
                Err(e)
            }
        }
    }

    /// Import a declaration and force its definition across.
    ///
    /// For contexts (translation units, namespaces) every member is
    /// imported; a failing member aborts only that member, and the first
    /// error is reported after the rest have been attempted.
    pub fn import_definition(&mut self, from_decl: DeclId) -> Result<DeclId> {
        let to_decl = self.import_decl(from_decl)?;
        let from = self.from;
        match &from.decl(from_decl).kind {
            DeclKind::Record(_) | DeclKind::ClassTemplateSpecialization { .. } => {
                let from_def = from.tag_definition(from_decl).ok_or_else(|| {
                    ImportError::unknown("record has no definition to import")
                })?;
                let to_def = self.import_decl(from_def)?;
                self.import_record_body(from_def, to_def)?;
            }
            DeclKind::Enum(_) => {
                let from_def = from
                    .tag_definition(from_decl)
                    .ok_or_else(|| ImportError::unknown("enum has no definition to import"))?;
                let to_def = self.import_decl(from_def)?;
                self.import_enum_body(from_def, to_def)?;
            }
            DeclKind::TranslationUnit | DeclKind::Namespace { .. } => {
                let mut first_err = None;
                for &member in from.members(from_decl) {
                    if let Err(e) = self.import_decl(member) {
                        debug!(error = %e, "skipping member that failed to import");
                        first_err.get_or_insert(e);
                    }
                }
                if let Some(e) = first_err {
                    return Err(e);
                }
            }
            _ => {}
        }
        Ok(to_decl)
    }

    /// Later sightings of an already-imported declaration can carry flags
    /// the first sighting lacked.
    fn propagate_flags(&mut self, from_decl: DeclId, to_decl: DeclId) {
        let extra = self.from.decl(from_decl).flags;
        if !extra.is_empty() {
            self.to.decl_mut(to_decl).flags |= extra;
        }
    }

    fn import_decl_uncached(&mut self, d: DeclId) -> Result<DeclId> {
        let from = self.from;
        let decl = from.decl(d);
        trace!(kind = decl.kind.kind_name(), "importing declaration");

        // The root maps to the root.
        if matches!(decl.kind, DeclKind::TranslationUnit) {
            let tu = self.to.translation_unit();
            self.map.record_decl(d, tu);
            return Ok(tu);
        }

        // Parameters and template parameters are owned by their
        // function/template and are built without importing their
        // context (which would recurse into the owner).
        match decl.kind {
            DeclKind::Param { .. } => return self.import_param(d),
            DeclKind::TemplateTypeParam { .. } | DeclKind::NonTypeTemplateParam { .. } => {
                return self.import_template_param(d)
            }
            _ => {}
        }

        // A templated pattern is reached through its template, never
        // standalone; importing the template wires the pattern mapping.
        if let Some(template) = described_template_of(decl) {
            let _ = self.import_decl(template)?;
            return self.map.lookup_decl(d).ok_or_else(|| {
                ImportError::unknown("templated pattern was not mapped by its template")
            });
        }

        // A record in function scope would recurse through the import of
        // its own enclosing function; deliberately unhandled.
        if decl.record_data().is_some() {
            if let Some(lex) = decl.lexical_dc {
                if matches!(from.decl(lex).kind, DeclKind::Function(_)) {
                    return Err(ImportError::Unsupported {
                        construct: "record declared inside a function scope",
                    });
                }
            }
        }

        // Definition redirection: a non-defining tag whose chain has a
        // definition resolves to that definition.
        if let Some(def) = from.tag_definition(d) {
            if def != d {
                let to_def = self.import_decl(def)?;
                self.map.record_decl(d, to_def);
                return Ok(to_def);
            }
        }

        // Contexts, then name, then location.
        let from_sem = decl
            .semantic_dc
            .ok_or_else(|| ImportError::unknown("declaration without a semantic context"))?;
        let sem_dc = self.import_decl(from_sem)?;
        let lex_dc = match decl.lexical_dc {
            Some(lex) if lex != from_sem => self.import_decl(lex)?,
            _ => sem_dc,
        };
        let name = match &from.decl(d).name {
            Some(n) => Some(self.import_decl_name(n)?),
            None => None,
        };
        let loc = self.import_loc(from.decl(d).loc)?;

        match &from.decl(d).kind {
            DeclKind::Namespace { .. } => self.visit_namespace(d, name, loc, sem_dc, lex_dc),
            DeclKind::Typedef { .. } => self.visit_typedef(d, name, loc, sem_dc, lex_dc),
            DeclKind::Enum(_) => self.visit_enum(d, name, loc, sem_dc, lex_dc),
            DeclKind::EnumConstant { .. } => {
                self.visit_enum_constant(d, name, loc, sem_dc, lex_dc)
            }
            DeclKind::Record(_) => self.visit_record(d, name, loc, sem_dc, lex_dc),
            DeclKind::Field { .. } => self.visit_field(d, name, loc, sem_dc, lex_dc),
            DeclKind::Function(_) => self.visit_function(d, name, loc, sem_dc, lex_dc),
            DeclKind::Var(_) => self.visit_var(d, name, loc, sem_dc, lex_dc),
            DeclKind::ClassTemplate(_)
            | DeclKind::FunctionTemplate(_)
            | DeclKind::VarTemplate(_) => self.visit_template(d, name, loc, sem_dc, lex_dc),
            DeclKind::ClassTemplateSpecialization { .. } => {
                self.visit_class_specialization(d, name, loc, sem_dc, lex_dc)
            }
            DeclKind::VarTemplateSpecialization { .. } => {
                self.visit_var_specialization(d, name, loc, sem_dc, lex_dc)
            }
            DeclKind::TranslationUnit
            | DeclKind::Param { .. }
            | DeclKind::TemplateTypeParam { .. }
            | DeclKind::NonTypeTemplateParam { .. } => {
                unreachable!("handled before dispatch")
            }
        }
    }

    // --- merge search ---

    /// Search the destination context for an equivalent declaration.
    fn resolve_name(
        &mut self,
        from_d: DeclId,
        sem_dc: DeclId,
        name: Option<DeclName>,
        ns: IdentNamespace,
    ) -> Result<NameResolution> {
        let Some(name) = name else {
            return Ok(NameResolution::Fresh(None));
        };
        // Function-scope declarations never merge.
        if matches!(self.to.decl(sem_dc).kind, DeclKind::Function(_)) {
            return Ok(NameResolution::Fresh(Some(name)));
        }
        let candidates = self.to.lookup(sem_dc, &name, ns);
        let mut conflicts: SmallVec<[DeclId; 4]> = SmallVec::new();
        for cand in candidates {
            if self.oracle.is_equivalent(self.from, &*self.to, from_d, cand) {
                return Ok(NameResolution::Existing(cand));
            }
            conflicts.push(cand);
        }
        if conflicts.is_empty() {
            return Ok(NameResolution::Fresh(Some(name)));
        }
        self.resolve_conflict(name, &conflicts)
    }

    /// Tag merge search. Tags merge on name and shape (struct vs union vs
    /// class, scoped vs unscoped enum); body inconsistencies between two
    /// complete definitions are not a merge obstacle, they surface later
    /// as ODR warnings with the destination definition winning.
    fn resolve_tag_name(
        &mut self,
        from_d: DeclId,
        sem_dc: DeclId,
        name: DeclName,
    ) -> Result<NameResolution> {
        if matches!(self.to.decl(sem_dc).kind, DeclKind::Function(_)) {
            return Ok(NameResolution::Fresh(Some(name)));
        }
        let candidates = self.to.lookup(sem_dc, &name, IdentNamespace::TAG);
        let mut conflicts: SmallVec<[DeclId; 4]> = SmallVec::new();
        for cand in candidates {
            if tags_compatible(&self.from.decl(from_d).kind, &self.to.decl(cand).kind) {
                return Ok(NameResolution::Existing(cand));
            }
            conflicts.push(cand);
        }
        if conflicts.is_empty() {
            return Ok(NameResolution::Fresh(Some(name)));
        }
        self.resolve_conflict(name, &conflicts)
    }

    /// Ask the resolver for a way out; declining fails the import.
    fn resolve_conflict(
        &mut self,
        name: DeclName,
        conflicts: &[DeclId],
    ) -> Result<NameResolution> {
        debug!(
            name = %self.name_string(&name),
            candidates = conflicts.len(),
            "merge search found inequivalent same-name declarations"
        );
        match self.resolver.resolve(self.from, &*self.to, &name, conflicts) {
            Some(replacement) => Ok(NameResolution::Fresh(Some(replacement))),
            None => {
                let display = self.name_string(&name);
                self.diags.emit(
                    Diagnostic::error(ErrorCode::E4004)
                        .with_message(format!(
                            "name `{display}` conflicts with an existing declaration"
                        ))
                        .with_label(self.to.decl(conflicts[0]).loc, "existing declaration here"),
                );
                Err(ImportError::NameConflict { name: display })
            }
        }
    }

    /// Allocate `decl` in the destination, record the mapping, and attach
    /// it to its lexical context, in that order.
    fn finish_decl(&mut self, from_d: DeclId, mut decl: Decl, lex_dc: DeclId) -> DeclId {
        let src = self.from.decl(from_d);
        decl.lexical_dc = Some(lex_dc);
        decl.flags = src.flags;
        decl.access = src.access;
        decl.attrs = self.import_attrs(&src.attrs);
        let to_d = self.to.alloc_decl(decl);
        self.map.record_decl(from_d, to_d);
        self.to.add_member(lex_dc, to_d);
        to_d
    }

    // --- per-kind visitors ---

    fn visit_namespace(
        &mut self,
        d: DeclId,
        name: Option<DeclName>,
        loc: SourceLoc,
        sem_dc: DeclId,
        lex_dc: DeclId,
    ) -> Result<DeclId> {
        let from = self.from;
        let DeclKind::Namespace {
            is_inline,
            is_anonymous,
        } = from.decl(d).kind
        else {
            return Err(ImportError::unknown("expected a namespace"));
        };

        // The anonymous namespace merges per enclosing context.
        let resolution = if is_anonymous {
            let existing = self
                .to
                .members(sem_dc)
                .iter()
                .copied()
                .find(|&m| {
                    matches!(
                        self.to.decl(m).kind,
                        DeclKind::Namespace {
                            is_anonymous: true,
                            ..
                        }
                    )
                });
            match existing {
                Some(found) => NameResolution::Existing(found),
                None => NameResolution::Fresh(None),
            }
        } else {
            self.resolve_name(d, sem_dc, name, IdentNamespace::ORDINARY)?
        };

        match resolution {
            NameResolution::Existing(found) => {
                self.map.record_decl(d, found);
                self.propagate_flags(d, found);
                Ok(found)
            }
            NameResolution::Fresh(name) => Ok(self.finish_decl(
                d,
                Decl::new(
                    DeclKind::Namespace {
                        is_inline,
                        is_anonymous,
                    },
                    name,
                    loc,
                    sem_dc,
                ),
                lex_dc,
            )),
        }
    }

    fn visit_typedef(
        &mut self,
        d: DeclId,
        name: Option<DeclName>,
        loc: SourceLoc,
        sem_dc: DeclId,
        lex_dc: DeclId,
    ) -> Result<DeclId> {
        let from = self.from;
        let DeclKind::Typedef { underlying } = from.decl(d).kind else {
            return Err(ImportError::unknown("expected a typedef"));
        };
        match self.resolve_name(d, sem_dc, name, IdentNamespace::ORDINARY)? {
            NameResolution::Existing(found) => {
                self.map.record_decl(d, found);
                self.propagate_flags(d, found);
                Ok(found)
            }
            NameResolution::Fresh(name) => {
                let underlying = self.import_type(underlying)?;
                Ok(self.finish_decl(
                    d,
                    Decl::new(DeclKind::Typedef { underlying }, name, loc, sem_dc),
                    lex_dc,
                ))
            }
        }
    }

    fn visit_enum(
        &mut self,
        d: DeclId,
        name: Option<DeclName>,
        loc: SourceLoc,
        sem_dc: DeclId,
        lex_dc: DeclId,
    ) -> Result<DeclId> {
        let from = self.from;
        let Some(data) = from.decl(d).enum_data().cloned() else {
            return Err(ImportError::unknown("expected an enum"));
        };
        let resolution = match name {
            Some(name) => self.resolve_tag_name(d, sem_dc, name)?,
            None => NameResolution::Fresh(None),
        };
        match resolution {
            NameResolution::Existing(found) => {
                self.map.record_decl(d, found);
                self.propagate_flags(d, found);
                if data.is_definition {
                    self.import_enum_body(d, found)?;
                }
                Ok(found)
            }
            NameResolution::Fresh(name) => {
                let integer_type = match data.integer_type {
                    Some(ty) => Some(self.import_type(ty)?),
                    None => None,
                };
                let to_d = self.finish_decl(
                    d,
                    Decl::new(
                        DeclKind::Enum(EnumData {
                            integer_type,
                            is_scoped: data.is_scoped,
                            ..EnumData::forward()
                        }),
                        name,
                        loc,
                        sem_dc,
                    ),
                    lex_dc,
                );
                if data.is_definition {
                    self.import_enum_body(d, to_d)?;
                }
                Ok(to_d)
            }
        }
    }

    /// Import the enumerator list onto `to_def`. If the destination enum
    /// is already complete, the existing body wins: mismatched enumerator
    /// lists are reported, and the destination's width bits are kept even
    /// when the source computed different ones.
    pub(crate) fn import_enum_body(&mut self, from_def: DeclId, to_def: DeclId) -> Result<()> {
        let from = self.from;
        let from_data = from
            .decl(from_def)
            .enum_data()
            .cloned()
            .ok_or_else(|| ImportError::unknown("enum body import target is not an enum"))?;
        let already_complete = self
            .to
            .decl(to_def)
            .enum_data()
            .is_some_and(|e| e.is_complete);
        if already_complete {
            self.check_enum_odr(from_def, to_def);
            return Ok(());
        }

        let mut first_err = None;
        for &member in from.members(from_def) {
            if let Err(e) = self.import_decl(member) {
                debug!(error = %e, "skipping enumerator that failed to import");
                first_err.get_or_insert(e);
            }
        }
        if let Some(data) = self.to.decl_mut(to_def).enum_data_mut() {
            data.num_positive_bits = from_data.num_positive_bits;
            data.num_negative_bits = from_data.num_negative_bits;
        }
        self.to.complete_enum_definition(to_def);
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn visit_enum_constant(
        &mut self,
        d: DeclId,
        name: Option<DeclName>,
        loc: SourceLoc,
        sem_dc: DeclId,
        lex_dc: DeclId,
    ) -> Result<DeclId> {
        let from = self.from;
        let DeclKind::EnumConstant { ty, value, init } = from.decl(d).kind else {
            return Err(ImportError::unknown("expected an enumerator"));
        };
        match self.resolve_name(d, sem_dc, name, IdentNamespace::ORDINARY)? {
            NameResolution::Existing(found) => {
                self.map.record_decl(d, found);
                self.propagate_flags(d, found);
                Ok(found)
            }
            NameResolution::Fresh(name) => {
                let ty = self.import_type(ty)?;
                let init = match init {
                    Some(e) => Some(self.import_stmt(e)?),
                    None => None,
                };
                Ok(self.finish_decl(
                    d,
                    Decl::new(DeclKind::EnumConstant { ty, value, init }, name, loc, sem_dc),
                    lex_dc,
                ))
            }
        }
    }

    fn visit_record(
        &mut self,
        d: DeclId,
        name: Option<DeclName>,
        loc: SourceLoc,
        sem_dc: DeclId,
        lex_dc: DeclId,
    ) -> Result<DeclId> {
        let from = self.from;
        let data = from
            .decl(d)
            .record_data()
            .cloned()
            .ok_or_else(|| ImportError::unknown("expected a record"))?;

        // Anonymous records never merge by name.
        let resolution = match name {
            Some(name) if !data.is_anonymous => self.resolve_tag_name(d, sem_dc, name)?,
            name => NameResolution::Fresh(name),
        };

        match resolution {
            NameResolution::Existing(found) => {
                self.map.record_decl(d, found);
                self.propagate_flags(d, found);
                if data.is_definition {
                    self.import_record_body(d, found)?;
                }
                Ok(found)
            }
            NameResolution::Fresh(name) => {
                let to_d = self.finish_decl(
                    d,
                    Decl::new(
                        DeclKind::Record(RecordData {
                            is_anonymous: data.is_anonymous,
                            ..RecordData::forward(data.tag)
                        }),
                        name,
                        loc,
                        sem_dc,
                    ),
                    lex_dc,
                );
                // The mapping is recorded before the body, so a field of
                // type `S*` inside `S` resolves to the node under
                // construction instead of recursing.
                if data.is_definition {
                    self.import_record_body(d, to_d)?;
                }
                Ok(to_d)
            }
        }
    }

    /// Import bases and members onto `to_def`. If the destination record
    /// is already complete, the existing body wins and mismatches are
    /// reported as ODR warnings.
    ///
    /// A failing member aborts only that member; the record is completed
    /// regardless and the first member error is reported afterwards.
    pub(crate) fn import_record_body(&mut self, from_def: DeclId, to_def: DeclId) -> Result<()> {
        let from = self.from;
        let from_data = from
            .decl(from_def)
            .record_data()
            .cloned()
            .ok_or_else(|| ImportError::unknown("record body import target is not a record"))?;
        let already_complete = self
            .to
            .decl(to_def)
            .record_data()
            .is_some_and(|r| r.is_complete);
        if already_complete {
            self.check_record_odr(from_def, to_def);
            return Ok(());
        }

        let mut bases = Vec::with_capacity(from_data.bases.len());
        for &base in &from_data.bases {
            bases.push(self.import_base(base)?);
        }
        if let Some(data) = self.to.decl_mut(to_def).record_data_mut() {
            data.bases = bases;
        }

        let mut first_err = None;
        for &member in from.members(from_def) {
            if let Err(e) = self.import_decl(member) {
                debug!(error = %e, "skipping record member that failed to import");
                first_err.get_or_insert(e);
            }
        }
        self.to.complete_record_definition(to_def);
        match first_err {
            Some(e) => Err(e),
            None => Ok(()),
        }
    }

    fn import_base(&mut self, base: xtu_ast::BaseId) -> Result<xtu_ast::BaseId> {
        if let Some(to_base) = self.map.lookup_base(base) {
            return Ok(to_base);
        }
        let spec = *self.from.base(base);
        let ty = self.import_type(spec.ty)?;
        let to_base = self.to.alloc_base(xtu_ast::BaseSpecifier {
            ty,
            is_virtual: spec.is_virtual,
            access: spec.access,
        });
        self.map.record_base(base, to_base);
        Ok(to_base)
    }

    /// Compare an incoming record definition against the one the
    /// destination already has. Mismatches warn and the import proceeds
    /// with the destination's definition.
    fn check_record_odr(&mut self, from_def: DeclId, to_def: DeclId) {
        if !self.odr_checked.insert((from_def, to_def)) {
            return;
        }
        let from = self.from;
        let from_fields: Vec<DeclId> = fields_of(from, from_def);
        let to_fields: Vec<DeclId> = fields_of(self.to, to_def);
        let name = self.decl_display(to_def);

        if from_fields.len() != to_fields.len() {
            self.diags.emit(
                Diagnostic::warning(ErrorCode::E4001)
                    .with_message(format!(
                        "type `{name}` has inconsistent definitions across translation units"
                    ))
                    .with_label(self.to.decl(to_def).loc, "existing definition here")
                    .with_note(format!(
                        "{} field(s) here, {} in the incoming definition",
                        to_fields.len(),
                        from_fields.len()
                    )),
            );
            return;
        }
        for (ff, tf) in from_fields.into_iter().zip(to_fields) {
            if !self.oracle.is_equivalent(self.from, &*self.to, ff, tf) {
                let field = self.decl_display(tf);
                self.diags.emit(
                    Diagnostic::warning(ErrorCode::E4002)
                        .with_message(format!(
                            "field `{field}` of `{name}` has inconsistent types across \
                             translation units"
                        ))
                        .with_label(self.to.decl(tf).loc, "existing field here"),
                );
            }
        }
    }

    fn check_enum_odr(&mut self, from_def: DeclId, to_def: DeclId) {
        if !self.odr_checked.insert((from_def, to_def)) {
            return;
        }
        let from_count = self.from.members(from_def).len();
        let to_count = self.to.members(to_def).len();
        if from_count != to_count {
            let name = self.decl_display(to_def);
            self.diags.emit(
                Diagnostic::warning(ErrorCode::E4003)
                    .with_message(format!(
                        "enum `{name}` has inconsistent enumerator lists across translation units"
                    ))
                    .with_label(self.to.decl(to_def).loc, "existing definition here")
                    .with_note(format!(
                        "{to_count} enumerator(s) here, {from_count} in the incoming definition"
                    )),
            );
        }
    }

    fn visit_field(
        &mut self,
        d: DeclId,
        name: Option<DeclName>,
        loc: SourceLoc,
        sem_dc: DeclId,
        lex_dc: DeclId,
    ) -> Result<DeclId> {
        let from = self.from;
        let DeclKind::Field {
            ty,
            bit_width,
            index,
        } = from.decl(d).kind
        else {
            return Err(ImportError::unknown("expected a field"));
        };
        match self.resolve_name(d, sem_dc, name, IdentNamespace::MEMBER)? {
            NameResolution::Existing(found) => {
                self.map.record_decl(d, found);
                self.propagate_flags(d, found);
                Ok(found)
            }
            NameResolution::Fresh(name) => {
                let ty = self.import_type(ty)?;
                let bit_width = match bit_width {
                    Some(w) => Some(self.import_stmt(w)?),
                    None => None,
                };
                Ok(self.finish_decl(
                    d,
                    Decl::new(
                        DeclKind::Field {
                            ty,
                            bit_width,
                            index,
                        },
                        name,
                        loc,
                        sem_dc,
                    ),
                    lex_dc,
                ))
            }
        }
    }

    fn visit_function(
        &mut self,
        d: DeclId,
        name: Option<DeclName>,
        loc: SourceLoc,
        sem_dc: DeclId,
        lex_dc: DeclId,
    ) -> Result<DeclId> {
        let from = self.from;
        let DeclKind::Function(data) = from.decl(d).kind.clone() else {
            return Err(ImportError::unknown("expected a function"));
        };

        // Canonical-first: earlier redeclarations are imported before
        // this one so chain order survives the trip.
        let to_prev = match from.decl(d).previous {
            Some(prev) => Some(self.import_decl(prev)?),
            None => None,
        };

        // Merging a function means linking a new node into the existing
        // chain, not collapsing onto it; each source redeclaration gets
        // its own destination node.
        let (name, prev_link) = match self.resolve_name(d, sem_dc, name, IdentNamespace::ORDINARY)?
        {
            NameResolution::Existing(found) => {
                let name = self.to.decl(found).name.clone();
                (name, to_prev.or(Some(found)))
            }
            NameResolution::Fresh(name) => (name, to_prev),
        };

        let ty = self.import_type(data.ty)?;
        let mut to_params = Vec::with_capacity(data.params.len());
        for &param in &data.params {
            to_params.push(self.import_param(param)?);
        }

        let to_d = self.finish_decl(
            d,
            Decl::new(
                DeclKind::Function(FunctionData {
                    ty,
                    kind: data.kind,
                    storage: data.storage,
                    is_inline: data.is_inline,
                    params: to_params.clone(),
                    body: None,
                    described_template: None,
                }),
                name,
                loc,
                sem_dc,
            ),
            lex_dc,
        );
        for &param in &to_params {
            let p = self.to.decl_mut(param);
            p.semantic_dc = Some(to_d);
            p.lexical_dc = Some(to_d);
        }
        if let Some(prev) = prev_link {
            if prev != to_d {
                self.to.link_previous(to_d, prev);
            }
        }
        // Body last: the function is mapped, so recursive calls resolve.
        if let Some(body) = data.body {
            let body = self.import_stmt(body)?;
            if let DeclKind::Function(f) = &mut self.to.decl_mut(to_d).kind {
                f.body = Some(body);
            }
        }
        Ok(to_d)
    }

    /// Import a parameter without touching its owning function; the
    /// caller re-parents it.
    pub(crate) fn import_param(&mut self, param: DeclId) -> Result<DeclId> {
        if let Some(to_param) = self.map.lookup_decl(param) {
            return Ok(to_param);
        }
        let from = self.from;
        let decl = from.decl(param);
        let DeclKind::Param { ty, default_arg } = decl.kind else {
            return Err(ImportError::unknown("expected a parameter"));
        };
        let ty = self.import_type(ty)?;
        let default_arg = match default_arg {
            Some(e) => Some(self.import_stmt(e)?),
            None => None,
        };
        let name = match &from.decl(param).name {
            Some(n) => Some(self.import_decl_name(n)?),
            None => None,
        };
        let loc = self.import_loc(from.decl(param).loc)?;
        let attrs = self.import_attrs(&from.decl(param).attrs);
        let to_param = self.to.alloc_decl(Decl {
            kind: DeclKind::Param { ty, default_arg },
            name,
            loc,
            semantic_dc: None,
            lexical_dc: None,
            flags: from.decl(param).flags,
            access: from.decl(param).access,
            attrs,
            previous: None,
        });
        self.map.record_decl(param, to_param);
        Ok(to_param)
    }

    fn visit_var(
        &mut self,
        d: DeclId,
        name: Option<DeclName>,
        loc: SourceLoc,
        sem_dc: DeclId,
        lex_dc: DeclId,
    ) -> Result<DeclId> {
        let from = self.from;
        let DeclKind::Var(data) = from.decl(d).kind.clone() else {
            return Err(ImportError::unknown("expected a variable"));
        };

        let to_prev = match from.decl(d).previous {
            Some(prev) => Some(self.import_decl(prev)?),
            None => None,
        };
        // Variables chain like functions.
        let (name, prev_link) = match self.resolve_name(d, sem_dc, name, IdentNamespace::ORDINARY)?
        {
            NameResolution::Existing(found) => {
                let name = self.to.decl(found).name.clone();
                (name, to_prev.or(Some(found)))
            }
            NameResolution::Fresh(name) => (name, to_prev),
        };

        let ty = self.import_type(data.ty)?;
        let to_d = self.finish_decl(
            d,
            Decl::new(
                DeclKind::Var(VarData {
                    ty,
                    storage: data.storage,
                    init: None,
                    is_definition: data.is_definition,
                    described_template: None,
                }),
                name,
                loc,
                sem_dc,
            ),
            lex_dc,
        );
        if let Some(prev) = prev_link {
            if prev != to_d {
                self.to.link_previous(to_d, prev);
            }
        }
        if let Some(init) = data.init {
            let init = self.import_stmt(init)?;
            if let DeclKind::Var(v) = &mut self.to.decl_mut(to_d).kind {
                v.init = Some(init);
            }
        }
        Ok(to_d)
    }

    // --- templates ---

    fn visit_template(
        &mut self,
        d: DeclId,
        name: Option<DeclName>,
        loc: SourceLoc,
        sem_dc: DeclId,
        lex_dc: DeclId,
    ) -> Result<DeclId> {
        let from = self.from;
        let (data, ns) = match &from.decl(d).kind {
            DeclKind::ClassTemplate(t) => {
                (t.clone(), IdentNamespace::TAG | IdentNamespace::ORDINARY)
            }
            DeclKind::FunctionTemplate(t) | DeclKind::VarTemplate(t) => {
                (t.clone(), IdentNamespace::ORDINARY)
            }
            _ => return Err(ImportError::unknown("expected a template")),
        };

        match self.resolve_name(d, sem_dc, name, ns)? {
            NameResolution::Existing(found) => {
                self.map.record_decl(d, found);
                self.propagate_flags(d, found);
                // Wire the source pattern and parameters onto the
                // existing pair so references through them resolve.
                let found_data = match &self.to.decl(found).kind {
                    DeclKind::ClassTemplate(t)
                    | DeclKind::FunctionTemplate(t)
                    | DeclKind::VarTemplate(t) => t.clone(),
                    _ => return Err(ImportError::unknown("merge target is not a template")),
                };
                self.map.record_decl(data.templated, found_data.templated);
                for (&fp, &tp) in data.params.iter().zip(&found_data.params) {
                    self.map.record_decl(fp, tp);
                }
                // A defining source pattern completes a declaration-only
                // destination pattern.
                self.import_pattern_body(data.templated, found_data.templated)?;
                Ok(found)
            }
            NameResolution::Fresh(name) => {
                // Parameters first: the pattern's signature references
                // them.
                let mut to_params = Vec::with_capacity(data.params.len());
                for &param in &data.params {
                    to_params.push(self.import_template_param(param)?);
                }
                let to_pattern = self.import_template_pattern(data.templated, sem_dc)?;
                let to_data = TemplateData {
                    params: to_params,
                    templated: to_pattern,
                    specializations: Vec::new(),
                };
                let kind = match &from.decl(d).kind {
                    DeclKind::ClassTemplate(_) => DeclKind::ClassTemplate(to_data),
                    DeclKind::FunctionTemplate(_) => DeclKind::FunctionTemplate(to_data),
                    _ => DeclKind::VarTemplate(to_data),
                };
                let to_d = self.finish_decl(d, Decl::new(kind, name, loc, sem_dc), lex_dc);
                self.wire_pattern(to_pattern, to_d);
                // The pair exists and is mapped; now the pattern's body
                // can reference the template.
                self.import_pattern_body(data.templated, to_pattern)?;
                Ok(to_d)
            }
        }
    }

    /// Build the templated pattern node. Patterns are reached through
    /// their template, so this bypasses the merge search and never
    /// attaches the node to a member list.
    fn import_template_pattern(&mut self, from_p: DeclId, sem_dc: DeclId) -> Result<DeclId> {
        if let Some(to_p) = self.map.lookup_decl(from_p) {
            return Ok(to_p);
        }
        let from = self.from;
        let kind = match &from.decl(from_p).kind {
            DeclKind::Record(r) => DeclKind::Record(RecordData {
                is_anonymous: r.is_anonymous,
                ..RecordData::forward(r.tag)
            }),
            DeclKind::Function(f) => {
                let f = f.clone();
                let ty = self.import_type(f.ty)?;
                let mut to_params = Vec::with_capacity(f.params.len());
                for &param in &f.params {
                    to_params.push(self.import_param(param)?);
                }
                DeclKind::Function(FunctionData {
                    ty,
                    kind: f.kind,
                    storage: f.storage,
                    is_inline: f.is_inline,
                    params: to_params,
                    body: None,
                    described_template: None,
                })
            }
            DeclKind::Var(v) => {
                let v = v.clone();
                DeclKind::Var(VarData {
                    ty: self.import_type(v.ty)?,
                    storage: v.storage,
                    init: None,
                    is_definition: v.is_definition,
                    described_template: None,
                })
            }
            _ => {
                return Err(ImportError::Unsupported {
                    construct: "template pattern that is not a record, function, or variable",
                })
            }
        };
        let name = match &from.decl(from_p).name {
            Some(n) => Some(self.import_decl_name(n)?),
            None => None,
        };
        let loc = self.import_loc(from.decl(from_p).loc)?;
        let attrs = self.import_attrs(&from.decl(from_p).attrs);
        let to_p = self.to.alloc_decl(Decl {
            kind,
            name,
            loc,
            semantic_dc: Some(sem_dc),
            lexical_dc: Some(sem_dc),
            flags: from.decl(from_p).flags,
            access: from.decl(from_p).access,
            attrs,
            previous: None,
        });
        self.map.record_decl(from_p, to_p);
        if let DeclKind::Function(f) = &self.to.decl(to_p).kind {
            for param in f.params.clone() {
                let p = self.to.decl_mut(param);
                p.semantic_dc = Some(to_p);
                p.lexical_dc = Some(to_p);
            }
        }
        Ok(to_p)
    }

    fn wire_pattern(&mut self, to_pattern: DeclId, to_template: DeclId) {
        let pattern = self.to.decl_mut(to_pattern);
        match &mut pattern.kind {
            DeclKind::Record(r) => r.described_template = Some(to_template),
            DeclKind::Function(f) => f.described_template = Some(to_template),
            DeclKind::Var(v) => v.described_template = Some(to_template),
            _ => {}
        }
    }

    /// Carry the source pattern's definition onto `to_p`. A destination
    /// pattern that already has a body keeps it.
    fn import_pattern_body(&mut self, from_p: DeclId, to_p: DeclId) -> Result<()> {
        let from = self.from;
        match &from.decl(from_p).kind {
            DeclKind::Record(r) if r.is_definition => self.import_record_body(from_p, to_p),
            DeclKind::Function(f) => {
                let has_body = matches!(
                    &self.to.decl(to_p).kind,
                    DeclKind::Function(tf) if tf.body.is_some()
                );
                if let (Some(body), false) = (f.body, has_body) {
                    let body = self.import_stmt(body)?;
                    if let DeclKind::Function(f) = &mut self.to.decl_mut(to_p).kind {
                        f.body = Some(body);
                    }
                }
                Ok(())
            }
            DeclKind::Var(v) => {
                let has_init = matches!(
                    &self.to.decl(to_p).kind,
                    DeclKind::Var(tv) if tv.init.is_some()
                );
                if let (Some(init), false) = (v.init, has_init) {
                    let init = self.import_stmt(init)?;
                    if let DeclKind::Var(v) = &mut self.to.decl_mut(to_p).kind {
                        v.init = Some(init);
                    }
                }
                Ok(())
            }
            _ => Ok(()),
        }
    }

    fn import_template_param(&mut self, param: DeclId) -> Result<DeclId> {
        if let Some(to_param) = self.map.lookup_decl(param) {
            return Ok(to_param);
        }
        let from = self.from;
        let kind = match &from.decl(param).kind {
            DeclKind::TemplateTypeParam {
                depth,
                index,
                default,
            } => DeclKind::TemplateTypeParam {
                depth: *depth,
                index: *index,
                default: match *default {
                    Some(ty) => Some(self.import_type(ty)?),
                    None => None,
                },
            },
            DeclKind::NonTypeTemplateParam { ty, depth, index } => {
                DeclKind::NonTypeTemplateParam {
                    ty: self.import_type(*ty)?,
                    depth: *depth,
                    index: *index,
                }
            }
            _ => return Err(ImportError::unknown("expected a template parameter")),
        };
        let name = match &from.decl(param).name {
            Some(n) => Some(self.import_decl_name(n)?),
            None => None,
        };
        let loc = self.import_loc(from.decl(param).loc)?;
        let attrs = self.import_attrs(&from.decl(param).attrs);
        let to_param = self.to.alloc_decl(Decl {
            kind,
            name,
            loc,
            semantic_dc: None,
            lexical_dc: None,
            flags: from.decl(param).flags,
            access: from.decl(param).access,
            attrs,
            previous: None,
        });
        self.map.record_decl(param, to_param);
        Ok(to_param)
    }

    fn visit_class_specialization(
        &mut self,
        d: DeclId,
        name: Option<DeclName>,
        loc: SourceLoc,
        sem_dc: DeclId,
        lex_dc: DeclId,
    ) -> Result<DeclId> {
        let from = self.from;
        let DeclKind::ClassTemplateSpecialization {
            template,
            args,
            record,
        } = from.decl(d).kind.clone()
        else {
            return Err(ImportError::unknown("expected a class specialization"));
        };
        let to_template = self.import_decl(template)?;
        let to_args = self.import_template_args(&args)?;

        // The specialization table is searched with the already-imported
        // arguments; a hit merges instead of duplicating.
        let table = match &self.to.decl(to_template).kind {
            DeclKind::ClassTemplate(t) => t.specializations.clone(),
            _ => {
                return Err(ImportError::unknown(
                    "specialized declaration is not a class template",
                ))
            }
        };
        for existing in table {
            if let DeclKind::ClassTemplateSpecialization {
                args: existing_args,
                ..
            } = &self.to.decl(existing).kind
            {
                if *existing_args == to_args {
                    self.map.record_decl(d, existing);
                    self.propagate_flags(d, existing);
                    if record.is_definition {
                        self.import_record_body(d, existing)?;
                    }
                    return Ok(existing);
                }
            }
        }

        let to_d = self.finish_decl(
            d,
            Decl::new(
                DeclKind::ClassTemplateSpecialization {
                    template: to_template,
                    args: to_args,
                    record: RecordData {
                        is_anonymous: record.is_anonymous,
                        ..RecordData::forward(record.tag)
                    },
                },
                name,
                loc,
                sem_dc,
            ),
            lex_dc,
        );
        if let DeclKind::ClassTemplate(t) = &mut self.to.decl_mut(to_template).kind {
            t.specializations.push(to_d);
        }
        if record.is_definition {
            self.import_record_body(d, to_d)?;
        }
        Ok(to_d)
    }

    fn visit_var_specialization(
        &mut self,
        d: DeclId,
        name: Option<DeclName>,
        loc: SourceLoc,
        sem_dc: DeclId,
        lex_dc: DeclId,
    ) -> Result<DeclId> {
        let from = self.from;
        let DeclKind::VarTemplateSpecialization {
            template,
            args,
            var,
        } = from.decl(d).kind.clone()
        else {
            return Err(ImportError::unknown("expected a variable specialization"));
        };
        let to_template = self.import_decl(template)?;
        let to_args = self.import_template_args(&args)?;

        let table = match &self.to.decl(to_template).kind {
            DeclKind::VarTemplate(t) => t.specializations.clone(),
            _ => {
                return Err(ImportError::unknown(
                    "specialized declaration is not a variable template",
                ))
            }
        };
        for existing in table {
            if let DeclKind::VarTemplateSpecialization {
                args: existing_args,
                ..
            } = &self.to.decl(existing).kind
            {
                if *existing_args == to_args {
                    self.map.record_decl(d, existing);
                    self.propagate_flags(d, existing);
                    return Ok(existing);
                }
            }
        }

        let ty = self.import_type(var.ty)?;
        let to_d = self.finish_decl(
            d,
            Decl::new(
                DeclKind::VarTemplateSpecialization {
                    template: to_template,
                    args: to_args,
                    var: VarData {
                        ty,
                        storage: var.storage,
                        init: None,
                        is_definition: var.is_definition,
                        described_template: None,
                    },
                },
                name,
                loc,
                sem_dc,
            ),
            lex_dc,
        );
        if let DeclKind::VarTemplate(t) = &mut self.to.decl_mut(to_template).kind {
            t.specializations.push(to_d);
        }
        if let Some(init) = var.init {
            let init = self.import_stmt(init)?;
            if let DeclKind::VarTemplateSpecialization { var, .. } =
                &mut self.to.decl_mut(to_d).kind
            {
                var.init = Some(init);
            }
        }
        Ok(to_d)
    }

    // --- display helpers ---

    /// Render a destination-context declaration name for diagnostics.
    fn decl_display(&self, d: DeclId) -> String {
        match &self.to.decl(d).name {
            Some(name) => self.name_string(name),
            None => format!("<anonymous {}>", self.to.decl(d).kind.kind_name()),
        }
    }

    fn name_string(&self, name: &DeclName) -> String {
        match name {
            DeclName::Identifier(n) => self.to.interner().lookup(*n).to_owned(),
            DeclName::Operator(op) => format!("operator{}", op.spelling()),
            DeclName::Constructor(_) => "<constructor>".to_owned(),
            DeclName::Destructor(_) => "<destructor>".to_owned(),
            DeclName::Conversion(_) => "<conversion function>".to_owned(),
            DeclName::LiteralOperator(n) => {
                format!("operator\"\"{}", self.to.interner().lookup(*n))
            }
            DeclName::DeductionGuide(_) => "<deduction guide>".to_owned(),
            DeclName::Selector(sel) => {
                if sel.num_args() == 0 {
                    self.to.interner().lookup(sel.pieces()[0]).to_owned()
                } else {
                    sel.pieces()
                        .iter()
                        .map(|&p| format!("{}:", self.to.interner().lookup(p)))
                        .collect()
                }
            }
        }
    }
}

fn tags_compatible(a: &DeclKind, b: &DeclKind) -> bool {
    match (a, b) {
        (DeclKind::Record(ra), DeclKind::Record(rb)) => ra.tag == rb.tag,
        (DeclKind::Enum(ea), DeclKind::Enum(eb)) => ea.is_scoped == eb.is_scoped,
        _ => false,
    }
}

fn described_template_of(decl: &Decl) -> Option<DeclId> {
    match &decl.kind {
        DeclKind::Record(r) => r.described_template,
        DeclKind::Function(f) => f.described_template,
        DeclKind::Var(v) => v.described_template,
        _ => None,
    }
}

fn fields_of(cx: &xtu_ast::AstContext, record: DeclId) -> Vec<DeclId> {
    cx.members(record)
        .iter()
        .copied()
        .filter(|&m| matches!(cx.decl(m).kind, DeclKind::Field { .. }))
        .collect()
}
