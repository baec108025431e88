//! End-to-end importer tests over hand-built source contexts.

use std::cell::Cell;
use std::rc::Rc;

use pretty_assertions::assert_eq;
use xtu_ast::{
    AstContext, Decl, DeclFlags, DeclId, DeclKind, DeclName, EnumData, ExprInfo, FunctionData,
    FunctionKind, IdentNamespace, QualType, RecordData, SourceLoc, StmtKind, StorageClass, Stmt,
    TagKind, TargetInfo, TemplateArg, TemplateData, TypeId, TypeKind, VarData,
};
use xtu_diagnostic::{ErrorCode, Severity};
use xtu_import::{ConflictResolver, ImportError, Importer};

fn ident(cx: &AstContext, s: &str) -> DeclName {
    DeclName::Identifier(cx.intern(s))
}

fn add_var(cx: &mut AstContext, dc: DeclId, name: &str, ty: QualType) -> DeclId {
    let name = ident(cx, name);
    let d = cx.alloc_decl(Decl::new(
        DeclKind::Var(VarData {
            ty,
            storage: StorageClass::None,
            init: None,
            is_definition: true,
            described_template: None,
        }),
        Some(name),
        SourceLoc::INVALID,
        dc,
    ));
    cx.add_member(dc, d);
    d
}

fn add_record(cx: &mut AstContext, dc: DeclId, name: &str) -> DeclId {
    let name = ident(cx, name);
    let d = cx.alloc_decl(Decl::new(
        DeclKind::Record(RecordData::forward(TagKind::Struct)),
        Some(name),
        SourceLoc::INVALID,
        dc,
    ));
    cx.add_member(dc, d);
    d
}

fn add_field(cx: &mut AstContext, record: DeclId, name: &str, ty: QualType, index: u32) -> DeclId {
    let name = ident(cx, name);
    let d = cx.alloc_decl(Decl::new(
        DeclKind::Field {
            ty,
            bit_width: None,
            index,
        },
        Some(name),
        SourceLoc::INVALID,
        record,
    ));
    cx.add_member(record, d);
    d
}

fn add_function(cx: &mut AstContext, dc: DeclId, name: &str, body: Option<xtu_ast::StmtId>) -> DeclId {
    let fn_ty = cx.intern_type(TypeKind::Function {
        result: TypeId::INT.into(),
        params: vec![],
        variadic: false,
    });
    let name = ident(cx, name);
    let d = cx.alloc_decl(Decl::new(
        DeclKind::Function(FunctionData {
            ty: fn_ty.into(),
            kind: FunctionKind::Plain,
            storage: StorageClass::None,
            is_inline: false,
            params: vec![],
            body,
            described_template: None,
        }),
        Some(name),
        SourceLoc::INVALID,
        dc,
    ));
    cx.add_member(dc, d);
    d
}

fn add_typedef(cx: &mut AstContext, dc: DeclId, name: &str, ty: QualType) -> DeclId {
    let name = ident(cx, name);
    let d = cx.alloc_decl(Decl::new(
        DeclKind::Typedef { underlying: ty },
        Some(name),
        SourceLoc::INVALID,
        dc,
    ));
    cx.add_member(dc, d);
    d
}

/// template<typename T> struct <name>, optionally with a defining pattern
/// carrying one int field. Returns (template, pattern).
fn add_class_template(cx: &mut AstContext, name: &str, define: bool) -> (DeclId, DeclId) {
    let tu = cx.translation_unit();
    let tmpl_name = ident(cx, name);
    let pattern = cx.alloc_decl(Decl::new(
        DeclKind::Record(RecordData::forward(TagKind::Struct)),
        Some(tmpl_name.clone()),
        SourceLoc::INVALID,
        tu,
    ));
    let t_param = cx.alloc_decl(Decl::new(
        DeclKind::TemplateTypeParam {
            depth: 0,
            index: 0,
            default: None,
        },
        Some(ident(cx, "T")),
        SourceLoc::INVALID,
        tu,
    ));
    let template = cx.alloc_decl(Decl::new(
        DeclKind::ClassTemplate(TemplateData {
            params: vec![t_param],
            templated: pattern,
            specializations: vec![],
        }),
        Some(tmpl_name),
        SourceLoc::INVALID,
        tu,
    ));
    if let Some(r) = cx.decl_mut(pattern).record_data_mut() {
        r.described_template = Some(template);
    }
    cx.add_member(tu, template);
    if define {
        add_field(cx, pattern, "payload", TypeId::INT.into(), 0);
        cx.complete_record_definition(pattern);
    }
    (template, pattern)
}

/// struct S { int a; S* next; };
fn add_self_linked_struct(cx: &mut AstContext) -> DeclId {
    let tu = cx.translation_unit();
    let s = add_record(cx, tu, "S");
    add_field(cx, s, "a", TypeId::INT.into(), 0);
    let s_ty = cx.intern_type(TypeKind::Record(s));
    let ptr = cx.intern_type(TypeKind::Pointer(s_ty.into()));
    add_field(cx, s, "next", ptr.into(), 1);
    cx.complete_record_definition(s);
    s
}

fn add_enum(cx: &mut AstContext, dc: DeclId, name: &str, enumerators: &[(&str, i64)]) -> DeclId {
    let name = ident(cx, name);
    let e = cx.alloc_decl(Decl::new(
        DeclKind::Enum(EnumData {
            integer_type: Some(TypeId::INT.into()),
            ..EnumData::forward()
        }),
        Some(name),
        SourceLoc::INVALID,
        dc,
    ));
    cx.add_member(dc, e);
    for (n, v) in enumerators {
        let n = ident(cx, n);
        let c = cx.alloc_decl(Decl::new(
            DeclKind::EnumConstant {
                ty: TypeId::INT.into(),
                value: *v,
                init: None,
            },
            Some(n),
            SourceLoc::INVALID,
            e,
        ));
        cx.add_member(e, c);
    }
    cx.complete_enum_definition(e);
    e
}

fn fields_of(cx: &AstContext, record: DeclId) -> Vec<DeclId> {
    cx.members(record)
        .iter()
        .copied()
        .filter(|&m| matches!(cx.decl(m).kind, DeclKind::Field { .. }))
        .collect()
}

struct CountingResolver {
    calls: Rc<Cell<usize>>,
}

impl ConflictResolver for CountingResolver {
    fn resolve(
        &mut self,
        _from: &AstContext,
        _to: &AstContext,
        _name: &DeclName,
        _candidates: &[DeclId],
    ) -> Option<DeclName> {
        self.calls.set(self.calls.get() + 1);
        None
    }
}

struct RenameResolver;

impl ConflictResolver for RenameResolver {
    fn resolve(
        &mut self,
        _from: &AstContext,
        to: &AstContext,
        name: &DeclName,
        _candidates: &[DeclId],
    ) -> Option<DeclName> {
        match name {
            DeclName::Identifier(n) => {
                let renamed = format!("{}__imported", to.interner().lookup(*n));
                Some(DeclName::Identifier(to.intern(&renamed)))
            }
            _ => None,
        }
    }
}

#[test]
fn importing_twice_yields_the_same_node() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let from_tu = from.translation_unit();
    let v = add_var(&mut from, from_tu, "x", TypeId::INT.into());

    let decls_before = to.decl_count();
    let mut imp = Importer::new(&from, &mut to);
    let first = imp.import_decl(v).expect("import succeeds");
    let second = imp.import_decl(v).expect("import succeeds");
    assert_eq!(first, second);
    drop(imp);

    assert_eq!(to.decl_count(), decls_before + 1);
    let name = ident(&to, "x");
    assert_eq!(
        to.lookup(to.translation_unit(), &name, IdentNamespace::ORDINARY),
        vec![first]
    );
}

#[test]
fn definition_merges_onto_existing_forward_declaration() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let from_s = add_self_linked_struct(&mut from);
    let to_tu = to.translation_unit();
    let to_forward = add_record(&mut to, to_tu, "S");

    let mut imp = Importer::new(&from, &mut to);
    let to_s = imp.import_decl(from_s).expect("import succeeds");
    drop(imp);

    assert_eq!(to_s, to_forward);
    assert!(to.decl(to_s).record_data().expect("record").is_complete);
    assert_eq!(fields_of(&to, to_s).len(), 2);
}

#[test]
fn forward_declaration_merges_onto_existing_definition() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let from_tu = from.translation_unit();
    let from_forward = add_record(&mut from, from_tu, "S");
    let to_s = add_self_linked_struct(&mut to);

    let decls_before = to.decl_count();
    let mut imp = Importer::new(&from, &mut to);
    let imported = imp.import_decl(from_forward).expect("import succeeds");
    drop(imp);

    assert_eq!(imported, to_s);
    // Nothing new was allocated; the existing definition also survives.
    assert_eq!(to.decl_count(), decls_before);
    assert_eq!(fields_of(&to, to_s).len(), 2);
}

#[test]
fn self_referential_struct_imports_with_back_pointer() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let from_s = add_self_linked_struct(&mut from);

    let mut imp = Importer::new(&from, &mut to);
    let to_s = imp.import_definition(from_s).expect("import succeeds");
    assert!(imp.diagnostics().is_empty());
    drop(imp);

    let fields = fields_of(&to, to_s);
    assert_eq!(fields.len(), 2);
    let DeclKind::Field { ty: a_ty, .. } = to.decl(fields[0]).kind else {
        panic!("expected a field");
    };
    assert_eq!(a_ty.ty, TypeId::INT);

    // The second field's type is S* where S is the imported record, not
    // a duplicate.
    let DeclKind::Field { ty: next_ty, .. } = to.decl(fields[1]).kind else {
        panic!("expected a field");
    };
    let TypeKind::Pointer(pointee) = to.type_kind(next_ty.ty) else {
        panic!("expected a pointer type");
    };
    let TypeKind::Record(pointee_decl) = to.type_kind(pointee.ty) else {
        panic!("expected a record type");
    };
    assert_eq!(*pointee_decl, to_s);
    assert!(to.decl(to_s).record_data().expect("record").is_complete);
}

#[test]
fn redeclaration_chain_preserves_source_order() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let tu = from.translation_unit();
    let f1 = add_function(&mut from, tu, "f", None);
    let f2 = add_function(&mut from, tu, "f", None);
    from.link_previous(f2, f1);

    let mut imp = Importer::new(&from, &mut to);
    let to_f2 = imp.import_decl(f2).expect("import succeeds");
    let to_f1 = imp.imported_decl(f1).expect("previous was imported first");
    drop(imp);

    assert_ne!(to_f1, to_f2);
    assert_eq!(to.canonical_decl(to_f2), to_f1);
    assert_eq!(to.redecl_chain(to_f2), vec![to_f1, to_f2]);
}

#[test]
fn conflicting_declaration_fails_and_is_not_retried() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let from_tu = from.translation_unit();
    let to_tu = to.translation_unit();
    let from_x = add_var(&mut from, from_tu, "x", TypeId::FLOAT.into());
    add_var(&mut to, to_tu, "x", TypeId::INT.into());

    let calls = Rc::new(Cell::new(0));
    let mut imp = Importer::new(&from, &mut to).with_resolver(Box::new(CountingResolver {
        calls: Rc::clone(&calls),
    }));

    let err = imp.import_decl(from_x).expect_err("conflict must fail");
    assert!(matches!(err, ImportError::NameConflict { .. }));
    let again = imp.import_decl(from_x).expect_err("cached failure");
    assert!(matches!(again, ImportError::NameConflict { .. }));

    // The second request is answered from the failure cache; the
    // resolver is never consulted again.
    assert_eq!(calls.get(), 1);
    assert_eq!(imp.diagnostics().len(), 1);
    assert_eq!(imp.diagnostics()[0].code, ErrorCode::E4004);
    assert_eq!(imp.diagnostics()[0].severity, Severity::Error);
}

#[test]
fn resolver_can_rename_past_a_conflict() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let from_tu = from.translation_unit();
    let to_tu = to.translation_unit();
    let from_x = add_var(&mut from, from_tu, "x", TypeId::FLOAT.into());
    let to_x = add_var(&mut to, to_tu, "x", TypeId::INT.into());

    let mut imp = Importer::new(&from, &mut to).with_resolver(Box::new(RenameResolver));
    let imported = imp.import_decl(from_x).expect("rename resolves the conflict");
    drop(imp);

    assert_ne!(imported, to_x);
    let renamed = ident(&to, "x__imported");
    assert_eq!(
        to.lookup(to.translation_unit(), &renamed, IdentNamespace::ORDINARY),
        vec![imported]
    );
    // The original keeps its name and type.
    let DeclKind::Var(v) = &to.decl(to_x).kind else {
        panic!("expected a variable");
    };
    assert_eq!(v.ty.ty, TypeId::INT);
}

#[test]
fn mismatched_record_definitions_warn_and_keep_destination() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let from_tu = from.translation_unit();
    let to_tu = to.translation_unit();
    let from_s = add_record(&mut from, from_tu, "S");
    add_field(&mut from, from_s, "a", TypeId::INT.into(), 0);
    add_field(&mut from, from_s, "b", TypeId::FLOAT.into(), 1);
    from.complete_record_definition(from_s);

    let to_s = add_record(&mut to, to_tu, "S");
    add_field(&mut to, to_s, "a", TypeId::INT.into(), 0);
    to.complete_record_definition(to_s);

    let mut imp = Importer::new(&from, &mut to);
    let imported = imp.import_definition(from_s).expect("merge proceeds");
    assert_eq!(imp.diagnostics().len(), 1);
    assert_eq!(imp.diagnostics()[0].code, ErrorCode::E4001);
    assert_eq!(imp.diagnostics()[0].severity, Severity::Warning);
    drop(imp);

    assert_eq!(imported, to_s);
    assert_eq!(fields_of(&to, to_s).len(), 1);
}

#[test]
fn mismatched_enumerator_lists_warn_and_keep_destination() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let from_tu = from.translation_unit();
    let to_tu = to.translation_unit();
    let from_e = add_enum(&mut from, from_tu, "E", &[("A", 0), ("B", 1)]);
    let to_e = add_enum(&mut to, to_tu, "E", &[("A", 0)]);

    let mut imp = Importer::new(&from, &mut to);
    let imported = imp.import_definition(from_e).expect("merge proceeds");
    assert_eq!(imp.diagnostics().len(), 1);
    assert_eq!(imp.diagnostics()[0].code, ErrorCode::E4003);
    drop(imp);

    assert_eq!(imported, to_e);
    assert_eq!(to.members(to_e).len(), 1);
}

#[test]
fn enum_imports_with_enumerators_and_width_bits() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let from_tu = from.translation_unit();
    let from_e = add_enum(&mut from, from_tu, "E", &[("A", 0), ("B", 5)]);
    if let Some(data) = from.decl_mut(from_e).enum_data_mut() {
        data.num_positive_bits = 3;
    }

    let mut imp = Importer::new(&from, &mut to);
    let to_e = imp.import_definition(from_e).expect("import succeeds");
    drop(imp);

    let data = to.decl(to_e).enum_data().expect("enum");
    assert!(data.is_complete);
    assert_eq!(data.num_positive_bits, 3);
    let members = to.members(to_e).to_vec();
    assert_eq!(members.len(), 2);
    let DeclKind::EnumConstant { value, .. } = to.decl(members[1]).kind else {
        panic!("expected an enumerator");
    };
    assert_eq!(value, 5);
}

#[test]
fn record_in_function_scope_is_unsupported() {
    let mut from = AstContext::default();
    let to_ctx = &mut AstContext::default();
    let tu = from.translation_unit();
    let f = add_function(&mut from, tu, "f", None);
    let local = from.alloc_decl(Decl::new(
        DeclKind::Record(RecordData::forward(TagKind::Struct)),
        Some(ident(&from, "Local")),
        SourceLoc::INVALID,
        f,
    ));

    let mut imp = Importer::new(&from, to_ctx);
    let err = imp.import_decl(local).expect_err("must be rejected");
    assert!(matches!(err, ImportError::Unsupported { .. }));
    let again = imp.import_decl(local).expect_err("cached failure");
    assert!(matches!(again, ImportError::Unsupported { .. }));
}

#[test]
fn plain_char_follows_source_signedness() {
    let mut from = AstContext::new(TargetInfo {
        char_is_signed: false,
    });
    let mut to = AstContext::default(); // char is signed here
    let from_tu = from.translation_unit();
    let from_c = add_var(&mut from, from_tu, "c", TypeId::CHAR.into());

    let mut imp = Importer::new(&from, &mut to);
    let to_c = imp.import_decl(from_c).expect("import succeeds");
    drop(imp);

    let DeclKind::Var(v) = &to.decl(to_c).kind else {
        panic!("expected a variable");
    };
    assert_eq!(v.ty.ty, TypeId::UCHAR);
}

#[test]
fn locations_rebase_into_the_destination_file_copy() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let file = from
        .source_mut()
        .add_buffer("s.h", "struct S;\nint x;\n", Default::default())
        .expect("buffer fits");
    let loc = from.source().loc_for(file, 14).expect("in range");
    let tu = from.translation_unit();
    let v = add_var(&mut from, tu, "x", TypeId::INT.into());
    from.decl_mut(v).loc = loc;

    let mut imp = Importer::new(&from, &mut to);
    let to_v = imp.import_decl(v).expect("import succeeds");
    drop(imp);

    let to_loc = to.decl(to_v).loc;
    let (to_file, offset) = to.source().decompose(to_loc).expect("file location");
    assert_eq!(offset, 14);
    assert_eq!(to.source().file(to_file).name(), "s.h");
    assert_eq!(to.source().file(to_file).contents(), "struct S;\nint x;\n");
}

#[test]
fn macro_locations_collapse_to_their_expansion_site() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let file = from
        .source_mut()
        .add_buffer("m.c", "#define D int d;\nD\n", Default::default())
        .expect("buffer fits");
    let use_site = from.source().loc_for(file, 17).expect("in range");
    let exp = from
        .source_mut()
        .create_expansion(6, use_site)
        .expect("fits");
    let tu = from.translation_unit();
    let v = add_var(&mut from, tu, "d", TypeId::INT.into());
    from.decl_mut(v).loc = exp;

    let mut imp = Importer::new(&from, &mut to);
    let to_v = imp.import_decl(v).expect("import succeeds");
    drop(imp);

    // Expansion history is not reconstructed; the location lands at the
    // use site in the destination's copy of the file.
    let (_, offset) = to.source().decompose(to.decl(to_v).loc).expect("file location");
    assert_eq!(offset, 17);
}

#[test]
fn switch_case_chain_is_relinked() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let int_info = ExprInfo::rvalue(TypeId::INT.into());

    let lit0 = from.alloc_stmt(Stmt::synthesized(StmtKind::IntegerLiteral {
        value: 0,
        info: int_info,
    }));
    let brk1 = from.alloc_stmt(Stmt::synthesized(StmtKind::Break));
    let brk2 = from.alloc_stmt(Stmt::synthesized(StmtKind::Break));
    let deflt = from.alloc_stmt(Stmt::synthesized(StmtKind::Default {
        sub: brk2,
        next_case: None,
    }));
    let case0 = from.alloc_stmt(Stmt::synthesized(StmtKind::Case {
        value: lit0,
        sub: brk1,
        next_case: Some(deflt),
    }));
    let cond = from.alloc_stmt(Stmt::synthesized(StmtKind::IntegerLiteral {
        value: 1,
        info: int_info,
    }));
    let body = from.alloc_stmt(Stmt::synthesized(StmtKind::Compound {
        stmts: vec![case0, deflt],
    }));
    let switch = from.alloc_stmt(Stmt::synthesized(StmtKind::Switch {
        cond,
        body,
        first_case: Some(case0),
    }));
    let tu = from.translation_unit();
    let f = add_function(&mut from, tu, "f", Some(switch));

    let mut imp = Importer::new(&from, &mut to);
    let to_f = imp.import_decl(f).expect("import succeeds");
    drop(imp);

    let DeclKind::Function(fd) = &to.decl(to_f).kind else {
        panic!("expected a function");
    };
    let StmtKind::Switch { first_case, .. } = to.stmt(fd.body.expect("body")).kind else {
        panic!("expected a switch");
    };
    let to_case0 = first_case.expect("first case");
    let StmtKind::Case { next_case, .. } = to.stmt(to_case0).kind else {
        panic!("expected a case");
    };
    let to_default = next_case.expect("chain continues");
    let StmtKind::Default { next_case, .. } = to.stmt(to_default).kind else {
        panic!("expected a default");
    };
    assert_eq!(next_case, None);
}

#[test]
fn function_body_imports_with_local_variables() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let tu = from.translation_unit();

    // int f() { int local = 3; return local; }
    let f = add_function(&mut from, tu, "f", None);
    let local = from.alloc_decl(Decl::new(
        DeclKind::Var(VarData {
            ty: TypeId::INT.into(),
            storage: StorageClass::None,
            init: None,
            is_definition: true,
            described_template: None,
        }),
        Some(ident(&from, "local")),
        SourceLoc::INVALID,
        f,
    ));
    from.add_member(f, local);
    let three = from.alloc_stmt(Stmt::synthesized(StmtKind::IntegerLiteral {
        value: 3,
        info: ExprInfo::rvalue(TypeId::INT.into()),
    }));
    if let DeclKind::Var(v) = &mut from.decl_mut(local).kind {
        v.init = Some(three);
    }
    let decl_stmt = from.alloc_stmt(Stmt::synthesized(StmtKind::DeclStmt {
        decls: vec![local],
    }));
    let local_ref = from.alloc_stmt(Stmt::synthesized(StmtKind::DeclRef {
        decl: local,
        info: ExprInfo::lvalue(TypeId::INT.into()),
    }));
    let ret = from.alloc_stmt(Stmt::synthesized(StmtKind::Return {
        value: Some(local_ref),
    }));
    let body = from.alloc_stmt(Stmt::synthesized(StmtKind::Compound {
        stmts: vec![decl_stmt, ret],
    }));
    if let DeclKind::Function(fd) = &mut from.decl_mut(f).kind {
        fd.body = Some(body);
    }

    let mut imp = Importer::new(&from, &mut to);
    let to_f = imp.import_decl(f).expect("import succeeds");
    let to_local = imp.imported_decl(local).expect("local was imported");
    drop(imp);

    // The local lives in the imported function's context and the return
    // references the imported local.
    assert_eq!(to.decl(to_local).semantic_dc, Some(to_f));
    let DeclKind::Function(fd) = &to.decl(to_f).kind else {
        panic!("expected a function");
    };
    let StmtKind::Compound { stmts } = &to.stmt(fd.body.expect("body")).kind else {
        panic!("expected a compound body");
    };
    let StmtKind::Return { value } = to.stmt(stmts[1]).kind else {
        panic!("expected a return");
    };
    let StmtKind::DeclRef { decl, .. } = to.stmt(value.expect("value")).kind else {
        panic!("expected a decl reference");
    };
    assert_eq!(decl, to_local);
}

#[test]
fn class_template_specializations_merge_by_arguments() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();

    // template<typename T> struct V; template<> struct V<int> { int payload; };
    let (template, _) = add_class_template(&mut from, "V", false);
    let from_tu = from.translation_unit();
    let spec = from.alloc_decl(Decl::new(
        DeclKind::ClassTemplateSpecialization {
            template,
            args: vec![TemplateArg::Type(TypeId::INT.into())],
            record: RecordData::forward(TagKind::Struct),
        },
        Some(ident(&from, "V")),
        SourceLoc::INVALID,
        from_tu,
    ));
    from.add_member(from_tu, spec);
    add_field(&mut from, spec, "payload", TypeId::INT.into(), 0);
    from.complete_record_definition(spec);
    if let DeclKind::ClassTemplate(t) = &mut from.decl_mut(template).kind {
        t.specializations.push(spec);
    }

    let mut imp = Importer::new(&from, &mut to);
    let to_spec = imp.import_definition(spec).expect("import succeeds");
    let to_template = imp.imported_decl(template).expect("template was imported");
    drop(imp);

    let DeclKind::ClassTemplate(t) = &to.decl(to_template).kind else {
        panic!("expected a class template");
    };
    assert_eq!(t.specializations, vec![to_spec]);
    assert_eq!(fields_of(&to, to_spec).len(), 1);

    // A later session finds the specialization by its arguments instead
    // of duplicating it.
    let mut imp = Importer::new(&from, &mut to);
    let merged = imp.import_decl(spec).expect("import succeeds");
    assert!(imp.diagnostics().is_empty());
    drop(imp);
    assert_eq!(merged, to_spec);
    let DeclKind::ClassTemplate(t) = &to.decl(to_template).kind else {
        panic!("expected a class template");
    };
    assert_eq!(t.specializations.len(), 1);
}

#[test]
fn merge_search_skips_function_scope() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let from_tu = from.translation_unit();

    // Two unrelated functions both declare `int tmp;` locally; the
    // second import must not merge with (or conflict against) the first.
    let f = add_function(&mut from, from_tu, "f", None);
    let g = add_function(&mut from, from_tu, "g", None);
    let mk_local = |cx: &mut AstContext, owner: DeclId| {
        let d = cx.alloc_decl(Decl::new(
            DeclKind::Var(VarData {
                ty: TypeId::INT.into(),
                storage: StorageClass::None,
                init: None,
                is_definition: true,
                described_template: None,
            }),
            Some(ident(cx, "tmp")),
            SourceLoc::INVALID,
            owner,
        ));
        cx.add_member(owner, d);
        d
    };
    let tmp_f = mk_local(&mut from, f);
    let tmp_g = mk_local(&mut from, g);

    let mut imp = Importer::new(&from, &mut to);
    let to_tmp_f = imp.import_decl(tmp_f).expect("import succeeds");
    let to_tmp_g = imp.import_decl(tmp_g).expect("import succeeds");
    drop(imp);

    assert_ne!(to_tmp_f, to_tmp_g);
    assert_ne!(
        to.decl(to_tmp_f).semantic_dc,
        to.decl(to_tmp_g).semantic_dc
    );
}

#[test]
fn typedef_merges_with_equivalent_and_conflicts_with_different() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let from_tu = from.translation_unit();
    let to_tu = to.translation_unit();

    let from_ok = add_typedef(&mut from, from_tu, "word_t", TypeId::INT.into());
    let from_bad = add_typedef(&mut from, from_tu, "size_t", TypeId::INT.into());
    let to_ok = add_typedef(&mut to, to_tu, "word_t", TypeId::INT.into());
    add_typedef(&mut to, to_tu, "size_t", TypeId::ULONG.into());

    let mut imp = Importer::new(&from, &mut to);
    assert_eq!(imp.import_decl(from_ok).expect("merge succeeds"), to_ok);
    let err = imp.import_decl(from_bad).expect_err("conflict must fail");
    assert!(matches!(err, ImportError::NameConflict { .. }));
}

#[test]
fn template_merge_completes_declared_pattern() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let (from_tmpl, _) = add_class_template(&mut from, "V", true);
    let (to_tmpl, to_pattern) = add_class_template(&mut to, "V", false);

    let mut imp = Importer::new(&from, &mut to);
    let merged = imp.import_decl(from_tmpl).expect("merge succeeds");
    assert!(imp.diagnostics().is_empty());
    drop(imp);

    // The defining source pattern completes the declaration-only
    // destination pattern.
    assert_eq!(merged, to_tmpl);
    assert!(to.decl(to_pattern).record_data().expect("record").is_complete);
    assert_eq!(fields_of(&to, to_pattern).len(), 1);
}

#[test]
fn merging_propagates_usage_flags() {
    let mut from = AstContext::default();
    let mut to = AstContext::default();
    let from_tu = from.translation_unit();
    let to_tu = to.translation_unit();
    let from_td = add_typedef(&mut from, from_tu, "word_t", TypeId::INT.into());
    from.decl_mut(from_td).flags |= DeclFlags::USED;
    let to_td = add_typedef(&mut to, to_tu, "word_t", TypeId::INT.into());
    assert!(!to.decl(to_td).flags.contains(DeclFlags::USED));

    let mut imp = Importer::new(&from, &mut to);
    let merged = imp.import_decl(from_td).expect("merge succeeds");
    drop(imp);

    assert_eq!(merged, to_td);
    assert!(to.decl(to_td).flags.contains(DeclFlags::USED));
}
