//! Structural equivalence between declarations of two contexts.
//!
//! Handles never mean the same thing in two contexts, so "is this the
//! same entity" is answered structurally: same name, same kind, same
//! shape. The check is deliberately shallow for incomplete types and
//! optimistic on cycles (a pair already under comparison is assumed
//! equivalent, which is what makes self-referential records compare
//! without recursing forever).

use rustc_hash::FxHashSet;
use xtu_ast::{
    AstContext, BuiltinKind, DeclId, DeclKind, DeclName, QualType, TemplateArg, TypeId, TypeKind,
};

/// Oracle the declaration importer consults before merging two same-name
/// declarations.
///
/// Takes `&mut self` so implementations can keep state across queries
/// (memoized verdicts, instrumentation).
pub trait StructuralEquivalence {
    /// Decide whether `from_decl` (in `from`) and `to_decl` (in `to`)
    /// declare the same entity.
    fn is_equivalent(
        &mut self,
        from: &AstContext,
        to: &AstContext,
        from_decl: DeclId,
        to_decl: DeclId,
    ) -> bool;
}

/// Default oracle: structural comparison over names, kinds, and types.
#[derive(Default)]
pub struct StructuralMatcher;

impl StructuralMatcher {
    /// Create the default matcher.
    pub fn new() -> Self {
        StructuralMatcher
    }
}

impl StructuralEquivalence for StructuralMatcher {
    fn is_equivalent(
        &mut self,
        from: &AstContext,
        to: &AstContext,
        from_decl: DeclId,
        to_decl: DeclId,
    ) -> bool {
        Comparison {
            from,
            to,
            visited: FxHashSet::default(),
        }
        .check_decls(from_decl, to_decl)
    }
}

/// One comparison run; `visited` holds every (from, to) pair currently
/// assumed equivalent.
struct Comparison<'a> {
    from: &'a AstContext,
    to: &'a AstContext,
    visited: FxHashSet<(DeclId, DeclId)>,
}

impl Comparison<'_> {
    fn check_decls(&mut self, a: DeclId, b: DeclId) -> bool {
        if !self.visited.insert((a, b)) {
            return true;
        }
        let da = self.from.decl(a);
        let db = self.to.decl(b);
        if !self.names_match(da.name.as_ref(), db.name.as_ref()) {
            return false;
        }
        match (&da.kind, &db.kind) {
            (DeclKind::TranslationUnit, DeclKind::TranslationUnit) => true,
            (
                DeclKind::Namespace { is_anonymous, .. },
                DeclKind::Namespace {
                    is_anonymous: other_anon,
                    ..
                },
            ) => is_anonymous == other_anon,
            (
                DeclKind::Typedef { underlying },
                DeclKind::Typedef {
                    underlying: other_underlying,
                },
            ) => self.check_types(*underlying, *other_underlying),
            (DeclKind::Enum(ea), DeclKind::Enum(eb)) => {
                ea.is_scoped == eb.is_scoped && self.check_enum_bodies(a, b)
            }
            (
                DeclKind::EnumConstant { ty, value, .. },
                DeclKind::EnumConstant {
                    ty: other_ty,
                    value: other_value,
                    ..
                },
            ) => value == other_value && self.check_types(*ty, *other_ty),
            (DeclKind::Record(ra), DeclKind::Record(rb)) => {
                ra.tag == rb.tag && self.check_record_bodies(a, b)
            }
            (
                DeclKind::Field { ty, .. },
                DeclKind::Field { ty: other_ty, .. },
            ) => self.check_types(*ty, *other_ty),
            (DeclKind::Function(fa), DeclKind::Function(fb)) => {
                fa.kind == fb.kind && self.check_types(fa.ty, fb.ty)
            }
            (
                DeclKind::Param { ty, .. },
                DeclKind::Param { ty: other_ty, .. },
            ) => self.check_types(*ty, *other_ty),
            (DeclKind::Var(va), DeclKind::Var(vb)) => self.check_types(va.ty, vb.ty),
            (DeclKind::ClassTemplate(ta), DeclKind::ClassTemplate(tb))
            | (DeclKind::FunctionTemplate(ta), DeclKind::FunctionTemplate(tb))
            | (DeclKind::VarTemplate(ta), DeclKind::VarTemplate(tb)) => {
                ta.params.len() == tb.params.len() && self.check_decls(ta.templated, tb.templated)
            }
            (
                DeclKind::ClassTemplateSpecialization { template, args, record },
                DeclKind::ClassTemplateSpecialization {
                    template: other_template,
                    args: other_args,
                    record: other_record,
                },
            ) => {
                record.tag == other_record.tag
                    && self.check_decls(*template, *other_template)
                    && self.check_args(args, other_args)
            }
            (
                DeclKind::VarTemplateSpecialization { template, args, var },
                DeclKind::VarTemplateSpecialization {
                    template: other_template,
                    args: other_args,
                    var: other_var,
                },
            ) => {
                self.check_decls(*template, *other_template)
                    && self.check_args(args, other_args)
                    && self.check_types(var.ty, other_var.ty)
            }
            (
                DeclKind::TemplateTypeParam { depth, index, .. },
                DeclKind::TemplateTypeParam {
                    depth: other_depth,
                    index: other_index,
                    ..
                },
            ) => depth == other_depth && index == other_index,
            (
                DeclKind::NonTypeTemplateParam { ty, depth, index },
                DeclKind::NonTypeTemplateParam {
                    ty: other_ty,
                    depth: other_depth,
                    index: other_index,
                },
            ) => {
                depth == other_depth
                    && index == other_index
                    && self.check_types(*ty, *other_ty)
            }
            _ => false,
        }
    }

    /// Body comparison only applies when both sides carry a complete
    /// definition; a forward declaration is compatible with anything of
    /// the same name and tag.
    fn check_record_bodies(&mut self, a: DeclId, b: DeclId) -> bool {
        let (Some(def_a), Some(def_b)) = (self.from.tag_definition(a), self.to.tag_definition(b))
        else {
            return true;
        };
        let complete_a = self
            .from
            .decl(def_a)
            .record_data()
            .is_some_and(|d| d.is_complete);
        let complete_b = self
            .to
            .decl(def_b)
            .record_data()
            .is_some_and(|d| d.is_complete);
        if !complete_a || !complete_b {
            return true;
        }

        let bases_a = self.from.decl(def_a).record_data().map_or(0, |d| d.bases.len());
        let bases_b = self.to.decl(def_b).record_data().map_or(0, |d| d.bases.len());
        if bases_a != bases_b {
            return false;
        }

        let fields_a = fields_of(self.from, def_a);
        let fields_b = fields_of(self.to, def_b);
        if fields_a.len() != fields_b.len() {
            return false;
        }
        fields_a
            .into_iter()
            .zip(fields_b)
            .all(|(fa, fb)| self.check_decls(fa, fb))
    }

    fn check_enum_bodies(&mut self, a: DeclId, b: DeclId) -> bool {
        let (Some(def_a), Some(def_b)) = (self.from.tag_definition(a), self.to.tag_definition(b))
        else {
            return true;
        };
        let constants_a: Vec<DeclId> = self.from.members(def_a).to_vec();
        let constants_b: Vec<DeclId> = self.to.members(def_b).to_vec();
        if constants_a.len() != constants_b.len() {
            return false;
        }
        constants_a
            .into_iter()
            .zip(constants_b)
            .all(|(ca, cb)| self.check_decls(ca, cb))
    }

    fn check_types(&mut self, a: QualType, b: QualType) -> bool {
        a.quals == b.quals && self.check_type_ids(a.ty, b.ty)
    }

    fn check_type_ids(&mut self, a: TypeId, b: TypeId) -> bool {
        match (self.from.type_kind(a), self.to.type_kind(b)) {
            (TypeKind::Builtin(ka), TypeKind::Builtin(kb)) => {
                ka == kb || self.chars_compatible(*ka, *kb)
            }
            (TypeKind::Pointer(pa), TypeKind::Pointer(pb)) => self.check_types(*pa, *pb),
            (
                TypeKind::Reference { pointee, lvalue },
                TypeKind::Reference {
                    pointee: other_pointee,
                    lvalue: other_lvalue,
                },
            ) => lvalue == other_lvalue && self.check_types(*pointee, *other_pointee),
            (
                TypeKind::ConstantArray { element, size },
                TypeKind::ConstantArray {
                    element: other_element,
                    size: other_size,
                },
            ) => size == other_size && self.check_types(*element, *other_element),
            (
                TypeKind::IncompleteArray { element },
                TypeKind::IncompleteArray {
                    element: other_element,
                },
            ) => self.check_types(*element, *other_element),
            // VLA bounds are expressions; only the element type is
            // compared.
            (
                TypeKind::VariableArray { element, .. },
                TypeKind::VariableArray {
                    element: other_element,
                    ..
                },
            ) => self.check_types(*element, *other_element),
            (
                TypeKind::Vector { element, num_elements },
                TypeKind::Vector {
                    element: other_element,
                    num_elements: other_count,
                },
            ) => num_elements == other_count && self.check_types(*element, *other_element),
            (
                TypeKind::Function { result, params, variadic },
                TypeKind::Function {
                    result: other_result,
                    params: other_params,
                    variadic: other_variadic,
                },
            ) => {
                variadic == other_variadic
                    && params.len() == other_params.len()
                    && {
                        let params = params.clone();
                        let other_params = other_params.clone();
                        let result = *result;
                        let other_result = *other_result;
                        self.check_types(result, other_result)
                            && params
                                .into_iter()
                                .zip(other_params)
                                .all(|(p, q)| self.check_types(p, q))
                    }
            }
            (TypeKind::Typedef(da), TypeKind::Typedef(db)) => self.check_decls(*da, *db),
            (TypeKind::Record(da), TypeKind::Record(db)) => self.check_decls(*da, *db),
            (TypeKind::Enum(da), TypeKind::Enum(db)) => self.check_decls(*da, *db),
            (
                TypeKind::Elaborated { keyword, named },
                TypeKind::Elaborated {
                    keyword: other_keyword,
                    named: other_named,
                },
            ) => keyword == other_keyword && self.check_types(*named, *other_named),
            (TypeKind::Paren(ia), TypeKind::Paren(ib)) => self.check_types(*ia, *ib),
            (TypeKind::Atomic(ia), TypeKind::Atomic(ib)) => self.check_types(*ia, *ib),
            (
                TypeKind::Decltype { underlying, .. },
                TypeKind::Decltype {
                    underlying: other_underlying,
                    ..
                },
            ) => self.check_types(*underlying, *other_underlying),
            (
                TypeKind::TemplateSpecialization { template, args, .. },
                TypeKind::TemplateSpecialization {
                    template: other_template,
                    args: other_args,
                    ..
                },
            ) => {
                let args = args.clone();
                let other_args = other_args.clone();
                let template = *template;
                let other_template = *other_template;
                self.check_decls(template, other_template) && self.check_args(&args, &other_args)
            }
            _ => false,
        }
    }

    /// Plain `char` matches the explicit variant its source target gives
    /// it, so a char/schar (or char/uchar) pair produced by the import
    /// signedness policy still compares equivalent.
    fn chars_compatible(&self, a: BuiltinKind, b: BuiltinKind) -> bool {
        let signed_from = self.from.target().char_is_signed;
        let signed_to = self.to.target().char_is_signed;
        match (a, b) {
            (BuiltinKind::Char, BuiltinKind::SChar) => signed_from,
            (BuiltinKind::Char, BuiltinKind::UChar) => !signed_from,
            (BuiltinKind::SChar, BuiltinKind::Char) => signed_to,
            (BuiltinKind::UChar, BuiltinKind::Char) => !signed_to,
            _ => false,
        }
    }

    fn check_args(&mut self, a: &[TemplateArg], b: &[TemplateArg]) -> bool {
        a.len() == b.len()
            && a.iter()
                .zip(b)
                .all(|(arg_a, arg_b)| self.check_arg(arg_a, arg_b))
    }

    fn check_arg(&mut self, a: &TemplateArg, b: &TemplateArg) -> bool {
        match (a, b) {
            (TemplateArg::Type(ta), TemplateArg::Type(tb)) => self.check_types(*ta, *tb),
            (
                TemplateArg::Integral { value, ty },
                TemplateArg::Integral {
                    value: other_value,
                    ty: other_ty,
                },
            ) => value == other_value && self.check_types(*ty, *other_ty),
            // Dependent expression arguments are not compared deeply.
            (TemplateArg::Expression(_), TemplateArg::Expression(_)) => true,
            (TemplateArg::Pack(pa), TemplateArg::Pack(pb)) => self.check_args(pa, pb),
            _ => false,
        }
    }

    fn names_match(&mut self, a: Option<&DeclName>, b: Option<&DeclName>) -> bool {
        match (a, b) {
            (None, None) => true,
            (Some(na), Some(nb)) => self.decl_names_match(na, nb),
            _ => false,
        }
    }

    /// Names are interned per context, so identifier comparison goes
    /// through the string.
    fn decl_names_match(&mut self, a: &DeclName, b: &DeclName) -> bool {
        match (a, b) {
            (DeclName::Identifier(na), DeclName::Identifier(nb)) => {
                self.from.interner().lookup(*na) == self.to.interner().lookup(*nb)
            }
            (DeclName::Operator(oa), DeclName::Operator(ob)) => oa == ob,
            (DeclName::Constructor(ta), DeclName::Constructor(tb))
            | (DeclName::Destructor(ta), DeclName::Destructor(tb))
            | (DeclName::Conversion(ta), DeclName::Conversion(tb)) => {
                self.check_type_ids(*ta, *tb)
            }
            (DeclName::LiteralOperator(na), DeclName::LiteralOperator(nb)) => {
                self.from.interner().lookup(*na) == self.to.interner().lookup(*nb)
            }
            (DeclName::DeductionGuide(da), DeclName::DeductionGuide(db)) => {
                self.check_decls(*da, *db)
            }
            (DeclName::Selector(sa), DeclName::Selector(sb)) => {
                sa.num_args() == sb.num_args()
                    && sa.pieces().len() == sb.pieces().len()
                    && sa
                        .pieces()
                        .iter()
                        .zip(sb.pieces())
                        .all(|(pa, pb)| {
                            self.from.interner().lookup(*pa) == self.to.interner().lookup(*pb)
                        })
            }
            _ => false,
        }
    }
}

fn fields_of(cx: &AstContext, record: DeclId) -> Vec<DeclId> {
    cx.members(record)
        .iter()
        .copied()
        .filter(|&m| matches!(cx.decl(m).kind, DeclKind::Field { .. }))
        .collect()
}
