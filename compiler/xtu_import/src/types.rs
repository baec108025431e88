//! Type import.
//!
//! Structural recursion over [`TypeKind`]: import every referenced
//! sub-type, declaration, and expression, then canonically construct the
//! equivalent kind in the destination. Qualifiers ride outside the
//! interned handle and are re-applied verbatim.
//!
//! Sugar kinds (typedef references, elaborated spellings, parens) are
//! imported as themselves, not desugared.

use crate::{Importer, Result};
use xtu_ast::{BuiltinKind, QualType, TemplateArg, TypeId, TypeKind};

impl Importer<'_> {
    /// Import a qualified type.
    pub fn import_type(&mut self, ty: QualType) -> Result<QualType> {
        Ok(QualType {
            ty: self.import_type_id(ty.ty)?,
            quals: ty.quals,
        })
    }

    /// Import an unqualified type handle, memoized per session.
    pub fn import_type_id(&mut self, from_ty: TypeId) -> Result<TypeId> {
        if let Some(to_ty) = self.map.lookup_type(from_ty) {
            return Ok(to_ty);
        }
        let from = self.from;
        let to_kind = match from.type_kind(from_ty) {
            TypeKind::Builtin(kind) => TypeKind::Builtin(self.map_builtin(*kind)),
            TypeKind::Pointer(pointee) => TypeKind::Pointer(self.import_type(*pointee)?),
            TypeKind::Reference { pointee, lvalue } => TypeKind::Reference {
                pointee: self.import_type(*pointee)?,
                lvalue: *lvalue,
            },
            TypeKind::ConstantArray { element, size } => TypeKind::ConstantArray {
                element: self.import_type(*element)?,
                size: *size,
            },
            TypeKind::IncompleteArray { element } => TypeKind::IncompleteArray {
                element: self.import_type(*element)?,
            },
            TypeKind::VariableArray { element, size_expr } => TypeKind::VariableArray {
                element: self.import_type(*element)?,
                size_expr: self.import_stmt(*size_expr)?,
            },
            TypeKind::Vector {
                element,
                num_elements,
            } => TypeKind::Vector {
                element: self.import_type(*element)?,
                num_elements: *num_elements,
            },
            TypeKind::Function {
                result,
                params,
                variadic,
            } => TypeKind::Function {
                result: self.import_type(*result)?,
                params: params
                    .iter()
                    .map(|&p| self.import_type(p))
                    .collect::<Result<Vec<_>>>()?,
                variadic: *variadic,
            },
            TypeKind::Typedef(decl) => TypeKind::Typedef(self.import_decl(*decl)?),
            TypeKind::Record(decl) => TypeKind::Record(self.import_decl(*decl)?),
            TypeKind::Enum(decl) => TypeKind::Enum(self.import_decl(*decl)?),
            TypeKind::Elaborated { keyword, named } => TypeKind::Elaborated {
                keyword: *keyword,
                named: self.import_type(*named)?,
            },
            TypeKind::Paren(inner) => TypeKind::Paren(self.import_type(*inner)?),
            TypeKind::Atomic(inner) => TypeKind::Atomic(self.import_type(*inner)?),
            TypeKind::Decltype {
                operand,
                underlying,
            } => TypeKind::Decltype {
                operand: self.import_stmt(*operand)?,
                underlying: self.import_type(*underlying)?,
            },
            TypeKind::TemplateSpecialization {
                template,
                args,
                canonical,
            } => {
                let template = *template;
                let args = args.clone();
                let canonical = *canonical;
                TypeKind::TemplateSpecialization {
                    template: self.import_decl(template)?,
                    args: self.import_template_args(&args)?,
                    // None means the source type is itself canonical, and
                    // the imported type then is too.
                    canonical: match canonical {
                        Some(c) => Some(self.import_type_id(c)?),
                        None => None,
                    },
                }
            }
        };
        let to_ty = self.to.intern_type(to_kind);
        self.map.record_type(from_ty, to_ty);
        Ok(to_ty)
    }

    /// Plain `char` crosses targets by meaning, not by spelling: when the
    /// two targets disagree on its signedness it becomes the explicit
    /// variant matching the source target.
    fn map_builtin(&self, kind: BuiltinKind) -> BuiltinKind {
        if kind == BuiltinKind::Char
            && self.from.target().char_is_signed != self.to.target().char_is_signed
        {
            if self.from.target().char_is_signed {
                BuiltinKind::SChar
            } else {
                BuiltinKind::UChar
            }
        } else {
            kind
        }
    }

    pub(crate) fn import_template_args(
        &mut self,
        args: &[TemplateArg],
    ) -> Result<Vec<TemplateArg>> {
        args.iter().map(|arg| self.import_template_arg(arg)).collect()
    }

    fn import_template_arg(&mut self, arg: &TemplateArg) -> Result<TemplateArg> {
        Ok(match arg {
            TemplateArg::Type(ty) => TemplateArg::Type(self.import_type(*ty)?),
            TemplateArg::Integral { value, ty } => TemplateArg::Integral {
                value: *value,
                ty: self.import_type(*ty)?,
            },
            TemplateArg::Expression(expr) => TemplateArg::Expression(self.import_stmt(*expr)?),
            TemplateArg::Pack(pack) => TemplateArg::Pack(self.import_template_args(pack)?),
        })
    }
}
