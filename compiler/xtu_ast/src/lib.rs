//! AST data model for cross-translation-unit tooling.
//!
//! Each compilation context ([`AstContext`]) is a self-contained arena:
//! types, declarations, statements, base specifiers, identifiers, and
//! source files all live in per-category stores and are referenced by
//! 32-bit handles. Handles are only meaningful within their owning
//! context; relating nodes across contexts is the importer's job
//! (`xtu_import`).

mod context;
mod decl;
mod interner;
mod name;
mod source;
mod stmt;
mod types;

pub use context::{AstContext, TargetInfo};
pub use decl::{
    AccessSpecifier, Attr, BaseId, BaseSpecifier, Decl, DeclFlags, DeclId, DeclKind, EnumData,
    FunctionData, FunctionKind, IdentNamespace, RecordData, StorageClass, TagKind, TemplateData,
    VarData,
};
pub use interner::{InternError, Name, StringInterner};
pub use name::{DeclName, OverloadedOperator, Selector};
pub use source::{
    FileCharacteristic, FileId, SourceError, SourceFile, SourceLoc, SourceManager, SourceRange,
};
pub use stmt::{
    BinaryOpKind, CastKind, ExprInfo, ObjectKind, Stmt, StmtId, StmtKind, TraitKind, TraitOperand,
    UnaryOpKind, ValueCategory,
};
pub use types::{
    BuiltinKind, ElaboratedKeyword, QualType, Qualifiers, TemplateArg, TypeId, TypeKind,
};
