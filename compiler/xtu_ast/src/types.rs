//! Type node kinds and handles.
//!
//! Types are interned structurally in their owning [`AstContext`]: equal
//! [`TypeKind`] values get equal [`TypeId`]s, so type identity within one
//! context is an O(1) index comparison. Builtin types are pre-interned at
//! fixed indices.
//!
//! [`AstContext`]: crate::AstContext

use crate::{DeclId, StmtId};
use bitflags::bitflags;
use std::fmt;

/// Interned type handle.
///
/// Builtin types occupy fixed indices below [`TypeId::FIRST_COMPOUND`];
/// compound types are interned on demand.
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct TypeId(u32);

impl TypeId {
    // Pre-interned builtins, in BuiltinKind declaration order.
    pub const VOID: TypeId = TypeId(0);
    pub const BOOL: TypeId = TypeId(1);
    pub const CHAR: TypeId = TypeId(2);
    pub const SCHAR: TypeId = TypeId(3);
    pub const UCHAR: TypeId = TypeId(4);
    pub const SHORT: TypeId = TypeId(5);
    pub const USHORT: TypeId = TypeId(6);
    pub const INT: TypeId = TypeId(7);
    pub const UINT: TypeId = TypeId(8);
    pub const LONG: TypeId = TypeId(9);
    pub const ULONG: TypeId = TypeId(10);
    pub const LONGLONG: TypeId = TypeId(11);
    pub const ULONGLONG: TypeId = TypeId(12);
    pub const INT128: TypeId = TypeId(13);
    pub const UINT128: TypeId = TypeId(14);
    pub const HALF: TypeId = TypeId(15);
    pub const FLOAT: TypeId = TypeId(16);
    pub const DOUBLE: TypeId = TypeId(17);
    pub const LONGDOUBLE: TypeId = TypeId(18);
    pub const WCHAR: TypeId = TypeId(19);
    pub const CHAR16: TypeId = TypeId(20);
    pub const CHAR32: TypeId = TypeId(21);
    pub const NULLPTR: TypeId = TypeId(22);

    /// First index for interned compound types.
    pub const FIRST_COMPOUND: u32 = 32;

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Create from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        TypeId(raw)
    }

    /// Check if this is a pre-interned builtin.
    #[inline]
    pub const fn is_builtin(self) -> bool {
        self.0 < Self::FIRST_COMPOUND
    }
}

impl fmt::Debug for TypeId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match BuiltinKind::from_type_id(*self) {
            Some(k) => write!(f, "TypeId::{k:?}"),
            None => write!(f, "TypeId({})", self.0),
        }
    }
}

/// Builtin type kinds.
///
/// `Char` is the plain `char` type whose signedness depends on the
/// context's target; `SChar`/`UChar` are the explicitly signed variants.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BuiltinKind {
    Void,
    Bool,
    Char,
    SChar,
    UChar,
    Short,
    UShort,
    Int,
    UInt,
    Long,
    ULong,
    LongLong,
    ULongLong,
    Int128,
    UInt128,
    Half,
    Float,
    Double,
    LongDouble,
    WChar,
    Char16,
    Char32,
    NullPtr,
}

impl BuiltinKind {
    /// All builtin kinds in pre-interning order.
    pub const ALL: [BuiltinKind; 23] = [
        BuiltinKind::Void,
        BuiltinKind::Bool,
        BuiltinKind::Char,
        BuiltinKind::SChar,
        BuiltinKind::UChar,
        BuiltinKind::Short,
        BuiltinKind::UShort,
        BuiltinKind::Int,
        BuiltinKind::UInt,
        BuiltinKind::Long,
        BuiltinKind::ULong,
        BuiltinKind::LongLong,
        BuiltinKind::ULongLong,
        BuiltinKind::Int128,
        BuiltinKind::UInt128,
        BuiltinKind::Half,
        BuiltinKind::Float,
        BuiltinKind::Double,
        BuiltinKind::LongDouble,
        BuiltinKind::WChar,
        BuiltinKind::Char16,
        BuiltinKind::Char32,
        BuiltinKind::NullPtr,
    ];

    /// The fixed `TypeId` for this builtin.
    #[inline]
    pub const fn type_id(self) -> TypeId {
        TypeId(self as u32)
    }

    /// Reverse of [`BuiltinKind::type_id`].
    pub fn from_type_id(id: TypeId) -> Option<BuiltinKind> {
        Self::ALL.get(id.0 as usize).copied()
    }
}

bitflags! {
    /// CVR qualifiers applied on top of an unqualified type.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct Qualifiers: u8 {
        const CONST = 1 << 0;
        const VOLATILE = 1 << 1;
        const RESTRICT = 1 << 2;
    }
}

/// A type handle plus qualifiers.
///
/// Types are interned unqualified; qualifiers live here, outside the
/// interner key, and are re-applied after any identity-map lookup.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct QualType {
    pub ty: TypeId,
    pub quals: Qualifiers,
}

impl QualType {
    /// An unqualified type.
    #[inline]
    pub const fn unqualified(ty: TypeId) -> Self {
        QualType {
            ty,
            quals: Qualifiers::empty(),
        }
    }

    /// Add qualifiers.
    #[inline]
    #[must_use]
    pub const fn with_quals(self, quals: Qualifiers) -> Self {
        QualType {
            ty: self.ty,
            quals: self.quals.union(quals),
        }
    }

    /// Check for `const`.
    #[inline]
    pub const fn is_const(self) -> bool {
        self.quals.contains(Qualifiers::CONST)
    }
}

impl From<TypeId> for QualType {
    fn from(ty: TypeId) -> Self {
        QualType::unqualified(ty)
    }
}

/// Keyword of an elaborated type (`struct S`, `enum E`, ...).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum ElaboratedKeyword {
    None,
    Struct,
    Class,
    Union,
    Enum,
    Typename,
}

/// A template argument.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TemplateArg {
    /// A type argument.
    Type(QualType),
    /// A non-type integral argument with its type.
    Integral { value: i64, ty: QualType },
    /// A dependent expression argument.
    Expression(StmtId),
    /// An expanded parameter pack.
    Pack(Vec<TemplateArg>),
}

/// The closed set of type node kinds.
///
/// Every referenced sub-node is a handle into the owning context, so
/// `TypeKind` is `Eq + Hash` and can be used as the interner key.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum TypeKind {
    Builtin(BuiltinKind),
    Pointer(QualType),
    Reference {
        pointee: QualType,
        lvalue: bool,
    },
    ConstantArray {
        element: QualType,
        size: u64,
    },
    IncompleteArray {
        element: QualType,
    },
    /// Variable-length array; the bound is an expression.
    VariableArray {
        element: QualType,
        size_expr: StmtId,
    },
    Vector {
        element: QualType,
        num_elements: u32,
    },
    Function {
        result: QualType,
        params: Vec<QualType>,
        variadic: bool,
    },
    Typedef(DeclId),
    Record(DeclId),
    Enum(DeclId),
    /// Sugar: `struct S` spelled with its keyword.
    Elaborated {
        keyword: ElaboratedKeyword,
        named: QualType,
    },
    /// Sugar: parenthesized type.
    Paren(QualType),
    Atomic(QualType),
    /// `decltype(expr)`; `underlying` is the deduced type.
    Decltype {
        operand: StmtId,
        underlying: QualType,
    },
    /// A (possibly dependent) template specialization type.
    ///
    /// `canonical` is `None` when this type is itself canonical.
    TemplateSpecialization {
        template: DeclId,
        args: Vec<TemplateArg>,
        canonical: Option<TypeId>,
    },
}

impl TypeKind {
    /// Sugar types wrap another type without changing its identity.
    pub fn is_sugar(&self) -> bool {
        matches!(
            self,
            TypeKind::Typedef(_)
                | TypeKind::Elaborated { .. }
                | TypeKind::Paren(_)
                | TypeKind::Decltype { .. }
                | TypeKind::TemplateSpecialization {
                    canonical: Some(_),
                    ..
                }
        )
    }
}
