//! Declaration node kinds and handles.
//!
//! Every declaration shares a small common record ([`Decl`]) holding its
//! name, location, semantic/lexical context links, flags, access, and
//! attributes; the kind-specific payload lives in [`DeclKind`].
//!
//! Declarations that can be redeclared carry a `previous` link; the chain
//! from the canonical (first) declaration forward is the redeclaration
//! chain. Records and enums additionally track which chain member is the
//! definition.

use crate::{DeclName, Name, QualType, SourceLoc, StmtId, TemplateArg};
use bitflags::bitflags;
use std::fmt;

/// Declaration handle into an [`AstContext`](crate::AstContext).
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct DeclId(u32);

impl DeclId {
    /// The translation-unit root, created at index 0 in every context.
    pub const TRANSLATION_UNIT: DeclId = DeclId(0);

    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Create from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        DeclId(raw)
    }
}

impl fmt::Debug for DeclId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        if *self == DeclId::TRANSLATION_UNIT {
            write!(f, "DeclId::TRANSLATION_UNIT")
        } else {
            write!(f, "DeclId({})", self.0)
        }
    }
}

/// Base-class specifier handle.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
#[repr(transparent)]
pub struct BaseId(u32);

impl BaseId {
    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Create from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        BaseId(raw)
    }
}

bitflags! {
    /// Source-independent declaration property bits.
    ///
    /// USED and IMPLICIT can be set after a declaration is first seen, so
    /// re-touching a declaration must propagate them.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
    pub struct DeclFlags: u8 {
        const USED = 1 << 0;
        const IMPLICIT = 1 << 1;
        const REFERENCED = 1 << 2;
    }
}

bitflags! {
    /// Identifier namespaces for unqualified lookup filtering.
    #[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
    pub struct IdentNamespace: u8 {
        /// Functions, variables, typedefs, enumerators, templates.
        const ORDINARY = 1 << 0;
        /// Records and enums.
        const TAG = 1 << 1;
        /// Record members.
        const MEMBER = 1 << 2;
    }
}

/// Member access.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum AccessSpecifier {
    #[default]
    None,
    Public,
    Protected,
    Private,
}

/// Storage class of a function or variable.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum StorageClass {
    #[default]
    None,
    Static,
    Extern,
    Register,
}

/// Tag kind of a record declaration.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TagKind {
    Struct,
    Union,
    Class,
}

/// Kind of a function declaration.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum FunctionKind {
    #[default]
    Plain,
    Method,
    Constructor,
    Destructor,
    Conversion,
}

/// A declaration attribute.
///
/// Attributes are copied node-by-node on import (deep clone), never
/// shared across contexts: the `Name` payloads are context-local.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum Attr {
    Packed,
    Used,
    NoReturn,
    Aligned { bytes: u32 },
    Deprecated { message: Option<Name> },
    Annotate { text: Name },
}

/// A base-class specifier of a record definition.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct BaseSpecifier {
    pub ty: QualType,
    pub is_virtual: bool,
    pub access: AccessSpecifier,
}

/// Kind-specific payload of an enum declaration.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct EnumData {
    /// Underlying integer type, if fixed or computed.
    pub integer_type: Option<QualType>,
    pub is_scoped: bool,
    /// True if this chain member carries the enumerator list.
    pub is_definition: bool,
    /// The defining chain member, once one exists.
    pub definition: Option<DeclId>,
    pub is_complete: bool,
    /// Bits needed for the largest positive enumerator value.
    pub num_positive_bits: u32,
    /// Bits needed for the most negative enumerator value.
    pub num_negative_bits: u32,
}

impl EnumData {
    /// A forward declaration with nothing filled in.
    pub fn forward() -> Self {
        EnumData {
            integer_type: None,
            is_scoped: false,
            is_definition: false,
            definition: None,
            is_complete: false,
            num_positive_bits: 0,
            num_negative_bits: 0,
        }
    }
}

/// Kind-specific payload of a record declaration.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct RecordData {
    pub tag: TagKind,
    pub is_anonymous: bool,
    /// True if this chain member carries the body.
    pub is_definition: bool,
    /// The defining chain member, once one exists.
    pub definition: Option<DeclId>,
    pub is_complete: bool,
    pub bases: Vec<BaseId>,
    /// Back-pointer to the class template this record is the pattern of.
    pub described_template: Option<DeclId>,
}

impl RecordData {
    /// A forward declaration of the given tag kind.
    pub fn forward(tag: TagKind) -> Self {
        RecordData {
            tag,
            is_anonymous: false,
            is_definition: false,
            definition: None,
            is_complete: false,
            bases: Vec::new(),
            described_template: None,
        }
    }
}

/// Kind-specific payload of a function declaration.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct FunctionData {
    /// The function type (a `TypeKind::Function`).
    pub ty: QualType,
    pub kind: FunctionKind,
    pub storage: StorageClass,
    pub is_inline: bool,
    pub params: Vec<DeclId>,
    pub body: Option<StmtId>,
    /// Back-pointer to the function template this is the pattern of.
    pub described_template: Option<DeclId>,
}

/// Kind-specific payload of a variable declaration.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct VarData {
    pub ty: QualType,
    pub storage: StorageClass,
    pub init: Option<StmtId>,
    pub is_definition: bool,
    /// Back-pointer to the variable template this is the pattern of.
    pub described_template: Option<DeclId>,
}

/// Kind-specific payload of a template declaration.
#[derive(Clone, Eq, PartialEq, Debug)]
pub struct TemplateData {
    pub params: Vec<DeclId>,
    /// The templated pattern declaration (record or variable).
    pub templated: DeclId,
    /// Specialization table, searched by template arguments on import.
    pub specializations: Vec<DeclId>,
}

/// The closed set of declaration kinds.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum DeclKind {
    TranslationUnit,
    Namespace {
        is_inline: bool,
        is_anonymous: bool,
    },
    Typedef {
        underlying: QualType,
    },
    Enum(EnumData),
    EnumConstant {
        ty: QualType,
        value: i64,
        init: Option<StmtId>,
    },
    Record(RecordData),
    Field {
        ty: QualType,
        bit_width: Option<StmtId>,
        index: u32,
    },
    Function(FunctionData),
    Param {
        ty: QualType,
        default_arg: Option<StmtId>,
    },
    Var(VarData),
    ClassTemplate(TemplateData),
    FunctionTemplate(TemplateData),
    VarTemplate(TemplateData),
    ClassTemplateSpecialization {
        template: DeclId,
        args: Vec<TemplateArg>,
        record: RecordData,
    },
    VarTemplateSpecialization {
        template: DeclId,
        args: Vec<TemplateArg>,
        var: VarData,
    },
    TemplateTypeParam {
        depth: u32,
        index: u32,
        default: Option<QualType>,
    },
    NonTypeTemplateParam {
        ty: QualType,
        depth: u32,
        index: u32,
    },
}

impl DeclKind {
    /// Check if declarations of this kind own a member list.
    pub fn is_context(&self) -> bool {
        matches!(
            self,
            DeclKind::TranslationUnit
                | DeclKind::Namespace { .. }
                | DeclKind::Enum(_)
                | DeclKind::Record(_)
                | DeclKind::Function(_)
                | DeclKind::ClassTemplateSpecialization { .. }
        )
    }

    /// The identifier namespace(s) a declaration of this kind occupies.
    pub fn ident_namespace(&self) -> IdentNamespace {
        match self {
            DeclKind::Record(_)
            | DeclKind::Enum(_)
            | DeclKind::ClassTemplateSpecialization { .. } => IdentNamespace::TAG,
            DeclKind::ClassTemplate(_) => IdentNamespace::TAG | IdentNamespace::ORDINARY,
            DeclKind::Field { .. } => IdentNamespace::MEMBER,
            DeclKind::TranslationUnit => IdentNamespace::empty(),
            _ => IdentNamespace::ORDINARY,
        }
    }

    /// Short kind name for logs and diagnostics.
    pub fn kind_name(&self) -> &'static str {
        match self {
            DeclKind::TranslationUnit => "translation unit",
            DeclKind::Namespace { .. } => "namespace",
            DeclKind::Typedef { .. } => "typedef",
            DeclKind::Enum(_) => "enum",
            DeclKind::EnumConstant { .. } => "enumerator",
            DeclKind::Record(_) => "record",
            DeclKind::Field { .. } => "field",
            DeclKind::Function(_) => "function",
            DeclKind::Param { .. } => "parameter",
            DeclKind::Var(_) => "variable",
            DeclKind::ClassTemplate(_) => "class template",
            DeclKind::FunctionTemplate(_) => "function template",
            DeclKind::VarTemplate(_) => "variable template",
            DeclKind::ClassTemplateSpecialization { .. } => "class template specialization",
            DeclKind::VarTemplateSpecialization { .. } => "variable template specialization",
            DeclKind::TemplateTypeParam { .. } => "template type parameter",
            DeclKind::NonTypeTemplateParam { .. } => "non-type template parameter",
        }
    }
}

/// A declaration node.
#[derive(Clone, Debug)]
pub struct Decl {
    pub kind: DeclKind,
    pub name: Option<DeclName>,
    pub loc: SourceLoc,
    /// Context where lookup finds this declaration.
    pub semantic_dc: Option<DeclId>,
    /// Context where this declaration is textually nested.
    pub lexical_dc: Option<DeclId>,
    pub flags: DeclFlags,
    pub access: AccessSpecifier,
    pub attrs: Vec<Attr>,
    /// Previous declaration of the same entity, if redeclared.
    pub previous: Option<DeclId>,
}

impl Decl {
    /// Create a declaration with both contexts set to `dc`.
    pub fn new(kind: DeclKind, name: Option<DeclName>, loc: SourceLoc, dc: DeclId) -> Self {
        Decl {
            kind,
            name,
            loc,
            semantic_dc: Some(dc),
            lexical_dc: Some(dc),
            flags: DeclFlags::empty(),
            access: AccessSpecifier::None,
            attrs: Vec::new(),
            previous: None,
        }
    }

    /// The translation-unit root declaration.
    pub fn translation_unit() -> Self {
        Decl {
            kind: DeclKind::TranslationUnit,
            name: None,
            loc: SourceLoc::INVALID,
            semantic_dc: None,
            lexical_dc: None,
            flags: DeclFlags::empty(),
            access: AccessSpecifier::None,
            attrs: Vec::new(),
            previous: None,
        }
    }

    /// Record payload accessor.
    pub fn record_data(&self) -> Option<&RecordData> {
        match &self.kind {
            DeclKind::Record(data)
            | DeclKind::ClassTemplateSpecialization { record: data, .. } => Some(data),
            _ => None,
        }
    }

    /// Mutable record payload accessor.
    pub fn record_data_mut(&mut self) -> Option<&mut RecordData> {
        match &mut self.kind {
            DeclKind::Record(data)
            | DeclKind::ClassTemplateSpecialization { record: data, .. } => Some(data),
            _ => None,
        }
    }

    /// Enum payload accessor.
    pub fn enum_data(&self) -> Option<&EnumData> {
        match &self.kind {
            DeclKind::Enum(data) => Some(data),
            _ => None,
        }
    }

    /// Mutable enum payload accessor.
    pub fn enum_data_mut(&mut self) -> Option<&mut EnumData> {
        match &mut self.kind {
            DeclKind::Enum(data) => Some(data),
            _ => None,
        }
    }
}
