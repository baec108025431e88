//! Statement and expression node kinds.
//!
//! Statements and expressions share one arena and one handle type
//! ([`StmtId`]); expressions are statements that carry an [`ExprInfo`]
//! with their type and value category.
//!
//! `switch` cases are doubly represented: each `Case`/`Default` node sits
//! inside the statement tree AND on a singly linked `next_case` list
//! hanging off the owning `Switch`. The list must be re-linked explicitly
//! whenever the tree is rebuilt.

use crate::{DeclId, Name, QualType, SourceRange};
use std::fmt;

/// Statement/expression handle into an [`AstContext`](crate::AstContext).
#[derive(Copy, Clone, Eq, PartialEq, Hash)]
#[repr(transparent)]
pub struct StmtId(u32);

impl StmtId {
    /// Get the raw u32 value.
    #[inline]
    pub const fn raw(self) -> u32 {
        self.0
    }

    /// Create from a raw u32 value.
    #[inline]
    pub const fn from_raw(raw: u32) -> Self {
        StmtId(raw)
    }
}

impl fmt::Debug for StmtId {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "StmtId({})", self.0)
    }
}

/// Value category of an expression.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ValueCategory {
    #[default]
    RValue,
    LValue,
    XValue,
}

/// Object kind of a glvalue.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug, Default)]
pub enum ObjectKind {
    #[default]
    Ordinary,
    BitField,
    VectorComponent,
}

/// Type and value semantics carried by every expression node.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub struct ExprInfo {
    pub ty: QualType,
    pub category: ValueCategory,
    pub object_kind: ObjectKind,
}

impl ExprInfo {
    /// An ordinary rvalue of the given type.
    pub fn rvalue(ty: QualType) -> Self {
        ExprInfo {
            ty,
            category: ValueCategory::RValue,
            object_kind: ObjectKind::Ordinary,
        }
    }

    /// An ordinary lvalue of the given type.
    pub fn lvalue(ty: QualType) -> Self {
        ExprInfo {
            ty,
            category: ValueCategory::LValue,
            object_kind: ObjectKind::Ordinary,
        }
    }
}

/// Unary operator opcodes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum UnaryOpKind {
    Plus,
    Minus,
    Not,
    LNot,
    PreInc,
    PreDec,
    PostInc,
    PostDec,
    Deref,
    AddrOf,
}

/// Binary operator opcodes (also the computation part of compound
/// assignments).
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum BinaryOpKind {
    Add,
    Sub,
    Mul,
    Div,
    Rem,
    Shl,
    Shr,
    Lt,
    Gt,
    Le,
    Ge,
    Eq,
    Ne,
    And,
    Xor,
    Or,
    LAnd,
    LOr,
    Assign,
    Comma,
}

/// Cast opcodes.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum CastKind {
    NoOp,
    LValueToRValue,
    IntegralCast,
    IntegralToBoolean,
    IntegralToFloating,
    FloatingCast,
    FloatingToIntegral,
    ArrayToPointerDecay,
    FunctionToPointerDecay,
    NullToPointer,
    PointerToBoolean,
    BitCast,
    ToVoid,
}

/// `sizeof`/`alignof` operand: a type or an (unevaluated) expression.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TraitOperand {
    Type(QualType),
    Expr(StmtId),
}

/// Which expression trait is being queried.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum TraitKind {
    SizeOf,
    AlignOf,
}

/// The closed set of statement and expression kinds.
#[derive(Clone, Eq, PartialEq, Debug)]
pub enum StmtKind {
    // --- statements ---
    Compound {
        stmts: Vec<StmtId>,
    },
    DeclStmt {
        decls: Vec<DeclId>,
    },
    Null,
    If {
        cond: StmtId,
        then_branch: StmtId,
        else_branch: Option<StmtId>,
    },
    While {
        cond: StmtId,
        body: StmtId,
    },
    Do {
        body: StmtId,
        cond: StmtId,
    },
    For {
        init: Option<StmtId>,
        cond: Option<StmtId>,
        inc: Option<StmtId>,
        body: StmtId,
    },
    Return {
        value: Option<StmtId>,
    },
    Break,
    Continue,
    Label {
        name: Name,
        sub: StmtId,
    },
    Goto {
        label: Name,
    },
    Switch {
        cond: StmtId,
        body: StmtId,
        /// Head of the case list threaded through `Case`/`Default` nodes.
        first_case: Option<StmtId>,
    },
    Case {
        value: StmtId,
        sub: StmtId,
        next_case: Option<StmtId>,
    },
    Default {
        sub: StmtId,
        next_case: Option<StmtId>,
    },

    // --- expressions ---
    /// Integer literal; `value` holds the full two's-complement payload.
    IntegerLiteral {
        value: i128,
        info: ExprInfo,
    },
    /// Floating literal; stored bit-exact.
    FloatingLiteral {
        bits: u64,
        info: ExprInfo,
    },
    /// String literal; contents interned in the owning context.
    StringLiteral {
        value: Name,
        info: ExprInfo,
    },
    CharacterLiteral {
        value: u32,
        info: ExprInfo,
    },
    BoolLiteral {
        value: bool,
        info: ExprInfo,
    },
    DeclRef {
        decl: DeclId,
        info: ExprInfo,
    },
    Paren {
        sub: StmtId,
        info: ExprInfo,
    },
    UnaryOp {
        op: UnaryOpKind,
        operand: StmtId,
        info: ExprInfo,
    },
    BinaryOp {
        op: BinaryOpKind,
        lhs: StmtId,
        rhs: StmtId,
        info: ExprInfo,
    },
    CompoundAssign {
        op: BinaryOpKind,
        lhs: StmtId,
        rhs: StmtId,
        computation_ty: QualType,
        info: ExprInfo,
    },
    Conditional {
        cond: StmtId,
        then_expr: StmtId,
        else_expr: StmtId,
        info: ExprInfo,
    },
    Call {
        callee: StmtId,
        args: Vec<StmtId>,
        info: ExprInfo,
    },
    Member {
        base: StmtId,
        member: DeclId,
        is_arrow: bool,
        info: ExprInfo,
    },
    ArraySubscript {
        base: StmtId,
        index: StmtId,
        info: ExprInfo,
    },
    Cast {
        kind: CastKind,
        operand: StmtId,
        is_implicit: bool,
        info: ExprInfo,
    },
    UnaryTrait {
        kind: TraitKind,
        operand: TraitOperand,
        info: ExprInfo,
    },
    InitList {
        inits: Vec<StmtId>,
        info: ExprInfo,
    },
    /// A lambda expression backed by a synthesized class.
    ///
    /// The class must be complete before the lambda node is usable.
    Lambda {
        class: DeclId,
        info: ExprInfo,
    },
}

impl StmtKind {
    /// Expression info, if this node is an expression.
    pub fn expr_info(&self) -> Option<&ExprInfo> {
        use StmtKind::*;
        match self {
            IntegerLiteral { info, .. }
            | FloatingLiteral { info, .. }
            | StringLiteral { info, .. }
            | CharacterLiteral { info, .. }
            | BoolLiteral { info, .. }
            | DeclRef { info, .. }
            | Paren { info, .. }
            | UnaryOp { info, .. }
            | BinaryOp { info, .. }
            | CompoundAssign { info, .. }
            | Conditional { info, .. }
            | Call { info, .. }
            | Member { info, .. }
            | ArraySubscript { info, .. }
            | Cast { info, .. }
            | UnaryTrait { info, .. }
            | InitList { info, .. }
            | Lambda { info, .. } => Some(info),
            _ => None,
        }
    }

    /// Check if this node participates in a switch-case chain.
    pub fn is_switch_case(&self) -> bool {
        matches!(self, StmtKind::Case { .. } | StmtKind::Default { .. })
    }
}

/// A statement node: kind plus source range.
#[derive(Clone, Debug)]
pub struct Stmt {
    pub kind: StmtKind,
    pub range: SourceRange,
}

impl Stmt {
    /// Create a statement with an invalid range (synthesized nodes).
    pub fn synthesized(kind: StmtKind) -> Self {
        Stmt {
            kind,
            range: SourceRange::INVALID,
        }
    }

    /// Create a statement with a source range.
    pub fn new(kind: StmtKind, range: SourceRange) -> Self {
        Stmt { kind, range }
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::TypeId;
    use pretty_assertions::assert_eq;

    #[test]
    fn expr_info_is_reported() {
        let lit = StmtKind::IntegerLiteral {
            value: 42,
            info: ExprInfo::rvalue(TypeId::INT.into()),
        };
        assert_eq!(lit.expr_info().map(|i| i.ty.ty), Some(TypeId::INT));
        assert_eq!(StmtKind::Break.expr_info(), None);
    }

    #[test]
    fn float_payload_is_bit_exact() {
        let negative_zero = StmtKind::FloatingLiteral {
            bits: (-0.0f64).to_bits(),
            info: ExprInfo::rvalue(TypeId::DOUBLE.into()),
        };
        let positive_zero = StmtKind::FloatingLiteral {
            bits: 0.0f64.to_bits(),
            info: ExprInfo::rvalue(TypeId::DOUBLE.into()),
        };
        // -0.0 == 0.0 as floats, but the nodes stay distinguishable.
        assert_ne!(negative_zero, positive_zero);
    }

    #[test]
    fn case_nodes_are_switch_cases() {
        assert!(StmtKind::Default {
            sub: StmtId::from_raw(0),
            next_case: None
        }
        .is_switch_case());
        assert!(!StmtKind::Null.is_switch_case());
    }
}
