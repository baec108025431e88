//! Declaration names.
//!
//! A declaration is named by more than a plain identifier: overloaded
//! operators, constructors/destructors/conversion functions (which embed a
//! type), literal operators, deduction guides, and multi-part selectors
//! all occur. [`DeclName`] is the closed sum of those shapes.

use crate::{DeclId, Name, TypeId};
use smallvec::SmallVec;

/// C++ overloaded operator kinds.
#[derive(Copy, Clone, Eq, PartialEq, Hash, Debug)]
pub enum OverloadedOperator {
    New,
    Delete,
    Plus,
    Minus,
    Star,
    Slash,
    Percent,
    Caret,
    Amp,
    Pipe,
    Tilde,
    Exclaim,
    Equal,
    Less,
    Greater,
    PlusEqual,
    MinusEqual,
    StarEqual,
    SlashEqual,
    LessLess,
    GreaterGreater,
    EqualEqual,
    ExclaimEqual,
    LessEqual,
    GreaterEqual,
    AmpAmp,
    PipePipe,
    PlusPlus,
    MinusMinus,
    Comma,
    Arrow,
    ArrowStar,
    Call,
    Subscript,
}

impl OverloadedOperator {
    /// Spelling of the operator token(s).
    pub fn spelling(self) -> &'static str {
        use OverloadedOperator::*;
        match self {
            New => "new",
            Delete => "delete",
            Plus => "+",
            Minus => "-",
            Star => "*",
            Slash => "/",
            Percent => "%",
            Caret => "^",
            Amp => "&",
            Pipe => "|",
            Tilde => "~",
            Exclaim => "!",
            Equal => "=",
            Less => "<",
            Greater => ">",
            PlusEqual => "+=",
            MinusEqual => "-=",
            StarEqual => "*=",
            SlashEqual => "/=",
            LessLess => "<<",
            GreaterGreater => ">>",
            EqualEqual => "==",
            ExclaimEqual => "!=",
            LessEqual => "<=",
            GreaterEqual => ">=",
            AmpAmp => "&&",
            PipePipe => "||",
            PlusPlus => "++",
            MinusMinus => "--",
            Comma => ",",
            Arrow => "->",
            ArrowStar => "->*",
            Call => "()",
            Subscript => "[]",
        }
    }
}

/// A multi-part message selector (Objective-C style).
///
/// A nullary selector has one piece and zero arguments; an n-ary selector
/// has n pieces, one per argument slot.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub struct Selector {
    pieces: SmallVec<[Name; 2]>,
    num_args: u32,
}

impl Selector {
    /// Create a nullary selector from a single piece.
    pub fn nullary(piece: Name) -> Self {
        Selector {
            pieces: SmallVec::from_slice(&[piece]),
            num_args: 0,
        }
    }

    /// Create an n-ary selector; one piece per argument.
    ///
    /// # Panics
    /// Panics on an empty piece list.
    pub fn with_args(pieces: impl IntoIterator<Item = Name>) -> Self {
        let pieces: SmallVec<[Name; 2]> = pieces.into_iter().collect();
        assert!(!pieces.is_empty(), "selector needs at least one piece");
        let num_args = u32::try_from(pieces.len()).unwrap_or(u32::MAX);
        Selector { pieces, num_args }
    }

    /// The selector pieces.
    pub fn pieces(&self) -> &[Name] {
        &self.pieces
    }

    /// Number of argument slots.
    pub fn num_args(&self) -> u32 {
        self.num_args
    }
}

/// The name of a declaration.
#[derive(Clone, Eq, PartialEq, Hash, Debug)]
pub enum DeclName {
    /// A plain identifier.
    Identifier(Name),
    /// `operator+`, `operator()`, ...
    Operator(OverloadedOperator),
    /// A constructor; carries the constructed type.
    Constructor(TypeId),
    /// A destructor; carries the destroyed type.
    Destructor(TypeId),
    /// A conversion function; carries the conversion target type.
    Conversion(TypeId),
    /// `operator"" _suffix`; carries the suffix identifier.
    LiteralOperator(Name),
    /// A deduction guide; carries the guided template declaration.
    DeductionGuide(DeclId),
    /// A multi-part message selector.
    Selector(Selector),
}

impl DeclName {
    /// The plain identifier, if this is an identifier name.
    pub fn ident(&self) -> Option<Name> {
        match self {
            DeclName::Identifier(n) => Some(*n),
            _ => None,
        }
    }
}

impl From<Name> for DeclName {
    fn from(n: Name) -> Self {
        DeclName::Identifier(n)
    }
}
