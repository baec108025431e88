//! Name and selector import.
//!
//! Identifiers are interned per context, so importing a name is a
//! lookup-then-reintern. Names that embed a type or declaration
//! (constructors, deduction guides) recursively import that payload.

use crate::{Importer, Result};
use xtu_ast::{Attr, DeclName, Name, Selector};

impl Importer<'_> {
    /// Re-intern an identifier in the destination context.
    pub(crate) fn import_name(&mut self, name: Name) -> Name {
        self.to.intern(self.from.interner().lookup(name))
    }

    /// Import a declaration name.
    pub fn import_decl_name(&mut self, name: &DeclName) -> Result<DeclName> {
        Ok(match name {
            DeclName::Identifier(n) => DeclName::Identifier(self.import_name(*n)),
            DeclName::Operator(op) => DeclName::Operator(*op),
            DeclName::Constructor(ty) => DeclName::Constructor(self.import_type_id(*ty)?),
            DeclName::Destructor(ty) => DeclName::Destructor(self.import_type_id(*ty)?),
            DeclName::Conversion(ty) => DeclName::Conversion(self.import_type_id(*ty)?),
            DeclName::LiteralOperator(n) => DeclName::LiteralOperator(self.import_name(*n)),
            DeclName::DeductionGuide(d) => DeclName::DeductionGuide(self.import_decl(*d)?),
            DeclName::Selector(sel) => DeclName::Selector(self.import_selector(sel)),
        })
    }

    /// Import a selector piece-by-piece, preserving its arity.
    pub fn import_selector(&mut self, sel: &Selector) -> Selector {
        let pieces: Vec<Name> = sel
            .pieces()
            .iter()
            .map(|&piece| self.import_name(piece))
            .collect();
        if sel.num_args() == 0 {
            Selector::nullary(pieces[0])
        } else {
            Selector::with_args(pieces)
        }
    }

    /// Deep-copy attributes; `Name` payloads are re-interned.
    pub(crate) fn import_attrs(&mut self, attrs: &[Attr]) -> Vec<Attr> {
        attrs
            .iter()
            .map(|attr| match attr {
                Attr::Packed => Attr::Packed,
                Attr::Used => Attr::Used,
                Attr::NoReturn => Attr::NoReturn,
                Attr::Aligned { bytes } => Attr::Aligned { bytes: *bytes },
                Attr::Deprecated { message } => Attr::Deprecated {
                    message: message.map(|m| self.import_name(m)),
                },
                Attr::Annotate { text } => Attr::Annotate {
                    text: self.import_name(*text),
                },
            })
            .collect()
    }
}
