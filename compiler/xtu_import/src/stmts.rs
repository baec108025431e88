//! Statement and expression import.
//!
//! Total over [`StmtKind`]: every kind either imports or the whole
//! subtree import fails. Sequence containers (compound statements, call
//! arguments, initializer lists) abort on the first failing element.
//!
//! The `switch` case chain is rebuilt explicitly: case nodes are created
//! with empty `next_case` links while the body is imported, then relinked
//! in source order before the owning `Switch` node is constructed.

use crate::{ImportError, Importer, Result};
use tracing::trace;
use xtu_ast::{DeclId, ExprInfo, Stmt, StmtId, StmtKind, TraitOperand};

impl Importer<'_> {
    /// Import a statement or expression subtree, memoized per session.
    pub fn import_stmt(&mut self, from_stmt: StmtId) -> Result<StmtId> {
        if let Some(to_stmt) = self.map.lookup_stmt(from_stmt) {
            return Ok(to_stmt);
        }
        let from = self.from;
        let stmt = from.stmt(from_stmt);
        let range = self.import_range(stmt.range)?;

        let kind = match &from.stmt(from_stmt).kind {
            // --- statements ---
            StmtKind::Compound { stmts } => StmtKind::Compound {
                stmts: self.import_stmt_seq(stmts)?,
            },
            StmtKind::DeclStmt { decls } => StmtKind::DeclStmt {
                decls: decls
                    .iter()
                    .map(|&d| self.import_decl(d))
                    .collect::<Result<Vec<DeclId>>>()?,
            },
            StmtKind::Null => StmtKind::Null,
            StmtKind::If {
                cond,
                then_branch,
                else_branch,
            } => StmtKind::If {
                cond: self.import_stmt(*cond)?,
                then_branch: self.import_stmt(*then_branch)?,
                else_branch: self.import_opt_stmt(*else_branch)?,
            },
            StmtKind::While { cond, body } => StmtKind::While {
                cond: self.import_stmt(*cond)?,
                body: self.import_stmt(*body)?,
            },
            StmtKind::Do { body, cond } => StmtKind::Do {
                body: self.import_stmt(*body)?,
                cond: self.import_stmt(*cond)?,
            },
            StmtKind::For {
                init,
                cond,
                inc,
                body,
            } => StmtKind::For {
                init: self.import_opt_stmt(*init)?,
                cond: self.import_opt_stmt(*cond)?,
                inc: self.import_opt_stmt(*inc)?,
                body: self.import_stmt(*body)?,
            },
            StmtKind::Return { value } => StmtKind::Return {
                value: self.import_opt_stmt(*value)?,
            },
            StmtKind::Break => StmtKind::Break,
            StmtKind::Continue => StmtKind::Continue,
            StmtKind::Label { name, sub } => StmtKind::Label {
                name: self.import_name(*name),
                sub: self.import_stmt(*sub)?,
            },
            StmtKind::Goto { label } => StmtKind::Goto {
                label: self.import_name(*label),
            },
            StmtKind::Switch {
                cond,
                body,
                first_case,
            } => {
                let cond = *cond;
                let body = *body;
                let first_case = *first_case;
                return self.import_switch(from_stmt, cond, body, first_case, range);
            }
            // Cases get their chain links patched by the owning switch.
            StmtKind::Case { value, sub, .. } => StmtKind::Case {
                value: self.import_stmt(*value)?,
                sub: self.import_stmt(*sub)?,
                next_case: None,
            },
            StmtKind::Default { sub, .. } => StmtKind::Default {
                sub: self.import_stmt(*sub)?,
                next_case: None,
            },

            // --- expressions ---
            StmtKind::IntegerLiteral { value, info } => StmtKind::IntegerLiteral {
                value: *value,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::FloatingLiteral { bits, info } => StmtKind::FloatingLiteral {
                bits: *bits,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::StringLiteral { value, info } => StmtKind::StringLiteral {
                value: self.import_name(*value),
                info: self.import_expr_info(*info)?,
            },
            StmtKind::CharacterLiteral { value, info } => StmtKind::CharacterLiteral {
                value: *value,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::BoolLiteral { value, info } => StmtKind::BoolLiteral {
                value: *value,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::DeclRef { decl, info } => StmtKind::DeclRef {
                decl: self.import_decl(*decl)?,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::Paren { sub, info } => StmtKind::Paren {
                sub: self.import_stmt(*sub)?,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::UnaryOp { op, operand, info } => StmtKind::UnaryOp {
                op: *op,
                operand: self.import_stmt(*operand)?,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::BinaryOp { op, lhs, rhs, info } => StmtKind::BinaryOp {
                op: *op,
                lhs: self.import_stmt(*lhs)?,
                rhs: self.import_stmt(*rhs)?,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::CompoundAssign {
                op,
                lhs,
                rhs,
                computation_ty,
                info,
            } => StmtKind::CompoundAssign {
                op: *op,
                lhs: self.import_stmt(*lhs)?,
                rhs: self.import_stmt(*rhs)?,
                computation_ty: self.import_type(*computation_ty)?,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::Conditional {
                cond,
                then_expr,
                else_expr,
                info,
            } => StmtKind::Conditional {
                cond: self.import_stmt(*cond)?,
                then_expr: self.import_stmt(*then_expr)?,
                else_expr: self.import_stmt(*else_expr)?,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::Call { callee, args, info } => StmtKind::Call {
                callee: self.import_stmt(*callee)?,
                args: self.import_stmt_seq(args)?,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::Member {
                base,
                member,
                is_arrow,
                info,
            } => StmtKind::Member {
                base: self.import_stmt(*base)?,
                member: self.import_decl(*member)?,
                is_arrow: *is_arrow,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::ArraySubscript { base, index, info } => StmtKind::ArraySubscript {
                base: self.import_stmt(*base)?,
                index: self.import_stmt(*index)?,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::Cast {
                kind,
                operand,
                is_implicit,
                info,
            } => StmtKind::Cast {
                kind: *kind,
                operand: self.import_stmt(*operand)?,
                is_implicit: *is_implicit,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::UnaryTrait {
                kind,
                operand,
                info,
            } => StmtKind::UnaryTrait {
                kind: *kind,
                operand: match operand {
                    TraitOperand::Type(ty) => TraitOperand::Type(self.import_type(*ty)?),
                    TraitOperand::Expr(e) => TraitOperand::Expr(self.import_stmt(*e)?),
                },
                info: self.import_expr_info(*info)?,
            },
            StmtKind::InitList { inits, info } => StmtKind::InitList {
                inits: self.import_stmt_seq(inits)?,
                info: self.import_expr_info(*info)?,
            },
            StmtKind::Lambda { class, info } => {
                let class = *class;
                let info = *info;
                let to_class = self.import_decl(class)?;
                // The synthesized class must be complete before the
                // lambda node is usable.
                if let Some(def) = from.tag_definition(class) {
                    let to_def = self.import_decl(def)?;
                    self.import_record_body(def, to_def)?;
                }
                StmtKind::Lambda {
                    class: to_class,
                    info: self.import_expr_info(info)?,
                }
            }
        };

        let to_stmt = self.to.alloc_stmt(Stmt::new(kind, range));
        self.map.record_stmt(from_stmt, to_stmt);
        Ok(to_stmt)
    }

    fn import_opt_stmt(&mut self, stmt: Option<StmtId>) -> Result<Option<StmtId>> {
        match stmt {
            Some(s) => Ok(Some(self.import_stmt(s)?)),
            None => Ok(None),
        }
    }

    fn import_stmt_seq(&mut self, stmts: &[StmtId]) -> Result<Vec<StmtId>> {
        stmts.iter().map(|&s| self.import_stmt(s)).collect()
    }

    /// Expression type/category payload.
    fn import_expr_info(&mut self, info: ExprInfo) -> Result<ExprInfo> {
        Ok(ExprInfo {
            ty: self.import_type(info.ty)?,
            category: info.category,
            object_kind: info.object_kind,
        })
    }

    /// Import a switch: condition and body first, then walk the source
    /// case chain, relink the imported case nodes in the same order, and
    /// only then build the switch node itself.
    fn import_switch(
        &mut self,
        from_stmt: StmtId,
        cond: StmtId,
        body: StmtId,
        first_case: Option<StmtId>,
        range: xtu_ast::SourceRange,
    ) -> Result<StmtId> {
        let from = self.from;
        let cond = self.import_stmt(cond)?;
        let body = self.import_stmt(body)?;

        // Every case node was imported as part of the body, so the chain
        // walk is pure map lookups.
        let mut to_cases = Vec::new();
        let mut cursor = first_case;
        while let Some(case) = cursor {
            let to_case = self.map.lookup_stmt(case).ok_or_else(|| {
                ImportError::unknown("switch case is not part of the switch body")
            })?;
            to_cases.push(to_case);
            cursor = match &from.stmt(case).kind {
                StmtKind::Case { next_case, .. } | StmtKind::Default { next_case, .. } => {
                    *next_case
                }
                _ => return Err(ImportError::unknown("case chain entry is not a case")),
            };
        }
        trace!(cases = to_cases.len(), "relinking switch case chain");
        for pair in to_cases.windows(2) {
            match &mut self.to.stmt_mut(pair[0]).kind {
                StmtKind::Case { next_case, .. } | StmtKind::Default { next_case, .. } => {
                    *next_case = Some(pair[1]);
                }
                _ => return Err(ImportError::unknown("relink target is not a case")),
            }
        }

        let to_stmt = self.to.alloc_stmt(Stmt::new(
            StmtKind::Switch {
                cond,
                body,
                first_case: to_cases.first().copied(),
            },
            range,
        ));
        self.map.record_stmt(from_stmt, to_stmt);
        Ok(to_stmt)
    }
}
