//! Lowering helpers for statement nodes.
//!
//! Statements lower to `Option<IrNode>`: `pass` and empty blocks produce
//! nothing so enclosing sequences stay free of filler nodes.

use crate::ast::{AstNode, AstNodeKind};
use crate::error::{ContractViolation, ReformErrorExt};
use crate::ir::node::{IrNode, IrNodeKind};
use crate::location::Location;

use super::lower_expr::lower_expr;
use super::lowering_context::LoweringContext;
use super::tree_helpers;

pub fn lower_statement(node: &AstNode, ctx: &mut LoweringContext) -> Result<Option<IrNode>, Box<dyn ReformErrorExt>> {
    let location = node.location_or_default();
    match node.get_kind() {
        AstNodeKind::Pass => Ok(None),
        AstNodeKind::Block { .. } => lower_block(node, ctx),
        AstNodeKind::ExprStatement { expr } => Ok(Some(tree_helpers::expression_only(lower_expr(expr)?, &location))),
        AstNodeKind::Assignment { target, value } => {
            let source = lower_expr(value)?;
            Ok(Some(build_assignment(target, source, &location)?))
        }
        AstNodeKind::With { .. } => Ok(Some(super::lower_with::lower_with_statement(node, ctx)?)),
        other => Err(ContractViolation::new(
            format!("{} is not a statement", other),
            "reform.lower_stmt.lower_statement",
            node.location.clone(),
        )
        .into()),
    }
}

pub fn lower_block(node: &AstNode, ctx: &mut LoweringContext) -> Result<Option<IrNode>, Box<dyn ReformErrorExt>> {
    let location = node.location_or_default();
    match node.get_kind() {
        AstNodeKind::Block { statements } => {
            let mut lowered = Vec::with_capacity(statements.len());
            for s in statements.iter() {
                lowered.push(lower_statement(s, ctx)?);
            }
            Ok(tree_helpers::make_statements_sequence(lowered, &location))
        }
        _ => lower_statement(node, ctx),
    }
}

/// Store `source` into a name or attribute target.
pub fn build_assignment(target: &AstNode, source: IrNode, location: &Location) -> Result<IrNode, Box<dyn ReformErrorExt>> {
    let kind = match target.get_kind() {
        AstNodeKind::Identifier { name } => IrNodeKind::AssignVariable {
            name: name.clone(),
            source: Box::new(source),
        },
        AstNodeKind::Member { object, property } => IrNodeKind::AssignAttribute {
            object: Box::new(lower_expr(object)?),
            attribute: property.clone(),
            source: Box::new(source),
        },
        other => {
            return Err(ContractViolation::new(
                format!("cannot assign to {}", other),
                "reform.lower_stmt.build_assignment",
                target.location.clone(),
            )
            .into());
        }
    };
    Ok(IrNode::new(kind, location.clone()))
}
