//! Lowering helpers for expression nodes.
//!
//! Expressions lower without touching the temp allocator: only statement
//! reformulations introduce temporaries.

use crate::ast::{AstNode, AstNodeKind};
use crate::error::{ContractViolation, ReformErrorExt};
use crate::ir::node::{IrNode, IrNodeKind};
use crate::ir::value::Value;
use crate::policy::AttributeLookupForm;

use super::tree_helpers;

pub fn lower_expr(node: &AstNode) -> Result<IrNode, Box<dyn ReformErrorExt>> {
    let location = node.location_or_default();
    let kind = match node.get_kind() {
        AstNodeKind::Identifier { name } => IrNodeKind::VariableRef { name: name.clone() },
        AstNodeKind::String { value } => IrNodeKind::Constant {
            value: Value::Str(value.clone()),
        },
        AstNodeKind::Integer { value } => IrNodeKind::Constant { value: Value::Int(*value) },
        AstNodeKind::Bool { value } => IrNodeKind::Constant { value: Value::Bool(*value) },
        AstNodeKind::None => IrNodeKind::Constant { value: Value::None },
        AstNodeKind::Member { object, property } => {
            // user-visible attribute access; only protocol hooks use the special form
            return Ok(tree_helpers::attribute_lookup(
                lower_expr(object)?,
                property,
                AttributeLookupForm::Plain,
                &location,
            ));
        }
        AstNodeKind::Call { callee, args } => {
            let called = lower_expr(callee)?;
            let args = if args.is_empty() {
                None
            } else {
                let elements = args.iter().map(lower_expr).collect::<Result<Vec<_>, _>>()?;
                Some(IrNode::new(IrNodeKind::MakeTuple { elements }, location.clone()))
            };
            return Ok(tree_helpers::call(called, args, &location));
        }
        other => {
            return Err(ContractViolation::new(
                format!("{} is not an expression", other),
                "reform.lower_expr.lower_expr",
                node.location.clone(),
            )
            .into());
        }
    };
    Ok(IrNode::new(kind, location))
}
