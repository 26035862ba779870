//! file: core/src/ir/lower/mod.rs
//! description: AST -> IR lowering entry point.
//!
//! Lowering walks the top-level statements of a script in order. Plain
//! statements map one-to-one onto IR nodes; `with` statements are handed to
//! the reformulation in `lower_with`.

pub mod lower_expr;
pub mod lower_stmt;
pub mod lower_with;
pub mod lowering_context;
pub mod tree_helpers;

pub use lower_with::{RawConstruct, RawWith, WithShape, build_with_node, build_with_statement};
pub use lowering_context::LoweringContext;

use crate::ast::{AstNode, AstNodeKind};
use crate::config::ReformConfig;
use crate::error::{ContractViolation, ReformErrorExt};
use crate::ir::module::IrModule;

pub fn lower_script(ast: &AstNode, name: &str, config: ReformConfig) -> Result<IrModule, Box<dyn ReformErrorExt>> {
    let body = match ast.get_kind() {
        AstNodeKind::Script { body } => body,
        other => {
            return Err(ContractViolation::new(
                format!("expected a script root, found {}", other),
                "reform.lower.lower_script",
                ast.location.clone(),
            )
            .into());
        }
    };

    let mut ctx = LoweringContext::new(config);
    let mut module = IrModule::new(name, ctx.revision());
    for statement in body.iter() {
        if let Some(node) = lower_stmt::lower_statement(statement, &mut ctx)? {
            module.push(node);
        }
    }
    module.temp_scopes = ctx.temps().scope_count();
    module.temps = ctx.temps().temp_count();
    log::debug!(
        "lowered {} into {} statement(s), {} temp scope(s)",
        name,
        module.len(),
        module.temp_scopes
    );
    Ok(module)
}
