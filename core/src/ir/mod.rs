pub mod interp;
pub mod lower;
pub mod module;
pub mod node;
pub mod temp_scope;
pub mod value;
pub mod verify;
pub mod walk;

pub use self::module::IrModule;
pub use self::node::{ExceptionComponent, IrNode, IrNodeKind, WaitKind};
pub use self::temp_scope::{ScopeId, TempScopeAllocator, TempVariable, ValueKind};

use crate::config::ReformConfig;
use crate::error::ReformErrorExt;

pub fn lower_ast_to_ir(
    ast: &crate::ast::AstNode,
    name: &str,
    config: ReformConfig,
) -> Result<IrModule, Box<dyn ReformErrorExt>> {
    lower::lower_script(ast, name, config)
}
