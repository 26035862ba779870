//! file: core/src/ast/kind.rs
//! description: AST node kinds produced by the fixture front-end.
//!
//! The tree is deliberately small: resource-management blocks, the
//! statements that can appear in their bodies, and the expressions those
//! statements need. Lowering turns these into `IrNode` trees.
//!
use super::node::AstNode;

#[derive(Debug, Clone, PartialEq)]
pub enum AstNodeKind {
    Script { body: Vec<AstNode> },
    Block { statements: Vec<AstNode> },

    With { items: Vec<AstNode>, body: Box<AstNode>, is_async: bool },
    WithItem { context: Box<AstNode>, target: Option<Box<AstNode>> },

    Assignment { target: Box<AstNode>, value: Box<AstNode> },
    ExprStatement { expr: Box<AstNode> },
    Pass,

    Call { callee: Box<AstNode>, args: Vec<AstNode> },
    Member { object: Box<AstNode>, property: String },
    Identifier { name: String },
    String { value: String },
    Integer { value: i64 },
    Bool { value: bool },
    None,
}

impl AstNodeKind {
    pub fn is_expression(&self) -> bool {
        matches!(
            self,
            AstNodeKind::Call { .. }
                | AstNodeKind::Member { .. }
                | AstNodeKind::Identifier { .. }
                | AstNodeKind::String { .. }
                | AstNodeKind::Integer { .. }
                | AstNodeKind::Bool { .. }
                | AstNodeKind::None
        )
    }

    /// Whether this node may appear on the left of `=` or after `as`.
    pub fn is_target(&self) -> bool {
        matches!(self, AstNodeKind::Identifier { .. } | AstNodeKind::Member { .. })
    }
}

use std::fmt;

impl fmt::Display for AstNodeKind {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            AstNodeKind::Script { .. } => write!(f, "Script"),
            AstNodeKind::Block { .. } => write!(f, "Block"),
            AstNodeKind::With { is_async: true, .. } => write!(f, "AsyncWith"),
            AstNodeKind::With { .. } => write!(f, "With"),
            AstNodeKind::WithItem { .. } => write!(f, "WithItem"),
            AstNodeKind::Assignment { .. } => write!(f, "Assignment"),
            AstNodeKind::ExprStatement { .. } => write!(f, "ExprStatement"),
            AstNodeKind::Pass => write!(f, "Pass"),
            AstNodeKind::Call { .. } => write!(f, "Call"),
            AstNodeKind::Member { .. } => write!(f, "Member"),
            AstNodeKind::Identifier { .. } => write!(f, "Identifier"),
            AstNodeKind::String { .. } => write!(f, "String"),
            AstNodeKind::Integer { .. } => write!(f, "Integer"),
            AstNodeKind::Bool { .. } => write!(f, "Bool"),
            AstNodeKind::None => write!(f, "None"),
        }
    }
}
