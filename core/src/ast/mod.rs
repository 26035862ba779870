//! file: core/src/ast/mod.rs
//! description: fixture front-end producing raw resource-management trees.
//!
//! The production parser lives outside this crate; this front-end exists so
//! tests and the CLI can feed realistic input through lowering.

pub mod err;
pub mod expr;
pub mod kind;
pub mod node;
pub mod rules;
pub mod stmt;

use pest::Parser;

pub use crate::error::ReformErrorExt;
pub use kind::AstNodeKind;
pub use node::AstNode;
pub use rules::{Rule, RulesParser};

/// Parse a script into an `AstNodeKind::Script` node.
pub fn generate_ast_from_source(script: &crate::script::Script) -> Result<AstNode, Box<dyn ReformErrorExt>> {
    let mut pairs = RulesParser::parse(Rule::script, &script.content)
        .map_err(|e| rules::syntax_error_from_pest(e, script))?;

    let root = match pairs.next() {
        Some(root) => root,
        None => {
            return Err(Box::<dyn ReformErrorExt>::from(Box::new(err::SyntaxError::with(
                crate::Level::Error,
                "Parser produced no script node.".into(),
                "reform.ast.generate_ast_from_source".into(),
                None,
                None,
            ))));
        }
    };

    let location = rules::get_location_from_pair(&root, script);
    let span = rules::get_span_from_pair(&root, script);
    let mut body = Vec::new();
    for pair in root.into_inner() {
        match pair.as_rule() {
            Rule::statement => body.push(stmt::parse_statement_rule(pair, script)?),
            Rule::EOI => {}
            other => {
                return Err(Box::<dyn ReformErrorExt>::from(Box::new(err::SyntaxError::with(
                    crate::Level::Error,
                    format!("Unexpected top-level rule: {:?}", other),
                    "reform.ast.generate_ast_from_source".into(),
                    rules::get_location_from_pair(&pair, script),
                    rules::get_span_from_pair(&pair, script),
                ))));
            }
        }
    }

    log::debug!("parsed {} top-level statement(s) from {}", body.len(), script.name);
    Ok(AstNode::new(AstNodeKind::Script { body }, location, span))
}
